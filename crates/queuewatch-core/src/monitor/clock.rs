//! Wall clock and the wait between checks.

use chrono::{DateTime, Local, TimeZone};

/// Source of "now" plus the blocking wait used between polls.
#[allow(async_fn_in_trait)]
pub trait Clock {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;

    /// Suspend until `deadline`; returns immediately if it has passed.
    async fn sleep_until(&self, deadline: &DateTime<Self::Tz>);
}

/// Local time, waiting on tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep_until(&self, deadline: &DateTime<Local>) {
        let remaining = deadline
            .signed_duration_since(Local::now())
            .to_std()
            .unwrap_or_default();
        tokio::time::sleep(remaining).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn past_deadline_returns_immediately() {
        let clock = SystemClock;
        let before = std::time::Instant::now();
        clock.sleep_until(&(clock.now() - Duration::hours(1))).await;
        assert!(before.elapsed() < std::time::Duration::from_secs(1));
    }
}
