//! The polling loop.
//!
//! Each cycle fetches the page, classifies it, picks the next wake-up instant,
//! records a sample when the status carries one, and waits. Any failure ends
//! the loop; nothing is retried.

use std::path::PathBuf;

use chrono::DateTime;
use tracing::{debug, error, info};

use super::clock::Clock;
use super::source::PageSource;
use crate::diagnostics::dump_page;
use crate::error::{ConfigError, MonitorError};
use crate::schedule::PollSchedule;
use crate::status::{classify, Keywords, Observation, PageContent};
use crate::storage::{Config, Sample, SampleSink};

/// Everything the loop needs from the configuration.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub schedule: PollSchedule,
    pub marker_class: String,
    pub keywords: Keywords,
    pub diagnostic_path: PathBuf,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            schedule: config.poll_schedule()?,
            marker_class: config.classifier.marker_class.clone(),
            keywords: config.classifier.keywords.clone(),
            diagnostic_path: config.diagnostic_path()?,
        })
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone)]
pub struct Cycle<Tz: chrono::TimeZone> {
    pub observation: Observation,
    pub next_wakeup: DateTime<Tz>,
    /// Sample written during this cycle, if any.
    pub recorded: Option<Sample>,
}

/// Polls one page until something goes wrong.
pub struct Monitor<S, K, C> {
    source: S,
    sink: K,
    clock: C,
    settings: MonitorSettings,
    /// The number seen at start-up has no known interval behind it.
    first_round: bool,
}

impl<S, K, C> Monitor<S, K, C>
where
    S: PageSource,
    K: SampleSink,
    C: Clock,
{
    pub fn new(source: S, sink: K, clock: C, settings: MonitorSettings) -> Self {
        Self {
            source,
            sink,
            clock,
            settings,
            first_round: true,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one cycle without waiting.
    pub async fn step(&mut self) -> Result<Cycle<C::Tz>, MonitorError> {
        let observation = self.observe().await?;
        let now = self.clock.now();

        let next_wakeup = self
            .settings
            .schedule
            .next_wakeup(observation.status, &now)
            .ok_or(MonitorError::ScheduleUnknown {
                status: observation.status,
            })?;

        let recorded = if std::mem::take(&mut self.first_round) {
            debug!(status = %observation.status, "first round, nothing recorded");
            None
        } else {
            match observation.sample_value() {
                Some(counter) => {
                    let sample = Sample::new(now.naive_local(), counter);
                    self.sink.append(&sample)?;
                    Some(sample)
                }
                None => None,
            }
        };

        info!(
            status = %observation.status,
            counter = ?observation.counter,
            next = %next_wakeup.naive_local(),
            "next scheduled check"
        );

        Ok(Cycle {
            observation,
            next_wakeup,
            recorded,
        })
    }

    /// Fetch and classify once, dumping the page if it is not recognised.
    pub async fn observe(&self) -> Result<Observation, MonitorError> {
        let raw = self.source.fetch().await?;
        let page = PageContent::from_html(raw, &self.settings.marker_class);

        classify(&page, &self.settings.keywords).map_err(|reason| {
            let path = self.settings.diagnostic_path.clone();
            match dump_page(&path, &page.raw) {
                Ok(()) => MonitorError::NoStatusMatched {
                    reason,
                    dump_path: path,
                },
                Err(source) => MonitorError::Diagnostic {
                    reason,
                    path,
                    source,
                },
            }
        })
    }

    /// Poll until a fatal condition occurs and return it.
    pub async fn run(&mut self) -> MonitorError {
        info!(source = self.source.describe(), cycle = %self.settings.schedule.cycle(), "monitor started");
        loop {
            match self.step().await {
                Ok(cycle) => self.clock.sleep_until(&cycle.next_wakeup).await,
                Err(e) => {
                    error!(error = %e, "monitor stopped");
                    return e;
                }
            }
        }
    }
}
