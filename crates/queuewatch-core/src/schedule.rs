//! Status-driven choice of the next polling instant.
//!
//! Polling is fine-grained (once per cycle, aligned to the hour) while the
//! counter moves or is about to, and drops to a single check at the next
//! opening time while the clinic is dormant.

use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::status::Status;

/// Polling cycle length in minutes. Always a divisor of 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CycleMinutes(u32);

impl CycleMinutes {
    /// Every accepted cycle length.
    pub const DIVISORS: [u32; 12] = [1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60];

    pub fn new(minutes: u32) -> Result<Self, ConfigError> {
        if Self::DIVISORS.contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(ConfigError::InvalidValue {
                key: "monitor.cycle_minutes".into(),
                message: format!("{minutes} does not divide 60 evenly"),
            })
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for CycleMinutes {
    fn default() -> Self {
        Self(30)
    }
}

impl TryFrom<u32> for CycleMinutes {
    type Error = ConfigError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Self::new(minutes)
    }
}

impl From<CycleMinutes> for u32 {
    fn from(cycle: CycleMinutes) -> Self {
        cycle.0
    }
}

impl fmt::Display for CycleMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.0)
    }
}

/// Decides when the next observation should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    cycle: CycleMinutes,
    /// Hour the clinic starts showing activity; dormant statuses wake up here.
    opening_hour: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            cycle: CycleMinutes::default(),
            opening_hour: 9,
        }
    }
}

impl PollSchedule {
    pub fn new(cycle: CycleMinutes, opening_hour: u32) -> Result<Self, ConfigError> {
        if opening_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.opening_hour".into(),
                message: format!("{opening_hour} is not an hour of the day"),
            });
        }
        Ok(Self {
            cycle,
            opening_hour,
        })
    }

    pub fn cycle(&self) -> CycleMinutes {
        self.cycle
    }

    pub fn opening_hour(&self) -> u32 {
        self.opening_hour
    }

    /// Next wake-up instant for `status` observed at `now`.
    ///
    /// Cycle wake-ups are measured in elapsed time from `now`, so they stay in
    /// the future and at most one cycle away across a daylight-saving change.
    /// Opening-time wake-ups are resolved in `now`'s time zone: a wall-clock
    /// time that is skipped moves forward to the first minute that exists, and
    /// a repeated one resolves to its first occurrence after `now`.
    ///
    /// Returns `None` only when the instant lies outside the representable
    /// range. Seconds are always zero on the result.
    pub fn next_wakeup<Tz: TimeZone>(
        &self,
        status: Status,
        now: &DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        let local = now.naive_local();
        if self.polls_per_cycle(status, local) {
            let boundary = self.next_boundary(local)?;
            now.clone().checked_add_signed(boundary - local)
        } else {
            let target = self.next_local(status, local)?;
            resolve_after(&now.timezone(), target, now)
        }
    }

    /// Wall-clock version of [`next_wakeup`](Self::next_wakeup).
    pub fn next_local(&self, status: Status, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.polls_per_cycle(status, now) {
            return self.next_boundary(now);
        }
        let opening = now.date().and_hms_opt(self.opening_hour, 0, 0)?;
        match status {
            Status::Finished | Status::Holiday => opening.checked_add_signed(Duration::days(1)),
            _ => Some(opening),
        }
    }

    fn polls_per_cycle(&self, status: Status, now: NaiveDateTime) -> bool {
        match status {
            Status::Accepting | Status::Beginning => true,
            Status::Preparing => now.hour() >= self.opening_hour,
            Status::Finished | Status::Holiday => false,
        }
    }

    /// Next multiple of the cycle past the hour, rolling into the next hour.
    fn next_boundary(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let cycle = self.cycle.get();
        let top_of_hour = now.date().and_hms_opt(now.hour(), 0, 0)?;
        let next_minute = (now.minute() / cycle + 1) * cycle;
        top_of_hour.checked_add_signed(Duration::minutes(i64::from(next_minute)))
    }
}

/// Longest run of skipped wall-clock minutes searched when resolving a gap.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Map a wall-clock time in `tz` onto the first matching instant after `now`.
fn resolve_after<Tz: TimeZone>(
    tz: &Tz,
    target: NaiveDateTime,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&target) {
        LocalResult::Single(instant) => Some(instant),
        LocalResult::Ambiguous(first, second) => [first, second].into_iter().find(|t| t > now),
        LocalResult::None => (1..=MAX_GAP_MINUTES).find_map(|m| {
            let shifted = target.checked_add_signed(Duration::minutes(m))?;
            tz.from_local_datetime(&shifted).earliest()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};
    use proptest::prelude::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 3, 12)
            .unwrap()
            .and_hms_micro_opt(h, m, s, 123_456)
            .unwrap()
    }

    fn schedule(cycle: u32) -> PollSchedule {
        PollSchedule::new(CycleMinutes::new(cycle).unwrap(), 9).unwrap()
    }

    #[test]
    fn rejects_cycles_that_do_not_divide_an_hour() {
        for bad in [0, 7, 25, 45, 90] {
            assert!(CycleMinutes::new(bad).is_err(), "{bad}");
        }
        for good in CycleMinutes::DIVISORS {
            assert_eq!(CycleMinutes::new(good).unwrap().get(), good);
        }
    }

    #[test]
    fn rejects_out_of_range_opening_hour() {
        assert!(PollSchedule::new(CycleMinutes::default(), 24).is_err());
    }

    #[test]
    fn accepting_rounds_to_next_boundary() {
        let s = schedule(30);
        assert_eq!(s.next_local(Status::Accepting, at(10, 2, 40)), Some(at(10, 30, 0).with_nanosecond(0).unwrap()));
        assert_eq!(
            s.next_local(Status::Beginning, at(10, 30, 0)),
            Some(at(11, 0, 0).with_nanosecond(0).unwrap())
        );
    }

    #[test]
    fn end_of_hour_rolls_over() {
        let s = schedule(30);
        let next = s.next_local(Status::Accepting, at(10, 59, 59)).unwrap();
        assert_eq!(next, at(11, 0, 0).with_nanosecond(0).unwrap());

        let late = s.next_local(Status::Accepting, at(23, 59, 0)).unwrap();
        assert_eq!(
            late,
            NaiveDate::from_ymd_opt(2019, 3, 13).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn preparing_before_opening_waits_for_opening() {
        let next = schedule(10).next_local(Status::Preparing, at(3, 17, 5)).unwrap();
        assert_eq!(next, at(9, 0, 0).with_nanosecond(0).unwrap());
    }

    #[test]
    fn preparing_after_opening_polls_per_cycle() {
        let next = schedule(10).next_local(Status::Preparing, at(9, 4, 0)).unwrap();
        assert_eq!(next, at(9, 10, 0).with_nanosecond(0).unwrap());
    }

    #[test]
    fn finished_and_holiday_wait_for_next_day() {
        let tomorrow_nine = NaiveDate::from_ymd_opt(2019, 3, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let s = schedule(30);
        assert_eq!(s.next_local(Status::Finished, at(14, 20, 0)), Some(tomorrow_nine));
        assert_eq!(s.next_local(Status::Holiday, at(8, 0, 0)), Some(tomorrow_nine));
    }

    #[test]
    fn custom_opening_hour() {
        let s = PollSchedule::new(CycleMinutes::new(15).unwrap(), 8).unwrap();
        assert_eq!(
            s.next_local(Status::Preparing, at(6, 0, 0)),
            Some(at(8, 0, 0).with_nanosecond(0).unwrap())
        );
        assert_eq!(
            s.next_local(Status::Preparing, at(8, 20, 0)),
            Some(at(8, 30, 0).with_nanosecond(0).unwrap())
        );
    }

    #[test]
    fn unrepresentable_instant_is_unknown() {
        let last_day = NaiveDate::MAX.and_hms_opt(20, 0, 0).unwrap();
        assert_eq!(schedule(30).next_local(Status::Finished, last_day), None);
    }

    #[test]
    fn keeps_time_zone_of_now() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2019, 3, 12, 10, 2, 0).unwrap();
        let next = schedule(30).next_wakeup(Status::Accepting, &now).unwrap();
        assert_eq!(next, tz.with_ymd_and_hms(2019, 3, 12, 10, 30, 0).unwrap());

        let utc_now = Utc.with_ymd_and_hms(2019, 3, 12, 22, 0, 0).unwrap();
        let next = schedule(30).next_wakeup(Status::Finished, &utc_now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2019, 3, 13, 9, 0, 0).unwrap());
    }

    /// Central European time with the 2019 transitions only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Cet2019;

    impl Cet2019 {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }

        fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> LocalResult<DateTime<Self>> {
            Cet2019.from_local_datetime(
                &NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap(),
            )
        }
    }

    impl TimeZone for Cet2019 {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            Cet2019
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let fits: Vec<FixedOffset> = [Self::summer(), Self::winter()]
                .into_iter()
                .filter(|off| {
                    let utc = *local - Duration::seconds(i64::from(off.local_minus_utc()));
                    self.offset_from_utc_datetime(&utc) == *off
                })
                .collect();
            match fits.as_slice() {
                [] => LocalResult::None,
                [one] => LocalResult::Single(*one),
                [first, second, ..] => LocalResult::Ambiguous(*first, *second),
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            let start = NaiveDate::from_ymd_opt(2019, 3, 31).unwrap().and_hms_opt(1, 0, 0).unwrap();
            let end = NaiveDate::from_ymd_opt(2019, 10, 27).unwrap().and_hms_opt(1, 0, 0).unwrap();
            if (start..end).contains(utc) {
                Self::summer()
            } else {
                Self::winter()
            }
        }
    }

    fn wall(t: &DateTime<Cet2019>) -> (u32, u32) {
        (t.hour(), t.minute())
    }

    #[test]
    fn repeated_hour_never_schedules_into_the_past() {
        let s = schedule(30);

        // Second pass through 02:15, after the clocks went back.
        let now = Cet2019::local(2019, 10, 27, 2, 15).latest().unwrap();
        let next = s.next_wakeup(Status::Accepting, &now).unwrap();
        assert!(next > now);
        assert_eq!(next.signed_duration_since(now), Duration::minutes(15));
        assert_eq!(wall(&next), (2, 30));

        // First pass through 02:45, just before the clocks go back.
        let now = Cet2019::local(2019, 10, 27, 2, 45).earliest().unwrap();
        let next = s.next_wakeup(Status::Beginning, &now).unwrap();
        assert_eq!(next.signed_duration_since(now), Duration::minutes(15));
        assert_eq!(wall(&next), (2, 0));
    }

    #[test]
    fn skipped_hour_still_has_a_wakeup() {
        let s = schedule(30);
        let now = Cet2019::local(2019, 3, 31, 1, 45).single().unwrap();
        let next = s.next_wakeup(Status::Accepting, &now).unwrap();
        assert_eq!(next.signed_duration_since(now), Duration::minutes(15));
        assert_eq!(wall(&next), (3, 0));
    }

    #[test]
    fn opening_time_across_transitions() {
        // Next-day opening keeps its wall-clock time over the spring change.
        let now = Cet2019::local(2019, 3, 30, 14, 0).single().unwrap();
        let next = schedule(30).next_wakeup(Status::Finished, &now).unwrap();
        assert_eq!(next, Cet2019::local(2019, 3, 31, 9, 0).single().unwrap());

        // Opening inside the skipped hour moves to the first existing minute.
        let early = PollSchedule::new(CycleMinutes::new(30).unwrap(), 2).unwrap();
        let now = Cet2019::local(2019, 3, 31, 0, 30).single().unwrap();
        let next = early.next_wakeup(Status::Preparing, &now).unwrap();
        assert_eq!(next, Cet2019::local(2019, 3, 31, 3, 0).single().unwrap());

        // Opening inside the repeated hour takes its first occurrence.
        let now = Cet2019::local(2019, 10, 27, 0, 30).single().unwrap();
        let next = early.next_wakeup(Status::Preparing, &now).unwrap();
        assert_eq!(next, Cet2019::local(2019, 10, 27, 2, 0).earliest().unwrap());
    }

    fn active_status() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Accepting),
            Just(Status::Beginning),
            Just(Status::Preparing),
        ]
    }

    proptest! {
        #[test]
        fn active_wakeup_is_aligned_and_within_one_cycle(
            idx in 0usize..CycleMinutes::DIVISORS.len(),
            status in active_status(),
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            prop_assume!(status != Status::Preparing || hour >= 9);
            let cycle = CycleMinutes::DIVISORS[idx];
            let now = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(hour, minute, second).unwrap();
            let next = schedule(cycle).next_local(status, now).unwrap();

            prop_assert!(next > now);
            prop_assert!(next - now <= Duration::minutes(i64::from(cycle)));
            prop_assert_eq!(next.minute() % cycle, 0);
            prop_assert_eq!(next.second(), 0);
            prop_assert_eq!(next.nanosecond(), 0);
        }
    }
}
