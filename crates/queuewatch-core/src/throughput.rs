//! Per-cycle throughput and the averaged daily throughput curve.
//!
//! Sample times are snapped to half-hour buckets so days polled at slightly
//! different minutes line up. A bucket's throughput is how far the counter
//! moved since the previous sample of the same day.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::storage::{DailySamples, Sample};

/// Time of day in minutes since midnight.
///
/// `24:00` (1440) is a valid bucket: samples taken at 23:45 or later snap
/// forward to the end of their own day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketTime(u16);

impl BucketTime {
    pub const END_OF_DAY: BucketTime = BucketTime(24 * 60);

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        let total = hour.checked_mul(60)?.checked_add(minute)?;
        (minute < 60 && total <= 24 * 60).then(|| Self(total as u16))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }
}

impl From<NaiveTime> for BucketTime {
    /// Exact minute of `time`, without snapping.
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl fmt::Display for BucketTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Parses `HH:MM` or the compact `HHMM` form (`930`, `1930`).
impl FromStr for BucketTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (h, m) = match s.split_once(':') {
            Some((h, m)) => (h, m),
            None if (3..=4).contains(&s.len()) && s.is_char_boundary(s.len() - 2) => {
                s.split_at(s.len() - 2)
            }
            None => return Err(format!("invalid time '{s}': expected HH:MM or HHMM")),
        };
        let hour: u32 = h.parse().map_err(|_| format!("invalid hour in '{s}'"))?;
        let minute: u32 = m.parse().map_err(|_| format!("invalid minute in '{s}'"))?;
        Self::from_hm(hour, minute).ok_or_else(|| format!("time out of range: '{s}'"))
    }
}

/// Snap a time of day to its half-hour bucket.
///
/// Minutes up to :15 belong to the hour, :16 to :44 to the half hour, and :45
/// onward to the next hour.
pub fn snap(time: NaiveTime) -> BucketTime {
    let hour = time.hour() as u16;
    let minute = time.minute();
    let minutes = if minute > 15 && minute < 45 {
        hour * 60 + 30
    } else if minute >= 45 {
        (hour + 1) * 60
    } else {
        hour * 60
    };
    BucketTime(minutes)
}

/// Counter movement observed at one bucket of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputPoint {
    pub time_of_day: BucketTime,
    pub delta: i64,
}

/// Throughput series of a single day, in sample order.
///
/// The first sample has no predecessor and yields no point.
pub fn daily_throughput(samples: &[Sample]) -> Vec<ThroughputPoint> {
    samples
        .windows(2)
        .map(|pair| ThroughputPoint {
            time_of_day: snap(pair[1].timestamp.time()),
            delta: i64::from(pair[1].counter) - i64::from(pair[0].counter),
        })
        .collect()
}

/// Mean throughput at one bucket across days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub time_of_day: BucketTime,
    /// Rounded to one decimal place.
    pub mean_delta: f64,
    /// Number of deltas averaged into this bucket.
    pub samples: u32,
}

/// Averaged daily throughput, ordered by time of day with unique buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedCurve {
    points: Vec<CurvePoint>,
}

impl AveragedCurve {
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, time_of_day: BucketTime) -> Option<&CurvePoint> {
        self.points
            .binary_search_by_key(&time_of_day, |p| p.time_of_day)
            .ok()
            .map(|idx| &self.points[idx])
    }

    /// Render the curve as a horizontal bar chart.
    pub fn render_ascii_chart(&self) -> String {
        let mut output = String::from("\nAverage throughput per cycle:\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');

        let peak = self
            .points
            .iter()
            .map(|p| p.mean_delta)
            .fold(0.0_f64, f64::max);

        for point in &self.points {
            let bar_length = if peak > 0.0 {
                ((point.mean_delta.max(0.0) / peak) * 30.0).round() as usize
            } else {
                0
            };
            output.push_str(&format!(
                "{} {}{} {:>6.1} (n={})\n",
                point.time_of_day,
                "█".repeat(bar_length),
                " ".repeat(30 - bar_length),
                point.mean_delta,
                point.samples
            ));
        }

        output.push_str(&"─".repeat(50));
        output.push('\n');
        output
    }
}

/// Average every day's throughput into one curve.
pub fn aggregate(days: &DailySamples) -> AveragedCurve {
    let mut sums: BTreeMap<BucketTime, (i64, u32)> = BTreeMap::new();

    for samples in days.values() {
        for point in daily_throughput(samples) {
            let entry = sums.entry(point.time_of_day).or_insert((0, 0));
            entry.0 += point.delta;
            entry.1 += 1;
        }
    }

    let points = sums
        .into_iter()
        .map(|(time_of_day, (sum, count))| CurvePoint {
            time_of_day,
            mean_delta: round_one_decimal(sum as f64 / f64::from(count)),
            samples: count,
        })
        .collect();

    AveragedCurve { points }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
