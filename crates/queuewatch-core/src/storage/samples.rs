//! Append-only CSV sample store, one file per calendar day.
//!
//! Each line is `<timestamp>,<counter>` where the timestamp is the local wall
//! clock with microseconds, e.g. `2019-03-12 10:00:03.512306,12`. Files are
//! named after the day they hold (`2019-03-12.csv`).

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PersistError, StoreError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One recorded reception number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub counter: u32,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, counter: u32) -> Self {
        Self { timestamp, counter }
    }

    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    fn to_line(self) -> String {
        format!("{},{}\n", self.timestamp.format(TIMESTAMP_FORMAT), self.counter)
    }

    fn parse_line(line: &str) -> Result<Self, String> {
        let (ts, counter) = line
            .split_once(',')
            .ok_or_else(|| "expected '<timestamp>,<counter>'".to_string())?;
        let ts = ts.trim();
        let timestamp = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|e| format!("bad timestamp '{ts}': {e}"))?;
        let counter = counter
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad counter '{}': {e}", counter.trim()))?;
        Ok(Self { timestamp, counter })
    }
}

/// Destination for samples produced by the polling loop.
pub trait SampleSink {
    /// Append one sample; durable once this returns `Ok`.
    fn append(&self, sample: &Sample) -> Result<(), PersistError>;
}

/// Samples grouped by day, each day in written order.
pub type DailySamples = BTreeMap<NaiveDate, Vec<Sample>>;

/// CSV files under a single directory.
#[derive(Debug, Clone)]
pub struct CsvSampleStore {
    dir: PathBuf,
}

impl CsvSampleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.csv", day.format("%Y-%m-%d")))
    }

    /// Read every day file in the directory.
    ///
    /// Files whose name is not `<ISO date>.csv` are skipped. A missing
    /// directory reads as an empty history.
    pub fn read_all(&self) -> Result<DailySamples, StoreError> {
        let mut days = DailySamples::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(days),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            let Some(day) = day_from_path(&path) else {
                debug!(path = %path.display(), "skipping non-day file");
                continue;
            };
            days.insert(day, read_file(&path)?);
        }

        Ok(days)
    }

    /// Read a single day; a day without a file has no samples.
    pub fn read_day(&self, day: NaiveDate) -> Result<Vec<Sample>, StoreError> {
        let path = self.day_path(day);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_file(&path)
    }
}

impl SampleSink for CsvSampleStore {
    fn append(&self, sample: &Sample) -> Result<(), PersistError> {
        let path = self.day_path(sample.day());
        let io_err = |source: std::io::Error| PersistError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| PersistError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(sample.to_line().as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        debug!(path = %path.display(), counter = sample.counter, "sample appended");
        Ok(())
    }
}

fn day_from_path(path: &Path) -> Option<NaiveDate> {
    if path.extension()? != "csv" || !path.is_file() {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

fn read_file(path: &Path) -> Result<Vec<Sample>, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            Sample::parse_line(line).map_err(|message| StoreError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message,
            })
        })
        .collect()
}
