//! # queuewatch Core Library
//!
//! Watches a clinic's "now serving" page, records how the reception number
//! moves through the day, and predicts when a given number will be called.
//! The CLI binary is a thin layer over this library.
//!
//! ## Architecture
//!
//! - **Status classification**: the page is reduced to one of five reception
//!   statuses, plus the current number while patients are being accepted
//! - **Adaptive schedule**: the next check is chosen from the status, every
//!   cycle while the counter moves and once at opening time while dormant
//! - **Monitor**: a sequential fetch/classify/schedule/record/sleep loop
//! - **Storage**: append-only per-day CSV samples and TOML configuration
//! - **Prediction**: per-cycle throughput averaged over all recorded days,
//!   walked forward from the number currently being served
//!
//! ## Key Components
//!
//! - [`Monitor`]: the polling loop
//! - [`PollSchedule`]: next wake-up selection
//! - [`CsvSampleStore`]: sample persistence
//! - [`aggregate`] and [`predict`](predict::predict): the prediction engine
//! - [`Config`]: application configuration management

pub mod diagnostics;
pub mod error;
pub mod monitor;
pub mod predict;
pub mod schedule;
pub mod status;
pub mod storage;
pub mod throughput;

pub use error::{ClassifyError, ConfigError, CoreError, MonitorError, PersistError, PredictError, StoreError};
pub use monitor::{Clock, Cycle, HttpPageSource, Monitor, MonitorSettings, PageSource, SystemClock};
pub use predict::{forecast, Prediction};
pub use schedule::{CycleMinutes, PollSchedule};
pub use status::{classify, Keywords, Observation, PageContent, Status};
pub use storage::{Config, CsvSampleStore, DailySamples, Sample, SampleSink};
pub use throughput::{aggregate, daily_throughput, AveragedCurve, BucketTime, CurvePoint, ThroughputPoint};
