//! Core error types for queuewatch-core.
//!
//! Every failure of the polling loop is fatal and surfaces through
//! [`MonitorError`]; nothing here is retried. Prediction's "cannot predict"
//! outcome is not an error at all (see [`crate::predict::Prediction`]).

use std::path::PathBuf;
use thiserror::Error;

use crate::status::Status;

/// Core error type for queuewatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Polling loop errors
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// Sample store read errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Prediction errors
    #[error("Prediction error: {0}")]
    Predict(#[from] PredictError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal outcomes of the polling loop.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The page could not be retrieved.
    #[error("Failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    /// No status could be inferred from the page; the raw page was dumped.
    #[error("{reason}; page content saved to {}", dump_path.display())]
    NoStatusMatched {
        reason: ClassifyError,
        dump_path: PathBuf,
    },

    /// The selector could not produce a wake-up instant for this status.
    #[error("Cannot determine the next check time for status '{status}'")]
    ScheduleUnknown { status: Status },

    /// A sample could not be written.
    #[error("Failed to persist sample: {0}")]
    PersistFailed(#[from] PersistError),

    /// The page was not recognised and the dump itself could not be written.
    #[error("{reason}; failed to write diagnostic dump to {}: {source}", path.display())]
    Diagnostic {
        reason: ClassifyError,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a page could not be classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// Neither the service marker nor any status keyword was found.
    #[error("none of the status keywords found")]
    NoStatusMatched,

    /// The service marker was present but did not hold a number.
    #[error("service marker content '{0}' is not a reception number")]
    InvalidCounter(String),
}

/// Failure to append a sample, split by class.
#[derive(Error, Debug)]
pub enum PersistError {
    /// I/O failure; most likely a wrong sample directory.
    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Errors reading the sample history back.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record line did not parse.
    #[error("Malformed record at {}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Usage errors of the prediction engine.
#[derive(Error, Debug)]
pub enum PredictError {
    /// No day contributed any throughput.
    #[error("No sample history available to build a throughput curve")]
    EmptyHistory,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
