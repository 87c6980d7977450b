mod config;
pub mod samples;

pub use config::{ClassifierConfig, Config, ContactConfig, MonitorConfig, StorageConfig};
pub use samples::{CsvSampleStore, DailySamples, Sample, SampleSink};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/queuewatch[-dev]/` based on QUEUEWATCH_ENV.
///
/// Set QUEUEWATCH_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUEUEWATCH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("queuewatch-dev")
    } else {
        base_dir.join("queuewatch")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
