pub mod config;
pub mod predict;
pub mod watch;

use std::path::PathBuf;

use queuewatch_core::error::Result;
use queuewatch_core::{Config, CsvSampleStore};

/// Sample store at `dir`, or at the configured location when not given.
pub fn sample_store(dir: Option<PathBuf>) -> Result<CsvSampleStore> {
    let dir = match dir {
        Some(dir) => dir,
        None => Config::load()?.samples_dir()?,
    };
    Ok(CsvSampleStore::new(dir))
}
