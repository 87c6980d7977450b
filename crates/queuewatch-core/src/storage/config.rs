//! TOML-based application configuration.
//!
//! Stores:
//! - The monitored page and polling cadence
//! - The markers used to recognise each reception status
//! - Where samples and diagnostic dumps are written
//! - Contact details for reservations
//!
//! Configuration is stored at `~/.config/queuewatch/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::schedule::{CycleMinutes, PollSchedule};
use crate::status::Keywords;

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Page showing the clinic's reception status.
    #[serde(default)]
    pub url: String,
    /// Minutes between checks while the counter is moving. Must divide 60.
    #[serde(default)]
    pub cycle_minutes: CycleMinutes,
    /// Hour at which dormant statuses are checked again.
    #[serde(default = "default_opening_hour")]
    pub opening_hour: u32,
}

/// Page recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Class of the `<span>` holding the current reception number.
    #[serde(default = "default_marker_class")]
    pub marker_class: String,
    #[serde(default)]
    pub keywords: Keywords,
}

/// Storage locations. Unset paths fall back to the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub samples_dir: Option<PathBuf>,
    #[serde(default)]
    pub diagnostic_path: Option<PathBuf>,
}

/// Contact details submitted with a reservation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/queuewatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub contact: ContactConfig,
}

// Default functions
fn default_opening_hour() -> u32 {
    9
}
fn default_marker_class() -> String {
    "mark".into()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cycle_minutes: CycleMinutes::default(),
            opening_hour: default_opening_hour(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            marker_class: default_marker_class(),
            keywords: Keywords::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".into()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is rejected,
    /// e.g. a cycle length that does not divide 60.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Check everything the monitor needs before it starts polling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "monitor.url".into(),
                message: "no page URL configured".into(),
            });
        }
        let url = url::Url::parse(&self.monitor.url).map_err(|e| ConfigError::InvalidValue {
            key: "monitor.url".into(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "monitor.url".into(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.classifier.marker_class.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "classifier.marker_class".into(),
                message: "must not be empty".into(),
            });
        }
        self.poll_schedule().map(|_| ())
    }

    pub fn poll_schedule(&self) -> Result<PollSchedule, ConfigError> {
        PollSchedule::new(self.monitor.cycle_minutes, self.monitor.opening_hour)
    }

    /// Directory holding the per-day sample files.
    pub fn samples_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.samples_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("csv")),
        }
    }

    /// File receiving the raw page when classification fails.
    pub fn diagnostic_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.diagnostic_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("html_error_log")),
        }
    }
}
