//! WAL store configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! `{}` is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration for a `WalStore` and its checkpoint scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalConfig {
    /// Path of the persisted log (default: "wal.log")
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Staged records that trigger a capacity-driven flush (default: 10)
    #[serde(default = "default_wal_size")]
    pub wal_size: usize,

    /// Seconds between background checkpoints (default: 300)
    #[serde(default = "default_checkpoint_interval_secs")]
    pub checkpoint_interval_secs: u64,

    /// Whether forced flushes (commit, checkpoint) fsync the log (default: true)
    #[serde(default = "default_fsync_on_flush")]
    pub fsync_on_flush: bool,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("wal.log")
}

fn default_wal_size() -> usize {
    10
}

fn default_checkpoint_interval_secs() -> u64 {
    300
}

fn default_fsync_on_flush() -> bool {
    true
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            wal_size: default_wal_size(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
            fsync_on_flush: default_fsync_on_flush(),
        }
    }
}

impl WalConfig {
    /// Default configuration writing to `log_file`
    pub fn with_log_file(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
            ..Self::default()
        }
    }

    /// Builder-style override of the staging capacity
    pub fn wal_size(mut self, wal_size: usize) -> Self {
        self.wal_size = wal_size;
        self
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WalConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.wal_size == 0 {
            return Err(ConfigError::Invalid("wal_size must be at least 1".into()));
        }
        if self.checkpoint_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "checkpoint_interval_secs must be at least 1".into(),
            ));
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("log_file must not be empty".into()));
        }
        Ok(())
    }

    /// Checkpoint interval as a `Duration`
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = WalConfig::default();
        assert_eq!(config.log_file, PathBuf::from("wal.log"));
        assert_eq!(config.wal_size, 10);
        assert_eq!(config.checkpoint_interval(), Duration::from_secs(300));
        assert!(config.fsync_on_flush);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: WalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, WalConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.json");
        fs::write(&path, r#"{"log_file": "data/db.wal", "wal_size": 4}"#).unwrap();

        let config = WalConfig::load(&path).unwrap();
        assert_eq!(config.log_file, PathBuf::from("data/db.wal"));
        assert_eq!(config.wal_size, 4);
        assert_eq!(config.checkpoint_interval_secs, 300);
    }

    #[test]
    fn test_zero_wal_size_rejected() {
        let config = WalConfig::default().wal_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = WalConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(WalConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
