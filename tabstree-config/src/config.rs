//! The `Config` struct and its YAML persistence.
//!
//! Covers:
//! - `load` / `load_from` (missing file → defaults written to disk)
//! - `save` / `save_to` (atomic write via temp file + rename)
//! - XDG-style path helpers (`config_path`, `config_dir`, `storage_dir`)
//! - Semantic validation (`validate`)

use crate::error::ConfigError;
use crate::types::LogLevel;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration for the hierarchy store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Verbosity of the debug log file
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory holding the persisted collection.
    /// `None` resolves to `<config_dir>/state`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Key the collection is stored under
    #[serde(default = "crate::defaults::storage_key")]
    pub storage_key: String,

    /// Recompute the span of a moved chunk from the forest instead of
    /// trusting the caller's item count
    #[serde(default = "crate::defaults::bool_true")]
    pub revalidate_move_chunk: bool,

    /// URL of the side panel page; tabs showing it are not tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_url: Option<String>,

    /// Per-subscriber buffer of change events
    #[serde(default = "crate::defaults::notification_capacity")]
    pub notification_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            storage_dir: None,
            storage_key: crate::defaults::storage_key(),
            revalidate_move_chunk: crate::defaults::bool_true(),
            panel_url: None,
            notification_capacity: crate::defaults::notification_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create it
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Config path: {:?}", path);

        if path.exists() {
            let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
            let config: Config = if contents.trim().is_empty() {
                Self::default()
            } else {
                serde_yaml_ng::from_str(&contents).map_err(ConfigError::from)?
            };
            config.validate()?;
            Ok(config)
        } else {
            log::info!("Config file not found, creating default at {:?}", path);
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;

        Ok(())
    }

    /// Reject values the store cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage_key must not be empty".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Validation(
                "notification_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("tabstree")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("tabstree")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Directory the persisted collection lives in, resolving `~/`
    pub fn storage_dir(&self) -> PathBuf {
        match &self.storage_dir {
            Some(dir) => {
                if let Ok(rest) = dir.strip_prefix("~")
                    && let Some(home) = dirs::home_dir()
                {
                    return home.join(rest);
                }
                dir.clone()
            }
            None => Self::config_dir().join("state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage_key, "tabstruct");
        assert!(config.revalidate_move_chunk);
        assert_eq!(config.notification_capacity, 256);
        assert_eq!(config.log_level, LogLevel::Off);
        assert!(config.panel_url.is_none());
    }

    #[test]
    fn test_load_missing_file_writes_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.yaml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "log_level: debug\nrevalidate_move_chunk: false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!config.revalidate_move_chunk);
        assert_eq!(config.storage_key, "tabstruct");
    }

    #[test]
    fn test_corrupt_yaml_is_parse_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "log_level: [[[").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = Config {
            notification_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");

        let config = Config {
            storage_dir: Some(temp.path().join("state")),
            panel_url: Some("chrome-extension://abc/sidebar.html".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.storage_dir(), temp.path().join("state"));
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
