//! Center configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use sharecenter_types::Address;
use sharecenter_utils::LogFormat;

use crate::ConfigError;

/// Configuration for a ShareCenter instance.
///
/// Can be loaded from a TOML file via [`CenterConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CenterConfig {
    /// Registry owner, recorded the first time a data directory is opened.
    /// Later opens keep the recorded owner.
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Buffer of the async event stream before slow receivers lag.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_owner() -> Address {
    Address::new("owner")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./sharecenter_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_channel_capacity() -> usize {
    1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CenterConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// LMDB map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = CenterConfig::from_toml_str("").unwrap();
        assert_eq!(config, CenterConfig::default());
        assert_eq!(config.map_size_bytes(), 1024 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = CenterConfig::from_toml_str(
            r#"
            owner = "0xadmin"
            data_dir = "/var/lib/sharecenter"
            log_format = "json"
            event_channel_capacity = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.owner, Address::new("0xadmin"));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sharecenter"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.event_channel_capacity, 16);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn toml_roundtrip() {
        let config = CenterConfig {
            map_size_mb: 64,
            ..CenterConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(CenterConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = CenterConfig::from_toml_str("map_size_mb = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CenterConfig::from_toml_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
