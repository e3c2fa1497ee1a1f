//! Sync runtime configuration.
//!
//! # Invariants
//! - Missing fields take their defaults when deserialized.
//! - A validated config never carries a zero interval or page size.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_COLD_LOAD_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroInterval,
    ZeroPageSize,
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "sync interval must be at least one second"),
            Self::ZeroPageSize => write!(f, "cold load page size must be positive"),
            Self::Parse(message) => write!(f, "invalid sync config: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between scheduled sync cycles.
    pub interval_secs: u64,
    /// Records requested per cold-load page.
    pub cold_load_page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            cold_load_page_size: DEFAULT_COLD_LOAD_PAGE_SIZE,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.cold_load_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SyncConfig};
    use std::time::Duration;

    #[test]
    fn missing_fields_take_defaults() {
        let config = SyncConfig::from_json("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.cold_load_page_size, 500);
    }

    #[test]
    fn zero_values_are_rejected() {
        assert_eq!(
            SyncConfig::from_json(r#"{"interval_secs":0}"#).unwrap_err(),
            ConfigError::ZeroInterval
        );
        assert_eq!(
            SyncConfig::from_json(r#"{"cold_load_page_size":0}"#).unwrap_err(),
            ConfigError::ZeroPageSize
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            SyncConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
