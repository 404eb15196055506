//! TOML-based engine configuration.
//!
//! Everything here has a default matching the engine's built-in
//! constants, so a missing or partial file always yields a working
//! configuration. Stored wherever the host chooses; the engine takes an
//! explicit path.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::overdue::AGGRESSIVE_THRESHOLD_HOURS;

fn default_daily_check_hour() -> u32 {
    23
}

fn default_daily_check_minute() -> u32 {
    50
}

fn default_backstop_interval_hours() -> u32 {
    24
}

fn default_aggressive_threshold_hours() -> u32 {
    AGGRESSIVE_THRESHOLD_HOURS
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock hour of the daily all-habits completion check.
    #[serde(default = "default_daily_check_hour")]
    pub daily_check_hour: u32,
    /// Wall-clock minute of the daily completion check.
    #[serde(default = "default_daily_check_minute")]
    pub daily_check_minute: u32,
    /// Interval the host's periodic backstop sweep should run at.
    #[serde(default = "default_backstop_interval_hours")]
    pub backstop_interval_hours: u32,
    /// Overdue offset at which notifications switch to the aggressive
    /// tier.
    #[serde(default = "default_aggressive_threshold_hours")]
    pub aggressive_threshold_hours: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            daily_check_hour: default_daily_check_hour(),
            daily_check_minute: default_daily_check_minute(),
            backstop_interval_hours: default_backstop_interval_hours(),
            aggressive_threshold_hours: default_aggressive_threshold_hours(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file, falling back to defaults if it is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
