//! Cadence configuration system
//!
//! Loads engine settings from `cadence.toml`, with environment variables
//! taking precedence for temporary overrides.
//!
//! ```toml
//! [timeline]
//! default_easing = "ease-in-out"
//! playback_rate = 1.0
//!
//! [clock]
//! frame_interval_ms = 16.67
//!
//! [logging]
//! filter = "cadence_timeline=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_FILE: &str = "cadence.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CadenceConfig {
    /// Defaults for new timelines
    pub timeline: TimelineConfig,
    /// Headless frame clock settings
    pub clock: ClockConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

/// Timeline defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Easing for keyframes and definitions that do not name one (CSS syntax)
    pub default_easing: String,
    /// Initial playback rate; negative plays backwards
    pub playback_rate: f64,
}

/// Frame clock configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    /// Frame spacing used when the clock is driven headless
    pub frame_interval_ms: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter directives; `RUST_LOG` is used when unset
    pub filter: Option<String>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_easing: "ease".to_string(),
            playback_rate: 1.0,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 1000.0 / 60.0,
        }
    }
}

impl CadenceConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `cadence.toml` in the current directory,
    /// or return the default configuration if it is missing or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Values that do not parse are ignored.
    pub fn merge_with_env(&mut self) {
        if let Ok(easing) = std::env::var("CADENCE_DEFAULT_EASING") {
            self.timeline.default_easing = easing;
        }
        if let Ok(val) = std::env::var("CADENCE_PLAYBACK_RATE") {
            if let Ok(rate) = val.parse::<f64>() {
                self.timeline.playback_rate = rate;
            }
        }

        if let Ok(val) = std::env::var("CADENCE_FRAME_INTERVAL_MS") {
            if let Ok(interval) = val.parse::<f64>() {
                if interval > 0.0 {
                    self.clock.frame_interval_ms = interval;
                }
            }
        }

        if let Ok(filter) = std::env::var("CADENCE_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from cadence.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
