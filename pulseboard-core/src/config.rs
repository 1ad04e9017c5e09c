//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pulseboard/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pulseboard/` (~/.config/pulseboard/)
//! - State/Logs: `$XDG_STATE_HOME/pulseboard/` (~/.local/state/pulseboard/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Batch analyzer configuration
    #[serde(default)]
    pub analytics: AnalyzerConfig,

    /// Live aggregator configuration
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Batch analyzer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    /// Number of calendar days covered by the trend series (including today)
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: u32,

    /// Completion durations at or above this many seconds are discarded
    /// as bad data before averages/medians/histograms
    #[serde(default = "default_max_completion_secs")]
    pub max_completion_secs: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            trend_window_days: default_trend_window_days(),
            max_completion_secs: default_max_completion_secs(),
        }
    }
}

fn default_trend_window_days() -> u32 {
    30
}

fn default_max_completion_secs() -> f64 {
    3600.0
}

/// Live aggregator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    /// Seconds of history re-queried on every change-feed event
    #[serde(default = "default_activity_window_secs")]
    pub activity_window_secs: i64,

    /// In-progress responses younger than this count as active respondents
    #[serde(default = "default_active_respondent_window_secs")]
    pub active_respondent_window_secs: i64,

    /// Capacity of the per-survey activity ring buffer
    #[serde(default = "default_activity_buffer_size")]
    pub activity_buffer_size: usize,

    /// Seconds between housekeeping sweeps of the activity buffers
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Max subscribe attempts before giving up on a survey feed
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,

    /// Base reconnect delay in milliseconds (doubles per attempt)
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Reconnect delay cap in milliseconds
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            activity_window_secs: default_activity_window_secs(),
            active_respondent_window_secs: default_active_respondent_window_secs(),
            activity_buffer_size: default_activity_buffer_size(),
            sweep_interval_secs: default_sweep_interval_secs(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

impl RealtimeConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.activity_window_secs <= 0 {
            return Err(Error::Config(
                "realtime.activity_window_secs must be positive".to_string(),
            ));
        }
        if self.active_respondent_window_secs <= 0 {
            return Err(Error::Config(
                "realtime.active_respondent_window_secs must be positive".to_string(),
            ));
        }
        if self.activity_buffer_size == 0 || self.activity_buffer_size > 1000 {
            return Err(Error::Config(
                "realtime.activity_buffer_size must be between 1 and 1000".to_string(),
            ));
        }
        if self.reconnect_max_attempts == 0 {
            return Err(Error::Config(
                "realtime.reconnect_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(Error::Config(
                "realtime.reconnect_base_delay_ms must not exceed reconnect_max_delay_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn default_activity_window_secs() -> i64 {
    300
}

fn default_active_respondent_window_secs() -> i64 {
    600
}

fn default_activity_buffer_size() -> usize {
    100
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_reconnect_max_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30000
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.realtime.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pulseboard/config.toml` (~/.config/pulseboard/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pulseboard").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pulseboard/` (~/.local/state/pulseboard/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pulseboard")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pulseboard/pulseboard.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pulseboard.log")
    }
}
