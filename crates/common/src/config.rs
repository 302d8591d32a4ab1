//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AutogainError, AutogainResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory holding one sub-directory per device profile.
    pub profiles_dir: PathBuf,

    /// Gain-curve learning parameters.
    pub learning: LearningConfig,

    /// Parameters applied to devices seen for the first time.
    pub device_defaults: DeviceDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters of the adaptive gain-curve controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Whether click gestures update the curve.
    pub enabled: bool,

    /// Gain change per metre of longitudinal error.
    pub learning_rate: f64,

    /// Event window duration in seconds. Also the idle timeout.
    pub time_window_secs: f64,

    /// Number of early non-clutching submovements scored as ballistic.
    pub max_submovements: usize,

    /// Minimum persistence (m/s) for a speed extremum pair to survive.
    pub persistence_threshold: f64,

    /// Inter-sample gap (ms) above which a span counts as clutching.
    pub clutch_threshold_ms: f64,

    /// Resampling bucket length as a multiple of the nominal sample period.
    pub resample_factor: f64,

    /// Largest deviation from the target direction (degrees) for an aimed movement.
    pub max_angle_deg: f64,

    /// Largest overshoot ratio for an aimed movement.
    pub max_overshoot_ratio: f64,

    /// Overshoot ratio below which a movement counts as interrupted.
    pub interrupted_ratio: f64,
}

/// Profile parameters for a device without a saved profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    /// Device resolution in counts per inch.
    pub cpi: f64,

    /// Display density in pixels per inch.
    pub ppi: f64,

    /// Initial polling rate (Hz) until a higher one is measured.
    pub polling_rate_hz: f64,

    /// Value of every non-dead-band bin in a fresh curve.
    pub default_gain: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "autogain=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profiles_dir: dirs_default_profiles(),
            learning: LearningConfig::default(),
            device_defaults: DeviceDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            learning_rate: 1.0,
            time_window_secs: 5.0,
            max_submovements: 3,
            persistence_threshold: 0.01,
            clutch_threshold_ms: 130.0,
            resample_factor: 3.0,
            max_angle_deg: 45.0,
            max_overshoot_ratio: 1.5,
            interrupted_ratio: 0.5,
        }
    }
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            cpi: 800.0,
            ppi: 96.0,
            polling_rate_hz: 125.0,
            default_gain: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LearningConfig {
    /// Event window duration in microseconds.
    pub fn time_window_us(&self) -> u64 {
        (self.time_window_secs.max(0.0) * 1_000_000.0) as u64
    }

    /// Reject parameter sets the controller cannot run with.
    pub fn validate(&self) -> AutogainResult<()> {
        let positive = [
            ("learning.time_window_secs", self.time_window_secs),
            ("learning.resample_factor", self.resample_factor),
            ("learning.clutch_threshold_ms", self.clutch_threshold_ms),
            ("learning.max_overshoot_ratio", self.max_overshoot_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AutogainError::config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate >= 0.0) {
            return Err(AutogainError::config(format!(
                "learning.learning_rate must be non-negative, got {}",
                self.learning_rate
            )));
        }
        if !(self.persistence_threshold.is_finite() && self.persistence_threshold >= 0.0) {
            return Err(AutogainError::config(format!(
                "learning.persistence_threshold must be non-negative, got {}",
                self.persistence_threshold
            )));
        }
        if !(0.0..=90.0).contains(&self.max_angle_deg) {
            return Err(AutogainError::config(format!(
                "learning.max_angle_deg must lie in [0, 90], got {}",
                self.max_angle_deg
            )));
        }
        if self.max_submovements == 0 {
            return Err(AutogainError::config(
                "learning.max_submovements must be at least 1",
            ));
        }
        Ok(())
    }
}

impl DeviceDefaults {
    /// Reject device parameters that would make the transfer function degenerate.
    pub fn validate(&self) -> AutogainResult<()> {
        for (name, value) in [
            ("device_defaults.cpi", self.cpi),
            ("device_defaults.ppi", self.ppi),
            ("device_defaults.polling_rate_hz", self.polling_rate_hz),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AutogainError::config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.default_gain.is_finite() && self.default_gain >= 0.0) {
            return Err(AutogainError::config(format!(
                "device_defaults.default_gain must be non-negative, got {}",
                self.default_gain
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!("Ignoring invalid config at {:?}: {}", config_path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Validate every section.
    pub fn validate(&self) -> AutogainResult<()> {
        self.learning.validate()?;
        self.device_defaults.validate()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("autogain").join("config.json")
}

/// Default profiles directory.
fn dirs_default_profiles() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("autogain").join("profiles")
}
