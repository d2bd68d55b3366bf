//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; omitted values take the
//! defaults below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::calibration::params::{ADC_MAX, STORED_SIZE};
use crate::calibration::session::SessionTimeouts;
use crate::error::{Result, WheelBridgeError};
use crate::signal::pipeline::PipelineStages;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ControlConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Signal pipeline stage toggles
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub filter_accel: bool,

    #[serde(default = "default_true")]
    pub filter_brake: bool,

    #[serde(default = "default_true")]
    pub filter_steering: bool,

    #[serde(default = "default_true")]
    pub response_curve: bool,

    #[serde(default = "default_true")]
    pub deadband: bool,

    #[serde(default)]
    pub accel_inverted: bool,

    #[serde(default = "default_true")]
    pub accel_gain_enabled: bool,

    #[serde(default = "default_accel_gain")]
    pub accel_gain: f64,
}

/// Raw input configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InputsConfig {
    #[serde(default = "default_analog_threshold")]
    pub analog_threshold: i32,

    /// JSONL frames to replay; empty for an idle wheel
    #[serde(default)]
    pub replay_path: String,
}

/// Where the operator console lives
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    #[default]
    Stdio,
    Serial,
}

/// Operator console configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub kind: ConsoleKind,

    /// Serial device; empty to try the usual device paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Persistent storage configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,

    #[serde(default = "default_storage_size")]
    pub size: usize,
}

/// Calibration session timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CalibrationConfig {
    #[serde(default = "default_menu_timeout_half_seconds")]
    pub menu_timeout_half_seconds: u64,

    #[serde(default = "default_deadband_timeout_ms")]
    pub deadband_timeout_ms: u64,
}

/// HID report output configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_report_path")]
    pub path: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_true() -> bool { true }

fn default_tick_interval_ms() -> u64 { 10 }

fn default_accel_gain() -> f64 { crate::signal::pipeline::DEFAULT_ACCEL_GAIN }

fn default_analog_threshold() -> i32 { crate::input::reader::DEFAULT_ANALOG_THRESHOLD }

fn default_baud_rate() -> u32 { crate::console::link::DEFAULT_BAUD_RATE }

fn default_storage_path() -> String { "./eeprom.bin".to_string() }
fn default_storage_size() -> usize { crate::calibration::store::DEFAULT_EEPROM_SIZE }

fn default_menu_timeout_half_seconds() -> u64 { crate::calibration::session::MENU_TIMEOUT_HALF_SECONDS }
fn default_deadband_timeout_ms() -> u64 { 10_000 }

fn default_report_path() -> String { "./reports.jsonl".to_string() }
fn default_max_records_per_file() -> usize { 10_000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_accel: true,
            filter_brake: true,
            filter_steering: true,
            response_curve: true,
            deadband: true,
            accel_inverted: false,
            accel_gain_enabled: true,
            accel_gain: default_accel_gain(),
        }
    }
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            analog_threshold: default_analog_threshold(),
            replay_path: String::new(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            kind: ConsoleKind::Stdio,
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            size: default_storage_size(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            menu_timeout_half_seconds: default_menu_timeout_half_seconds(),
            deadband_timeout_ms: default_deadband_timeout_ms(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_report_path(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl ControlConfig {
    /// Period of the control loop
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl PipelineConfig {
    /// Stage toggles for [`crate::signal::pipeline::SignalPipeline`]
    pub fn stages(&self) -> PipelineStages {
        PipelineStages {
            filter_accel: self.filter_accel,
            filter_brake: self.filter_brake,
            filter_steering: self.filter_steering,
            response_curve: self.response_curve,
            deadband: self.deadband,
            accel_inverted: self.accel_inverted,
            accel_gain: self.accel_gain_enabled.then_some(self.accel_gain),
        }
    }
}

impl InputsConfig {
    /// Replay file, if one is configured
    pub fn replay_path(&self) -> Option<PathBuf> {
        (!self.replay_path.is_empty()).then(|| PathBuf::from(&self.replay_path))
    }
}

impl CalibrationConfig {
    /// Session deadlines
    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            menu: Duration::from_millis(500 * self.menu_timeout_half_seconds),
            deadband_entry: Duration::from_millis(self.deadband_timeout_ms),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wheel_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read, parsed or validated
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.control.tick_interval_ms == 0 || self.control.tick_interval_ms > 1000 {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("tick_interval_ms must be between 1 and 1000")
            ));
        }

        if self.pipeline.accel_gain_enabled
            && !(self.pipeline.accel_gain > 0.0 && self.pipeline.accel_gain <= 10.0)
        {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("accel_gain must be greater than 0.0 and at most 10.0")
            ));
        }

        if !(0..=ADC_MAX).contains(&self.inputs.analog_threshold) {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom(format!("analog_threshold must be between 0 and {}", ADC_MAX))
            ));
        }

        if self.console.kind == ConsoleKind::Serial && self.console.baud_rate == 0 {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("baud_rate must be greater than 0")
            ));
        }

        if self.storage.path.is_empty() {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("storage path cannot be empty")
            ));
        }

        if self.storage.size < STORED_SIZE {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom(format!("storage size must be at least {} bytes", STORED_SIZE))
            ));
        }

        if self.calibration.menu_timeout_half_seconds == 0
            || self.calibration.menu_timeout_half_seconds > 1200
        {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("menu_timeout_half_seconds must be between 1 and 1200")
            ));
        }

        if self.calibration.deadband_timeout_ms == 0 || self.calibration.deadband_timeout_ms > 600_000 {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("deadband_timeout_ms must be between 1 and 600000")
            ));
        }

        if self.report.enabled && self.report.path.is_empty() {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("report path cannot be empty when enabled")
            ));
        }

        if self.report.max_records_per_file == 0 {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.report.max_files_to_keep == 0 {
            return Err(WheelBridgeError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        Ok(())
    }
}
