//! # Error Types
//!
//! Custom error types for Wheel Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Wheel Bridge
#[derive(Debug, Error)]
pub enum WheelBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistent storage errors (out of range access, short image)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serial console errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Report encoding or replay frame decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input replay file errors
    #[error("Replay error: {0}")]
    Replay(String),

    /// Steering calibration with a zero-width half (left == center or right == center)
    #[error("Degenerate steering calibration: left={left}, center={center}, right={right}")]
    DegenerateCalibration {
        /// Calibrated left extreme
        left: i32,
        /// Calibrated center
        center: i32,
        /// Calibrated right extreme
        right: i32,
    },
}

/// Result type alias for Wheel Bridge
pub type Result<T> = std::result::Result<T, WheelBridgeError>;
