//! # Calibration Module
//!
//! Calibration data, its persistence, and the interactive procedure that
//! re-measures it.
//!
//! This module handles:
//! - The calibration record and its valid ranges (see [`params`])
//! - Field-wise validated load and verbatim save (see [`store`])
//! - The operator-driven calibration session (see [`session`])

pub mod params;
pub mod session;
pub mod store;

pub use params::{CalibrationParameters, Field};
pub use session::{CalibrationSession, SessionOutcome, SessionStatus, SessionTimeouts};
pub use store::{CalibrationStore, FileStorage, MemoryStorage, Storage};
