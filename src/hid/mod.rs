//! # HID Sink Module
//!
//! Boundary between the signal pipeline and whatever transmits the gamepad
//! report.
//!
//! The core only talks to the [`HidSink`] trait:
//! - `set_axis_range` once per calibration change
//! - `set_axis_value`, `set_button`, `set_hat` and `send_report` once per tick
//!
//! [`report::JsonlReportSink`] is the host-side implementation used by the
//! binary: it scales axes into the HID logical range and writes each report
//! as one JSON line. [`rotating::RotatingFile`] bounds that output on disk.

pub mod report;
pub mod rotating;

use serde::Serialize;
use std::fmt;

use crate::error::Result;

/// Number of report button slots.
pub const BUTTON_COUNT: usize = 9;

/// Number of hat switches in the report.
pub const HAT_COUNT: usize = 1;

/// Analog axes of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Accelerator,
    Brake,
    Steering,
}

impl Axis {
    /// All axes in report order.
    pub const ALL: [Axis; 3] = [Axis::Accelerator, Axis::Brake, Axis::Steering];

    /// Position in report order.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::Accelerator => 0,
            Axis::Brake => 1,
            Axis::Steering => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Accelerator => "accelerator",
            Axis::Brake => "brake",
            Axis::Steering => "steering",
        };
        f.write_str(name)
    }
}

/// Hat switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HatDirection {
    #[default]
    Centered,
    Up,
    Right,
    Down,
    Left,
}

impl HatDirection {
    /// Angle in degrees, `None` when centered.
    #[must_use]
    pub fn angle(self) -> Option<u16> {
        match self {
            HatDirection::Centered => None,
            HatDirection::Up => Some(0),
            HatDirection::Right => Some(90),
            HatDirection::Down => Some(180),
            HatDirection::Left => Some(270),
        }
    }
}

/// Accepts final axis, button and hat values and transmits a report.
#[cfg_attr(test, mockall::automock)]
pub trait HidSink {
    /// Sets the calibrated input range the sink scales `axis` from.
    fn set_axis_range(&mut self, axis: Axis, min: i32, max: i32);

    /// Sets the calibrated value of `axis` for the next report.
    fn set_axis_value(&mut self, axis: Axis, value: i32);

    /// Sets button slot `index`.
    fn set_button(&mut self, index: usize, pressed: bool);

    /// Sets hat switch `index`.
    fn set_hat(&mut self, index: usize, hat: HatDirection);

    /// Transmits the current state.
    ///
    /// # Errors
    ///
    /// Returns error if the transport fails
    fn send_report(&mut self) -> Result<()>;
}
