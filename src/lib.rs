//! # Wheel Bridge Library
//!
//! Turn a repurposed racing wheel and pedal set into a HID gamepad.
//!
//! This library provides the signal conditioning, button reading and
//! calibration machinery that sits between raw ADC and switch readings and a
//! gamepad report: per-axis filtering, a cosine steering response curve,
//! deadband suppression, and an operator-driven calibration procedure with
//! validated persistence.

pub mod bridge;
pub mod calibration;
pub mod config;
pub mod console;
pub mod error;
pub mod hid;
pub mod input;
pub mod signal;
