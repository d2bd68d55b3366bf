//! # JSON Lines Report Sink
//!
//! Host-side [`HidSink`] that scales calibrated axis values into the HID
//! logical range and writes one JSON object per report.
//!
//! ## Scaling
//!
//! Each axis is mapped linearly from its calibrated `min..=max` onto
//! `HID_AXIS_MIN..=HID_AXIS_MAX`, clamped. A range with `min == max` reports 0.
//! A range with `min > max` reports the axis reversed.
//!
//! ## Record Format
//!
//! ```text
//! {"timestamp":"2026-01-01T00:00:00.000Z","sequence":1,"accelerator":-32767,"brake":-32767,"steering":0,"buttons":0,"hat":null}
//! ```

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;
use tracing::debug;

use super::{Axis, HatDirection, HidSink, BUTTON_COUNT, HAT_COUNT};
use crate::calibration::params::ADC_MAX;
use crate::error::Result;

/// Lowest HID logical axis value.
pub const HID_AXIS_MIN: i32 = -32767;

/// Highest HID logical axis value.
pub const HID_AXIS_MAX: i32 = 32767;

/// Scales `value` from `min..=max` into the HID logical range.
///
/// # Examples
///
/// ```
/// use wheel_bridge::hid::report::{scale_axis, HID_AXIS_MAX, HID_AXIS_MIN};
///
/// assert_eq!(scale_axis(0, 0, 1023), HID_AXIS_MIN);
/// assert_eq!(scale_axis(1023, 0, 1023), HID_AXIS_MAX);
/// assert_eq!(scale_axis(500, 500, 500), 0);
/// ```
#[must_use]
pub fn scale_axis(value: i32, min: i32, max: i32) -> i32 {
    if min == max {
        return 0;
    }
    let span = i64::from(HID_AXIS_MAX) - i64::from(HID_AXIS_MIN);
    let scaled = (i64::from(value) - i64::from(min)) * span / (i64::from(max) - i64::from(min))
        + i64::from(HID_AXIS_MIN);
    scaled.clamp(i64::from(HID_AXIS_MIN), i64::from(HID_AXIS_MAX)) as i32
}

/// One transmitted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GamepadReport {
    /// Wall-clock time the report was built (RFC 3339, UTC).
    pub timestamp: String,
    /// Reports sent so far, including this one.
    pub sequence: u64,
    pub accelerator: i32,
    pub brake: i32,
    pub steering: i32,
    /// Button slot `i` is bit `i`.
    pub buttons: u32,
    /// Hat angle in degrees, `null` when centered.
    pub hat: Option<u16>,
}

/// Writes reports as JSON lines to any [`Write`].
#[derive(Debug)]
pub struct JsonlReportSink<W: Write> {
    writer: W,
    ranges: [(i32, i32); 3],
    values: [i32; 3],
    buttons: [bool; BUTTON_COUNT],
    hats: [HatDirection; HAT_COUNT],
    sequence: u64,
}

impl<W: Write> JsonlReportSink<W> {
    /// Creates a sink with every axis ranged over the full ADC domain.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            ranges: [(0, ADC_MAX); 3],
            values: [0; 3],
            buttons: [false; BUTTON_COUNT],
            hats: [HatDirection::Centered; HAT_COUNT],
            sequence: 0,
        }
    }

    /// Number of reports written.
    #[must_use]
    pub fn reports_sent(&self) -> u64 {
        self.sequence
    }

    /// Calibrated range currently set for `axis`.
    #[must_use]
    pub fn range(&self, axis: Axis) -> (i32, i32) {
        self.ranges[axis.index()]
    }

    /// Builds the report the next `send_report` would write.
    #[must_use]
    pub fn snapshot(&self) -> GamepadReport {
        let scaled = |axis: Axis| {
            let (min, max) = self.ranges[axis.index()];
            scale_axis(self.values[axis.index()], min, max)
        };

        let buttons = self
            .buttons
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .fold(0u32, |bits, (i, _)| bits | (1 << i));

        GamepadReport {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            sequence: self.sequence + 1,
            accelerator: scaled(Axis::Accelerator),
            brake: scaled(Axis::Brake),
            steering: scaled(Axis::Steering),
            buttons,
            hat: self.hats[0].angle(),
        }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> HidSink for JsonlReportSink<W> {
    fn set_axis_range(&mut self, axis: Axis, min: i32, max: i32) {
        self.ranges[axis.index()] = (min, max);
    }

    fn set_axis_value(&mut self, axis: Axis, value: i32) {
        self.values[axis.index()] = value;
    }

    fn set_button(&mut self, index: usize, pressed: bool) {
        match self.buttons.get_mut(index) {
            Some(slot) => *slot = pressed,
            None => debug!("Ignoring button slot {} (report has {})", index, BUTTON_COUNT),
        }
    }

    fn set_hat(&mut self, index: usize, hat: HatDirection) {
        match self.hats.get_mut(index) {
            Some(slot) => *slot = hat,
            None => debug!("Ignoring hat switch {} (report has {})", index, HAT_COUNT),
        }
    }

    fn send_report(&mut self) -> Result<()> {
        let report = self.snapshot();
        serde_json::to_writer(&mut self.writer, &report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.sequence = report.sequence;
        Ok(())
    }
}
