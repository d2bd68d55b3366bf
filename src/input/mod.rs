//! # Input Module
//!
//! Raw input sampling for the wheel and pedals.
//!
//! This module handles:
//! - One [`RawFrame`] of line levels and ADC readings per tick
//! - Input sources: idle (wheel centered, nothing pressed) and JSONL replay
//! - Debounced buttons, analog-threshold buttons and the D-pad hat (see [`reader`])
//!
//! ## Replay Format
//!
//! One JSON object per line. Omitted button fields default to released.
//!
//! ```text
//! {"accel": 0, "brake": 0, "steering": 512}
//! {"accel": 800, "brake": 0, "steering": 300, "digital": [true, true, false, true, true, true]}
//! ```

pub mod reader;

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::calibration::params::ADC_MAX;
use crate::error::{Result, WheelBridgeError};
use crate::signal::pipeline::RawAxes;

/// Digital buttons: paddle left/right, shift up/down, start, cross.
pub const DIGITAL_BUTTON_COUNT: usize = 6;

/// Resistor-ladder buttons on spare analog channels: circle, square, triangle.
pub const ANALOG_BUTTON_COUNT: usize = 3;

/// D-pad switches: up, right, down, left.
pub const DPAD_COUNT: usize = 4;

fn released_digital() -> [bool; DIGITAL_BUTTON_COUNT] {
    [true; DIGITAL_BUTTON_COUNT]
}

fn released_dpad() -> [bool; DPAD_COUNT] {
    [true; DPAD_COUNT]
}

fn released_analog() -> [i32; ANALOG_BUTTON_COUNT] {
    [ADC_MAX; ANALOG_BUTTON_COUNT]
}

/// Everything sampled in one tick.
///
/// Digital values are line levels: switches pull the line low when pressed,
/// so `true` means released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RawFrame {
    pub accel: i32,
    pub brake: i32,
    pub steering: i32,
    #[serde(default = "released_digital")]
    pub digital: [bool; DIGITAL_BUTTON_COUNT],
    #[serde(default = "released_dpad")]
    pub dpad: [bool; DPAD_COUNT],
    #[serde(default = "released_analog")]
    pub analog_buttons: [i32; ANALOG_BUTTON_COUNT],
}

impl Default for RawFrame {
    /// Wheel centered, pedals released, no button pressed.
    fn default() -> Self {
        Self {
            accel: 0,
            brake: 0,
            steering: (ADC_MAX + 1) / 2,
            digital: released_digital(),
            dpad: released_dpad(),
            analog_buttons: released_analog(),
        }
    }
}

impl RawFrame {
    /// The three primary axis readings.
    #[must_use]
    pub fn axes(&self) -> RawAxes {
        RawAxes {
            accel: self.accel,
            brake: self.brake,
            steering: self.steering,
        }
    }
}

/// Produces one frame per tick. Reads never block.
pub trait InputSource {
    /// Samples every input.
    fn sample(&mut self) -> RawFrame;
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn sample(&mut self) -> RawFrame {
        (**self).sample()
    }
}

/// Source that always reports the resting position.
#[derive(Debug, Clone, Default)]
pub struct IdleSource {
    frame: RawFrame,
}

impl IdleSource {
    /// Idle source reporting `frame` forever.
    #[must_use]
    pub fn with_frame(frame: RawFrame) -> Self {
        Self { frame }
    }
}

impl InputSource for IdleSource {
    fn sample(&mut self) -> RawFrame {
        self.frame
    }
}

/// Source that replays recorded frames, looping at the end.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<RawFrame>,
    position: usize,
}

impl ReplaySource {
    /// Creates a replay from in-memory frames.
    ///
    /// # Errors
    ///
    /// Returns error if `frames` is empty
    pub fn new(frames: Vec<RawFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(WheelBridgeError::Replay("replay contains no frames".to_string()));
        }
        Ok(Self {
            frames,
            position: 0,
        })
    }

    /// Parses JSONL frames, skipping blank lines.
    ///
    /// # Errors
    ///
    /// Returns error naming the first line that fails to parse, or if there
    /// are no frames
    pub fn parse(contents: &str) -> Result<Self> {
        let mut frames = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame = serde_json::from_str(line)
                .map_err(|e| WheelBridgeError::Replay(format!("line {}: {}", i + 1, e)))?;
            frames.push(frame);
        }
        Self::new(frames)
    }

    /// Loads frames from a JSONL file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let replay = Self::parse(&contents)?;
        info!(
            "Loaded {} replay frames from {}",
            replay.frames.len(),
            path.as_ref().display()
        );
        Ok(replay)
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; construction rejects empty replays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl InputSource for ReplaySource {
    fn sample(&mut self) -> RawFrame {
        let frame = self.frames[self.position];
        self.position = (self.position + 1) % self.frames.len();
        frame
    }
}
