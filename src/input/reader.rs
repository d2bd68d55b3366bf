//! # Button and D-Pad Reader
//!
//! Converts line levels and analog-threshold readings into report button
//! slots and the hat switch.
//!
//! ## Slots
//!
//! | Slot | Input | Kind |
//! |------|-------|------|
//! | 0 | Left paddle | digital |
//! | 1 | Right paddle | digital |
//! | 2 | Shift up | digital |
//! | 3 | Shift down | digital |
//! | 4 | Start | digital |
//! | 5 | Cross | digital |
//! | 6 | Circle | analog threshold |
//! | 7 | Square | analog threshold |
//! | 8 | Triangle | analog threshold |
//!
//! ## Debounce
//!
//! State only changes on an edge: a switch whose level matches the previous
//! tick keeps its reported state. The hat is recomputed only when some D-pad
//! switch changed.
//!
//! ## Hat Priority
//!
//! With every D-pad switch released the hat is centered. Otherwise up, right,
//! down and left are checked in that order and the last pressed one wins, so
//! up+right reports right and up+left reports left.

use tracing::debug;

use super::{RawFrame, ANALOG_BUTTON_COUNT, DIGITAL_BUTTON_COUNT, DPAD_COUNT};
use crate::hid::{HatDirection, BUTTON_COUNT};

/// Default analog button threshold (about 20% of the ADC range).
pub const DEFAULT_ANALOG_THRESHOLD: i32 = 205;

/// Button names by slot, for logging.
pub const BUTTON_NAMES: [&str; BUTTON_COUNT] = [
    "paddle_left",
    "paddle_right",
    "shift_up",
    "shift_down",
    "start",
    "cross",
    "circle",
    "square",
    "triangle",
];

const DPAD_DIRECTIONS: [HatDirection; DPAD_COUNT] = [
    HatDirection::Up,
    HatDirection::Right,
    HatDirection::Down,
    HatDirection::Left,
];

/// Button and hat state after one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub buttons: [bool; BUTTON_COUNT],
    pub hat: HatDirection,
}

/// Edge-detecting reader for every button input.
#[derive(Debug, Clone)]
pub struct InputReader {
    threshold: i32,
    buttons: [bool; BUTTON_COUNT],
    dpad: [bool; DPAD_COUNT],
    hat: HatDirection,
}

impl Default for InputReader {
    fn default() -> Self {
        Self::new(DEFAULT_ANALOG_THRESHOLD)
    }
}

impl InputReader {
    /// Creates a reader; analog buttons count as pressed below `threshold`.
    #[must_use]
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold,
            buttons: [false; BUTTON_COUNT],
            dpad: [false; DPAD_COUNT],
            hat: HatDirection::Centered,
        }
    }

    /// Current state without sampling.
    #[must_use]
    pub fn state(&self) -> ButtonState {
        ButtonState {
            buttons: self.buttons,
            hat: self.hat,
        }
    }

    /// Updates from one frame and returns the new state.
    pub fn read(&mut self, frame: &RawFrame) -> ButtonState {
        for i in 0..DIGITAL_BUTTON_COUNT {
            self.update_button(i, !frame.digital[i]);
        }
        for i in 0..ANALOG_BUTTON_COUNT {
            let pressed = frame.analog_buttons[i] < self.threshold;
            self.update_button(DIGITAL_BUTTON_COUNT + i, pressed);
        }

        let mut dpad_changed = false;
        for i in 0..DPAD_COUNT {
            let pressed = !frame.dpad[i];
            if pressed != self.dpad[i] {
                self.dpad[i] = pressed;
                dpad_changed = true;
            }
        }
        if dpad_changed {
            self.hat = Self::hat_from(&self.dpad);
            debug!("Hat changed to {:?}", self.hat);
        }

        self.state()
    }

    fn update_button(&mut self, slot: usize, pressed: bool) {
        if self.buttons[slot] != pressed {
            self.buttons[slot] = pressed;
            debug!(
                "Button {} {}",
                BUTTON_NAMES[slot],
                if pressed { "pressed" } else { "released" }
            );
        }
    }

    fn hat_from(dpad: &[bool; DPAD_COUNT]) -> HatDirection {
        dpad.iter()
            .zip(DPAD_DIRECTIONS)
            .filter(|(pressed, _)| **pressed)
            .map(|(_, direction)| direction)
            .last()
            .unwrap_or(HatDirection::Centered)
    }
}
