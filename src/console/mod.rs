//! # Operator Console Module
//!
//! Line-oriented byte I/O with the operator.
//!
//! The core is synchronous and never waits on the console: it takes at most
//! one buffered byte per tick through [`Console::read_byte`]. [`link`] pumps
//! bytes between that interface and an async stream (stdio or a serial port).
//!
//! ## Normal Mode Commands
//!
//! | Key | Command |
//! |-----|---------|
//! | `c` | Enter calibration |
//! | `p` | Print current calibration |
//! | `s` | Toggle scan output |
//! | `h` | Help |
//! | `a` | About |

pub mod link;

use std::collections::VecDeque;

/// Help text printed by `h`.
pub const HELP_TEXT: &str = "c - calibrate\np - print cal values\ns - analog scan mode\nh - this help screen\na - about this software";

/// Banner printed by `a`.
pub const ABOUT_TEXT: &str = concat!(
    "\nWheel Bridge v",
    env!("CARGO_PKG_VERSION"),
    "\nRacing wheel and pedals to HID gamepad converter\n"
);

/// Byte-oriented operator console.
pub trait Console {
    /// Takes one buffered input byte, if any. Never blocks.
    fn read_byte(&mut self) -> Option<u8>;

    /// Writes text without a line terminator.
    fn write_str(&mut self, text: &str);

    /// Writes text followed by a newline.
    fn write_line(&mut self, line: &str) {
        self.write_str(line);
        self.write_str("\n");
    }
}

/// Commands recognized outside calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Calibrate,
    PrintCalibration,
    ToggleScan,
    Help,
    About,
}

impl Command {
    /// Maps a keystroke to a command.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'c' => Some(Command::Calibrate),
            b'p' => Some(Command::PrintCalibration),
            b's' => Some(Command::ToggleScan),
            b'h' => Some(Command::Help),
            b'a' => Some(Command::About),
            _ => None,
        }
    }
}

/// In-memory console: scripted input, captured output.
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    input: VecDeque<u8>,
    output: String,
}

impl BufferedConsole {
    /// Empty console.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `bytes` as operator input.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Number of queued input bytes.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns and clears everything written so far.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl Console for BufferedConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_str(&mut self, text: &str) {
        self.output.push_str(text);
    }
}
