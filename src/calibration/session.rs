//! # Calibration Session
//!
//! Operator-driven procedure that re-measures axis extremes and the steering
//! deadband over the console.
//!
//! The session is a poll-driven state machine. The control loop calls
//! [`CalibrationSession::poll`] once per tick with the current time and raw
//! readings; the session consumes at most one console byte per poll and never
//! blocks.
//!
//! ## States
//!
//! ```text
//!               +--> Measuring(SteeringCal | AccelCal | BrakeCal) --> AwaitContinue --+
//!               |                                                                      |
//! MenuWait -----+--> DeadbandEdit ------------------------------------------------------+--> MenuWait
//!    |          |                                                                      |
//!    |          +--> (reset to defaults) ----------------------------------------------+
//!    |
//!    +-- '0' --> Committed
//!    +-- 'q' or menu timeout --> Discarded
//! ```
//!
//! | State | Wait | Deadline |
//! |-------|------|----------|
//! | `MenuWait` | one selection byte | 10 s, then `Discarded` |
//! | `Measuring` | `m` for each point | none |
//! | `AwaitContinue` | any byte | none |
//! | `DeadbandEdit` | a line ending in `\n` | 10 s, then whatever was typed |
//!
//! Discarding keeps every edit made during the session in memory; only the
//! stored copy is left untouched. The edits stay active until the next restart.

use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::params::{CalibrationParameters, Field, ADC_MAX, DEADBAND_RANGE};
use super::store::{CalibrationStore, Storage};
use crate::console::Console;
use crate::signal::pipeline::RawAxes;

/// Menu countdown in half-second ticks.
pub const MENU_TIMEOUT_HALF_SECONDS: u64 = 20;

/// Time allowed to pick a menu entry.
pub const DEFAULT_MENU_TIMEOUT: Duration = Duration::from_millis(500 * MENU_TIMEOUT_HALF_SECONDS);

/// Time allowed to type a deadband value.
pub const DEFAULT_DEADBAND_ENTRY_TIMEOUT: Duration = Duration::from_secs(10);

/// Keystroke that records a measurement.
pub const MEASURE_KEY: u8 = b'm';

/// Longest deadband entry kept; further characters are dropped.
const MAX_ENTRY_LEN: usize = 16;

/// Deadlines for the timed waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Menu selection deadline.
    pub menu: Duration,
    /// Deadband entry deadline.
    pub deadband_entry: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            menu: DEFAULT_MENU_TIMEOUT,
            deadband_entry: DEFAULT_DEADBAND_ENTRY_TIMEOUT,
        }
    }
}

/// Measurement procedures reachable from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    /// Left, right, then center of the wheel.
    SteeringCal,
    /// Released, then fully pressed accelerator.
    AccelCal,
    /// Released, then fully pressed brake.
    BrakeCal,
}

impl Procedure {
    /// Fields measured, in order.
    #[must_use]
    pub fn steps(self) -> &'static [Field] {
        match self {
            Procedure::SteeringCal => &[Field::SteeringLeft, Field::SteeringRight, Field::SteeringCenter],
            Procedure::AccelCal => &[Field::AccelMin, Field::AccelMax],
            Procedure::BrakeCal => &[Field::BrakeMin, Field::BrakeMax],
        }
    }

    /// Raw reading this procedure measures.
    #[must_use]
    pub fn reading(self, raw: RawAxes) -> i32 {
        match self {
            Procedure::SteeringCal => raw.steering,
            Procedure::AccelCal => raw.accel,
            Procedure::BrakeCal => raw.brake,
        }
    }
}

fn prompt(field: Field) -> &'static str {
    match field {
        Field::SteeringLeft => "Turn the wheel fully LEFT and hold it, then press 'm' to measure",
        Field::SteeringRight => "Turn the wheel fully RIGHT and hold it, then press 'm' to measure",
        Field::SteeringCenter => "Let the wheel rest at CENTER, then press 'm' to measure",
        Field::AccelMin => "Release the accelerator pedal, then press 'm' to measure",
        Field::AccelMax => "Press the accelerator pedal all the way down, then press 'm' to measure",
        Field::BrakeMin => "Release the brake pedal, then press 'm' to measure",
        Field::BrakeMax => "Press the brake pedal all the way down, then press 'm' to measure",
        Field::SteeringDeadband => "Enter the steering deadband",
    }
}

/// Why a session ended without saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Operator pressed `q`.
    Quit,
    /// No menu selection before the deadline.
    Timeout,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Operator pressed `0` and the store accepted the write.
    Committed,
    /// Operator pressed `0` but the store write failed. Edits stay in memory.
    SaveFailed,
    /// Session ended without writing the store.
    Discarded(DiscardReason),
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Keep polling; normal reporting stays suspended.
    Active,
    /// Session is over.
    Finished(SessionOutcome),
}

/// Current position in the procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Menu shown, waiting for a selection.
    MenuWait {
        deadline: Instant,
        /// Last whole-second count printed.
        announced_secs: u64,
    },
    /// Waiting for `m` to record `procedure.steps()[step]`.
    Measuring { procedure: Procedure, step: usize },
    /// Measurements done, waiting for any key.
    AwaitContinue,
    /// Collecting a typed deadband value.
    DeadbandEdit { deadline: Instant, entry: String },
    /// Terminal.
    Finished(SessionOutcome),
}

/// One calibration session.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use wheel_bridge::calibration::params::CalibrationParameters;
/// use wheel_bridge::calibration::session::{
///     CalibrationSession, DiscardReason, SessionOutcome, SessionStatus, SessionTimeouts,
/// };
/// use wheel_bridge::calibration::store::{CalibrationStore, MemoryStorage};
/// use wheel_bridge::console::BufferedConsole;
/// use wheel_bridge::signal::pipeline::RawAxes;
///
/// let mut cal = CalibrationParameters::default();
/// let mut store = CalibrationStore::new(MemoryStorage::default());
/// let mut console = BufferedConsole::new();
/// let start = Instant::now();
///
/// let mut session = CalibrationSession::start(start, SessionTimeouts::default(), &cal, &mut console);
///
/// // Nobody answers the menu
/// let status = session.poll(start + Duration::from_secs(10), RawAxes::default(), &mut cal, &mut store, &mut console);
/// assert_eq!(status, SessionStatus::Finished(SessionOutcome::Discarded(DiscardReason::Timeout)));
/// ```
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    state: SessionState,
    timeouts: SessionTimeouts,
    started_with: CalibrationParameters,
}

impl CalibrationSession {
    /// Opens a session and prints the menu.
    pub fn start<C: Console + ?Sized>(
        now: Instant,
        timeouts: SessionTimeouts,
        cal: &CalibrationParameters,
        console: &mut C,
    ) -> Self {
        info!("Calibration session started");
        let mut session = Self {
            state: SessionState::Finished(SessionOutcome::Discarded(DiscardReason::Quit)),
            timeouts,
            started_with: *cal,
        };
        session.enter_menu(now, console);
        session
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Calibration in effect when the session started.
    #[must_use]
    pub fn started_with(&self) -> &CalibrationParameters {
        &self.started_with
    }

    /// Advances the session by one tick.
    ///
    /// # Arguments
    ///
    /// * `now` - Monotonic time of this tick
    /// * `raw` - Unfiltered readings of this tick, used for measurements
    /// * `cal` - Live calibration, edited in place
    /// * `store` - Written only on commit
    /// * `console` - Source of at most one byte per poll, and sink for prompts
    pub fn poll<S: Storage, C: Console + ?Sized>(
        &mut self,
        now: Instant,
        raw: RawAxes,
        cal: &mut CalibrationParameters,
        store: &mut CalibrationStore<S>,
        console: &mut C,
    ) -> SessionStatus {
        let state = std::mem::replace(
            &mut self.state,
            SessionState::Finished(SessionOutcome::Discarded(DiscardReason::Quit)),
        );

        self.state = match state {
            // Deadlines are checked before input, so a late byte never counts
            SessionState::MenuWait { deadline, .. } if now >= deadline => {
                console.write_line("\nTimeout. Leaving calibration mode. Values NOT saved.");
                self.discard(DiscardReason::Timeout, cal)
            }
            SessionState::MenuWait {
                deadline,
                announced_secs,
            } => match console.read_byte() {
                Some(byte) => self.select(byte, now, deadline, announced_secs, cal, store, console),
                None => {
                    let remaining = deadline.saturating_duration_since(now).as_secs();
                    if remaining < announced_secs {
                        console.write_str(&format!("{} ", remaining));
                    }
                    SessionState::MenuWait {
                        deadline,
                        announced_secs: remaining.min(announced_secs),
                    }
                }
            },

            SessionState::Measuring { procedure, step } => match console.read_byte() {
                Some(MEASURE_KEY) => {
                    let field = procedure.steps()[step];
                    let value = procedure.reading(raw).clamp(0, ADC_MAX);
                    cal.set(field, value);
                    info!("Measured {} = {}", field, value);
                    console.write_line(&format!("{} = {}", field, value));

                    match procedure.steps().get(step + 1) {
                        Some(&next) => {
                            console.write_line(prompt(next));
                            SessionState::Measuring {
                                procedure,
                                step: step + 1,
                            }
                        }
                        None => {
                            console.write_line("Press any key to continue");
                            SessionState::AwaitContinue
                        }
                    }
                }
                _ => SessionState::Measuring { procedure, step },
            },

            SessionState::AwaitContinue => match console.read_byte() {
                Some(_) => self.menu_state(now, console),
                None => SessionState::AwaitContinue,
            },

            SessionState::DeadbandEdit { deadline, entry } if now >= deadline => {
                self.finish_deadband(&entry, now, cal, console)
            }
            SessionState::DeadbandEdit { deadline, mut entry } => match console.read_byte() {
                Some(b'\n') => self.finish_deadband(&entry, now, cal, console),
                Some(byte) => {
                    if entry.len() < MAX_ENTRY_LEN {
                        entry.push(char::from(byte));
                    }
                    SessionState::DeadbandEdit { deadline, entry }
                }
                None => SessionState::DeadbandEdit { deadline, entry },
            },

            finished @ SessionState::Finished(_) => finished,
        };

        match self.state {
            SessionState::Finished(outcome) => SessionStatus::Finished(outcome),
            _ => SessionStatus::Active,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn select<S: Storage, C: Console + ?Sized>(
        &mut self,
        byte: u8,
        now: Instant,
        deadline: Instant,
        announced_secs: u64,
        cal: &mut CalibrationParameters,
        store: &mut CalibrationStore<S>,
        console: &mut C,
    ) -> SessionState {
        match byte {
            // Terminators from line-buffered terminals are not selections
            b'\r' | b'\n' => SessionState::MenuWait {
                deadline,
                announced_secs,
            },
            b'1' => self.begin_measuring(Procedure::SteeringCal, console),
            b'2' => self.begin_measuring(Procedure::AccelCal, console),
            b'3' => self.begin_measuring(Procedure::BrakeCal, console),
            b'4' => {
                console.write_line("");
                console.write_line("Enter the steering deadband (2-100) and press Enter");
                console.write_str(&format!(
                    "(steering spans 0 to {})\nCurrent value: {}\n",
                    ADC_MAX, cal.steering_deadband
                ));
                SessionState::DeadbandEdit {
                    deadline: now + self.timeouts.deadband_entry,
                    entry: String::new(),
                }
            }
            b'5' => {
                *cal = CalibrationParameters::default();
                info!("Calibration reset to defaults");
                console.write_line("");
                console.write_line("All values reset to defaults (not saved yet)");
                self.menu_state(now, console)
            }
            b'0' => {
                console.write_line("");
                console.write_line("Calibration done. Saving values to EEPROM");
                match store.save(cal) {
                    Ok(()) => {
                        info!("Calibration session committed");
                        SessionState::Finished(SessionOutcome::Committed)
                    }
                    Err(e) => {
                        error!("Failed to save calibration: {}", e);
                        console.write_line(&format!("Save FAILED: {}", e));
                        SessionState::Finished(SessionOutcome::SaveFailed)
                    }
                }
            }
            b'q' => {
                console.write_line("");
                console.write_line("Leaving calibration mode. Values NOT saved.");
                self.discard(DiscardReason::Quit, cal)
            }
            _ => self.menu_state(now, console),
        }
    }

    fn begin_measuring<C: Console + ?Sized>(&self, procedure: Procedure, console: &mut C) -> SessionState {
        console.write_line("");
        console.write_line(prompt(procedure.steps()[0]));
        SessionState::Measuring { procedure, step: 0 }
    }

    fn finish_deadband<C: Console + ?Sized>(
        &self,
        entry: &str,
        now: Instant,
        cal: &mut CalibrationParameters,
        console: &mut C,
    ) -> SessionState {
        let value = parse_leading_int(entry);
        if DEADBAND_RANGE.contains(&value) {
            cal.steering_deadband = value;
            info!("Steering deadband set to {}", value);
        }
        console.write_line(&format!("\ndeadband = {}", cal.steering_deadband));
        self.menu_state(now, console)
    }

    fn discard(&self, reason: DiscardReason, cal: &CalibrationParameters) -> SessionState {
        if *cal != self.started_with {
            warn!("Calibration edits left active but not saved; they are lost on restart");
        }
        info!("Calibration session discarded ({:?})", reason);
        SessionState::Finished(SessionOutcome::Discarded(reason))
    }

    fn enter_menu<C: Console + ?Sized>(&mut self, now: Instant, console: &mut C) {
        self.state = self.menu_state(now, console);
    }

    fn menu_state<C: Console + ?Sized>(&self, now: Instant, console: &mut C) -> SessionState {
        let secs = self.timeouts.menu.as_secs();
        console.write_line("\n    Calibration menu");
        console.write_line("1. Steering wheel left/right/center");
        console.write_line("2. Accelerator min/max");
        console.write_line("3. Brake min/max");
        console.write_line("4. Steering deadband");
        console.write_line("5. Reset all values to defaults");
        console.write_line("0. Leave calibration and save values to EEPROM");
        console.write_line("q. Leave calibration without saving\n");
        console.write_line(&format!("You have {} seconds to make a selection", secs));
        SessionState::MenuWait {
            deadline: now + self.timeouts.menu,
            announced_secs: secs,
        }
    }
}

/// Parses an optionally signed integer prefix, ignoring leading whitespace.
///
/// Returns 0 when there are no digits; saturates on overflow.
#[must_use]
pub fn parse_leading_int(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let magnitude = digits
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0i64, |acc, d| (acc * 10 + i64::from(d)).min(i64::from(i32::MAX) + 1));

    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::store::MemoryStorage;
    use crate::console::BufferedConsole;

    struct Harness {
        start: Instant,
        cal: CalibrationParameters,
        store: CalibrationStore<MemoryStorage>,
        console: BufferedConsole,
        session: CalibrationSession,
    }

    impl Harness {
        fn new() -> Self {
            let start = Instant::now();
            let cal = CalibrationParameters::default();
            let mut console = BufferedConsole::new();
            let session = CalibrationSession::start(start, SessionTimeouts::default(), &cal, &mut console);
            Self {
                start,
                cal,
                store: CalibrationStore::new(MemoryStorage::default()),
                console,
                session,
            }
        }

        fn poll_at(&mut self, millis: u64, raw: RawAxes) -> SessionStatus {
            self.session.poll(
                self.start + Duration::from_millis(millis),
                raw,
                &mut self.cal,
                &mut self.store,
                &mut self.console,
            )
        }

        /// Feeds each byte on its own poll at time `millis`.
        fn type_at(&mut self, millis: u64, bytes: &[u8], raw: RawAxes) -> SessionStatus {
            let mut status = SessionStatus::Active;
            for &byte in bytes {
                self.console.push_input(&[byte]);
                status = self.poll_at(millis, raw);
            }
            status
        }
    }

    fn steering(value: i32) -> RawAxes {
        RawAxes {
            steering: value,
            ..RawAxes::default()
        }
    }

    fn pedals(accel: i32, brake: i32) -> RawAxes {
        RawAxes {
            accel,
            brake,
            steering: 512,
        }
    }

    // ==================== Menu Tests ====================

    #[test]
    fn test_start_prints_menu() {
        let h = Harness::new();
        assert!(h.console.output().contains("Calibration menu"));
        assert!(h.console.output().contains("You have 10 seconds"));
        assert!(matches!(h.session.state(), SessionState::MenuWait { .. }));
    }

    #[test]
    fn test_menu_timeout_discards_without_changes() {
        let mut h = Harness::new();
        assert_eq!(h.poll_at(9_999, RawAxes::default()), SessionStatus::Active);
        assert_eq!(
            h.poll_at(10_000, RawAxes::default()),
            SessionStatus::Finished(SessionOutcome::Discarded(DiscardReason::Timeout))
        );
        assert_eq!(h.cal, *h.session.started_with());
        assert!(h.store.read_raw().unwrap().rejected_fields().len() == 8, "store untouched");
    }

    #[test]
    fn test_countdown_announces_each_second_once() {
        let mut h = Harness::new();
        h.console.take_output();
        for millis in [500, 1_000, 1_500, 2_000] {
            h.poll_at(millis, RawAxes::default());
        }
        assert_eq!(h.console.take_output(), "9 8 ");
    }

    #[test]
    fn test_unknown_key_restarts_countdown() {
        let mut h = Harness::new();
        assert_eq!(h.type_at(9_000, b"x", RawAxes::default()), SessionStatus::Active);
        // Deadline moved to 19 s
        assert_eq!(h.poll_at(18_000, RawAxes::default()), SessionStatus::Active);
        assert!(matches!(h.poll_at(19_000, RawAxes::default()), SessionStatus::Finished(_)));
    }

    #[test]
    fn test_selection_after_deadline_is_not_accepted() {
        let mut h = Harness::new();
        h.console.push_input(b"0");
        assert_eq!(
            h.poll_at(10_000, RawAxes::default()),
            SessionStatus::Finished(SessionOutcome::Discarded(DiscardReason::Timeout))
        );
        assert_eq!(h.console.pending_input(), 1, "late selection left unread");
        assert_eq!(h.store.read_raw().unwrap().steering_left, -1, "nothing saved");
    }

    #[test]
    fn test_line_terminators_are_ignored() {
        let mut h = Harness::new();
        h.console.take_output();
        h.type_at(9_500, b"\r\n", RawAxes::default());
        assert!(!h.console.output().contains("Calibration menu"));
        assert!(matches!(h.poll_at(10_000, RawAxes::default()), SessionStatus::Finished(_)));
    }

    #[test]
    fn test_quit_keeps_edits_in_memory_only() {
        let mut h = Harness::new();
        h.type_at(100, b"4", RawAxes::default());
        h.type_at(200, b"40\n", RawAxes::default());
        let status = h.type_at(300, b"q", RawAxes::default());

        assert_eq!(status, SessionStatus::Finished(SessionOutcome::Discarded(DiscardReason::Quit)));
        assert_eq!(h.cal.steering_deadband, 40);
        assert_ne!(h.store.read_raw().unwrap().steering_deadband, 40);
    }

    #[test]
    fn test_commit_saves() {
        let mut h = Harness::new();
        h.cal.brake_max = 900;
        let status = h.type_at(100, b"0", RawAxes::default());
        assert_eq!(status, SessionStatus::Finished(SessionOutcome::Committed));
        assert_eq!(h.store.read_raw().unwrap(), h.cal);
        assert!(h.console.output().contains("Saving values"));
    }

    #[test]
    fn test_commit_with_failing_store() {
        let start = Instant::now();
        let mut cal = CalibrationParameters::default();
        let mut console = BufferedConsole::new();
        let mut store = CalibrationStore::new(MemoryStorage::new(4));
        let mut session = CalibrationSession::start(start, SessionTimeouts::default(), &cal, &mut console);

        console.push_input(b"0");
        let status = session.poll(start, RawAxes::default(), &mut cal, &mut store, &mut console);
        assert_eq!(status, SessionStatus::Finished(SessionOutcome::SaveFailed));
        assert!(console.output().contains("Save FAILED"));
    }

    #[test]
    fn test_finished_session_stays_finished() {
        let mut h = Harness::new();
        h.type_at(0, b"q", RawAxes::default());
        h.console.push_input(b"1");
        assert!(matches!(h.poll_at(100, RawAxes::default()), SessionStatus::Finished(_)));
        assert_eq!(h.console.pending_input(), 1, "finished session reads nothing");
    }

    #[test]
    fn test_reset_defaults_not_persisted() {
        let mut h = Harness::new();
        h.cal.steering_left = 100;
        h.cal.steering_deadband = 60;
        h.type_at(100, b"5", RawAxes::default());
        assert_eq!(h.cal, CalibrationParameters::default());
        assert!(matches!(h.session.state(), SessionState::MenuWait { .. }));
        assert_eq!(h.store.read_raw().unwrap().steering_left, -1);
    }

    // ==================== Measurement Tests ====================

    #[test]
    fn test_steering_measures_left_right_center() {
        let mut h = Harness::new();
        h.type_at(100, b"1", RawAxes::default());
        assert!(matches!(
            h.session.state(),
            SessionState::Measuring { procedure: Procedure::SteeringCal, step: 0 }
        ));

        h.type_at(200, b"m", steering(20));
        h.type_at(300, b"xm", steering(1000));
        h.type_at(400, b"m", steering(505));

        assert_eq!(h.cal.steering_left, 20);
        assert_eq!(h.cal.steering_right, 1000);
        assert_eq!(h.cal.steering_center, 505);
        assert_eq!(*h.session.state(), SessionState::AwaitContinue);
        assert!(h.console.output().contains("steering_center = 505"));
    }

    #[test]
    fn test_measurement_has_no_timeout() {
        let mut h = Harness::new();
        h.type_at(100, b"2", RawAxes::default());
        assert_eq!(h.poll_at(3_600_000, RawAxes::default()), SessionStatus::Active);
        assert!(matches!(h.session.state(), SessionState::Measuring { .. }));
    }

    #[test]
    fn test_pedal_measurements() {
        let mut h = Harness::new();
        h.type_at(0, b"2", pedals(0, 0));
        h.type_at(0, b"m", pedals(35, 0));
        h.type_at(0, b"m", pedals(870, 0));
        h.type_at(0, b" ", pedals(0, 0));
        h.type_at(0, b"3", pedals(0, 0));
        h.type_at(0, b"m", pedals(0, 12));
        h.type_at(0, b"m", pedals(0, 1010));

        assert_eq!((h.cal.accel_min, h.cal.accel_max), (35, 870));
        assert_eq!((h.cal.brake_min, h.cal.brake_max), (12, 1010));
    }

    #[test]
    fn test_continue_key_is_consumed_and_menu_reopens() {
        let mut h = Harness::new();
        h.type_at(0, b"3mm", pedals(0, 500));
        h.console.take_output();
        h.type_at(5_000, b"0", RawAxes::default());
        // '0' only dismissed the prompt
        assert!(matches!(h.session.state(), SessionState::MenuWait { .. }));
        assert!(h.console.output().contains("Calibration menu"));
        // Countdown restarted from the continue key
        assert_eq!(h.poll_at(14_999, RawAxes::default()), SessionStatus::Active);
    }

    #[test]
    fn test_measurement_clamps_out_of_range_reading() {
        let mut h = Harness::new();
        h.type_at(0, b"1m", steering(-40));
        assert_eq!(h.cal.steering_left, 0);
    }

    // ==================== Deadband Tests ====================

    #[test]
    fn test_deadband_accepts_in_range() {
        let mut h = Harness::new();
        h.type_at(0, b"4", RawAxes::default());
        h.type_at(100, b"25\n", RawAxes::default());
        assert_eq!(h.cal.steering_deadband, 25);
        assert!(h.console.output().contains("deadband = 25"));
    }

    #[test]
    fn test_deadband_rejects_out_of_range_silently() {
        let entries: [&[u8]; 5] = [b"1\n", b"101\n", b"abc\n", b"-5\n", b"\n"];
        for entry in entries {
            let mut h = Harness::new();
            h.type_at(0, b"4", RawAxes::default());
            h.type_at(100, entry, RawAxes::default());
            assert_eq!(h.cal.steering_deadband, 10);
            assert!(h.console.output().contains("deadband = 10"));
            assert!(matches!(h.session.state(), SessionState::MenuWait { .. }));
        }
    }

    #[test]
    fn test_deadband_entry_timeout_uses_partial_input() {
        let mut h = Harness::new();
        h.type_at(0, b"4", RawAxes::default());
        h.type_at(1_000, b"3", RawAxes::default());
        h.type_at(2_000, b"0", RawAxes::default());
        assert_eq!(h.poll_at(9_999, RawAxes::default()), SessionStatus::Active);
        assert!(matches!(h.session.state(), SessionState::DeadbandEdit { .. }));

        h.poll_at(10_000, RawAxes::default());
        assert_eq!(h.cal.steering_deadband, 30);
        assert!(matches!(h.session.state(), SessionState::MenuWait { .. }));
    }

    #[test]
    fn test_deadband_byte_after_deadline_is_ignored() {
        let mut h = Harness::new();
        h.type_at(0, b"4", RawAxes::default());
        h.type_at(1_000, b"1", RawAxes::default());
        h.console.push_input(b"5");
        h.poll_at(10_000, RawAxes::default());
        assert_eq!(h.cal.steering_deadband, 10, "\"1\" alone is out of range");
        assert_eq!(h.console.pending_input(), 1);
    }

    #[test]
    fn test_deadband_accepts_carriage_return_line() {
        let mut h = Harness::new();
        h.type_at(0, b"4", RawAxes::default());
        h.type_at(0, b"12\r\n", RawAxes::default());
        assert_eq!(h.cal.steering_deadband, 12);
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("42"), 42);
        assert_eq!(parse_leading_int("  17abc"), 17);
        assert_eq!(parse_leading_int("-8"), -8);
        assert_eq!(parse_leading_int("+9"), 9);
        assert_eq!(parse_leading_int("x1"), 0);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("99999999999"), i32::MAX);
        assert_eq!(parse_leading_int("-99999999999"), i32::MIN);
    }
}
