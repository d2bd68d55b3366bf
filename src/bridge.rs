//! # Bridge
//!
//! Per-tick orchestration of sampling, the signal pipeline, button reading,
//! report emission, console commands and the calibration session.
//!
//! ## Tick
//!
//! In normal mode one tick samples every input, runs the pipeline, hands the
//! axis, button and hat values to the HID sink, sends one report, prints scan
//! output when enabled, and finally handles at most one console command.
//!
//! While a calibration session is active the tick only samples the inputs and
//! polls the session: no reports are sent and normal commands are not read.
//! When the session ends the calibrated ranges are re-applied to the sink and
//! normal ticking resumes on the next tick.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::calibration::params::CalibrationParameters;
use crate::calibration::session::{CalibrationSession, SessionOutcome, SessionStatus, SessionTimeouts};
use crate::calibration::store::{CalibrationStore, Storage};
use crate::console::{Command, Console, ABOUT_TEXT, HELP_TEXT};
use crate::error::Result;
use crate::hid::{Axis, HidSink};
use crate::input::reader::InputReader;
use crate::input::InputSource;
use crate::signal::pipeline::{AxisValues, PipelineStages, SignalPipeline};

/// What the bridge did on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A report was handed to the sink.
    Reported,
    /// A calibration session is running; nothing was reported.
    Calibrating,
    /// A calibration session ended on this tick.
    SessionEnded(SessionOutcome),
}

/// Tunables that are not collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeOptions {
    pub stages: PipelineStages,
    pub analog_threshold: i32,
    pub timeouts: SessionTimeouts,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            stages: PipelineStages::default(),
            analog_threshold: crate::input::reader::DEFAULT_ANALOG_THRESHOLD,
            timeouts: SessionTimeouts::default(),
        }
    }
}

/// Owns the live calibration and every collaborator.
pub struct Bridge<I, H, C, S> {
    source: I,
    sink: H,
    console: C,
    store: CalibrationStore<S>,
    pipeline: SignalPipeline,
    reader: InputReader,
    cal: CalibrationParameters,
    timeouts: SessionTimeouts,
    session: Option<CalibrationSession>,
    scan: bool,
    report_failing: bool,
}

impl<I, H, C, S> Bridge<I, H, C, S>
where
    I: InputSource,
    H: HidSink,
    C: Console,
    S: Storage,
{
    /// Assembles a bridge holding default calibration.
    ///
    /// Call [`Bridge::start`] before the first tick.
    pub fn new(source: I, sink: H, console: C, store: CalibrationStore<S>, options: BridgeOptions) -> Self {
        Self {
            source,
            sink,
            console,
            store,
            pipeline: SignalPipeline::new(options.stages),
            reader: InputReader::new(options.analog_threshold),
            cal: CalibrationParameters::default(),
            timeouts: options.timeouts,
            session: None,
            scan: false,
            report_failing: false,
        }
    }

    /// Loads stored calibration over the defaults and applies the ranges.
    ///
    /// Every rejected stored field is reported on the console.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be read
    pub fn start(&mut self) -> Result<()> {
        let (cal, rejected) = self.store.load_with_report(&self.cal)?;
        for r in &rejected {
            self.console.write_line(&format!(
                "Stored {} = {} is invalid, using {}",
                r.field,
                r.stored,
                cal.get(r.field)
            ));
        }
        self.cal = cal;
        self.pipeline.apply_ranges(&mut self.sink, &self.cal);
        self.console.write_line(ABOUT_TEXT);
        self.console.write_line("Press 'h' for help");
        Ok(())
    }

    /// Runs one tick at monotonic time `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let frame = self.source.sample();

        if let Some(session) = self.session.as_mut() {
            let status = session.poll(now, frame.axes(), &mut self.cal, &mut self.store, &mut self.console);
            return match status {
                SessionStatus::Active => TickOutcome::Calibrating,
                SessionStatus::Finished(outcome) => {
                    self.session = None;
                    self.console.write_line("Applying calibration");
                    self.pipeline.apply_ranges(&mut self.sink, &self.cal);
                    info!("Calibration session ended: {:?}", outcome);
                    TickOutcome::SessionEnded(outcome)
                }
            };
        }

        let values = self.pipeline.process(frame.axes(), &self.cal);
        let buttons = self.reader.read(&frame);
        self.emit(values, &buttons);

        if self.scan {
            let avg = self.pipeline.last_filtered();
            let raw = self.pipeline.last_raw();
            self.console.write_str(&format!(
                "Average: {},{},{}  Raw: {},{},{}\r",
                avg.accel, avg.brake, avg.steering, raw.accel, raw.brake, raw.steering
            ));
        }

        if let Some(byte) = self.console.read_byte() {
            self.handle_key(byte, now);
        }

        TickOutcome::Reported
    }

    fn emit(&mut self, values: AxisValues, buttons: &crate::input::reader::ButtonState) {
        self.sink.set_axis_value(Axis::Accelerator, values.accel);
        self.sink.set_axis_value(Axis::Brake, values.brake);
        self.sink.set_axis_value(Axis::Steering, values.steering);
        for (slot, &pressed) in buttons.buttons.iter().enumerate() {
            self.sink.set_button(slot, pressed);
        }
        self.sink.set_hat(0, buttons.hat);

        match self.sink.send_report() {
            Ok(()) => {
                if self.report_failing {
                    info!("Report output recovered");
                    self.report_failing = false;
                }
            }
            Err(e) => {
                if !self.report_failing {
                    warn!("Failed to send report: {}", e);
                    self.report_failing = true;
                }
            }
        }
    }

    fn handle_key(&mut self, byte: u8, now: Instant) {
        let Some(command) = Command::from_byte(byte) else {
            debug!("Ignoring console byte 0x{:02x}", byte);
            return;
        };

        match command {
            Command::Calibrate => {
                self.session = Some(CalibrationSession::start(now, self.timeouts, &self.cal, &mut self.console));
            }
            Command::PrintCalibration => {
                self.console.write_str(&self.cal.to_string());
            }
            Command::ToggleScan => {
                self.scan = !self.scan;
                info!("Scan output {}", if self.scan { "enabled" } else { "disabled" });
            }
            Command::Help => self.console.write_line(HELP_TEXT),
            Command::About => self.console.write_line(ABOUT_TEXT),
        }
    }

    /// Live calibration.
    pub fn calibration(&self) -> &CalibrationParameters {
        &self.cal
    }

    /// True while a calibration session runs.
    pub fn is_calibrating(&self) -> bool {
        self.session.is_some()
    }

    /// True while scan output is on.
    pub fn scan_enabled(&self) -> bool {
        self.scan
    }

    pub fn sink(&self) -> &H {
        &self.sink
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn store_mut(&mut self) -> &mut CalibrationStore<S> {
        &mut self.store
    }
}
