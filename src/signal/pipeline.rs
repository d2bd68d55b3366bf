//! # Signal Pipeline
//!
//! Turns one tick's raw ADC readings into calibrated axis values.
//!
//! ## Stages
//!
//! | Order | Stage | Axes | Toggle |
//! |-------|-------|------|--------|
//! | 1 | Clamp to `0..=ADC_MAX` | all | always |
//! | 2 | Moving average | each | `filter_accel` / `filter_brake` / `filter_steering` |
//! | 3 | Cosine response curve | steering | `response_curve` |
//! | 4 | Deadband snap to center | steering | `deadband` |
//! | 5 | Inversion | accelerator | `accel_inverted` |
//! | 6 | Gain | accelerator | `accel_gain` |
//!
//! The pipeline stops at calibrated raw values. The HID sink is told the
//! calibrated range of each axis through [`SignalPipeline::apply_ranges`] and
//! does the final scaling itself.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::curve;
use super::filter::AxisFilter;
use crate::calibration::params::{CalibrationParameters, ADC_MAX};
use crate::error::WheelBridgeError;
use crate::hid::{Axis, HidSink};

/// Default accelerator gain for a short-travel pedal.
pub const DEFAULT_ACCEL_GAIN: f64 = 1.2;

/// One reading per analog axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAxes {
    pub accel: i32,
    pub brake: i32,
    pub steering: i32,
}

impl RawAxes {
    /// Clamps every reading into the ADC domain.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            accel: self.accel.clamp(0, ADC_MAX),
            brake: self.brake.clamp(0, ADC_MAX),
            steering: self.steering.clamp(0, ADC_MAX),
        }
    }
}

/// Calibrated axis values handed to the HID sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisValues {
    pub accel: i32,
    pub brake: i32,
    pub steering: i32,
}

/// Which stages run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineStages {
    /// Moving average on the accelerator.
    pub filter_accel: bool,
    /// Moving average on the brake.
    pub filter_brake: bool,
    /// Moving average on the steering.
    pub filter_steering: bool,
    /// Cosine response curve on the steering.
    pub response_curve: bool,
    /// Snap steering values near center to center.
    pub deadband: bool,
    /// Report `ADC_MAX - accel` for a pedal wired in reverse.
    pub accel_inverted: bool,
    /// Gain on accelerator travel above `accel_min`, `None` to disable.
    pub accel_gain: Option<f64>,
}

impl Default for PipelineStages {
    fn default() -> Self {
        Self {
            filter_accel: true,
            filter_brake: true,
            filter_steering: true,
            response_curve: true,
            deadband: true,
            accel_inverted: false,
            accel_gain: Some(DEFAULT_ACCEL_GAIN),
        }
    }
}

impl PipelineStages {
    /// Every stage off: values pass through clamped and unchanged.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            filter_accel: false,
            filter_brake: false,
            filter_steering: false,
            response_curve: false,
            deadband: false,
            accel_inverted: false,
            accel_gain: None,
        }
    }
}

/// Snaps `value` to the steering center when it lies within `center ± deadband/2`.
///
/// # Examples
///
/// ```
/// use wheel_bridge::calibration::params::CalibrationParameters;
/// use wheel_bridge::signal::pipeline::apply_deadband;
///
/// let cal = CalibrationParameters::default(); // center 512, deadband 10
/// assert_eq!(apply_deadband(517, &cal), 512);
/// assert_eq!(apply_deadband(518, &cal), 518);
/// ```
#[must_use]
pub fn apply_deadband(value: i32, cal: &CalibrationParameters) -> i32 {
    let half = cal.steering_deadband / 2;
    let center = cal.steering_center;
    if (center - half..=center + half).contains(&value) {
        center
    } else {
        value
    }
}

/// Per-axis filters plus stage configuration.
#[derive(Debug, Clone)]
pub struct SignalPipeline {
    stages: PipelineStages,
    accel_filter: AxisFilter,
    brake_filter: AxisFilter,
    steering_filter: AxisFilter,
    last_raw: RawAxes,
    last_filtered: RawAxes,
    degenerate_reported: bool,
}

impl Default for SignalPipeline {
    fn default() -> Self {
        Self::new(PipelineStages::default())
    }
}

impl SignalPipeline {
    /// Creates a pipeline with zeroed filters.
    #[must_use]
    pub fn new(stages: PipelineStages) -> Self {
        Self {
            stages,
            accel_filter: AxisFilter::new(),
            brake_filter: AxisFilter::new(),
            steering_filter: AxisFilter::new(),
            last_raw: RawAxes::default(),
            last_filtered: RawAxes::default(),
            degenerate_reported: false,
        }
    }

    /// Active stage configuration.
    #[must_use]
    pub fn stages(&self) -> &PipelineStages {
        &self.stages
    }

    /// Raw readings of the last tick, after clamping.
    #[must_use]
    pub fn last_raw(&self) -> RawAxes {
        self.last_raw
    }

    /// Readings of the last tick after the filter stage.
    #[must_use]
    pub fn last_filtered(&self) -> RawAxes {
        self.last_filtered
    }

    /// Runs every enabled stage over one tick of readings.
    pub fn process(&mut self, raw: RawAxes, cal: &CalibrationParameters) -> AxisValues {
        let raw = raw.clamped();
        self.last_raw = raw;

        let filtered = RawAxes {
            accel: Self::filter(&mut self.accel_filter, self.stages.filter_accel, raw.accel),
            brake: Self::filter(&mut self.brake_filter, self.stages.filter_brake, raw.brake),
            steering: Self::filter(
                &mut self.steering_filter,
                self.stages.filter_steering,
                raw.steering,
            ),
        };
        self.last_filtered = filtered;

        let mut steering = filtered.steering;
        if self.stages.response_curve {
            steering = self.curve(steering, cal);
        }
        if self.stages.deadband {
            steering = apply_deadband(steering, cal);
        }

        AxisValues {
            accel: self.accel(filtered.accel, cal),
            brake: filtered.brake,
            steering,
        }
    }

    /// Tells the sink the calibrated range of each axis.
    ///
    /// Also re-arms the degenerate-calibration warning, since the geometry
    /// may have changed.
    pub fn apply_ranges<H: HidSink + ?Sized>(&mut self, sink: &mut H, cal: &CalibrationParameters) {
        sink.set_axis_range(Axis::Accelerator, cal.accel_min, cal.accel_max);
        sink.set_axis_range(Axis::Brake, cal.brake_min, cal.brake_max);
        sink.set_axis_range(Axis::Steering, cal.steering_left, cal.steering_right);
        self.degenerate_reported = false;
        info!(
            "Applied axis ranges: accel {}..{}, brake {}..{}, steering {}..{}",
            cal.accel_min, cal.accel_max, cal.brake_min, cal.brake_max,
            cal.steering_left, cal.steering_right
        );
    }

    fn filter(filter: &mut AxisFilter, enabled: bool, sample: i32) -> i32 {
        if enabled {
            filter.push(sample)
        } else {
            sample
        }
    }

    fn curve(&mut self, steering: i32, cal: &CalibrationParameters) -> i32 {
        match curve::apply(steering, cal) {
            Ok(value) => value,
            Err(e @ WheelBridgeError::DegenerateCalibration { .. }) => {
                if !self.degenerate_reported {
                    warn!("{}; steering held at center until recalibrated", e);
                    self.degenerate_reported = true;
                }
                cal.steering_center
            }
            Err(e) => {
                warn!("Response curve failed: {}", e);
                cal.steering_center
            }
        }
    }

    /// Gain scales travel above `accel_min`, so a released pedal stays released.
    fn accel(&self, value: i32, cal: &CalibrationParameters) -> i32 {
        let value = if self.stages.accel_inverted {
            ADC_MAX - value
        } else {
            value
        };

        match self.stages.accel_gain {
            Some(gain) => {
                let travel = f64::from(value - cal.accel_min) * gain;
                (cal.accel_min + travel.round() as i32).clamp(0, ADC_MAX)
            }
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::report::{scale_axis, HID_AXIS_MIN};
    use crate::hid::MockHidSink;
    use mockall::predicate::eq;

    fn raw(accel: i32, brake: i32, steering: i32) -> RawAxes {
        RawAxes {
            accel,
            brake,
            steering,
        }
    }

    fn steering_only() -> PipelineStages {
        PipelineStages {
            deadband: true,
            ..PipelineStages::passthrough()
        }
    }

    // ==================== Deadband Tests ====================

    #[test]
    fn test_deadband_window_snaps_to_center() {
        let cal = CalibrationParameters::default();
        let mut pipeline = SignalPipeline::new(steering_only());
        for w in 507..=517 {
            assert_eq!(pipeline.process(raw(0, 0, w), &cal).steering, 512, "w={}", w);
        }
    }

    #[test]
    fn test_deadband_edges_pass_through() {
        let cal = CalibrationParameters::default();
        let mut pipeline = SignalPipeline::new(steering_only());
        assert_eq!(pipeline.process(raw(0, 0, 506), &cal).steering, 506);
        assert_eq!(pipeline.process(raw(0, 0, 518), &cal).steering, 518);
    }

    #[test]
    fn test_odd_deadband_floors_half_width() {
        let mut cal = CalibrationParameters::default();
        cal.steering_deadband = 7; // half width 3
        assert_eq!(apply_deadband(515, &cal), 512);
        assert_eq!(apply_deadband(516, &cal), 516);
        assert_eq!(apply_deadband(509, &cal), 512);
        assert_eq!(apply_deadband(508, &cal), 508);
    }

    // ==================== Stage Composition Tests ====================

    #[test]
    fn test_passthrough_only_clamps() {
        let cal = CalibrationParameters::default();
        let mut pipeline = SignalPipeline::new(PipelineStages::passthrough());
        let out = pipeline.process(raw(-5, 2000, 300), &cal);
        assert_eq!(out, AxisValues { accel: 0, brake: 1023, steering: 300 });
        assert_eq!(pipeline.last_raw(), raw(0, 1023, 300));
    }

    #[test]
    fn test_filters_are_per_channel() {
        let cal = CalibrationParameters::default();
        let stages = PipelineStages {
            filter_brake: true,
            ..PipelineStages::passthrough()
        };
        let mut pipeline = SignalPipeline::new(stages);
        let out = pipeline.process(raw(400, 400, 400), &cal);
        assert_eq!(out.accel, 400);
        assert_eq!(out.brake, 100);
        assert_eq!(out.steering, 400);
        assert_eq!(pipeline.last_filtered().brake, 100);
    }

    #[test]
    fn test_accel_gain_scales_and_clamps() {
        let cal = CalibrationParameters::default();
        let stages = PipelineStages {
            accel_gain: Some(1.2),
            ..PipelineStages::passthrough()
        };
        let mut pipeline = SignalPipeline::new(stages);
        assert_eq!(pipeline.process(raw(500, 0, 512), &cal).accel, 600);
        assert_eq!(pipeline.process(raw(1000, 0, 512), &cal).accel, 1023);
        assert_eq!(pipeline.process(raw(0, 0, 512), &cal).accel, 0);
    }

    #[test]
    fn test_accel_gain_keeps_released_pedal_at_min() {
        let cal = CalibrationParameters {
            accel_min: 300,
            accel_max: 900,
            ..CalibrationParameters::default()
        };
        let stages = PipelineStages {
            accel_gain: Some(1.2),
            ..PipelineStages::passthrough()
        };
        let mut pipeline = SignalPipeline::new(stages);

        let released = pipeline.process(raw(300, 0, 512), &cal).accel;
        assert_eq!(released, 300);
        assert_eq!(scale_axis(released, cal.accel_min, cal.accel_max), HID_AXIS_MIN);

        // 100 counts of travel become 120
        assert_eq!(pipeline.process(raw(400, 0, 512), &cal).accel, 420);
        assert_eq!(pipeline.process(raw(850, 0, 512), &cal).accel, 960);
    }

    #[test]
    fn test_accel_inversion_runs_before_gain() {
        let cal = CalibrationParameters::default();
        let stages = PipelineStages {
            accel_inverted: true,
            accel_gain: Some(2.0),
            ..PipelineStages::passthrough()
        };
        let mut pipeline = SignalPipeline::new(stages);
        // 1023 - 923 = 100, doubled
        assert_eq!(pipeline.process(raw(923, 0, 512), &cal).accel, 200);
    }

    #[test]
    fn test_curve_then_deadband() {
        let cal = CalibrationParameters::default();
        let stages = PipelineStages {
            response_curve: true,
            deadband: true,
            ..PipelineStages::passthrough()
        };
        let mut pipeline = SignalPipeline::new(stages);

        // Near center the curve is flat, so a 40-count offset lands in the deadband
        assert_eq!(pipeline.process(raw(0, 0, 472), &cal).steering, 512);
        assert_eq!(pipeline.process(raw(0, 0, 0), &cal).steering, 0);
        assert_eq!(pipeline.process(raw(0, 0, 1023), &cal).steering, 1023);
    }

    #[test]
    fn test_degenerate_calibration_holds_center() {
        let mut cal = CalibrationParameters::default();
        cal.steering_left = 512;
        let stages = PipelineStages {
            response_curve: true,
            ..PipelineStages::passthrough()
        };
        let mut pipeline = SignalPipeline::new(stages);
        for w in [0, 300, 900] {
            assert_eq!(pipeline.process(raw(0, 0, w), &cal).steering, 512);
        }
        assert!(pipeline.degenerate_reported);
    }

    #[test]
    fn test_default_stages_warm_up() {
        let cal = CalibrationParameters::default();
        let mut pipeline = SignalPipeline::default();
        let mut out = AxisValues::default();
        for _ in 0..4 {
            out = pipeline.process(raw(500, 700, 512), &cal);
        }
        assert_eq!(out.brake, 700);
        assert_eq!(out.accel, 600);
        assert_eq!(out.steering, 512);
    }

    // ==================== Sink Range Tests ====================

    #[test]
    fn test_apply_ranges_sets_every_axis() {
        let cal = CalibrationParameters {
            steering_left: 10,
            steering_right: 1000,
            steering_center: 505,
            steering_deadband: 10,
            accel_min: 20,
            accel_max: 900,
            brake_min: 30,
            brake_max: 950,
        };

        let mut sink = MockHidSink::new();
        sink.expect_set_axis_range()
            .with(eq(Axis::Accelerator), eq(20), eq(900))
            .times(1)
            .return_const(());
        sink.expect_set_axis_range()
            .with(eq(Axis::Brake), eq(30), eq(950))
            .times(1)
            .return_const(());
        sink.expect_set_axis_range()
            .with(eq(Axis::Steering), eq(10), eq(1000))
            .times(1)
            .return_const(());

        let mut pipeline = SignalPipeline::default();
        pipeline.degenerate_reported = true;
        pipeline.apply_ranges(&mut sink, &cal);
        assert!(!pipeline.degenerate_reported);
    }
}
