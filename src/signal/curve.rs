//! # Steering Response Curve
//!
//! Cosine-eased remap of the raw steering reading around its calibrated center.
//!
//! Each half of the travel is mapped onto a quarter of a cosine wave:
//!
//! - Left half (`left..=center`): `angle = 90 * (raw - left) / (center - left) - 90`,
//!   `output = left + round(cos(angle) * (center - left))`
//! - Right half (`center..=right`): `angle = 90 * (raw - center) / (right - center)`,
//!   `output = center + round((1 - cos(angle)) * (right - center))`
//!
//! Both halves meet at `center` with output equal to input, both endpoints map to
//! themselves, and the output never decreases as the raw value increases. Raw values
//! beyond the calibrated extremes saturate at the extremes.

use crate::calibration::params::CalibrationParameters;
use crate::error::{Result, WheelBridgeError};

/// Applies the response curve to a raw steering value.
///
/// # Arguments
///
/// * `raw` - Steering reading, filtered or not
/// * `cal` - Current calibration
///
/// # Errors
///
/// Returns [`WheelBridgeError::DegenerateCalibration`] when `left >= center` or
/// `right <= center`, which would divide by zero. Callers fall back to
/// `cal.steering_center`.
///
/// # Examples
///
/// ```
/// use wheel_bridge::calibration::params::CalibrationParameters;
/// use wheel_bridge::signal::curve::apply;
///
/// let cal = CalibrationParameters {
///     steering_left: 0,
///     steering_center: 496,
///     steering_right: 995,
///     ..CalibrationParameters::default()
/// };
///
/// assert_eq!(apply(0, &cal)?, 0);
/// assert_eq!(apply(496, &cal)?, 496);
/// assert_eq!(apply(995, &cal)?, 995);
/// # Ok::<(), wheel_bridge::error::WheelBridgeError>(())
/// ```
pub fn apply(raw: i32, cal: &CalibrationParameters) -> Result<i32> {
    let left = cal.steering_left;
    let center = cal.steering_center;
    let right = cal.steering_right;

    let bottom_range = center - left;
    let top_range = right - center;
    if bottom_range <= 0 || top_range <= 0 {
        return Err(WheelBridgeError::DegenerateCalibration {
            left,
            center,
            right,
        });
    }

    let raw = raw.clamp(left, right);

    let output = if raw <= center {
        let bottom = f64::from(bottom_range);
        let angle_deg = 90.0 * f64::from(raw - left) / bottom - 90.0;
        f64::from(left) + (angle_deg.to_radians().cos() * bottom).round()
    } else {
        let top = f64::from(top_range);
        let angle_deg = f64::from(raw - center) * 90.0 / top;
        ((1.0 - angle_deg.to_radians().cos()) * top + f64::from(center)).round()
    };

    Ok(output as i32)
}

/// Applies the curve, returning `cal.steering_center` for a degenerate calibration.
#[must_use]
pub fn apply_or_center(raw: i32, cal: &CalibrationParameters) -> i32 {
    apply(raw, cal).unwrap_or(cal.steering_center)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal(left: i32, center: i32, right: i32) -> CalibrationParameters {
        CalibrationParameters {
            steering_left: left,
            steering_center: center,
            steering_right: right,
            ..CalibrationParameters::default()
        }
    }

    #[test]
    fn test_identity_at_center() {
        for c in [cal(0, 512, 1023), cal(30, 480, 990), cal(340, 341, 1023), cal(100, 600, 700)] {
            assert_eq!(apply(c.steering_center, &c).unwrap(), c.steering_center, "{:?}", c);
        }
    }

    #[test]
    fn test_endpoints_map_to_themselves() {
        let c = cal(30, 480, 990);
        assert_eq!(apply(30, &c).unwrap(), 30);
        assert_eq!(apply(990, &c).unwrap(), 990);
    }

    #[test]
    fn test_zero_raw_with_zero_left() {
        // cos(-90 deg) = 0
        let c = cal(0, 496, 995);
        assert_eq!(apply(0, &c).unwrap(), 0);
    }

    #[test]
    fn test_monotonic_over_full_domain() {
        for c in [cal(0, 512, 1023), cal(0, 496, 995), cal(25, 400, 700), cal(300, 350, 1000)] {
            let mut previous = i32::MIN;
            for raw in 0..=1023 {
                let out = apply(raw, &c).unwrap();
                assert!(out >= previous, "raw {} gave {} after {} for {:?}", raw, out, previous, c);
                previous = out;
            }
        }
    }

    #[test]
    fn test_compresses_near_center_on_left_half() {
        // Quarter of the way from center the cosine curve barely moves
        let c = cal(0, 512, 1023);
        let out = apply(384, &c).unwrap();
        assert!(out > 384, "left half bends toward center, got {}", out);
        assert_eq!(out, (512.0 * (-22.5_f64).to_radians().cos()).round() as i32);
    }

    #[test]
    fn test_right_half_midpoint() {
        let c = cal(0, 500, 1000);
        // angle 45 deg: (1 - cos 45) * 500 + 500
        let expected = ((1.0 - 45.0_f64.to_radians().cos()) * 500.0 + 500.0).round() as i32;
        assert_eq!(apply(750, &c).unwrap(), expected);
    }

    #[test]
    fn test_out_of_range_raw_saturates() {
        let c = cal(30, 480, 990);
        assert_eq!(apply(0, &c).unwrap(), 30);
        assert_eq!(apply(1023, &c).unwrap(), 990);
    }

    #[test]
    fn test_degenerate_left_equals_center() {
        let c = cal(500, 500, 1000);
        match apply(200, &c) {
            Err(WheelBridgeError::DegenerateCalibration { left, center, right }) => {
                assert_eq!((left, center, right), (500, 500, 1000));
            }
            other => panic!("Expected DegenerateCalibration, got: {:?}", other),
        }
        assert_eq!(apply_or_center(200, &c), 500);
    }

    #[test]
    fn test_degenerate_right_equals_center() {
        let c = cal(0, 700, 700);
        assert!(apply(800, &c).is_err());
        assert_eq!(apply_or_center(800, &c), 700);
    }

    #[test]
    fn test_inverted_geometry_is_degenerate() {
        let c = cal(900, 500, 100);
        assert!(apply(500, &c).is_err());
    }
}
