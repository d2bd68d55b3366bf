//! # Calibration Parameters
//!
//! The single calibration record shared by the signal pipeline and the
//! calibration session, plus its fixed EEPROM layout.
//!
//! ## Valid Ranges
//!
//! The raw ADC range `0..=ADC_MAX` is split into thirds:
//!
//! | Field | Valid range |
//! |-------|-------------|
//! | `steering_left`, `accel_min`, `brake_min` | `0..=ADC_MAX/3` |
//! | `steering_center` | `ADC_MAX/3..=ADC_MAX*2/3` |
//! | `steering_right`, `accel_max`, `brake_max` | `ADC_MAX*2/3..=ADC_MAX` |
//! | `steering_deadband` | `2..=100` |
//!
//! ## Stored Layout
//!
//! Eight little-endian `i16` values in declaration order, 16 bytes, no header,
//! version tag or checksum. Changing the field order or width breaks every image
//! written by an earlier build without any way to detect it.

use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::ops::RangeInclusive;

/// Maximum raw ADC reading (10-bit converter).
pub const ADC_MAX: i32 = 1023;

/// Raw values a field calibrated at the low end may take.
pub const LOWER_THIRD: RangeInclusive<i32> = 0..=ADC_MAX / 3;

/// Raw values the steering center may take.
pub const MIDDLE_THIRD: RangeInclusive<i32> = ADC_MAX / 3..=ADC_MAX * 2 / 3;

/// Raw values a field calibrated at the high end may take.
pub const UPPER_THIRD: RangeInclusive<i32> = ADC_MAX * 2 / 3..=ADC_MAX;

/// Accepted steering deadband widths.
pub const DEADBAND_RANGE: RangeInclusive<i32> = 2..=100;

/// Number of persisted fields.
pub const FIELD_COUNT: usize = 8;

/// Size of the persisted image in bytes.
pub const STORED_SIZE: usize = FIELD_COUNT * 2;

/// Identifies one calibration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SteeringLeft,
    SteeringRight,
    SteeringCenter,
    SteeringDeadband,
    AccelMin,
    AccelMax,
    BrakeMin,
    BrakeMax,
}

impl Field {
    /// All fields in stored order.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::SteeringLeft,
        Field::SteeringRight,
        Field::SteeringCenter,
        Field::SteeringDeadband,
        Field::AccelMin,
        Field::AccelMax,
        Field::BrakeMin,
        Field::BrakeMax,
    ];

    /// Name used in console output and log messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Field::SteeringLeft => "steering_left",
            Field::SteeringRight => "steering_right",
            Field::SteeringCenter => "steering_center",
            Field::SteeringDeadband => "steering_deadband",
            Field::AccelMin => "accel_min",
            Field::AccelMax => "accel_max",
            Field::BrakeMin => "brake_min",
            Field::BrakeMax => "brake_max",
        }
    }

    /// Range a loaded value must fall in to be accepted.
    #[must_use]
    pub fn valid_range(self) -> RangeInclusive<i32> {
        match self {
            Field::SteeringLeft | Field::AccelMin | Field::BrakeMin => LOWER_THIRD,
            Field::SteeringCenter => MIDDLE_THIRD,
            Field::SteeringRight | Field::AccelMax | Field::BrakeMax => UPPER_THIRD,
            Field::SteeringDeadband => DEADBAND_RANGE,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loaded field that failed validation and was left at its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedField {
    /// Which field was rejected.
    pub field: Field,
    /// The value read from storage.
    pub stored: i32,
}

/// Axis extremes and steering deadband.
///
/// # Examples
///
/// ```
/// use wheel_bridge::calibration::params::CalibrationParameters;
///
/// let cal = CalibrationParameters::default();
/// assert_eq!(cal.steering_center, 512);
/// assert!(cal.rejected_fields().is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationParameters {
    /// Raw steering reading at full left lock.
    pub steering_left: i32,
    /// Raw steering reading at full right lock.
    pub steering_right: i32,
    /// Raw steering reading with the wheel centered.
    pub steering_center: i32,
    /// Full width of the window around center that snaps to center.
    pub steering_deadband: i32,
    /// Raw accelerator reading when released.
    pub accel_min: i32,
    /// Raw accelerator reading when fully pressed.
    pub accel_max: i32,
    /// Raw brake reading when released.
    pub brake_min: i32,
    /// Raw brake reading when fully pressed.
    pub brake_max: i32,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            steering_left: 0,
            steering_right: ADC_MAX,
            steering_center: 512,
            steering_deadband: 10,
            accel_min: 0,
            accel_max: ADC_MAX,
            brake_min: 0,
            brake_max: ADC_MAX,
        }
    }
}

impl CalibrationParameters {
    /// Reads one field.
    #[must_use]
    pub fn get(&self, field: Field) -> i32 {
        match field {
            Field::SteeringLeft => self.steering_left,
            Field::SteeringRight => self.steering_right,
            Field::SteeringCenter => self.steering_center,
            Field::SteeringDeadband => self.steering_deadband,
            Field::AccelMin => self.accel_min,
            Field::AccelMax => self.accel_max,
            Field::BrakeMin => self.brake_min,
            Field::BrakeMax => self.brake_max,
        }
    }

    /// Overwrites one field without validation.
    pub fn set(&mut self, field: Field, value: i32) {
        match field {
            Field::SteeringLeft => self.steering_left = value,
            Field::SteeringRight => self.steering_right = value,
            Field::SteeringCenter => self.steering_center = value,
            Field::SteeringDeadband => self.steering_deadband = value,
            Field::AccelMin => self.accel_min = value,
            Field::AccelMax => self.accel_max = value,
            Field::BrakeMin => self.brake_min = value,
            Field::BrakeMax => self.brake_max = value,
        }
    }

    /// Lists the fields whose current value lies outside its valid range.
    #[must_use]
    pub fn rejected_fields(&self) -> Vec<RejectedField> {
        Field::ALL
            .iter()
            .filter(|field| !field.valid_range().contains(&self.get(**field)))
            .map(|&field| RejectedField {
                field,
                stored: self.get(field),
            })
            .collect()
    }

    /// Copies every valid field of `candidate` into `self`.
    ///
    /// Invalid fields keep the value `self` already held and are returned so
    /// the caller can report them.
    pub fn merge_valid(&mut self, candidate: &CalibrationParameters) -> Vec<RejectedField> {
        let mut rejected = Vec::new();
        for field in Field::ALL {
            let value = candidate.get(field);
            if field.valid_range().contains(&value) {
                self.set(field, value);
            } else {
                rejected.push(RejectedField {
                    field,
                    stored: value,
                });
            }
        }
        rejected
    }

    /// Encodes the stored layout.
    ///
    /// Values outside the `i16` range saturate; nothing else is checked.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; STORED_SIZE] {
        let mut buf = BytesMut::with_capacity(STORED_SIZE);
        for field in Field::ALL {
            let value = self.get(field).clamp(i32::from(i16::MIN), i32::from(i16::MAX));
            buf.put_i16_le(value as i16);
        }

        let mut out = [0u8; STORED_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decodes the stored layout without validating any field.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; STORED_SIZE]) -> Self {
        let mut buf = &bytes[..];
        let mut cal = Self::default();
        for field in Field::ALL {
            cal.set(field, i32::from(buf.get_i16_le()));
        }
        cal
    }
}

impl fmt::Display for CalibrationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current calibration values:")?;
        for field in Field::ALL {
            writeln!(f, "{} = {}", field, self.get(field))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirds() {
        assert_eq!(LOWER_THIRD, 0..=341);
        assert_eq!(MIDDLE_THIRD, 341..=682);
        assert_eq!(UPPER_THIRD, 682..=1023);
    }

    #[test]
    fn test_defaults_are_valid() {
        let cal = CalibrationParameters::default();
        assert_eq!(cal.steering_left, 0);
        assert_eq!(cal.steering_right, 1023);
        assert_eq!(cal.steering_deadband, 10);
        assert!(cal.rejected_fields().is_empty());
    }

    #[test]
    fn test_merge_valid_keeps_held_value_for_bad_field() {
        let mut held = CalibrationParameters::default();
        let candidate = CalibrationParameters {
            steering_left: 2000,
            steering_right: 990,
            steering_center: 500,
            steering_deadband: 20,
            accel_min: 30,
            accel_max: 900,
            brake_min: 40,
            brake_max: 950,
        };

        let rejected = held.merge_valid(&candidate);

        assert_eq!(
            rejected,
            vec![RejectedField {
                field: Field::SteeringLeft,
                stored: 2000
            }]
        );
        assert_eq!(held.steering_left, 0);
        assert_eq!(held.steering_right, 990);
        assert_eq!(held.steering_center, 500);
        assert_eq!(held.steering_deadband, 20);
        assert_eq!(held.accel_min, 30);
        assert_eq!(held.brake_max, 950);
    }

    #[test]
    fn test_deadband_bounds() {
        let mut cal = CalibrationParameters::default();
        for (value, ok) in [(1, false), (2, true), (100, true), (101, false)] {
            cal.steering_deadband = value;
            assert_eq!(cal.rejected_fields().is_empty(), ok, "deadband {}", value);
        }
    }

    #[test]
    fn test_center_boundaries_overlap_thirds() {
        let mut cal = CalibrationParameters::default();
        cal.steering_center = 341;
        assert!(cal.rejected_fields().is_empty());
        cal.steering_center = 683;
        assert_eq!(cal.rejected_fields()[0].field, Field::SteeringCenter);
    }

    #[test]
    fn test_byte_layout_is_little_endian_in_field_order() {
        let cal = CalibrationParameters {
            steering_left: 0x0102,
            steering_right: 3,
            steering_center: 4,
            steering_deadband: 5,
            accel_min: 6,
            accel_max: 7,
            brake_min: 8,
            brake_max: -1,
        };
        let bytes = cal.to_bytes();
        assert_eq!(&bytes[0..4], &[0x02, 0x01, 0x03, 0x00]);
        assert_eq!(&bytes[14..16], &[0xFF, 0xFF]);
        assert_eq!(CalibrationParameters::from_bytes(&bytes), cal);
    }

    #[test]
    fn test_erased_image_decodes_to_minus_one() {
        let cal = CalibrationParameters::from_bytes(&[0xFF; STORED_SIZE]);
        assert_eq!(cal.steering_left, -1);
        assert_eq!(cal.rejected_fields().len(), FIELD_COUNT);
    }

    #[test]
    fn test_encode_saturates_out_of_range_values() {
        let mut cal = CalibrationParameters::default();
        cal.accel_max = 100_000;
        let decoded = CalibrationParameters::from_bytes(&cal.to_bytes());
        assert_eq!(decoded.accel_max, i32::from(i16::MAX));
    }

    #[test]
    fn test_display_lists_every_field() {
        let text = CalibrationParameters::default().to_string();
        for field in Field::ALL {
            assert!(text.contains(field.name()));
        }
        assert!(text.contains("steering_center = 512"));
    }
}
