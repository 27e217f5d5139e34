//! # Numeric and Bit Utilities
//!
//! Shared helpers used by both robot models: saturating clamps, bit/byte
//! conversion, buzzer note timing, the micro:bit mount rotation and the
//! tilt-compensated compass.

use super::reading::Vector3;

/// Angle between the micro:bit mount and the robot body, in degrees
pub const MOUNT_ANGLE_DEG: f64 = 40.0;

/// Lowest playable note (MIDI numbering)
pub const NOTE_MIN: i32 = 32;

/// Highest playable note (MIDI numbering)
pub const NOTE_MAX: i32 = 135;

/// Sense of the mount rotation applied to one sensor field
///
/// `Positive` computes `y' = y·cos + z·sin`, `z' = z·cos − y·sin`;
/// `Negative` flips the sine terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationSense {
    Positive,
    Negative,
}

impl RotationSense {
    fn sign(self) -> f64 {
        match self {
            RotationSense::Positive => 1.0,
            RotationSense::Negative => -1.0,
        }
    }
}

/// Clamp an integer to `[min, max]`
pub fn clamp_i32(value: i32, min: i32, max: i32) -> i32 {
    value.clamp(min, max)
}

/// Clamp a float to `[min, max]`; NaN collapses to `min`
pub fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Expand a byte into its bits, index 0 being the least significant bit
pub fn byte_to_bits(byte: u8) -> [u8; 8] {
    let mut bits = [0u8; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> i) & 1;
    }
    bits
}

/// Pack bits into a byte, index 0 being the least significant bit
///
/// Any non-zero element counts as a set bit.
pub fn bits_to_byte(bits: &[u8]) -> u8 {
    bits.iter()
        .take(8)
        .enumerate()
        .fold(0u8, |acc, (i, &bit)| if bit != 0 { acc | (1 << i) } else { acc })
}

/// Frequency in Hz of a note, clamped to the playable range
pub fn note_to_frequency(note: i32) -> f64 {
    let note = clamp_i32(note, NOTE_MIN, NOTE_MAX);
    440.0 * 2f64.powf((note - 69) as f64 / 12.0)
}

/// Buzzer period in microseconds for a frequency
///
/// Returns `None` when the period does not fit the 16-bit wire field.
pub fn frequency_to_period(frequency: f64) -> Option<u16> {
    if !(frequency > 0.0) {
        return None;
    }
    let period = (1_000_000.0 / frequency).round();
    if period.is_finite() && period <= u16::MAX as f64 {
        Some(period as u16)
    } else {
        None
    }
}

/// Buzzer period in microseconds for a note, clamped to the playable range
pub fn note_to_period(note: i32) -> Option<u16> {
    frequency_to_period(note_to_frequency(note))
}

/// Rotate a vector from the micro:bit mount frame into the robot body frame
pub fn rotate_mount(v: Vector3, sense: RotationSense) -> Vector3 {
    let rad = MOUNT_ANGLE_DEG.to_radians();
    let (sin, cos) = rad.sin_cos();
    let s = sense.sign();
    Vector3 {
        x: v.x,
        y: v.y * cos + s * v.z * sin,
        z: v.z * cos - s * v.y * sin,
    }
}

/// Tilt-compensated compass heading in degrees, `[0, 360)`
///
/// The robot's forward axis reads 0° when pointing at magnetic north.
/// Undefined (`None`) when the z acceleration is exactly zero.
pub fn heading(acceleration: Vector3, magnetometer: Vector3) -> Option<f64> {
    let Vector3 { x: ax, y: ay, z: az } = acceleration;
    if az == 0.0 {
        return None;
    }
    let Vector3 { x: mx, y: my, z: mz } = magnetometer;

    let phi = (-ay / az).atan();
    let theta = (ax / (ay * phi.sin() + az * phi.cos())).atan();

    let y_p = my * phi.cos() - mz * phi.sin();
    let z_p = my * phi.sin() + mz * phi.cos();
    let x_pp = mx * theta.cos() + z_p * theta.sin();

    let angle = 180.0 + x_pp.atan2(y_p).to_degrees();
    if !angle.is_finite() {
        return None;
    }

    let wrapped = angle.rem_euclid(360.0);
    Some(if wrapped >= 360.0 { 0.0 } else { wrapped })
}

/// Interpret three bytes as a big-endian 24-bit two's-complement integer
///
/// The bytes are shifted into the top of a 32-bit word, reinterpreted as
/// signed, then divided by 256.
pub fn int24_from_be(msb: u8, mid: u8, lsb: u8) -> i32 {
    let word = ((msb as u32) << 24) | ((mid as u32) << 16) | ((lsb as u32) << 8);
    (word as i32) / 256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_helpers() {
        assert_eq!(clamp_i32(-10, 0, 180), 0);
        assert_eq!(clamp_i32(999, 0, 180), 180);
        assert_eq!(clamp_i32(90, 0, 180), 90);
        assert_eq!(clamp_f64(f64::NAN, 0.0, 16.0), 0.0);
        assert_eq!(clamp_f64(20.0, 0.0, 16.0), 16.0);
    }

    #[test]
    fn test_byte_to_bits_lsb_first() {
        assert_eq!(byte_to_bits(0b0000_0001), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(byte_to_bits(0b1000_0000), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(byte_to_bits(0x30), [0, 0, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_bits_to_byte_inverts_byte_to_bits() {
        for byte in [0x00u8, 0x01, 0x5A, 0x80, 0xFF] {
            assert_eq!(bits_to_byte(&byte_to_bits(byte)), byte);
        }
    }

    #[test]
    fn test_a4_frequency() {
        assert!((note_to_frequency(69) - 440.0).abs() < 1e-9);
        assert_eq!(note_to_period(69), Some(2273));
    }

    #[test]
    fn test_note_is_clamped() {
        assert_eq!(note_to_period(0), note_to_period(NOTE_MIN));
        assert_eq!(note_to_period(500), note_to_period(NOTE_MAX));
    }

    #[test]
    fn test_highest_note_period_fits() {
        let period = note_to_period(NOTE_MAX).unwrap();
        assert!(period > 0);
        // 440 * 2^(66/12) Hz ≈ 19912 Hz
        assert_eq!(period, 50);
    }

    #[test]
    fn test_lowest_note_period_fits() {
        let period = note_to_period(NOTE_MIN).unwrap();
        assert_eq!(period, 19_263);
    }

    #[test]
    fn test_period_overflow_is_absent() {
        // 10 Hz needs a 100000 µs period
        assert_eq!(frequency_to_period(10.0), None);
        assert_eq!(frequency_to_period(0.0), None);
        assert_eq!(frequency_to_period(-5.0), None);
        // Boundary: exactly 65535 µs still fits
        assert_eq!(frequency_to_period(1_000_000.0 / 65_535.0), Some(65_535));
    }

    #[test]
    fn test_rotation_senses_are_inverse() {
        let v = Vector3 { x: 1.0, y: 2.0, z: 3.0 };
        let there = rotate_mount(v, RotationSense::Positive);
        let back = rotate_mount(there, RotationSense::Negative);
        assert!((back.x - v.x).abs() < 1e-12);
        assert!((back.y - v.y).abs() < 1e-12);
        assert!((back.z - v.z).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_positive_sense() {
        let v = Vector3 { x: 0.0, y: 0.0, z: 1.0 };
        let r = rotate_mount(v, RotationSense::Positive);
        let rad = MOUNT_ANGLE_DEG.to_radians();
        assert!((r.y - rad.sin()).abs() < 1e-12);
        assert!((r.z - rad.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_heading_undefined_without_z_acceleration() {
        let mag = Vector3 { x: 10.0, y: -20.0, z: 5.0 };
        assert_eq!(heading(Vector3::default(), mag), None);
        assert_eq!(heading(Vector3 { x: 1.0, y: 2.0, z: 0.0 }, mag), None);
    }

    #[test]
    fn test_heading_level_north_is_zero() {
        let accel = Vector3 { x: 0.0, y: 0.0, z: 9.8 };
        let mag = Vector3 { x: 0.0, y: -30.0, z: -20.0 };
        let h = heading(accel, mag).unwrap();
        assert!(h < 1.0 || h > 359.0, "heading was {}", h);
        assert!((0.0..360.0).contains(&h));
    }

    #[test]
    fn test_heading_quarter_turn() {
        let accel = Vector3 { x: 0.0, y: 0.0, z: 9.8 };
        let mag = Vector3 { x: -30.0, y: 0.0, z: 0.0 };
        let h = heading(accel, mag).unwrap();
        assert!((h - 90.0).abs() < 1e-9, "heading was {}", h);
    }

    #[test]
    fn test_heading_always_in_range() {
        let accel = Vector3 { x: 1.0, y: -2.0, z: 9.0 };
        for (mx, my) in [(5.0, 5.0), (-5.0, 5.0), (5.0, -5.0), (-5.0, -5.0)] {
            let h = heading(accel, Vector3 { x: mx, y: my, z: 3.0 }).unwrap();
            assert!((0.0..360.0).contains(&h));
        }
    }

    #[test]
    fn test_int24_sign_extension() {
        assert_eq!(int24_from_be(0x00, 0x00, 0x00), 0);
        assert_eq!(int24_from_be(0x00, 0x03, 0x18), 792);
        assert_eq!(int24_from_be(0xFF, 0xFF, 0xFF), -1);
        assert_eq!(int24_from_be(0x80, 0x00, 0x00), -8_388_608);
        assert_eq!(int24_from_be(0x7F, 0xFF, 0xFF), 8_388_607);
    }
}
