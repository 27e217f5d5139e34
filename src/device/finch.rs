//! # Finch
//!
//! Wheeled robot with a micro:bit mounted at 40° under its shell.
//!
//! ## Sensor frame (20 bytes)
//!
//! | Byte | Content |
//! |------|---------|
//! | 0-1 | Distance, big-endian |
//! | 2, 3 | Light left, right |
//! | 4 | Line left, bit 7 = move in progress |
//! | 5 | Line right |
//! | 6 | Battery |
//! | 7-9 | Left encoder, 24-bit signed |
//! | 10-12 | Right encoder, 24-bit signed |
//! | 13-15 | Accelerometer x, y, z |
//! | 16 | Buttons / shake |
//! | 17-19 | Magnetometer x, y, z |
//!
//! ## Combined output frame (20 bytes)
//!
//! ```text
//! [0xD0, beak R G B, tail1 R G B, ..., tail4 R G B, period H L, duration H L]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::{byte_to_percent, decode_buttons, Model, ModelKind, Rgb, Tone, ACCEL_SCALE};
use crate::protocol::frame::RawFrame;
use crate::protocol::math::{clamp_i32, heading, int24_from_be, rotate_mount, RotationSense};
use crate::protocol::reading::{FinchChannels, ModelChannels, SensorReading, Vector3};

/// Sensor frame length
pub const SENSOR_FRAME_LEN: usize = 20;

/// Combined output frame opcode
pub const OP_SET_ALL: u8 = 0xD0;

/// Motor frame opcode
pub const OP_MOTORS: u8 = 0xD2;

/// Motor frame mode byte
pub const MOTORS_MODE: u8 = 0x40;

/// Encoder reset opcode
pub const OP_RESET_ENCODERS: u8 = 0xD5;

/// Display opcode
pub const OP_DISPLAY: u8 = 0xDA;

/// Stop-all opcode
pub const OP_STOP_ALL: u8 = 0xDF;

/// Combined output frame length
pub const SET_ALL_LEN: usize = 20;

/// Number of tail LEDs
pub const TAIL_LEDS: u8 = 4;

/// Distance sensor centimeters per count
pub const DISTANCE_CM_PER_COUNT: f64 = 0.0919;

/// Battery offset added before scaling
pub const BATTERY_OFFSET: f64 = 320.0;

/// Battery volts per count (after offset)
pub const BATTERY_SCALE: f64 = 0.00937;

/// Encoder ticks per wheel rotation
pub const TICKS_PER_ROTATION: f64 = 792.0;

/// Encoder ticks per centimeter travelled
pub const TICKS_PER_CM: f64 = 49.7;

/// Encoder ticks per degree of in-place rotation
pub const TICKS_PER_DEGREE: f64 = 4.335;

/// Wire speed units per percent of full speed
pub const SPEED_SCALE: f64 = 0.36;

/// Largest tick count a motor frame can carry
pub const MAX_TICKS: u32 = 0x00FF_FFFF;

/// Rotation sense for the accelerometer
pub const ACCEL_ROTATION: RotationSense = RotationSense::Negative;

/// Rotation sense for the magnetometer
pub const MAG_ROTATION: RotationSense = RotationSense::Positive;

mod offset {
    pub const DISTANCE: usize = 0;
    pub const LIGHT_LEFT: usize = 2;
    pub const LIGHT_RIGHT: usize = 3;
    pub const LINE_LEFT: usize = 4;
    pub const LINE_RIGHT: usize = 5;
    pub const BATTERY: usize = 6;
    pub const ENCODER_LEFT: usize = 7;
    pub const ENCODER_RIGHT: usize = 10;
    pub const ACCEL: usize = 13;
    pub const BUTTONS: usize = 16;
    pub const MAG: usize = 17;
}

/// Finch model marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Finch;

/// Finch output memory (wire values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinchOutputs {
    pub beak: Rgb,
    pub tail: [Rgb; 4],
}

/// Which tail LEDs a command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailSelect {
    All,
    Port(u8),
}

/// Straight-line travel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// In-place turn direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

/// Left line sensor byte: movement flag plus line reading
///
/// The flag occupies bit 7; the line value is taken from the remaining bits.
pub fn split_line_byte(raw: u8) -> (bool, u8) {
    if raw > 127 {
        (true, raw - 128)
    } else {
        (false, raw)
    }
}

/// Line sensor value (flag bit already removed) to 0-100
pub fn line_percent(value: u8) -> u8 {
    let scaled = 100 - ((value as f64 - 6.0) * 100.0 / 121.0).round() as i32;
    clamp_i32(scaled, 0, 100) as u8
}

/// Signed motor speed (-100..100, clamped) to its wire byte
///
/// Magnitude `round(|speed| × 0.36)`, bit 7 set for forward.
pub fn speed_to_wire(speed: i32) -> u8 {
    let speed = clamp_i32(speed, -100, 100);
    let magnitude = (speed.unsigned_abs() as f64 * SPEED_SCALE).round() as u8;
    if speed > 0 {
        magnitude + 128
    } else {
        magnitude
    }
}

/// Ticks needed to travel `distance_cm`
pub fn ticks_for_distance(distance_cm: f64, ticks_per_cm: f64) -> u32 {
    to_ticks(distance_cm.abs() * ticks_per_cm)
}

/// Ticks needed to spin in place by `degrees`
pub fn ticks_for_turn(degrees: f64, ticks_per_degree: f64) -> u32 {
    to_ticks(degrees.abs() * ticks_per_degree)
}

fn to_ticks(ticks: f64) -> u32 {
    if !ticks.is_finite() {
        return 0;
    }
    (ticks.round().max(0.0) as u64).min(MAX_TICKS as u64) as u32
}

/// Build a motor frame
///
/// Zero ticks selects velocity control; non-zero ticks run a position
/// move that stops after that many encoder ticks.
///
/// # Arguments
///
/// * `left_speed`, `right_speed` - Wheel speeds, -100..100 (clamped)
/// * `left_ticks`, `right_ticks` - Encoder ticks to travel (at most 0xFFFFFF)
///
/// # Returns
///
/// * `Bytes` - Ten-byte frame `[0xD2, 0x40, ls, lt x3, rs, rt x3]`
///
/// # Examples
///
/// ```no_run
/// use birdbrain_bridge::device::finch::encode_motors;
///
/// let frame = encode_motors(100, 0, -50, 0);
/// assert_eq!(&frame[..], &[0xD2, 0x40, 164, 0, 0, 0, 18, 0, 0, 0]);
/// ```
pub fn encode_motors(left_speed: i32, left_ticks: u32, right_speed: i32, right_ticks: u32) -> Bytes {
    let mut frame = BytesMut::with_capacity(10);
    frame.put_u8(OP_MOTORS);
    frame.put_u8(MOTORS_MODE);
    frame.put_u8(speed_to_wire(left_speed));
    frame.put_uint(left_ticks.min(MAX_TICKS) as u64, 3);
    frame.put_u8(speed_to_wire(right_speed));
    frame.put_uint(right_ticks.min(MAX_TICKS) as u64, 3);
    frame.freeze()
}

/// Encoder reset frame
pub fn encode_reset_encoders() -> Bytes {
    Bytes::from_static(&[OP_RESET_ENCODERS])
}

impl FinchOutputs {
    /// Tail indices addressed by a selection
    pub fn tail_indices(select: TailSelect) -> Result<Vec<usize>, crate::error::EncodingError> {
        match select {
            TailSelect::All => Ok((0..TAIL_LEDS as usize).collect()),
            TailSelect::Port(port) => Ok(vec![super::check_port("tail", port, TAIL_LEDS)?]),
        }
    }
}

impl Model for Finch {
    type Outputs = FinchOutputs;

    const KIND: ModelKind = ModelKind::Finch;
    const SENSOR_FRAME_LEN: usize = SENSOR_FRAME_LEN;
    const STOP_ALL: u8 = OP_STOP_ALL;
    const DISPLAY: u8 = OP_DISPLAY;

    fn decode(frame: &RawFrame<Self>) -> SensorReading {
        let b = frame.bytes();

        let distance_raw = u16::from_be_bytes([b[offset::DISTANCE], b[offset::DISTANCE + 1]]);
        let distance_cm = (distance_raw as f64 * DISTANCE_CM_PER_COUNT).round() as u16;

        let (moving, line_left_raw) = split_line_byte(b[offset::LINE_LEFT]);

        let encoder = |at: usize| int24_from_be(b[at], b[at + 1], b[at + 2]) as f64 / TICKS_PER_ROTATION;

        let accel_raw = Vector3::new(
            b[offset::ACCEL] as i8 as f64,
            b[offset::ACCEL + 1] as i8 as f64,
            b[offset::ACCEL + 2] as i8 as f64,
        );
        let acceleration = rotate_mount(accel_raw, ACCEL_ROTATION).scaled(ACCEL_SCALE);

        let mag_raw = Vector3::new(
            b[offset::MAG] as i8 as f64,
            b[offset::MAG + 1] as i8 as f64,
            b[offset::MAG + 2] as i8 as f64,
        );
        let magnetometer = rotate_mount(mag_raw, MAG_ROTATION);

        let buttons = decode_buttons(b[offset::BUTTONS]);

        SensorReading {
            received_at: frame.received_at(),
            stale: frame.is_stale(),
            battery_volts: (b[offset::BATTERY] as f64 + BATTERY_OFFSET) * BATTERY_SCALE,
            acceleration,
            magnetometer,
            heading: heading(acceleration, magnetometer),
            button_a: buttons.button_a,
            button_b: buttons.button_b,
            shaking: buttons.shaking,
            channels: ModelChannels::Finch(FinchChannels {
                distance_cm,
                light_left: byte_to_percent(b[offset::LIGHT_LEFT]),
                light_right: byte_to_percent(b[offset::LIGHT_RIGHT]),
                line_left: line_percent(line_left_raw),
                line_right: line_percent(b[offset::LINE_RIGHT]),
                moving,
                encoder_left: encoder(offset::ENCODER_LEFT),
                encoder_right: encoder(offset::ENCODER_RIGHT),
            }),
        }
    }

    fn encode_outputs(outputs: &FinchOutputs, tone: Option<Tone>) -> Bytes {
        let mut frame = BytesMut::with_capacity(SET_ALL_LEN);
        frame.put_u8(OP_SET_ALL);
        frame.put_slice(&outputs.beak.to_array());
        for led in &outputs.tail {
            frame.put_slice(&led.to_array());
        }
        frame.put_slice(&Tone::to_wire(tone));
        frame.freeze()
    }

    fn decode_outputs(frame: &[u8]) -> Option<FinchOutputs> {
        if frame.len() != SET_ALL_LEN || frame[0] != OP_SET_ALL {
            return None;
        }
        let rgb = |at: usize| Rgb::from([frame[at], frame[at + 1], frame[at + 2]]);
        Some(FinchOutputs {
            beak: rgb(1),
            tail: [rgb(4), rgb(7), rgb(10), rgb(13)],
        })
    }
}
