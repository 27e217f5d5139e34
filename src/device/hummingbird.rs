//! # Hummingbird
//!
//! Robotics kit controller with three analog sensor ports, three single-color
//! LEDs, two tri-color LEDs and four servo ports.
//!
//! ## Sensor frame (14 bytes)
//!
//! | Byte | Content |
//! |------|---------|
//! | 0-2 | Sensor ports 1-3 |
//! | 3 | Battery |
//! | 4-6 | Accelerometer x, y, z |
//! | 7 | Buttons / shake |
//! | 8-13 | Magnetometer x, y, z as signed 16-bit big-endian pairs |
//!
//! ## Combined output frame (19 bytes)
//!
//! ```text
//! [0xCA, led1, 0x00, tri1 R G B, tri2 R G B, servo1..servo4, led2, led3,
//!  period H L, duration H L]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::{byte_to_percent, decode_buttons, Model, ModelKind, Rgb, Tone, ACCEL_SCALE};
use crate::error::EncodingError;
use crate::protocol::frame::RawFrame;
use crate::protocol::math::{clamp_i32, heading, rotate_mount, RotationSense};
use crate::protocol::reading::{HummingbirdChannels, ModelChannels, SensorReading, Vector3};

/// Sensor frame length
pub const SENSOR_FRAME_LEN: usize = 14;

/// Combined output frame opcode
pub const OP_SET_ALL: u8 = 0xCA;

/// Stop-all opcode
pub const OP_STOP_ALL: u8 = 0xCB;

/// Display opcode
pub const OP_DISPLAY: u8 = 0xCC;

/// Combined output frame length
pub const SET_ALL_LEN: usize = 19;

/// Number of single-color LED ports
pub const LED_PORTS: u8 = 3;

/// Number of tri-color LED ports
pub const TRI_LED_PORTS: u8 = 2;

/// Number of servo ports
pub const SERVO_PORTS: u8 = 4;

/// Number of sensor ports
pub const SENSOR_PORTS: u8 = 3;

/// Servo wire value meaning "no signal"
pub const SERVO_OFF: u8 = 255;

/// Largest position servo wire value (180°)
pub const SERVO_POSITION_MAX: u8 = 254;

/// Rotation servo speeds below this magnitude switch the servo off
pub const ROTATION_DEADBAND: i32 = 10;

/// Rotation servo magnitude per percent of speed
pub const ROTATION_SLOPE: f64 = 1.1;

/// Rotation servo magnitude at zero speed
pub const ROTATION_INTERCEPT: f64 = 10.0;

/// Battery volts per count
pub const BATTERY_SCALE: f64 = 0.0406;

/// Rotation sense for the accelerometer
pub const ACCEL_ROTATION: RotationSense = RotationSense::Positive;

/// Rotation sense for the magnetometer
pub const MAG_ROTATION: RotationSense = RotationSense::Negative;

mod offset {
    pub const PORTS: usize = 0;
    pub const BATTERY: usize = 3;
    pub const ACCEL: usize = 4;
    pub const BUTTONS: usize = 7;
    pub const MAG: usize = 8;
}

/// Hummingbird model marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hummingbird;

/// Hummingbird output memory (wire values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HummingbirdOutputs {
    pub leds: [u8; 3],
    pub tri_leds: [Rgb; 2],
    pub servos: [u8; 4],
}

impl Default for HummingbirdOutputs {
    fn default() -> Self {
        Self {
            leds: [0; 3],
            tri_leds: [Rgb::default(); 2],
            servos: [SERVO_OFF; 4],
        }
    }
}

/// Accessory sensor plugged into a port, selecting its conversion curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSensor {
    /// Light level, 0-100
    Light,
    /// Distance in centimeters
    Distance,
    /// Rotary dial, 0-100
    Dial,
    /// Sound level, 0-200
    Sound,
    /// Port voltage, 0-3.3 V
    Voltage,
}

impl PortSensor {
    /// Convert a raw port byte
    pub fn convert(self, raw: u8) -> f64 {
        let raw = raw as f64;
        match self {
            PortSensor::Light => (raw * 100.0 / 255.0).round(),
            PortSensor::Distance => (raw * 117.0 / 100.0).round(),
            PortSensor::Dial => (raw * 100.0 / 230.0).round().min(100.0),
            PortSensor::Sound => (raw * 200.0 / 255.0).round(),
            PortSensor::Voltage => raw * 3.3 / 255.0,
        }
    }
}

impl HummingbirdChannels {
    /// Reading of a sensor port for a specific accessory
    ///
    /// # Errors
    ///
    /// Returns `EncodingError::InvalidPort` for ports outside 1-3.
    pub fn port(&self, port: u8, sensor: PortSensor) -> Result<f64, EncodingError> {
        let index = super::check_port("sensor", port, SENSOR_PORTS)?;
        Ok(sensor.convert(self.ports_raw[index]))
    }
}

/// Position servo angle (0-180°, clamped) to its wire value
pub fn angle_to_wire(angle: i32) -> u8 {
    let angle = clamp_i32(angle, 0, 180);
    (angle as f64 * SERVO_POSITION_MAX as f64 / 180.0).round() as u8
}

/// Rotation servo speed (-100..100, clamped) to its wire value
///
/// Speeds inside the deadband switch the servo off. Otherwise the
/// magnitude follows `round(|speed| × 1.1 + 10)` with bit 7 set for
/// positive speeds.
pub fn rotation_to_wire(speed: i32) -> u8 {
    let speed = clamp_i32(speed, -100, 100);
    if speed.abs() < ROTATION_DEADBAND {
        return SERVO_OFF;
    }
    let magnitude = (speed.unsigned_abs() as f64 * ROTATION_SLOPE + ROTATION_INTERCEPT).round() as u8;
    if speed > 0 {
        magnitude | 0x80
    } else {
        magnitude
    }
}

impl Model for Hummingbird {
    type Outputs = HummingbirdOutputs;

    const KIND: ModelKind = ModelKind::Hummingbird;
    const SENSOR_FRAME_LEN: usize = SENSOR_FRAME_LEN;
    const STOP_ALL: u8 = OP_STOP_ALL;
    const DISPLAY: u8 = OP_DISPLAY;

    fn decode(frame: &RawFrame<Self>) -> SensorReading {
        let b = frame.bytes();

        let mut ports_raw = [0u8; 3];
        ports_raw.copy_from_slice(&b[offset::PORTS..offset::PORTS + 3]);

        let accel_raw = Vector3::new(
            b[offset::ACCEL] as i8 as f64,
            b[offset::ACCEL + 1] as i8 as f64,
            b[offset::ACCEL + 2] as i8 as f64,
        );
        let acceleration = rotate_mount(accel_raw, ACCEL_ROTATION).scaled(ACCEL_SCALE);

        let axis = |at: usize| i16::from_be_bytes([b[at], b[at + 1]]) as f64;
        let mag_raw = Vector3::new(axis(offset::MAG), axis(offset::MAG + 2), axis(offset::MAG + 4));
        let magnetometer = rotate_mount(mag_raw, MAG_ROTATION);

        let buttons = decode_buttons(b[offset::BUTTONS]);

        SensorReading {
            received_at: frame.received_at(),
            stale: frame.is_stale(),
            battery_volts: b[offset::BATTERY] as f64 * BATTERY_SCALE,
            acceleration,
            magnetometer,
            heading: heading(acceleration, magnetometer),
            button_a: buttons.button_a,
            button_b: buttons.button_b,
            shaking: buttons.shaking,
            channels: ModelChannels::Hummingbird(HummingbirdChannels {
                ports_raw,
                ports: ports_raw.map(byte_to_percent),
            }),
        }
    }

    fn encode_outputs(outputs: &HummingbirdOutputs, tone: Option<Tone>) -> Bytes {
        let mut frame = BytesMut::with_capacity(SET_ALL_LEN);
        frame.put_u8(OP_SET_ALL);
        frame.put_u8(outputs.leds[0]);
        frame.put_u8(0x00);
        for led in &outputs.tri_leds {
            frame.put_slice(&led.to_array());
        }
        frame.put_slice(&outputs.servos);
        frame.put_u8(outputs.leds[1]);
        frame.put_u8(outputs.leds[2]);
        frame.put_slice(&Tone::to_wire(tone));
        frame.freeze()
    }

    fn decode_outputs(frame: &[u8]) -> Option<HummingbirdOutputs> {
        if frame.len() != SET_ALL_LEN || frame[0] != OP_SET_ALL {
            return None;
        }
        let mut servos = [0u8; 4];
        servos.copy_from_slice(&frame[9..13]);
        Some(HummingbirdOutputs {
            leds: [frame[1], frame[13], frame[14]],
            tri_leds: [
                Rgb::from([frame[3], frame[4], frame[5]]),
                Rgb::from([frame[6], frame[7], frame[8]]),
            ],
            servos,
        })
    }
}
