//! # Robot Models
//!
//! The Finch and the Hummingbird share a micro:bit, so buttons, display and
//! buzzer timing work the same way on both. Frame sizes, field layouts,
//! opcodes and scaling constants differ, and each model implements
//! [`Model`] on its own.

use bytes::Bytes;
use serde::Deserialize;
use std::fmt;

use crate::protocol::frame::RawFrame;
use crate::protocol::math::{byte_to_bits, clamp_f64, clamp_i32, note_to_period};
use crate::protocol::reading::{ButtonState, SensorReading};

pub mod finch;
pub mod hummingbird;

pub use finch::Finch;
pub use hummingbird::Hummingbird;

/// Compass calibration frame (identical on both models)
pub const CALIBRATE_COMPASS: [u8; 4] = [0xCE, 0xFF, 0xFF, 0xFF];

/// Accelerometer counts to m/s²
pub const ACCEL_SCALE: f64 = 196.0 / 1280.0;

/// Longest note the buzzer accepts, in beats
pub const MAX_BEATS: f64 = 16.0;

/// Beat length at the fixed 60 bpm tempo
pub const MS_PER_BEAT: f64 = 1000.0;

/// Which robot a link talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Finch,
    Hummingbird,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Finch => write!(f, "finch"),
            ModelKind::Hummingbird => write!(f, "hummingbird"),
        }
    }
}

/// Wire-level description of one robot model
pub trait Model: Sized + Copy + fmt::Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Output memory: last commanded wire value of every persistent channel
    type Outputs: Default + Clone + PartialEq + fmt::Debug + Send;

    /// Model identifier
    const KIND: ModelKind;

    /// Fixed sensor frame length
    const SENSOR_FRAME_LEN: usize;

    /// Stop-all opcode
    const STOP_ALL: u8;

    /// Display opcode (print and pattern)
    const DISPLAY: u8;

    /// Decode a sensor frame validated for this model
    ///
    /// Never fails: the frame type guarantees the length matches the layout.
    fn decode(frame: &RawFrame<Self>) -> SensorReading;

    /// Build the combined output frame from output memory and an optional tone
    fn encode_outputs(outputs: &Self::Outputs, tone: Option<Tone>) -> Bytes;

    /// Recover output memory from a combined output frame
    ///
    /// Returns `None` if the frame is not a combined output frame of this model.
    fn decode_outputs(frame: &[u8]) -> Option<Self::Outputs>;
}

/// One buzzer note, never stored in output memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tone {
    /// Period in microseconds
    pub period_us: u16,

    /// Duration in milliseconds
    pub duration_ms: u16,
}

impl Tone {
    /// Tone for a note and a length in beats
    ///
    /// `note` is clamped to the playable range and `beats` to 0-16. Returns
    /// `None` when the note's period cannot be represented on the wire.
    pub fn from_note(note: i32, beats: f64) -> Option<Self> {
        let period_us = note_to_period(note)?;
        let beats = clamp_f64(beats, 0.0, MAX_BEATS);
        Some(Self {
            period_us,
            duration_ms: (beats * MS_PER_BEAT).round() as u16,
        })
    }

    /// Four-byte buzzer field: period hi/lo, duration hi/lo
    pub fn to_wire(tone: Option<Tone>) -> [u8; 4] {
        let tone = tone.unwrap_or_default();
        let [p_hi, p_lo] = tone.period_us.to_be_bytes();
        let [d_hi, d_lo] = tone.duration_ms.to_be_bytes();
        [p_hi, p_lo, d_hi, d_lo]
    }
}

/// Red/green/blue wire intensities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Convert 0-100 percentages (clamped) into wire values
    pub fn from_percent(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: intensity_to_wire(r),
            g: intensity_to_wire(g),
            b: intensity_to_wire(b),
        }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Light intensity 0-100 (clamped) to 0-255
pub fn intensity_to_wire(percent: i32) -> u8 {
    let percent = clamp_i32(percent, 0, 100);
    (percent as f64 * 255.0 / 100.0).round() as u8
}

/// Raw byte to a 0-100 percentage
pub fn byte_to_percent(raw: u8) -> u8 {
    (raw as f64 * 100.0 / 255.0).round() as u8
}

/// Decode the micro:bit status byte
///
/// Buttons read pressed when their bit is clear, shake when its bit is set.
pub fn decode_buttons(status: u8) -> ButtonState {
    let bits = byte_to_bits(status);
    ButtonState {
        button_a: bits[4] == 0,
        button_b: bits[5] == 0,
        shaking: bits[0] == 1,
    }
}

/// Check a 1-based port number against a channel's port count
pub(crate) fn check_port(channel: &'static str, port: u8, max: u8) -> Result<usize, crate::error::EncodingError> {
    if (1..=max).contains(&port) {
        Ok((port - 1) as usize)
    } else {
        Err(crate::error::EncodingError::InvalidPort { channel, port, max })
    }
}
