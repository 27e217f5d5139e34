//! # Sensor Reading Types
//!
//! Decoded, physically scaled view of one raw sensor frame.

use std::time::Instant;

/// Three-axis vector in the robot body frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Create a vector from its components
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Multiply every component by `factor`
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }
}

/// Finch-only sensor channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinchChannels {
    /// Distance to the nearest obstacle in centimeters
    pub distance_cm: u16,

    /// Left light sensor (0-100)
    pub light_left: u8,

    /// Right light sensor (0-100)
    pub light_right: u8,

    /// Left line sensor (0-100)
    pub line_left: u8,

    /// Right line sensor (0-100)
    pub line_right: u8,

    /// True while a position-controlled move is still running
    pub moving: bool,

    /// Left wheel encoder in rotations
    pub encoder_left: f64,

    /// Right wheel encoder in rotations
    pub encoder_right: f64,
}

/// Hummingbird-only sensor channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HummingbirdChannels {
    /// Raw port bytes for ports 1-3
    pub ports_raw: [u8; 3],

    /// Port readings scaled to 0-100
    pub ports: [u8; 3],
}

/// Model-specific sensor channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelChannels {
    Finch(FinchChannels),
    Hummingbird(HummingbirdChannels),
}

/// Fully decoded sensor frame
///
/// Inherits the arrival time and staleness of the frame it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Arrival time of the source frame
    pub received_at: Instant,

    /// Set when the transport reported a read failure after this frame
    pub stale: bool,

    /// Battery voltage in volts
    pub battery_volts: f64,

    /// Acceleration in m/s²
    pub acceleration: Vector3,

    /// Magnetometer in device units
    pub magnetometer: Vector3,

    /// Compass heading in degrees, absent when undefined
    pub heading: Option<f64>,

    /// micro:bit button A pressed
    pub button_a: bool,

    /// micro:bit button B pressed
    pub button_b: bool,

    /// Shake gesture detected
    pub shaking: bool,

    /// Model-specific channels
    pub channels: ModelChannels,
}

impl SensorReading {
    /// Finch channels, if this reading came from a Finch
    pub fn finch(&self) -> Option<&FinchChannels> {
        match &self.channels {
            ModelChannels::Finch(c) => Some(c),
            ModelChannels::Hummingbird(_) => None,
        }
    }

    /// Hummingbird channels, if this reading came from a Hummingbird
    pub fn hummingbird(&self) -> Option<&HummingbirdChannels> {
        match &self.channels {
            ModelChannels::Hummingbird(c) => Some(c),
            ModelChannels::Finch(_) => None,
        }
    }
}

/// Button and shake state packed into the micro:bit status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub button_a: bool,
    pub button_b: bool,
    pub shaking: bool,
}
