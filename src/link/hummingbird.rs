//! Hummingbird setters

use super::{FrameSink, Link};
use crate::device::check_port;
use crate::device::hummingbird::{
    angle_to_wire, rotation_to_wire, LED_PORTS, SERVO_PORTS, TRI_LED_PORTS,
};
use crate::device::{intensity_to_wire, Hummingbird, Rgb};
use crate::error::Result;

impl<S: FrameSink> Link<Hummingbird, S> {
    /// Set a single-color LED
    ///
    /// # Arguments
    ///
    /// * `port` - LED port, 1-3
    /// * `intensity` - Brightness 0-100 (clamped)
    ///
    /// # Errors
    ///
    /// Returns `EncodingError::InvalidPort` for other ports, with nothing sent
    /// and output memory unchanged, or `BridgeError::Transport` if the sink
    /// refuses the frame.
    pub fn set_led(&self, port: u8, intensity: i32) -> Result<()> {
        let index = check_port("led", port, LED_PORTS)?;
        let value = intensity_to_wire(intensity);
        self.update(|outputs| outputs.leds[index] = value)
    }

    /// Set a tri-color LED (port 1-2) from 0-100 percentages
    pub fn set_tri_led(&self, port: u8, r: i32, g: i32, b: i32) -> Result<()> {
        let index = check_port("tri-led", port, TRI_LED_PORTS)?;
        let color = Rgb::from_percent(r, g, b);
        self.update(|outputs| outputs.tri_leds[index] = color)
    }

    /// Move a position servo (port 1-4) to an angle in degrees (0-180)
    pub fn set_position_servo(&self, port: u8, angle: i32) -> Result<()> {
        let index = check_port("servo", port, SERVO_PORTS)?;
        let value = angle_to_wire(angle);
        self.update(|outputs| outputs.servos[index] = value)
    }

    /// Run a rotation servo (port 1-4) at a speed (-100..100)
    ///
    /// Speeds between -10 and 10 stop the servo.
    pub fn set_rotation_servo(&self, port: u8, speed: i32) -> Result<()> {
        let index = check_port("servo", port, SERVO_PORTS)?;
        let value = rotation_to_wire(speed);
        self.update(|outputs| outputs.servos[index] = value)
    }
}
