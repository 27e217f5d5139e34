//! Finch setters and motion commands

use tracing::debug;

use super::{FrameSink, Link};
use crate::device::finch::{
    encode_motors, encode_reset_encoders, ticks_for_distance, ticks_for_turn, Direction,
    FinchOutputs, TailSelect, Turn,
};
use crate::device::{Finch, Rgb};
use crate::error::Result;

impl<S: FrameSink> Link<Finch, S> {
    /// Set the beak color from 0-100 percentages
    pub fn set_beak(&self, r: i32, g: i32, b: i32) -> Result<()> {
        let color = Rgb::from_percent(r, g, b);
        self.update(|outputs| outputs.beak = color)
    }

    /// Set one tail LED (1-4) or all of them
    ///
    /// # Errors
    ///
    /// Returns `EncodingError::InvalidPort` for ports outside 1-4; nothing is
    /// sent and output memory is unchanged.
    pub fn set_tail(&self, select: TailSelect, r: i32, g: i32, b: i32) -> Result<()> {
        let indices = FinchOutputs::tail_indices(select)?;
        let color = Rgb::from_percent(r, g, b);
        self.update(|outputs| {
            for i in indices {
                outputs.tail[i] = color;
            }
        })
    }

    /// Run both wheels at a constant speed (-100..100) until told otherwise
    pub fn set_motors(&self, left: i32, right: i32) -> Result<()> {
        self.send_one_shot(encode_motors(left, 0, right, 0))
    }

    /// Run both wheels for a number of encoder ticks each
    pub fn move_position(&self, left_speed: i32, left_ticks: u32, right_speed: i32, right_ticks: u32) -> Result<()> {
        self.send_one_shot(encode_motors(left_speed, left_ticks, right_speed, right_ticks))
    }

    /// Drive straight for `distance_cm`
    ///
    /// # Arguments
    ///
    /// * `direction` - Forward or backward
    /// * `distance_cm` - Distance in centimeters; the sign is ignored
    /// * `speed` - Wheel speed 0-100; the sign is ignored
    ///
    /// A distance that rounds to zero ticks sends nothing.
    pub fn move_distance(&self, direction: Direction, distance_cm: f64, speed: i32) -> Result<()> {
        let ticks = ticks_for_distance(distance_cm, self.motion().ticks_per_cm);
        if ticks == 0 {
            debug!("{}: move of {} cm is zero ticks, skipped", self.name(), distance_cm);
            return Ok(());
        }

        let speed = match direction {
            Direction::Forward => speed.saturating_abs(),
            Direction::Backward => -speed.saturating_abs(),
        };
        self.move_position(speed, ticks, speed, ticks)
    }

    /// Spin in place by `degrees`
    pub fn turn(&self, turn: Turn, degrees: f64, speed: i32) -> Result<()> {
        let ticks = ticks_for_turn(degrees, self.motion().ticks_per_degree);
        if ticks == 0 {
            debug!("{}: turn of {}° is zero ticks, skipped", self.name(), degrees);
            return Ok(());
        }

        let speed = speed.saturating_abs();
        let (left, right) = match turn {
            Turn::Right => (speed, -speed),
            Turn::Left => (-speed, speed),
        };
        self.move_position(left, ticks, right, ticks)
    }

    /// Stop both wheels, leaving lights and display alone
    pub fn stop_wheels(&self) -> Result<()> {
        self.set_motors(0, 0)
    }

    /// Zero both wheel encoders
    pub fn reset_encoders(&self) -> Result<()> {
        self.send_one_shot(encode_reset_encoders())
    }
}
