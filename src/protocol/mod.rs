//! # Protocol Module
//!
//! Model-independent pieces of the robot protocol.
//!
//! This module handles:
//! - Sensor frame validation and staleness tracking
//! - Decoded sensor reading types
//! - Display (print / pattern) frame encoding
//! - Shared numeric helpers (clamping, bits, note timing, compass)

pub mod display;
pub mod frame;
pub mod math;
pub mod reading;
