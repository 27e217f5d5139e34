//! # BirdBrain Bridge Library
//!
//! Talk to Finch and Hummingbird robots over their micro:bit radio link.
//!
//! This library decodes the fixed-size sensor notifications the robots send
//! and encodes the command frames they accept. It keeps a per-robot output
//! memory so that each setter emits one frame carrying every light, servo and
//! buzzer channel at once. Scanning, pairing and the radio itself belong to
//! the caller: frames come in through [`link::Link::on_frame`] and go out
//! through a [`link::FrameSink`].

pub mod config;
pub mod device;
pub mod error;
pub mod link;
pub mod protocol;
