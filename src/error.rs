//! # Error Types
//!
//! Custom error types for BirdBrain Bridge using `thiserror`.
//!
//! Inbound framing problems, caller mistakes when building commands, and
//! transport failures are kept in separate enums so a consumer can tell a
//! dropped frame from a bad command from a dead link.

use thiserror::Error;

/// Inbound frame rejected by the frame validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Byte count does not match the model's fixed sensor frame length
    #[error("wrong frame length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Malformed command input supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Display pattern does not have exactly 25 elements
    #[error("display pattern must have 25 elements, got {0}")]
    PatternLength(usize),

    /// Display pattern element other than 0 or 1
    #[error("display pattern element {index} is {value}, expected 0 or 1")]
    PatternElement { index: usize, value: u8 },

    /// Port number outside the channel's valid range
    #[error("invalid {channel} port {port} (valid ports: 1-{max})")]
    InvalidPort {
        channel: &'static str,
        port: u8,
        max: u8,
    },
}

/// Failure reported by the transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Reading a sensor notification failed
    #[error("read failed: {0}")]
    Read(String),

    /// Writing a command frame failed
    #[error("write failed: {0}")]
    Write(String),

    /// The transport's outbound queue is full; the frame was dropped
    #[error("transport busy: outbound queue full")]
    Busy,

    /// The transport is no longer accepting frames
    #[error("transport closed")]
    Closed,
}

/// Main error type for BirdBrain Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Inbound frame errors
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Command encoding errors
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Transport errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for BirdBrain Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
