//! # micro:bit Display Frames
//!
//! Both models drive the same 5×5 LED matrix, only the opcode differs.
//!
//! ```text
//! Print:   [op, 0x40 | len, c0, c1, ..., c(len-1)]      len <= 18
//! Pattern: [op, 0x80, e24, e16..e23, e8..e15, e0..e7]
//! ```
//!
//! Pattern chunks are packed with their first element in the most
//! significant bit.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use super::math::bits_to_byte;
use crate::error::EncodingError;

/// Number of LEDs in the display
pub const DISPLAY_LEDS: usize = 25;

/// Longest string the display firmware accepts in one frame
pub const PRINT_MAX_CHARS: usize = 18;

/// Sub-command flag for scrolling text
pub const DISPLAY_PRINT_FLAG: u8 = 0x40;

/// Sub-command flag for a static pattern
pub const DISPLAY_PATTERN_FLAG: u8 = 0x80;

/// Code sent for characters the display cannot render
pub const PRINT_FALLBACK: u8 = b'?';

/// Whether a print request fit in a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFit {
    /// Every character was sent
    Complete,
    /// Trailing characters were cut off
    Truncated { dropped: usize },
}

/// Encoded print request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub frame: Bytes,
    pub fit: TextFit,
}

/// Build a print-string frame
///
/// # Arguments
///
/// * `opcode` - The model's display opcode
/// * `text` - Text to scroll; only the first 18 characters are sent
///
/// # Returns
///
/// * `EncodedText` - The frame (`[opcode, 0x40 | len, codes...]`) and whether
///   the text had to be cut off
///
/// # Examples
///
/// ```no_run
/// use birdbrain_bridge::protocol::display::{encode_print, TextFit};
///
/// let encoded = encode_print(0xCC, "Hi");
/// assert_eq!(&encoded.frame[..], &[0xCC, 0x42, b'H', b'i']);
/// assert_eq!(encoded.fit, TextFit::Complete);
/// ```
pub fn encode_print(opcode: u8, text: &str) -> EncodedText {
    let total = text.chars().count();
    let codes: Vec<u8> = text
        .chars()
        .take(PRINT_MAX_CHARS)
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(PRINT_FALLBACK))
        .collect();

    let fit = if total > PRINT_MAX_CHARS {
        let dropped = total - PRINT_MAX_CHARS;
        warn!("Display text truncated to {} characters ({} dropped)", PRINT_MAX_CHARS, dropped);
        TextFit::Truncated { dropped }
    } else {
        TextFit::Complete
    };

    let mut frame = BytesMut::with_capacity(2 + codes.len());
    frame.put_u8(opcode);
    frame.put_u8(DISPLAY_PRINT_FLAG | codes.len() as u8);
    frame.put_slice(&codes);

    EncodedText {
        frame: frame.freeze(),
        fit,
    }
}

/// Pack a 25-element on/off pattern into its four wire bytes
///
/// # Errors
///
/// Returns `EncodingError::PatternLength` unless exactly 25 elements are
/// given, and `EncodingError::PatternElement` for any element other than
/// 0 or 1.
pub fn pack_pattern(pattern: &[u8]) -> Result<[u8; 4], EncodingError> {
    if pattern.len() != DISPLAY_LEDS {
        return Err(EncodingError::PatternLength(pattern.len()));
    }
    if let Some((index, &value)) = pattern.iter().enumerate().find(|(_, v)| **v > 1) {
        return Err(EncodingError::PatternElement { index, value });
    }

    let chunk = |start: usize| {
        let mut bits = [0u8; 8];
        bits.copy_from_slice(&pattern[start..start + 8]);
        bits.reverse();
        bits_to_byte(&bits)
    };

    Ok([pattern[24], chunk(16), chunk(8), chunk(0)])
}

/// Build a display-pattern frame
///
/// # Arguments
///
/// * `opcode` - The model's display opcode
/// * `pattern` - 25 elements, each 0 (off) or 1 (on), row by row
///
/// # Returns
///
/// * `Bytes` - Six-byte frame: opcode, `0x80`, then the packed pattern
///
/// # Errors
///
/// Same as [`pack_pattern`].
///
/// # Examples
///
/// ```no_run
/// use birdbrain_bridge::protocol::display::encode_pattern;
///
/// let frame = encode_pattern(0xCC, &[0u8; 25]).unwrap();
/// assert_eq!(&frame[..], &[0xCC, 0x80, 0, 0, 0, 0]);
/// ```
pub fn encode_pattern(opcode: u8, pattern: &[u8]) -> Result<Bytes, EncodingError> {
    let packed = pack_pattern(pattern)?;

    let mut frame = BytesMut::with_capacity(6);
    frame.put_u8(opcode);
    frame.put_u8(DISPLAY_PATTERN_FLAG);
    frame.put_slice(&packed);
    Ok(frame.freeze())
}
