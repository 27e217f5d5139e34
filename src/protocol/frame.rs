//! # Raw Frames and Staleness Tracking
//!
//! Validates inbound sensor notifications and keeps the most recent one.
//!
//! A frame is accepted only when its length matches the model's fixed
//! sensor frame length. The accepted frame supersedes the previous one.
//! When the transport reports a read failure, the last frame stays
//! available but is flagged as stale.
//!
//! Frames are typed by the model they were validated for, so a frame can
//! only ever reach the decoder whose layout it matches.

use bytes::Bytes;
use std::marker::PhantomData;
use std::sync::RwLock;
use std::time::Instant;
use tracing::{debug, warn};

use crate::device::Model;
use crate::error::FrameError;

/// One validated sensor frame of model `M`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame<M> {
    bytes: Bytes,
    received_at: Instant,
    stale: bool,
    _model: PhantomData<M>,
}

impl<M: Model> RawFrame<M> {
    /// Validate and stamp a sensor frame
    ///
    /// # Arguments
    ///
    /// * `bytes` - One sensor notification as received
    /// * `received_at` - Arrival time supplied by the transport
    ///
    /// # Errors
    ///
    /// Returns `FrameError::WrongLength` if `bytes` is not exactly
    /// `M::SENSOR_FRAME_LEN` bytes long.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use birdbrain_bridge::device::Hummingbird;
    /// use birdbrain_bridge::protocol::frame::RawFrame;
    /// use std::time::Instant;
    ///
    /// let frame = RawFrame::<Hummingbird>::new(vec![0u8; 14], Instant::now()).unwrap();
    /// assert_eq!(frame.bytes().len(), 14);
    /// ```
    pub fn new(bytes: impl Into<Bytes>, received_at: Instant) -> Result<Self, FrameError> {
        let bytes = bytes.into();
        if bytes.len() != M::SENSOR_FRAME_LEN {
            return Err(FrameError::WrongLength {
                expected: M::SENSOR_FRAME_LEN,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes,
            received_at,
            stale: false,
            _model: PhantomData,
        })
    }
}

impl<M> RawFrame<M> {
    /// Frame content
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Arrival time
    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Whether a read failure was reported after this frame arrived
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Holds the latest accepted frame of one device
#[derive(Debug)]
pub struct FrameTracker<M> {
    latest: RwLock<Option<RawFrame<M>>>,
}

impl<M: Model> Default for FrameTracker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> FrameTracker<M> {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
        }
    }

    /// Accept a frame stamped with the current time
    pub fn ingest(&self, bytes: impl Into<Bytes>) -> Result<RawFrame<M>, FrameError> {
        self.ingest_at(bytes, Instant::now())
    }

    /// Accept a frame stamped with a caller-supplied arrival time
    ///
    /// # Errors
    ///
    /// Returns `FrameError::WrongLength` on a length mismatch. The previously
    /// accepted frame is kept untouched in that case.
    pub fn ingest_at(&self, bytes: impl Into<Bytes>, received_at: Instant) -> Result<RawFrame<M>, FrameError> {
        let frame = match RawFrame::new(bytes, received_at) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping {} sensor frame: {}", M::KIND, e);
                return Err(e);
            }
        };

        let mut latest = self.latest.write().unwrap_or_else(|e| e.into_inner());
        *latest = Some(frame.clone());
        Ok(frame)
    }

    /// Flag the latest frame as stale
    ///
    /// Returns `true` if a frame was flagged, `false` when none exists yet.
    pub fn mark_stale(&self) -> bool {
        let mut latest = self.latest.write().unwrap_or_else(|e| e.into_inner());
        match latest.as_mut() {
            Some(frame) => {
                if !frame.stale {
                    debug!("Marking last sensor frame stale");
                }
                frame.stale = true;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the latest accepted frame
    pub fn latest(&self) -> Option<RawFrame<M>> {
        self.latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Finch, Hummingbird};

    #[test]
    fn test_raw_frame_wrong_length() {
        for len in [0usize, 13, 14, 19, 21, 64] {
            let result = RawFrame::<Finch>::new(vec![0u8; len], Instant::now());
            assert_eq!(
                result,
                Err(FrameError::WrongLength {
                    expected: 20,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_raw_frame_accepts_exact_length() {
        let now = Instant::now();
        let frame = RawFrame::<Hummingbird>::new(vec![7u8; 14], now).unwrap();
        assert_eq!(frame.bytes(), &[7u8; 14]);
        assert_eq!(frame.received_at(), now);
        assert!(!frame.is_stale());
    }

    #[test]
    fn test_tracker_empty_until_first_frame() {
        let tracker = FrameTracker::<Hummingbird>::new();
        assert!(tracker.latest().is_none());
    }

    #[test]
    fn test_mark_stale_without_frame_is_noop() {
        let tracker = FrameTracker::<Hummingbird>::new();
        assert!(!tracker.mark_stale());
        assert!(tracker.latest().is_none());
    }

    #[test]
    fn test_wrong_length_keeps_previous_frame() {
        let tracker = FrameTracker::<Hummingbird>::new();
        tracker.ingest(vec![1u8; 14]).unwrap();

        assert!(tracker.ingest(vec![2u8; 13]).is_err());

        let latest = tracker.latest().unwrap();
        assert_eq!(latest.bytes(), &[1u8; 14]);
        assert!(!latest.is_stale(), "a rejected frame alone must not mark stale");
    }

    #[test]
    fn test_mark_stale_keeps_content() {
        let tracker = FrameTracker::<Hummingbird>::new();
        tracker.ingest(vec![3u8; 14]).unwrap();

        assert!(tracker.mark_stale());

        let latest = tracker.latest().unwrap();
        assert!(latest.is_stale());
        assert_eq!(latest.bytes(), &[3u8; 14]);
    }

    #[test]
    fn test_new_frame_supersedes_stale_one() {
        let tracker = FrameTracker::<Hummingbird>::new();
        let t0 = Instant::now();
        tracker.ingest_at(vec![1u8; 14], t0).unwrap();
        tracker.mark_stale();

        let t1 = t0 + std::time::Duration::from_millis(30);
        tracker.ingest_at(vec![9u8; 14], t1).unwrap();

        let latest = tracker.latest().unwrap();
        assert!(!latest.is_stale());
        assert_eq!(latest.received_at(), t1);
        assert_eq!(latest.bytes(), &[9u8; 14]);
    }
}
