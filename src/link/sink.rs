//! Output boundary: where encoded command frames go

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::TransportError;

/// Trait for handing command frames to the transport
///
/// Fire-and-forget: an `Ok` only means the frame was accepted for
/// transmission, not that the robot acted on it.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink {
    /// Queue one complete command frame
    fn send(&self, frame: Bytes) -> Result<(), TransportError>;
}

/// Outbound queue depth used when the caller has no better figure
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Sink that forwards frames to an async transport task over a bounded channel
///
/// When the transport task stops draining, the queue fills and further frames
/// are refused with `TransportError::Busy` instead of piling up and being
/// replayed late.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Create a sink and the receiver the transport task drains
    ///
    /// # Arguments
    ///
    /// * `capacity` - Frames the queue holds before refusing more (at least 1)
    ///
    /// # Returns
    ///
    /// * `(ChannelSink, Receiver<Bytes>)` - The sink to hand to a `Link`, and
    ///   the receiving end for the transport task
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use birdbrain_bridge::link::sink::{ChannelSink, DEFAULT_QUEUE_CAPACITY};
    ///
    /// let (sink, mut rx) = ChannelSink::channel(DEFAULT_QUEUE_CAPACITY);
    /// # drop((sink, rx.try_recv()));
    /// ```
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Busy,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}
