//! # Robot Link
//!
//! One [`Link`] per physical robot. It owns the robot's output memory and
//! its latest sensor frame, and it is the only place either is touched.
//!
//! This module handles:
//! - Accepting sensor frames from the transport and flagging staleness
//! - Decoding the current reading on demand
//! - Merging setter calls into output memory and emitting the combined frame
//! - One-shot commands (stop, buzzer, display, compass calibration)
//!
//! Every outbound frame is built and sent while holding the output lock, so
//! frames leave in the same order output memory changed and a frame never
//! mixes two setters' partial state.

use bytes::Bytes;
use serde::de::Error as _;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::{Config, MotionConfig};
use crate::device::{Model, Tone, CALIBRATE_COMPASS};
use crate::error::{BridgeError, FrameError, Result, TransportError};
use crate::protocol::display::{encode_pattern, encode_print, TextFit, DISPLAY_LEDS};
use crate::protocol::frame::FrameTracker;
use crate::protocol::reading::SensorReading;

pub mod finch;
pub mod hummingbird;
pub mod sink;

pub use sink::{ChannelSink, FrameSink};

/// Transport failure together with the last known (now stale) reading
#[derive(Debug, Clone, PartialEq)]
pub struct StaleReading {
    pub error: TransportError,
    pub last: Option<SensorReading>,
}

/// Protocol endpoint for one robot
pub struct Link<M: Model, S: FrameSink> {
    name: String,
    outputs: Mutex<M::Outputs>,
    frames: FrameTracker<M>,
    sink: S,
    motion: MotionConfig,
    trace_frames: bool,
    _model: PhantomData<M>,
}

impl<M: Model, S: FrameSink> std::fmt::Debug for Link<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("name", &self.name)
            .field("model", &M::KIND)
            .finish_non_exhaustive()
    }
}

impl<M: Model, S: FrameSink> Link<M, S> {
    /// Create a link with default settings
    ///
    /// # Arguments
    ///
    /// * `name` - Device name used in log output
    /// * `sink` - Where command frames are handed to the transport
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use birdbrain_bridge::device::Hummingbird;
    /// use birdbrain_bridge::link::{ChannelSink, Link};
    ///
    /// let (sink, mut rx) = ChannelSink::channel(8);
    /// let link: Link<Hummingbird, _> = Link::new("BB-1", sink);
    ///
    /// link.set_led(1, 100)?;
    /// assert_eq!(rx.try_recv().unwrap()[1], 255);
    /// # Ok::<(), birdbrain_bridge::error::BridgeError>(())
    /// ```
    pub fn new(name: impl Into<String>, sink: S) -> Self {
        Self {
            name: name.into(),
            outputs: Mutex::new(M::Outputs::default()),
            frames: FrameTracker::new(),
            sink,
            motion: MotionConfig::default(),
            trace_frames: false,
            _model: PhantomData,
        }
    }

    /// Create a link from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if the configured model is not `M`.
    pub fn from_config(config: &Config, sink: S) -> Result<Self> {
        if config.device.model != M::KIND {
            return Err(BridgeError::Config(toml::de::Error::custom(format!(
                "configured model '{}' does not match link model '{}'",
                config.device.model,
                M::KIND
            ))));
        }

        let mut link = Self::new(config.device.name.clone(), sink);
        link.motion = config.motion.clone();
        link.trace_frames = config.protocol.trace_frames;
        info!("Created {} link '{}'", M::KIND, link.name);
        Ok(link)
    }

    /// Device name used in log output
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    /// Accept a sensor notification stamped with the current time
    pub fn on_frame(&self, bytes: impl Into<Bytes>) -> std::result::Result<(), FrameError> {
        self.on_frame_at(bytes, Instant::now())
    }

    /// Accept a sensor notification with a transport-supplied arrival time
    ///
    /// # Arguments
    ///
    /// * `bytes` - One notification exactly as the transport received it
    /// * `received_at` - Monotonic arrival time
    ///
    /// # Errors
    ///
    /// Returns `FrameError::WrongLength` if the notification is not exactly
    /// one sensor frame. The previous reading stays current.
    pub fn on_frame_at(&self, bytes: impl Into<Bytes>, received_at: Instant) -> std::result::Result<(), FrameError> {
        let frame = self.frames.ingest_at(bytes, received_at)?;
        if self.trace_frames {
            trace!("{} <- {:02X?}", self.name, frame.bytes());
        }
        Ok(())
    }

    /// Record a transport read failure
    ///
    /// Marks the last frame stale and returns it alongside the error.
    pub fn on_transport_error(&self, error: TransportError) -> StaleReading {
        if self.frames.mark_stale() {
            warn!("{}: sensor data is stale: {}", self.name, error);
        } else {
            warn!("{}: transport error before first frame: {}", self.name, error);
        }

        StaleReading {
            error,
            last: self.current_reading(),
        }
    }

    /// Decode the latest sensor frame, if one has arrived
    pub fn current_reading(&self) -> Option<SensorReading> {
        self.frames.latest().map(|frame| M::decode(&frame))
    }

    /// Turn every output off and stop all motion
    pub fn stop_all(&self) -> Result<()> {
        let mut outputs = self.lock_outputs();
        *outputs = M::Outputs::default();
        self.emit(&outputs, Bytes::copy_from_slice(&[M::STOP_ALL]))
    }

    /// Play a note on the buzzer
    ///
    /// Lights and servos keep their current values.
    ///
    /// # Arguments
    ///
    /// * `note` - MIDI note number, clamped to 32-135
    /// * `beats` - Length at 60 bpm, clamped to 0-16
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Transport` if the sink refuses the frame.
    pub fn play_note(&self, note: i32, beats: f64) -> Result<()> {
        let tone = Tone::from_note(note, beats);
        if tone.is_none() {
            debug!("{}: note {} has no representable period, buzzer left silent", self.name, note);
        }

        let outputs = self.lock_outputs();
        let frame = M::encode_outputs(&outputs, tone);
        self.emit(&outputs, frame)
    }

    /// Scroll text across the display
    ///
    /// # Returns
    ///
    /// * `TextFit` - `Complete`, or `Truncated { dropped }` when the text was
    ///   longer than 18 characters and the tail was cut off
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use birdbrain_bridge::device::Finch;
    /// use birdbrain_bridge::link::{ChannelSink, Link};
    /// use birdbrain_bridge::protocol::display::TextFit;
    ///
    /// let (sink, _rx) = ChannelSink::channel(8);
    /// let link: Link<Finch, _> = Link::new("FN-1", sink);
    /// assert_eq!(link.print("hello")?, TextFit::Complete);
    /// # Ok::<(), birdbrain_bridge::error::BridgeError>(())
    /// ```
    pub fn print(&self, text: &str) -> Result<TextFit> {
        let encoded = encode_print(M::DISPLAY, text);
        let outputs = self.lock_outputs();
        self.emit(&outputs, encoded.frame)?;
        Ok(encoded.fit)
    }

    /// Show a static 25-element on/off pattern on the display
    pub fn display_pattern(&self, pattern: &[u8]) -> Result<()> {
        let frame = encode_pattern(M::DISPLAY, pattern)?;
        let outputs = self.lock_outputs();
        self.emit(&outputs, frame)
    }

    /// Turn every display LED off
    pub fn clear_display(&self) -> Result<()> {
        self.display_pattern(&[0u8; DISPLAY_LEDS])
    }

    /// Start the micro:bit compass calibration routine
    pub fn calibrate_compass(&self) -> Result<()> {
        let outputs = self.lock_outputs();
        self.emit(&outputs, Bytes::from_static(&CALIBRATE_COMPASS))
    }

    /// Apply a change to output memory and emit the combined frame
    pub(crate) fn update(&self, change: impl FnOnce(&mut M::Outputs)) -> Result<()> {
        let mut outputs = self.lock_outputs();
        change(&mut outputs);
        let frame = M::encode_outputs(&outputs, None);
        self.emit(&outputs, frame)
    }

    /// Emit a frame that does not depend on output memory
    pub(crate) fn send_one_shot(&self, frame: Bytes) -> Result<()> {
        let outputs = self.lock_outputs();
        self.emit(&outputs, frame)
    }

    fn lock_outputs(&self) -> MutexGuard<'_, M::Outputs> {
        self.outputs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send a frame; the caller's guard proves the output lock is held
    fn emit(&self, _held: &MutexGuard<'_, M::Outputs>, frame: Bytes) -> Result<()> {
        if self.trace_frames {
            trace!("{} -> {:02X?}", self.name, &frame[..]);
        }

        let len = frame.len();
        self.sink.send(frame).map_err(|e| {
            warn!("{}: failed to send command frame: {}", self.name, e);
            BridgeError::Transport(e)
        })?;

        debug!("{}: sent command frame ({} bytes)", self.name, len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::sink::mocks::RecordingSink;
    use super::sink::MockFrameSink;
    use super::*;
    use crate::device::hummingbird::{HummingbirdOutputs, SERVO_OFF};
    use crate::device::{Finch, Hummingbird, ModelKind};
    use std::sync::Arc;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn hummingbird() -> (Link<Hummingbird, RecordingSink>, RecordingSink) {
        init_tracing();
        let sink = RecordingSink::new();
        (Link::new("test-bird", sink.clone()), sink)
    }

    #[test]
    fn test_no_reading_before_first_frame() {
        let (link, _) = hummingbird();
        assert!(link.current_reading().is_none());
    }

    #[test]
    fn test_reading_after_frame() {
        let (link, _) = hummingbird();
        let at = Instant::now();
        link.on_frame_at(vec![0x30u8; 14], at).unwrap();

        let reading = link.current_reading().unwrap();
        assert_eq!(reading.received_at, at);
        assert!(!reading.stale);
    }

    #[test]
    fn test_wrong_length_frame_keeps_reading() {
        let (link, _) = hummingbird();
        link.on_frame(vec![10u8; 14]).unwrap();

        let err = link.on_frame(vec![10u8; 20]).unwrap_err();
        assert_eq!(err, FrameError::WrongLength { expected: 14, actual: 20 });

        let reading = link.current_reading().unwrap();
        assert!(!reading.stale);
        assert_eq!(reading.hummingbird().unwrap().ports_raw, [10, 10, 10]);
    }

    #[test]
    fn test_transport_error_marks_stale() {
        let (link, _) = hummingbird();
        link.on_frame(vec![0u8; 14]).unwrap();

        let report = link.on_transport_error(TransportError::Read("timeout".to_string()));
        assert_eq!(report.error, TransportError::Read("timeout".to_string()));
        assert!(report.last.unwrap().stale);
        assert!(link.current_reading().unwrap().stale);

        link.on_frame_at(vec![0u8; 14], Instant::now() + Duration::from_millis(50))
            .unwrap();
        assert!(!link.current_reading().unwrap().stale);
    }

    #[test]
    fn test_transport_error_before_first_frame() {
        let (link, _) = hummingbird();
        let report = link.on_transport_error(TransportError::Closed);
        assert!(report.last.is_none());
    }

    #[test]
    fn test_stop_all_resets_memory() {
        let (link, sink) = hummingbird();
        link.set_led(1, 100).unwrap();
        link.set_position_servo(2, 45).unwrap();

        link.stop_all().unwrap();
        assert_eq!(&sink.last().unwrap()[..], &[0xCB]);

        // The next setter starts from defaults again
        link.set_led(3, 100).unwrap();
        let outputs = Hummingbird::decode_outputs(&sink.last().unwrap()).unwrap();
        assert_eq!(outputs.leds, [0, 0, 255]);
        assert_eq!(outputs.servos, [SERVO_OFF; 4]);
    }

    #[test]
    fn test_play_note_keeps_outputs() {
        let (link, sink) = hummingbird();
        link.set_tri_led(1, 100, 0, 0).unwrap();
        link.play_note(69, 1.0).unwrap();

        let frame = sink.last().unwrap();
        assert_eq!(&frame[15..], &[0x08, 0xE1, 0x03, 0xE8]);
        let outputs = Hummingbird::decode_outputs(&frame).unwrap();
        assert_eq!(outputs.tri_leds[0].r, 255);

        // Buzzer is never remembered
        link.set_led(1, 0).unwrap();
        assert_eq!(&sink.last().unwrap()[15..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_print_reports_truncation() {
        let (link, sink) = hummingbird();
        assert_eq!(link.print("hello").unwrap(), TextFit::Complete);
        assert_eq!(&sink.last().unwrap()[..2], &[0xCC, 0x45]);

        let fit = link.print("this text is far too long").unwrap();
        assert_eq!(fit, TextFit::Truncated { dropped: 7 });
        assert_eq!(sink.last().unwrap().len(), 20);
    }

    #[test]
    fn test_display_pattern_errors_do_not_send() {
        let (link, sink) = hummingbird();
        let err = link.display_pattern(&[0u8; 24]).unwrap_err();
        assert!(matches!(err, BridgeError::Encoding(_)));
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn test_clear_display() {
        let (link, sink) = hummingbird();
        link.clear_display().unwrap();
        assert_eq!(&sink.last().unwrap()[..], &[0xCC, 0x80, 0, 0, 0, 0]);
    }

    #[test]
    fn test_calibrate_compass() {
        let (link, sink) = hummingbird();
        link.calibrate_compass().unwrap();
        assert_eq!(&sink.last().unwrap()[..], &[0xCE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_send_failure_is_reported() {
        let mut sink = MockFrameSink::new();
        sink.expect_send()
            .times(1)
            .returning(|_| Err(TransportError::Write("disconnected".to_string())));

        let link: Link<Finch, _> = Link::new("finch", sink);
        let err = link.stop_all().unwrap_err();
        assert!(matches!(err, BridgeError::Transport(TransportError::Write(_))));
    }

    #[test]
    fn test_stalled_transport_refuses_frames() {
        let (sink, mut rx) = ChannelSink::channel(1);
        let link: Link<Hummingbird, _> = Link::new("bird", sink);

        link.set_led(1, 100).unwrap();
        let err = link.set_led(2, 100).unwrap_err();
        assert!(matches!(err, BridgeError::Transport(TransportError::Busy)));

        // Once the transport drains, the next frame still carries both changes
        rx.try_recv().unwrap();
        link.set_led(3, 100).unwrap();
        let outputs = Hummingbird::decode_outputs(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(outputs.leds, [255, 255, 255]);
    }

    #[test]
    fn test_stop_all_uses_model_opcode() {
        let mut sink = MockFrameSink::new();
        sink.expect_send()
            .withf(|frame| frame[..] == [0xDF])
            .times(1)
            .returning(|_| Ok(()));

        let link: Link<Finch, _> = Link::new("finch", sink);
        link.stop_all().unwrap();
    }

    #[test]
    fn test_from_config_model_mismatch() {
        let config = Config::for_model(ModelKind::Finch);
        let result: Result<Link<Hummingbird, _>> = Link::from_config(&config, RecordingSink::new());
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_from_config_applies_settings() {
        let mut config = Config::for_model(ModelKind::Hummingbird);
        config.device.name = "BB-1".to_string();
        config.protocol.trace_frames = true;

        let link: Link<Hummingbird, _> = Link::from_config(&config, RecordingSink::new()).unwrap();
        assert_eq!(link.name(), "BB-1");
        assert!(link.trace_frames);
    }

    #[test]
    fn test_concurrent_setters_no_lost_update() {
        let (link, sink) = hummingbird();
        let link = Arc::new(link);

        let mut handles = Vec::new();
        for port in 1..=3u8 {
            let link = Arc::clone(&link);
            handles.push(std::thread::spawn(move || link.set_led(port, 50).unwrap()));
        }
        for port in 1..=2u8 {
            let link = Arc::clone(&link);
            handles.push(std::thread::spawn(move || {
                link.set_tri_led(port, 50, 50, 50).unwrap()
            }));
        }
        for port in 1..=4u8 {
            let link = Arc::clone(&link);
            handles.push(std::thread::spawn(move || {
                link.set_position_servo(port, 90).unwrap()
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        fn changed(outputs: &HummingbirdOutputs) -> usize {
            let defaults = HummingbirdOutputs::default();
            let leds = (0..3).filter(|&i| outputs.leds[i] != defaults.leds[i]).count();
            let tri = (0..2).filter(|&i| outputs.tri_leds[i] != defaults.tri_leds[i]).count();
            let servos = (0..4).filter(|&i| outputs.servos[i] != defaults.servos[i]).count();
            leds + tri + servos
        }

        let frames = sink.frames();
        assert_eq!(frames.len(), 9);

        // Each frame carries exactly one more channel than the one before it
        for (i, frame) in frames.iter().enumerate() {
            let outputs = Hummingbird::decode_outputs(frame).unwrap();
            assert_eq!(changed(&outputs), i + 1);
        }

        let last = Hummingbird::decode_outputs(frames.last().unwrap()).unwrap();
        assert_eq!(last.leds, [128; 3]);
        assert!(last.tri_leds.iter().all(|c| c.to_array() == [128, 128, 128]));
        assert_eq!(last.servos, [127; 4]);
    }
}
