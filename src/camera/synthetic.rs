//! Synthetic camera session.
//!
//! Generates viewfinder frames in software so the whole pipeline runs with
//! no camera attached: a bright patch sweeps across a mid-gray scene, which
//! the motion transform renders as a moving rising/falling edge pair.
//!
//! The session has a second, scripted delivery mode used for testing: any
//! messages pushed with [`SyntheticSession::push_message`] or
//! [`SyntheticSession::push_frame`] are delivered in order (without frame
//! pacing), followed by [`CameraMessage::Quit`] once the script runs out.
//! Previewed bundles are retained in scripted mode so tests can inspect the
//! transformed pixels end to end.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::message::CameraMessage;
use super::request::{CompletedRequest, FrameBuffer};
use super::session::{CameraSession, SessionError};
use super::stream::{PixelFormat, StreamFormat, StreamId};

/// Luminance of the synthetic scene background.
const SCENE_BACKGROUND: u8 = 96;
/// Luminance of the moving patch.
const SCENE_PATCH: u8 = 224;
/// Neutral chroma byte for generated frames.
const SCENE_CHROMA: u8 = 128;

/// Configuration for a [`SyntheticSession`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout of generated frames.
    pub pixel_format: PixelFormat,
    /// Generator pacing in frames per second.
    pub framerate: u32,
    /// Reported row stride; `None` reports `width`. Setting a larger value
    /// simulates hardware row padding.
    pub stride: Option<u32>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Yuv420,
            framerate: 30,
            stride: None,
        }
    }
}

impl SyntheticConfig {
    /// Creates a configuration with the given dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Opened,
    Configured,
    Running,
    Stopped,
}

/// Camera session backed by a software frame generator.
pub struct SyntheticSession {
    config: SyntheticConfig,
    state: State,
    script: Option<VecDeque<CameraMessage>>,
    next_sequence: u64,
    starts: u32,
    stops: u32,
    preview_count: u64,
    previewed: Vec<CompletedRequest>,
    shutdown: Arc<AtomicBool>,
    spare: Vec<Vec<u8>>,
}

impl SyntheticSession {
    /// Creates a generator-mode session: frames are produced at the
    /// configured rate until the shutdown flag is raised.
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            state: State::Closed,
            script: None,
            next_sequence: 0,
            starts: 0,
            stops: 0,
            preview_count: 0,
            previewed: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            spare: Vec::new(),
        }
    }

    /// Creates a scripted session with an initially empty script.
    ///
    /// A scripted session delivers pushed messages without pacing and
    /// answers [`CameraMessage::Quit`] once the script is drained.
    pub fn scripted(config: SyntheticConfig) -> Self {
        let mut session = Self::new(config);
        session.script = Some(VecDeque::new());
        session
    }

    /// Queues a message for delivery; switches the session to scripted mode.
    pub fn push_message(&mut self, message: CameraMessage) {
        self.script
            .get_or_insert_with(VecDeque::new)
            .push_back(message);
    }

    /// Queues a `RequestComplete` carrying the given main-stream bytes.
    pub fn push_frame(&mut self, bytes: Vec<u8>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let request = CompletedRequest::new(sequence)
            .with_buffer(StreamId::new(0), FrameBuffer::new(bytes));
        self.push_message(CameraMessage::RequestComplete(request));
    }

    /// Flag observed by [`wait`](CameraSession::wait); raising it makes the
    /// next wait return [`CameraMessage::Quit`]. Shared with signal handlers.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Number of times `start` has been called.
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Number of times `stop` has been called.
    pub fn stops(&self) -> u32 {
        self.stops
    }

    /// Total bundles handed to the preview sink.
    pub fn preview_count(&self) -> u64 {
        self.preview_count
    }

    /// Bundles handed to the preview sink, in order (scripted mode only;
    /// the generator recycles previewed buffers instead of retaining them).
    pub fn previewed(&self) -> &[CompletedRequest] {
        &self.previewed
    }

    fn format(&self) -> StreamFormat {
        StreamFormat {
            width: self.config.width,
            height: self.config.height,
            stride: self.config.stride.unwrap_or(self.config.width),
            pixel_format: self.config.pixel_format,
        }
    }

    /// Renders the next scene frame: mid-gray background, a bright square
    /// patch stepping rightward each frame (wrapping at the edge).
    fn generate_frame(&mut self) -> CompletedRequest {
        let format = self.format();
        let frame_len = format.frame_len();
        let luma_len = format.luminance_len();

        let mut data = self.spare.pop().unwrap_or_default();
        data.clear();
        data.resize(frame_len, 0);

        let (luma, chroma) = data.split_at_mut(luma_len);
        luma.fill(SCENE_BACKGROUND);
        chroma.fill(SCENE_CHROMA);

        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let side = (height / 4).max(1).min(width);
        let step = (width / 32).max(1);
        let x0 = (self.next_sequence as usize).wrapping_mul(step) % width;
        let y0 = (height - side) / 2;
        for row in luma[y0 * width..].chunks_mut(width).take(side) {
            for dx in 0..side {
                row[(x0 + dx) % width] = SCENE_PATCH;
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        CompletedRequest::new(sequence).with_buffer(StreamId::new(0), FrameBuffer::new(data))
    }
}

impl CameraSession for SyntheticSession {
    fn open(&mut self) -> Result<(), SessionError> {
        self.state = State::Opened;
        tracing::debug!(width = self.config.width, height = self.config.height, "synthetic camera opened");
        Ok(())
    }

    fn configure_viewfinder(&mut self) -> Result<(), SessionError> {
        if self.state != State::Opened {
            return Err(SessionError::ConfigureFailed("camera not open".into()));
        }
        if self.config.width == 0 || self.config.height == 0 {
            return Err(SessionError::ConfigureFailed(
                "frame dimensions must be non-zero".into(),
            ));
        }
        self.state = State::Configured;
        Ok(())
    }

    fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            State::Configured | State::Stopped => {
                self.state = State::Running;
                self.starts += 1;
                Ok(())
            }
            _ => Err(SessionError::StartFailed("session not configured".into())),
        }
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        if self.state != State::Running {
            return Err(SessionError::StopFailed("session not running".into()));
        }
        self.state = State::Stopped;
        self.stops += 1;
        Ok(())
    }

    fn wait(&mut self) -> Result<CameraMessage, SessionError> {
        if self.state != State::Running {
            return Err(SessionError::NotStarted);
        }
        if self.shutdown.load(Ordering::Relaxed) {
            return Ok(CameraMessage::Quit);
        }
        if let Some(script) = &mut self.script {
            return Ok(script.pop_front().unwrap_or(CameraMessage::Quit));
        }

        // Simulate the sensor cadence, then deliver the next scene frame.
        let interval = 1_000_000 / u64::from(self.config.framerate.max(1));
        thread::sleep(Duration::from_micros(interval));
        Ok(CameraMessage::RequestComplete(self.generate_frame()))
    }

    fn main_stream(&self) -> StreamId {
        StreamId::new(0)
    }

    fn viewfinder_stream(&self) -> StreamId {
        StreamId::new(0)
    }

    fn stream_format(&self, stream: StreamId) -> Result<StreamFormat, SessionError> {
        if self.state == State::Closed || self.state == State::Opened {
            return Err(SessionError::NotConfigured);
        }
        if stream != StreamId::new(0) {
            return Err(SessionError::NotConfigured);
        }
        Ok(self.format())
    }

    fn show_preview(
        &mut self,
        request: CompletedRequest,
        _stream: StreamId,
    ) -> Result<(), SessionError> {
        self.preview_count += 1;
        if self.script.is_some() {
            self.previewed.push(request);
        } else {
            for (_, buffer) in request.into_buffers() {
                self.spare.push(buffer.into_inner());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SyntheticConfig {
        SyntheticConfig {
            framerate: 1000,
            ..SyntheticConfig::with_dimensions(16, 8)
        }
    }

    fn opened(mut session: SyntheticSession) -> SyntheticSession {
        session.open().unwrap();
        session.configure_viewfinder().unwrap();
        session.start().unwrap();
        session
    }

    #[test]
    fn test_lifecycle_order_enforced() {
        let mut session = SyntheticSession::new(small_config());
        assert!(matches!(
            session.configure_viewfinder(),
            Err(SessionError::ConfigureFailed(_))
        ));
        assert!(matches!(session.wait(), Err(SessionError::NotStarted)));

        session.open().unwrap();
        session.configure_viewfinder().unwrap();
        session.start().unwrap();
        assert_eq!(session.starts(), 1);
    }

    #[test]
    fn test_generator_produces_full_frames() {
        let mut session = opened(SyntheticSession::new(small_config()));
        let format = session.stream_format(session.main_stream()).unwrap();

        match session.wait().unwrap() {
            CameraMessage::RequestComplete(request) => {
                let buffer = request.buffer(session.main_stream()).unwrap();
                assert_eq!(buffer.len(), format.frame_len());
                // Patch and background both present in the luminance plane.
                let luma = &buffer.as_slice()[..format.luminance_len()];
                assert!(luma.contains(&SCENE_PATCH));
                assert!(luma.contains(&SCENE_BACKGROUND));
            }
            other => panic!("expected a frame, got {}", other),
        }
    }

    #[test]
    fn test_patch_moves_between_frames() {
        let mut session = opened(SyntheticSession::new(small_config()));
        let format = session.stream_format(session.main_stream()).unwrap();
        let luma_len = format.luminance_len();

        let first = match session.wait().unwrap() {
            CameraMessage::RequestComplete(request) => {
                request.buffer(session.main_stream()).unwrap().as_slice()[..luma_len].to_vec()
            }
            other => panic!("expected a frame, got {}", other),
        };
        let second = match session.wait().unwrap() {
            CameraMessage::RequestComplete(request) => {
                request.buffer(session.main_stream()).unwrap().as_slice()[..luma_len].to_vec()
            }
            other => panic!("expected a frame, got {}", other),
        };
        assert_ne!(first, second);
    }

    #[test]
    fn test_script_drains_then_quits() {
        let mut session = SyntheticSession::scripted(small_config());
        session.push_message(CameraMessage::Timeout);
        let mut session = opened(session);

        assert!(matches!(session.wait().unwrap(), CameraMessage::Timeout));
        assert!(matches!(session.wait().unwrap(), CameraMessage::Quit));
    }

    #[test]
    fn test_shutdown_flag_yields_quit() {
        let mut session = opened(SyntheticSession::new(small_config()));
        session.shutdown_handle().store(true, Ordering::Relaxed);
        assert!(matches!(session.wait().unwrap(), CameraMessage::Quit));
    }

    #[test]
    fn test_stop_start_counts() {
        let mut session = opened(SyntheticSession::new(small_config()));
        session.stop().unwrap();
        session.start().unwrap();
        assert_eq!(session.stops(), 1);
        assert_eq!(session.starts(), 2);
    }

    #[test]
    fn test_scripted_preview_retained() {
        let mut session = SyntheticSession::scripted(small_config());
        session.push_frame(vec![0u8; 8]);
        let mut session = opened(session);

        let request = match session.wait().unwrap() {
            CameraMessage::RequestComplete(request) => request,
            other => panic!("expected a frame, got {}", other),
        };
        session.show_preview(request, session.viewfinder_stream()).unwrap();
        assert_eq!(session.preview_count(), 1);
        assert_eq!(session.previewed().len(), 1);
    }
}
