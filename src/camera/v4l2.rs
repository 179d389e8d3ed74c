//! V4L2 camera session.
//!
//! Binds the session trait to a real `/dev/video*` device through the `v4l`
//! crate: negotiated planar YUV or grayscale formats, memory-mapped capture
//! buffers, and a blocking dequeue surfaced as loop messages. V4L2 exposes a
//! single capture stream, so the main and viewfinder stream handles are the
//! same identifier here.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::message::CameraMessage;
use super::request::{CompletedRequest, FrameBuffer};
use super::session::{CameraSession, SessionError};
use super::stream::{PixelFormat, StreamFormat, StreamId};

/// Memory-mapped buffers requested from the driver.
const BUFFER_COUNT: u32 = 4;

/// Configuration for a [`V4l2Session`].
#[derive(Debug, Clone)]
pub struct V4l2Config {
    /// Device node, e.g. `/dev/video0`.
    pub path: String,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Requested capture rate in frames per second; 0 leaves the driver
    /// default in place.
    pub framerate: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            path: "/dev/video0".into(),
            width: 640,
            height: 480,
            framerate: 30,
        }
    }
}

/// Camera session backed by a V4L2 capture device.
pub struct V4l2Session {
    config: V4l2Config,
    device: Option<Box<Device>>,
    stream: Option<MmapStream<'static>>,
    format: Option<StreamFormat>,
    shutdown: Arc<AtomicBool>,
    spare: Vec<Vec<u8>>,
    preview_count: u64,
}

impl V4l2Session {
    /// Creates a session for the configured device node. The device is not
    /// touched until [`open`](CameraSession::open).
    pub fn new(config: V4l2Config) -> Self {
        Self {
            config,
            device: None,
            stream: None,
            format: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            spare: Vec::new(),
            preview_count: 0,
        }
    }

    /// Flag observed by [`wait`](CameraSession::wait); raising it makes the
    /// next wait return [`CameraMessage::Quit`]. Shared with signal handlers.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Formats the session will negotiate, in preference order.
    fn format_candidates() -> [(FourCC, PixelFormat); 3] {
        [
            (FourCC::new(b"YU12"), PixelFormat::Yuv420),
            (FourCC::new(b"NV12"), PixelFormat::Nv12),
            (FourCC::new(b"GREY"), PixelFormat::Grey),
        ]
    }
}

impl CameraSession for V4l2Session {
    fn open(&mut self) -> Result<(), SessionError> {
        let device = Device::with_path(&self.config.path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                SessionError::DeviceNotFound(self.config.path.clone())
            } else {
                SessionError::OpenFailed(format!("{}: {}", self.config.path, err))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|err| SessionError::OpenFailed(format!("query capabilities: {}", err)))?;
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(SessionError::OpenFailed(format!(
                "{} does not support video capture",
                self.config.path
            )));
        }
        info!(card = %caps.card, driver = %caps.driver, path = %self.config.path, "opened v4l2 device");

        self.device = Some(Box::new(device));
        Ok(())
    }

    fn configure_viewfinder(&mut self) -> Result<(), SessionError> {
        let device = self
            .device
            .as_deref()
            .ok_or_else(|| SessionError::ConfigureFailed("device not open".into()))?;

        let mut requested = device
            .format()
            .map_err(|err| SessionError::ConfigureFailed(format!("read format: {}", err)))?;
        requested.width = self.config.width;
        requested.height = self.config.height;

        // Drivers are free to answer set_format with a different fourcc, so
        // walk the candidates and keep the first one the device accepts.
        let mut negotiated = None;
        for (fourcc, pixel_format) in Self::format_candidates() {
            requested.fourcc = fourcc;
            match device.set_format(&requested) {
                Ok(actual) if actual.fourcc == fourcc => {
                    negotiated = Some((actual, pixel_format));
                    break;
                }
                Ok(_) => continue,
                Err(err) => {
                    debug!(%fourcc, "format rejected: {}", err);
                }
            }
        }
        let (actual, pixel_format) = negotiated.ok_or_else(|| {
            SessionError::UnsupportedFormat(format!(
                "{} offers none of YU12, NV12, GREY",
                self.config.path
            ))
        })?;

        if self.config.framerate > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.framerate);
            if let Err(err) = device.set_params(&params) {
                warn!(fps = self.config.framerate, "failed to set frame rate: {}", err);
            }
        }

        // A zero bytesperline means the driver left it for us to infer.
        let stride = if actual.stride == 0 {
            actual.width
        } else {
            actual.stride
        };
        self.format = Some(StreamFormat {
            width: actual.width,
            height: actual.height,
            stride,
            pixel_format,
        });
        Ok(())
    }

    fn start(&mut self) -> Result<(), SessionError> {
        let device = self
            .device
            .as_deref()
            .ok_or_else(|| SessionError::StartFailed("device not open".into()))?;
        if self.format.is_none() {
            return Err(SessionError::StartFailed("viewfinder not configured".into()));
        }

        let stream = MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|err| SessionError::StartFailed(format!("map capture buffers: {}", err)))?;
        self.stream = Some(stream);
        debug!(buffers = BUFFER_COUNT, "capture stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        // Dropping the stream queues STREAMOFF and unmaps the buffers.
        match self.stream.take() {
            Some(_) => Ok(()),
            None => Err(SessionError::StopFailed("stream not started".into())),
        }
    }

    fn wait(&mut self) -> Result<CameraMessage, SessionError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Ok(CameraMessage::Quit);
        }
        let stream = self.stream.as_mut().ok_or(SessionError::NotStarted)?;

        match stream.next() {
            Ok((buf, meta)) => {
                let mut data = self.spare.pop().unwrap_or_default();
                data.clear();
                data.extend_from_slice(buf);
                let request = CompletedRequest::new(u64::from(meta.sequence))
                    .with_buffer(StreamId::new(0), FrameBuffer::new(data));
                Ok(CameraMessage::RequestComplete(request))
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                // A signal broke the dequeue; if it was our shutdown signal
                // turn it into a clean quit, otherwise retry via timeout.
                if self.shutdown.load(Ordering::Relaxed) {
                    Ok(CameraMessage::Quit)
                } else {
                    Ok(CameraMessage::Timeout)
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                Ok(CameraMessage::Timeout)
            }
            Err(err) => Err(SessionError::CaptureFailed(err.to_string())),
        }
    }

    fn main_stream(&self) -> StreamId {
        StreamId::new(0)
    }

    fn viewfinder_stream(&self) -> StreamId {
        StreamId::new(0)
    }

    fn stream_format(&self, stream: StreamId) -> Result<StreamFormat, SessionError> {
        if stream != StreamId::new(0) {
            return Err(SessionError::NotConfigured);
        }
        self.format.ok_or(SessionError::NotConfigured)
    }

    fn show_preview(
        &mut self,
        request: CompletedRequest,
        _stream: StreamId,
    ) -> Result<(), SessionError> {
        self.preview_count += 1;
        trace!(sequence = request.sequence(), "frame displayed");
        for (_, buffer) in request.into_buffers() {
            self.spare.push(buffer.into_inner());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = V4l2Config::default();
        assert_eq!(config.path, "/dev/video0");
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
    }

    #[test]
    fn test_lifecycle_requires_open_device() {
        let mut session = V4l2Session::new(V4l2Config::default());
        assert!(matches!(
            session.configure_viewfinder(),
            Err(SessionError::ConfigureFailed(_))
        ));
        assert!(matches!(
            session.start(),
            Err(SessionError::StartFailed(_))
        ));
        assert!(matches!(session.wait(), Err(SessionError::NotStarted)));
        assert!(matches!(
            session.stream_format(StreamId::new(0)),
            Err(SessionError::NotConfigured)
        ));
    }
}
