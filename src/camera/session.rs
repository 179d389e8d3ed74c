//! The camera session abstraction the viewfinder loop is written against.
//!
//! A session owns the whole capture side: device, stream configuration,
//! buffer lifecycle and the preview surface. The loop only ever opens it,
//! starts it, awaits messages and hands finished bundles back for preview.
//! Keeping the surface a trait lets the loop run unchanged against real
//! hardware and against the synthetic backend the tests use.

use thiserror::Error;

use super::message::CameraMessage;
use super::request::CompletedRequest;
use super::stream::{StreamFormat, StreamId};

/// Errors surfaced by camera session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure viewfinder: {0}")]
    ConfigureFailed(String),
    #[error("failed to start capture: {0}")]
    StartFailed(String),
    #[error("failed to stop capture: {0}")]
    StopFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("preview handoff failed: {0}")]
    PreviewFailed(String),
    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),
    #[error("session not configured")]
    NotConfigured,
    #[error("session not started")]
    NotStarted,
}

/// A camera session: open/configure/start/stop lifecycle, a blocking message
/// queue, stream introspection and the preview sink.
///
/// # Contract
///
/// - Lifecycle calls happen in order: `open`, `configure_viewfinder`,
///   `start`; `stop` followed by `start` restarts capture on the already
///   configured streams (the timeout-recovery path).
/// - [`wait`](CameraSession::wait) is the loop's single blocking point. It
///   returns the next [`CameraMessage`] in delivery order.
/// - Stream handles and formats are valid once `configure_viewfinder` has
///   succeeded and stay fixed for the life of the session.
/// - [`show_preview`](CameraSession::show_preview) consumes the bundle: the
///   session recycles its buffers once the renderer is done with them.
pub trait CameraSession {
    /// Acquires the camera device.
    fn open(&mut self) -> Result<(), SessionError>;

    /// Configures the device for continuous viewfinder capture.
    fn configure_viewfinder(&mut self) -> Result<(), SessionError>;

    /// Starts streaming. Also used to resume after [`stop`](CameraSession::stop).
    fn start(&mut self) -> Result<(), SessionError>;

    /// Stops streaming without tearing down the configuration.
    fn stop(&mut self) -> Result<(), SessionError>;

    /// Blocks until the next message from the capture pipeline.
    fn wait(&mut self) -> Result<CameraMessage, SessionError>;

    /// Handle of the stream whose buffers the application processes.
    fn main_stream(&self) -> StreamId;

    /// Handle of the stream the preview surface renders.
    fn viewfinder_stream(&self) -> StreamId;

    /// Configuration of the given stream.
    fn stream_format(&self, stream: StreamId) -> Result<StreamFormat, SessionError>;

    /// Hands a finished bundle to the preview sink on the given stream.
    fn show_preview(
        &mut self,
        request: CompletedRequest,
        stream: StreamId,
    ) -> Result<(), SessionError>;
}
