//! Camera sessions and frame delivery.
//!
//! This module provides the session abstraction the viewfinder loop runs
//! against: a camera is opened, configured and started, then drained one
//! message at a time. Completed requests carry owned frame buffers, so the
//! processing stage can mutate pixels in place before the bundle is handed
//! back for display.

mod message;
mod request;
mod session;
mod stream;
mod synthetic;
#[cfg(feature = "v4l2")]
mod v4l2;

pub use message::CameraMessage;
pub use request::{BufferWriteGuard, CompletedRequest, FrameBuffer};
pub use session::{CameraSession, SessionError};
pub use stream::{PixelFormat, StreamFormat, StreamId};
pub use synthetic::{SyntheticConfig, SyntheticSession};
#[cfg(feature = "v4l2")]
pub use v4l2::{V4l2Config, V4l2Session};
