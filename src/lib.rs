//! Motionscope Library
//!
//! A live-camera motion-visualization preview. Each captured frame is
//! differenced per pixel against the previous one and rewritten in place
//! as a tri-valued indicator image: luminance that rose sharply renders
//! bright, luminance that fell sharply renders dark, everything else
//! renders neutral gray.
//!
//! # Architecture
//!
//! The viewfinder loop drains camera messages and wires the stages
//! together:
//!
//! ```text
//! camera session → motion transform → preview sink
//!        ↓               ↕
//!    messages     previous-frame store
//! ```
//!
//! Completed requests carry owned frame buffers; the transform mutates
//! the pixels through a scoped write guard, then the whole bundle is
//! handed back to the session for display. Device timeouts restart the
//! camera without touching the previous-frame store, so detection resumes
//! against the last processed frame.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use motionscope::camera::{SyntheticConfig, SyntheticSession};
//! use motionscope::viewfinder;
//!
//! let config = SyntheticConfig::with_dimensions(320, 240);
//! let mut session = SyntheticSession::new(config);
//!
//! // Run the loop for one second against the software frame generator.
//! let summary = viewfinder::run(&mut session, Some(Duration::from_secs(1))).unwrap();
//! println!("processed {} frames", summary.frames);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod motion;
pub mod options;
pub mod viewfinder;

// Re-export commonly used types at crate root
pub use camera::{CameraMessage, CameraSession, CompletedRequest, SessionError, StreamFormat};
pub use motion::{MotionTransform, PreviousFrame};
pub use options::{Options, Settings};
pub use viewfinder::{ExitReason, LoopError, LoopSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
