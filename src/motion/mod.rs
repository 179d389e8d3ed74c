//! Motion detection over the viewfinder stream.
//!
//! The transform compares each frame's luminance plane against the one
//! before it and rewrites the frame as a tri-valued motion image; the
//! store keeps the reference plane between iterations.

mod store;
mod transform;

pub use store::PreviousFrame;
pub use transform::{MotionTransform, DEFAULT_THRESHOLD, FALLING, NEUTRAL, RISING};
