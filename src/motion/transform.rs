//! Per-pixel motion transform.
//!
//! Turns a raw frame into a tri-valued motion indicator by differencing
//! each luminance sample against the previous frame: a sharp rise renders
//! bright, a sharp fall renders dark, everything else renders neutral
//! gray. The chrominance bytes are overwritten with the neutral value so
//! the preview stays grayscale apart from the highlights.

/// Output value for a luminance rise beyond the threshold.
pub const RISING: u8 = 255;
/// Output value for a luminance fall beyond the threshold.
pub const FALLING: u8 = 0;
/// Output value for a change within the threshold, and for chroma bytes.
pub const NEUTRAL: u8 = 127;

/// Difference magnitude a pixel must strictly exceed to count as motion.
pub const DEFAULT_THRESHOLD: i16 = 40;

/// In-place motion-indicator operator.
///
/// Stateless apart from its threshold; the caller owns the previous-frame
/// bytes and passes them in on every application.
#[derive(Debug, Clone)]
pub struct MotionTransform {
    threshold: i16,
}

impl MotionTransform {
    /// Creates a transform with [`DEFAULT_THRESHOLD`].
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Creates a transform with a custom threshold.
    pub fn with_threshold(threshold: i16) -> Self {
        Self { threshold }
    }

    /// Active threshold.
    pub fn threshold(&self) -> i16 {
        self.threshold
    }

    /// Transforms `frame` in place against `previous`.
    ///
    /// The first `luminance_len` bytes of `frame` are the luminance plane;
    /// each sample is replaced with [`RISING`], [`FALLING`] or [`NEUTRAL`]
    /// according to its signed difference from the corresponding byte of
    /// `previous`. The comparison is strict, so a difference of exactly the
    /// threshold stays neutral. Before a sample is overwritten its input
    /// value is written back into `previous`, which therefore holds the
    /// unmodified current plane when this returns. Any bytes after the
    /// luminance plane are set to [`NEUTRAL`].
    ///
    /// # Panics
    ///
    /// Panics if `frame` is shorter than `luminance_len` or if `previous`
    /// is not exactly `luminance_len` bytes. The loop controller validates
    /// both before calling.
    pub fn apply(&self, frame: &mut [u8], luminance_len: usize, previous: &mut [u8]) {
        assert!(
            frame.len() >= luminance_len,
            "frame of {} bytes cannot hold a {}-byte luminance plane",
            frame.len(),
            luminance_len
        );
        assert_eq!(
            previous.len(),
            luminance_len,
            "previous-frame store length does not match the luminance plane"
        );

        let (luminance, chroma) = frame.split_at_mut(luminance_len);
        for (cur, prev) in luminance.iter_mut().zip(previous.iter_mut()) {
            let diff = i16::from(*cur) - i16::from(*prev);
            *prev = *cur;
            *cur = if diff > self.threshold {
                RISING
            } else if diff < -self.threshold {
                FALLING
            } else {
                NEUTRAL
            };
        }
        chroma.fill(NEUTRAL);
    }
}

impl Default for MotionTransform {
    fn default() -> Self {
        Self::new()
    }
}
