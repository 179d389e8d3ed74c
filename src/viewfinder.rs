//! Viewfinder loop.
//!
//! Drives one full camera session from open to clean exit: awaits pipeline
//! messages, recovers from device timeouts with a stop/start cycle, applies
//! the motion transform to every completed frame and hands the result to
//! the preview sink. An optional deadline bounds the total runtime.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::camera::{CameraMessage, CameraSession, SessionError};
use crate::motion::{MotionTransform, PreviousFrame};

/// Processed frames between capture-rate debug lines.
const RATE_LOG_INTERVAL: u64 = 240;

/// Errors that abort the viewfinder loop.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("unrecognised message!")]
    UnrecognisedMessage,
    #[error("stride {stride} does not match width {width}; padded rows are not supported")]
    PaddedStride { stride: u32, width: u32 },
    #[error("main-stream buffer holds {got} bytes, expected at least {need}")]
    ShortBuffer { got: usize, need: usize },
    #[error("completed request carries no main-stream buffer")]
    MissingBuffer,
    #[error("camera session: {0}")]
    Session(#[from] SessionError),
}

/// Why the loop returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The camera pipeline delivered a quit message.
    Quit,
    /// The configured runtime deadline elapsed.
    DeadlineExpired,
}

/// Outcome of a completed viewfinder session.
#[derive(Debug, Clone, Copy)]
pub struct LoopSummary {
    /// Frames transformed and previewed.
    pub frames: u64,
    /// Timeout recoveries performed.
    pub restarts: u32,
    /// What ended the session.
    pub exit: ExitReason,
}

/// Runs the viewfinder loop over `session` until quit, deadline or error.
///
/// The session is opened, configured and started, then drained one message
/// at a time. Completed requests are transformed in place and previewed;
/// timeouts trigger a stop/start restart with the previous-frame store
/// retained, so the first post-restart frame differences against the last
/// pre-restart one. The deadline is checked as each completed request
/// arrives, before it is processed. The store is allocated when the first
/// frame reveals the stream geometry and released when this returns, on
/// every path.
///
/// Stopping the camera on exit is the session's concern; both backends do
/// it when dropped.
pub fn run<S: CameraSession>(
    session: &mut S,
    deadline: Option<Duration>,
) -> Result<LoopSummary, LoopError> {
    session.open()?;
    session.configure_viewfinder()?;
    session.start()?;

    let transform = MotionTransform::new();
    let mut store = PreviousFrame::new();
    let mut frames: u64 = 0;
    let mut restarts: u32 = 0;
    let mut luminance_len = 0;
    let started = Instant::now();

    loop {
        match session.wait()? {
            CameraMessage::Timeout => {
                error!("device timeout detected, attempting a restart");
                session.stop()?;
                session.start()?;
                restarts += 1;
            }
            CameraMessage::Quit => {
                info!(frames, restarts, "quit signal received");
                return Ok(LoopSummary {
                    frames,
                    restarts,
                    exit: ExitReason::Quit,
                });
            }
            CameraMessage::RequestComplete(mut request) => {
                if let Some(deadline) = deadline {
                    if started.elapsed() > deadline {
                        info!(frames, restarts, "runtime deadline reached");
                        return Ok(LoopSummary {
                            frames,
                            restarts,
                            exit: ExitReason::DeadlineExpired,
                        });
                    }
                }

                let main = session.main_stream();
                {
                    let buffer = request.buffer_mut(main).ok_or(LoopError::MissingBuffer)?;
                    let mut span = buffer.write();

                    if frames == 0 {
                        let format = session.stream_format(main)?;
                        if format.stride != format.width {
                            return Err(LoopError::PaddedStride {
                                stride: format.stride,
                                width: format.width,
                            });
                        }
                        info!(
                            width = format.width,
                            height = format.height,
                            stride = format.stride,
                            pixel_format = %format.pixel_format,
                            "viewfinder stream configured"
                        );
                        luminance_len = format.luminance_len();
                        store.allocate(luminance_len);
                    }

                    if span.len() < luminance_len {
                        return Err(LoopError::ShortBuffer {
                            got: span.len(),
                            need: luminance_len,
                        });
                    }
                    transform.apply(&mut span, luminance_len, store.bytes_mut());
                }
                session.show_preview(request, session.viewfinder_stream())?;

                frames += 1;
                trace!(frames, "frame transformed");
                if frames % RATE_LOG_INTERVAL == 0 {
                    let elapsed = started.elapsed().as_secs_f64();
                    if elapsed > 0.0 {
                        debug!(frames, fps = frames as f64 / elapsed, "capture rate");
                    }
                }
            }
            other => {
                debug!(kind = other.kind(), "message kind not handled by the viewfinder loop");
                return Err(LoopError::UnrecognisedMessage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{SyntheticConfig, SyntheticSession};

    // 2x2 YUV420 frames: a 4-byte luminance plane plus 2 chroma bytes.
    fn config() -> SyntheticConfig {
        SyntheticConfig::with_dimensions(2, 2)
    }

    #[test]
    fn test_transforms_and_previews_in_order() {
        let mut session = SyntheticSession::scripted(config());
        session.push_frame(vec![10, 50, 100, 200, 0x77, 0x88]);
        session.push_frame(vec![10, 50, 100, 200, 0x00, 0xFF]);

        let summary = run(&mut session, None).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.restarts, 0);
        assert_eq!(summary.exit, ExitReason::Quit);

        let main = session.main_stream();
        let previewed = session.previewed();
        assert_eq!(previewed.len(), 2);
        // Frame 0 differences against the zero-filled store; frame 1 is
        // unchanged and therefore renders fully neutral.
        assert_eq!(
            previewed[0].buffer(main).unwrap().as_slice(),
            &[127, 255, 255, 255, 127, 127]
        );
        assert_eq!(previewed[1].buffer(main).unwrap().as_slice(), &[127u8; 6]);
    }

    #[test]
    fn test_timeout_restarts_once_and_keeps_store() {
        let mut session = SyntheticSession::scripted(config());
        session.push_frame(vec![10, 50, 100, 200, 0x00, 0x00]);
        session.push_message(CameraMessage::Timeout);
        session.push_frame(vec![10, 10, 141, 159, 0xAA, 0xBB]);

        let summary = run(&mut session, None).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.restarts, 1);
        assert_eq!(session.stops(), 1);
        assert_eq!(session.starts(), 2);

        // The post-restart frame differences against the pre-restart one:
        // diffs 0, -40, +41, -41 with only the last two past the threshold.
        let main = session.main_stream();
        assert_eq!(
            session.previewed()[1].buffer(main).unwrap().as_slice(),
            &[127, 127, 255, 0, 127, 127]
        );
    }

    #[test]
    fn test_quit_skips_queued_frames() {
        let mut session = SyntheticSession::scripted(config());
        session.push_message(CameraMessage::Quit);
        session.push_frame(vec![0u8; 6]);

        let summary = run(&mut session, None).unwrap();
        assert_eq!(summary.exit, ExitReason::Quit);
        assert_eq!(summary.frames, 0);
        assert_eq!(session.preview_count(), 0);
    }

    #[test]
    fn test_unknown_message_is_fatal() {
        let mut session = SyntheticSession::scripted(config());
        session.push_frame(vec![0u8; 6]);
        session.push_message(CameraMessage::RequestCancelled);

        let err = run(&mut session, None).unwrap_err();
        assert!(matches!(err, LoopError::UnrecognisedMessage));
        assert_eq!(err.to_string(), "unrecognised message!");
    }

    #[test]
    fn test_zero_deadline_processes_nothing() {
        let mut session = SyntheticSession::scripted(config());
        session.push_frame(vec![0u8; 6]);
        session.push_frame(vec![0u8; 6]);

        let summary = run(&mut session, Some(Duration::ZERO)).unwrap();
        assert_eq!(summary.exit, ExitReason::DeadlineExpired);
        assert_eq!(summary.frames, 0);
        assert_eq!(session.preview_count(), 0);
    }

    #[test]
    fn test_deadline_expires_against_generator() {
        let mut config = config();
        config.framerate = 1000;
        let mut session = SyntheticSession::new(config);

        let summary = run(&mut session, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(summary.exit, ExitReason::DeadlineExpired);
    }

    #[test]
    fn test_short_buffer_is_fatal() {
        let mut session = SyntheticSession::scripted(config());
        session.push_frame(vec![0u8; 3]);

        let err = run(&mut session, None).unwrap_err();
        assert!(matches!(err, LoopError::ShortBuffer { got: 3, need: 4 }));
    }

    #[test]
    fn test_padded_stride_is_rejected() {
        let mut config = config();
        config.stride = Some(4);
        let mut session = SyntheticSession::scripted(config);
        session.push_frame(vec![0u8; 6]);

        let err = run(&mut session, None).unwrap_err();
        assert!(matches!(err, LoopError::PaddedStride { stride: 4, width: 2 }));
    }

    #[test]
    fn test_initialization_failure_propagates() {
        let mut session = SyntheticSession::scripted(SyntheticConfig::with_dimensions(0, 2));

        let err = run(&mut session, None).unwrap_err();
        assert!(matches!(
            err,
            LoopError::Session(SessionError::ConfigureFailed(_))
        ));
    }
}
