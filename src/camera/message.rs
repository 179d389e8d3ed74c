//! Messages delivered by a camera session's event queue.

use std::fmt;

use super::request::CompletedRequest;

/// One message from [`CameraSession::wait`](super::CameraSession::wait).
///
/// The payload-carrying variant is `RequestComplete`; the others are plain
/// tags. The enum is non-exhaustive because camera stacks grow message kinds
/// over time. The viewfinder loop services exactly `RequestComplete`,
/// `Timeout` and `Quit` and treats anything else as a fatal wiring error.
#[non_exhaustive]
#[derive(Debug)]
pub enum CameraMessage {
    /// A capture request finished; the bundle carries its filled buffers.
    RequestComplete(CompletedRequest),
    /// The device produced no frames for the watchdog period.
    Timeout,
    /// The session is shutting down (signal handler or host teardown).
    Quit,
    /// An in-flight request was cancelled inside the pipeline.
    ///
    /// Backends in this crate drop cancelled requests silently during
    /// stop/start cycles and never emit this; a session that does deliver
    /// cancellations will make the viewfinder loop fail fast.
    RequestCancelled,
}

impl CameraMessage {
    /// Short tag name, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CameraMessage::RequestComplete(_) => "request-complete",
            CameraMessage::Timeout => "timeout",
            CameraMessage::Quit => "quit",
            CameraMessage::RequestCancelled => "request-cancelled",
        }
    }
}

impl fmt::Display for CameraMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_complete_carries_payload() {
        let msg = CameraMessage::RequestComplete(CompletedRequest::new(3));
        match msg {
            CameraMessage::RequestComplete(request) => assert_eq!(request.sequence(), 3),
            other => panic!("unexpected message: {}", other),
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(CameraMessage::Timeout.kind(), "timeout");
        assert_eq!(CameraMessage::Quit.kind(), "quit");
        assert_eq!(CameraMessage::RequestCancelled.kind(), "request-cancelled");
    }
}
