//! Completed capture bundles and scoped access to their pixel buffers.
//!
//! A [`CompletedRequest`] represents one finished camera request: it owns the
//! filled buffer for every stream that took part in the request. The buffers
//! are lent to the application through [`FrameBuffer::write`], which yields
//! a [`BufferWriteGuard`] whose lifetime scopes the mutable access, so the
//! borrow checker proves the buffer is released before the request is handed
//! on to the preview sink.

use std::fmt;
use std::ops::{Deref, DerefMut};

use super::stream::StreamId;

/// One filled pixel buffer belonging to a completed request.
///
/// The byte region is contiguous: a packed luminance plane first, any chroma
/// or auxiliary planes after it.
pub struct FrameBuffer {
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Wraps a filled byte region.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Total buffer length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the buffer.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Grants scoped write access to the buffer.
    ///
    /// The returned guard dereferences to the byte region; dropping it
    /// releases the access. Backends whose buffers map device memory would
    /// perform their cache synchronization when the guard is released.
    pub fn write(&mut self) -> BufferWriteGuard<'_> {
        BufferWriteGuard { data: &mut self.data }
    }

    /// Consumes the buffer and returns the backing bytes (for recycling).
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Scoped write access to a [`FrameBuffer`].
///
/// Constructed by [`FrameBuffer::write`]; access ends when the guard goes out
/// of scope.
pub struct BufferWriteGuard<'a> {
    data: &'a mut Vec<u8>,
}

impl Deref for BufferWriteGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl DerefMut for BufferWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

/// A finished camera request: sequence number plus the filled buffer for
/// every configured stream.
///
/// Requests are created by [`CameraSession`](super::CameraSession)
/// implementations, processed by the viewfinder loop, and consumed by
/// `show_preview`. Passing the bundle by value into the preview sink is what
/// forbids buffer access after the handoff.
pub struct CompletedRequest {
    sequence: u64,
    buffers: Vec<(StreamId, FrameBuffer)>,
}

impl CompletedRequest {
    /// Creates an empty bundle with the given sequence number.
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            buffers: Vec::new(),
        }
    }

    /// Attaches a filled buffer for a stream (builder style).
    pub fn with_buffer(mut self, stream: StreamId, buffer: FrameBuffer) -> Self {
        self.buffers.push((stream, buffer));
        self
    }

    /// Monotonic sequence number assigned by the session.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read-only buffer lookup by stream handle.
    pub fn buffer(&self, stream: StreamId) -> Option<&FrameBuffer> {
        self.buffers
            .iter()
            .find(|(id, _)| *id == stream)
            .map(|(_, buf)| buf)
    }

    /// Mutable buffer lookup by stream handle.
    pub fn buffer_mut(&mut self, stream: StreamId) -> Option<&mut FrameBuffer> {
        self.buffers
            .iter_mut()
            .find(|(id, _)| *id == stream)
            .map(|(_, buf)| buf)
    }

    /// Consumes the request and returns its buffers (for recycling).
    pub fn into_buffers(self) -> Vec<(StreamId, FrameBuffer)> {
        self.buffers
    }
}

impl fmt::Debug for CompletedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletedRequest")
            .field("sequence", &self.sequence)
            .field("streams", &self.buffers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_lookup_by_stream() {
        let main = StreamId::new(0);
        let other = StreamId::new(1);
        let request = CompletedRequest::new(7).with_buffer(main, FrameBuffer::new(vec![1, 2, 3]));

        assert_eq!(request.sequence(), 7);
        assert_eq!(request.buffer(main).map(FrameBuffer::len), Some(3));
        assert!(request.buffer(other).is_none());
    }

    #[test]
    fn test_write_guard_mutates_in_place() {
        let mut buffer = FrameBuffer::new(vec![0u8; 4]);
        {
            let mut guard = buffer.write();
            guard[0] = 255;
            guard[3] = 127;
        }
        assert_eq!(buffer.as_slice(), &[255, 0, 0, 127]);
    }

    #[test]
    fn test_into_buffers_returns_backing_store() {
        let main = StreamId::new(0);
        let request =
            CompletedRequest::new(0).with_buffer(main, FrameBuffer::new(vec![9u8; 8]));

        let buffers = request.into_buffers();
        assert_eq!(buffers.len(), 1);
        assert_eq!(buffers[0].1.as_slice(), &[9u8; 8]);
    }
}
