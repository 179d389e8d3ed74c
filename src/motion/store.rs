//! Previous-frame luminance store.

/// Retained copy of the last processed frame's luminance plane.
///
/// The store starts unallocated because the plane size is only known once
/// the first frame reveals the stream geometry. It is sized exactly once,
/// holds the unmodified luminance of the most recently observed frame, and
/// survives camera restarts so the next difference is computed against the
/// last pre-restart frame. Dropping it releases the allocation.
#[derive(Debug, Default)]
pub struct PreviousFrame {
    data: Vec<u8>,
}

impl PreviousFrame {
    /// Creates an unallocated store.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Allocates the store at `len` bytes, zero-filled.
    ///
    /// Calling again with the same length is a no-op; the stream geometry
    /// is fixed for a session, so a differing length is a caller bug.
    pub fn allocate(&mut self, len: usize) {
        debug_assert!(
            self.data.is_empty() || self.data.len() == len,
            "previous-frame store resized from {} to {}",
            self.data.len(),
            len
        );
        if self.data.len() != len {
            self.data = vec![0; len];
        }
    }

    /// True once [`allocate`](Self::allocate) has run with a non-zero length.
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    /// Allocated length in bytes; 0 before allocation.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True before allocation.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored luminance bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view used by the transform to write the current frame in.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unallocated() {
        let store = PreviousFrame::new();
        assert!(!store.is_allocated());
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_allocate_zero_fills() {
        let mut store = PreviousFrame::new();
        store.allocate(16);
        assert!(store.is_allocated());
        assert_eq!(store.len(), 16);
        assert!(store.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reallocate_same_length_keeps_contents() {
        let mut store = PreviousFrame::new();
        store.allocate(4);
        store.bytes_mut().copy_from_slice(&[1, 2, 3, 4]);
        store.allocate(4);
        assert_eq!(store.bytes(), &[1, 2, 3, 4]);
    }
}
