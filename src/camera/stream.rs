//! Stream handles and per-stream configuration.
//!
//! A session exposes its configured streams as opaque [`StreamId`] handles;
//! the geometry and pixel layout behind a handle come from [`StreamFormat`].

use std::fmt;

/// Opaque handle to one configured stream of a camera session.
///
/// Handles are only meaningful for the session that issued them. For a
/// viewfinder configuration the main stream and the viewfinder stream are
/// the same underlying stream and compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub(crate) usize);

impl StreamId {
    /// Creates a handle from a raw index.
    ///
    /// Intended for [`CameraSession`](super::CameraSession) implementations;
    /// application code should use the handles the session returns.
    pub fn new(index: usize) -> Self {
        Self(index)
    }
}

/// Pixel layout tag for a stream.
///
/// All supported layouts start with a packed 8-bit luminance plane of
/// exactly `width * height` bytes; they differ only in what follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar 4:2:0 YUV: luminance plane, then two quarter-size chroma planes.
    Yuv420,
    /// Semi-planar 4:2:0 YUV: luminance plane, then one interleaved UV plane.
    Nv12,
    /// Luminance only, no chroma bytes.
    Grey,
}

impl PixelFormat {
    /// Total frame size in bytes for the given dimensions.
    pub fn frame_len(&self, width: u32, height: u32) -> usize {
        let luma = (width as usize) * (height as usize);
        match self {
            // Both 4:2:0 variants carry half a plane of chroma.
            PixelFormat::Yuv420 | PixelFormat::Nv12 => luma + luma / 2,
            PixelFormat::Grey => luma,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Yuv420 => "YUV420",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Grey => "GREY",
        };
        f.write_str(name)
    }
}

/// Configuration of one stream: geometry, row stride and pixel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per luminance row; equals `width` unless the device pads rows.
    pub stride: u32,
    /// Pixel layout of the stream's buffers.
    pub pixel_format: PixelFormat,
}

impl StreamFormat {
    /// Length of the luminance plane in bytes (`width * height`).
    #[inline]
    pub fn luminance_len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total buffer length in bytes for this format.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.pixel_format.frame_len(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv420_frame_len() {
        assert_eq!(PixelFormat::Yuv420.frame_len(4, 2), 12);
        assert_eq!(PixelFormat::Yuv420.frame_len(640, 480), 460_800);
    }

    #[test]
    fn test_grey_frame_len_is_luma_only() {
        assert_eq!(PixelFormat::Grey.frame_len(640, 480), 307_200);
    }

    #[test]
    fn test_format_lengths() {
        let fmt = StreamFormat {
            width: 2,
            height: 2,
            stride: 2,
            pixel_format: PixelFormat::Yuv420,
        };
        assert_eq!(fmt.luminance_len(), 4);
        assert_eq!(fmt.frame_len(), 6);
    }
}
