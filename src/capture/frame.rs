//! Frame types: a decoded camera buffer and the view a capture reads from.

use image::RgbaImage;
use std::sync::Arc;
use std::time::Instant;

/// A single decoded frame from a live stream.
///
/// Pixels are RGBA8 at the stream's native resolution. A frame may be
/// zero-sized when the stream has not produced data yet.
#[derive(Clone)]
pub struct Frame {
    /// Shared so snapshots for capture do not copy the buffer.
    image: Arc<RgbaImage>,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a frame from raw RGBA8 bytes.
    ///
    /// Returns `None` if the buffer length does not match `width * height * 4`.
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(|image| Self::from_image(image, sequence))
    }

    /// Wraps an already decoded image.
    pub fn from_image(image: RgbaImage, sequence: u64) -> Self {
        Self {
            image: Arc::new(image),
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// An empty frame, as reported before the first buffer arrives.
    pub fn empty() -> Self {
        Self::from_image(RgbaImage::new(0, 0), 0)
    }

    /// Returns the decoded pixels.
    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Native width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Native height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True when the frame carries no pixels yet.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Read-only view over the live buffer at the moment of capture.
///
/// Pairs the native frame with the on-screen box it was being rendered
/// into. The two usually differ in aspect ratio.
#[derive(Debug, Clone)]
pub struct FrameSource {
    frame: Frame,
    viewport_width: u32,
    viewport_height: u32,
}

impl FrameSource {
    /// Creates a view of `frame` rendered into a `viewport_width` x `viewport_height` box.
    pub fn new(frame: Frame, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            frame,
            viewport_width,
            viewport_height,
        }
    }

    /// The underlying frame.
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Native (intrinsic) resolution.
    #[inline]
    pub fn native_size(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    /// Rendered viewport size.
    #[inline]
    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// True if any native or viewport dimension is zero.
    pub fn is_degenerate(&self) -> bool {
        self.frame.is_empty() || self.viewport_width == 0 || self.viewport_height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 64 * 48 * 4];
        let frame = Frame::from_rgba(pixels, 64, 48, 1).unwrap();

        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.sequence(), 1);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 100];
        assert!(Frame::from_rgba(pixels, 640, 480, 1).is_none());
    }

    #[test]
    fn test_source_degenerate_dimensions() {
        let frame = Frame::from_image(RgbaImage::new(4, 4), 1);
        assert!(!FrameSource::new(frame.clone(), 10, 10).is_degenerate());
        assert!(FrameSource::new(frame, 0, 10).is_degenerate());
        assert!(FrameSource::new(Frame::empty(), 10, 10).is_degenerate());
    }
}
