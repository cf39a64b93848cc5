//! Encoded capture output.

use super::geometry::{DrawRect, SourceRect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raster format a capture is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// Lossless; keeps overlay edges clean.
    #[default]
    Png,
    Jpeg,
}

impl CaptureFormat {
    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            CaptureFormat::Png => "image/png",
            CaptureFormat::Jpeg => "image/jpeg",
        }
    }

    /// File extension used for downloads.
    pub fn extension(self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpeg => "jpg",
        }
    }
}

/// How the final canvas is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    pub format: CaptureFormat,
    /// JPEG quality (1-100); ignored for PNG.
    pub jpeg_quality: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Png,
            jpeg_quality: 100,
        }
    }
}

/// An immutable encoded still produced by one compositing run.
#[derive(Clone)]
pub struct CapturedImage {
    bytes: Arc<[u8]>,
    format: CaptureFormat,
    width: u32,
    height: u32,
    captured_at: DateTime<Utc>,
    digest: blake3::Hash,
}

impl CapturedImage {
    /// Wraps encoded bytes of a `width` x `height` raster.
    pub fn new(bytes: Vec<u8>, format: CaptureFormat, width: u32, height: u32) -> Self {
        let digest = blake3::hash(&bytes);
        Self {
            bytes: bytes.into(),
            format,
            width,
            height,
            captured_at: Utc::now(),
            digest,
        }
    }

    /// Encoded bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn format(&self) -> CaptureFormat {
        self.format
    }

    #[inline]
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Pixel width (always the viewport width at capture time).
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height (always the viewport height at capture time).
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// BLAKE3 digest of the encoded bytes.
    #[inline]
    pub fn digest(&self) -> blake3::Hash {
        self.digest
    }

    /// File name for a download, e.g. `captured_image.png`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .field("digest", &self.digest.to_hex().as_str())
            .finish()
    }
}

/// Everything one `compose` call produced.
#[derive(Debug, Clone)]
pub struct CompositionResult {
    /// The encoded still.
    pub image: CapturedImage,
    /// Where the whole native frame was drawn in output space.
    pub placement: DrawRect,
    /// Region of the native frame that is visible in the output.
    pub source: SourceRect,
    /// Where the overlay was drawn, if one was active.
    pub overlay: Option<DrawRect>,
}
