//! Capture compositing.
//!
//! Produces one encoded still from a live frame so that it matches the
//! preview pixel for pixel in framing: the output has the viewport's
//! size, the frame is cover-fitted and center-cropped exactly as the
//! preview showed it, and an optional overlay is drawn centered on top.
//!
//! # Overlay sizing
//!
//! The overlay is a square whose side is a fraction of the output width:
//! **0.7** on narrow viewports (width ≤ 768 by default) and **0.4** on
//! wide ones. Both are configurable through [`OverlaySizing`].

mod canvas;
mod compositor;
mod geometry;
mod output;
mod overlay;

pub use canvas::{CpuBackend, CpuCanvas, RasterBackend, RasterCanvas};
pub use compositor::{ComposeError, Compositor, CompositorSettings};
pub use geometry::{cover_fit, overlay_rect, DrawRect, PixelRect, SourceRect, ViewportClass};
pub use output::{CaptureFormat, CapturedImage, CompositionResult, EncodeSettings};
pub use overlay::{
    decode_overlay, AssetError, AssetLoader, FsAssetLoader, MemoryAssetLoader, OverlayDescriptor,
    OverlaySizing,
};
