//! Snapframe
//!
//! A camera capture screen: a live preview from a front or rear camera,
//! an optional overlay image picked from a catalog, and a shutter that
//! produces one still framed exactly as the preview showed it.
//!
//! # Architecture
//!
//! ```text
//! capture (session, surface) → compose (cover-fit, overlay, encode) → export
//!                 ↘                       ↙
//!                  screen (live / captured / error)
//! ```
//!
//! # Design Principles
//!
//! - **What you see is what you get**: the still has the viewport's size
//!   and the preview's center crop, independent of the camera resolution
//! - **One grant at a time**: a stream is always stopped before another
//!   is requested, and late results are dropped rather than applied
//! - **Failures stay local**: a failed capture leaves the preview live
//!
//! # Example
//!
//! ```no_run
//! use snapframe::{
//!     capture::{CaptureConfig, MockMedia, StreamSession},
//!     compose::{Compositor, CompositorSettings, MemoryAssetLoader},
//!     export::{DirectorySink, LogFeedback},
//!     screen::{CameraScreen, ScreenOptions},
//! };
//!
//! # async fn run() -> Result<(), snapframe::screen::ScreenError> {
//! let session = StreamSession::new(MockMedia::new(), CaptureConfig::default(), (400, 800));
//! let compositor = Compositor::new(MemoryAssetLoader::new(), CompositorSettings::default());
//! let mut screen = CameraScreen::new(
//!     session,
//!     compositor,
//!     DirectorySink::new(".", "captured_image"),
//!     LogFeedback,
//!     ScreenOptions::default(),
//! );
//!
//! screen.start().await?;
//! screen.capture().await?;
//! let path = screen.download()?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod compose;
pub mod export;
pub mod metrics;
pub mod screen;

// Re-export commonly used types at crate root
pub use capture::{CameraFacing, FileConfig, Frame, FrameSource, MediaAccess, StreamSession};
pub use compose::{CapturedImage, CompositionResult, Compositor, OverlayDescriptor};
pub use screen::{CameraScreen, ScreenAction, ViewState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
