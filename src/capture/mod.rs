//! Camera streams and the live display surface.
//!
//! This module owns everything with device side effects: requesting a
//! stream for a facing mode, attaching it to the surface the preview is
//! rendered into, and tearing it down again. At most one device grant is
//! held at any time.

mod config;
mod facing;
mod frame;
mod media;
#[cfg(feature = "camera")]
mod native;
mod session;
mod surface;

pub use config::{
    CaptureConfig, CompositorConfig, ConfigError, ExportConfig, FileConfig, MetricsConfig,
    OverlayEntry,
};
pub use facing::CameraFacing;
pub use frame::{Frame, FrameSource};
pub use media::{LiveStream, MediaAccess, MediaError, MockMedia, MockStream, StreamConstraints};
#[cfg(feature = "camera")]
pub use native::{NokhwaMedia, NokhwaStream};
pub use session::{AcquireOutcome, AcquireTicket, SessionStats, StreamSession};
pub use surface::{DisplaySurface, StreamHandle};
