//! Prometheus metrics for the camera screen.
//!
//! Mirrors the screen's capture counters and the session's stream
//! counters into a Prometheus registry, optionally served over HTTP.
//!
//! # Metrics Exposed
//!
//! ## Capture
//! - `snapframe_captures_total` - Stills captured and shown
//! - `snapframe_capture_failures_total` - Failed capture attempts
//! - `snapframe_stale_captures_total` - Compositions discarded as stale
//! - `snapframe_downloads_total` - Captures offered for download
//! - `snapframe_last_capture_bytes` - Encoded size of the displayed capture
//! - `snapframe_overlay_active` - Whether an overlay is selected
//!
//! ## Stream
//! - `snapframe_stream_acquisitions_total` - Streams attached
//! - `snapframe_stream_releases_total` - Streams stopped
//! - `snapframe_stream_failures_total` - Failed acquisitions
//! - `snapframe_stream_live` - Whether a stream is attached
//!
//! # Example
//!
//! ```no_run
//! use snapframe::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     captures: 1,
//!     stream_acquisitions: 1,
//!     stream_live: true,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
