//! Export and feedback sinks.
//!
//! Narrow collaborators for what happens after a capture: offering the
//! still as a named file, and a fire-and-forget shutter notification.

mod download;
mod feedback;

pub use download::{DirectorySink, DownloadSink, ExportError};
pub use feedback::{FeedbackError, FeedbackSink, LogFeedback};
