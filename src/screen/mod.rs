//! The camera screen.
//!
//! Ties a [`StreamSession`](crate::capture::StreamSession), a
//! [`Compositor`](crate::compose::Compositor) and the export sinks into
//! one view that is live, showing a capture, or showing an error.

mod controller;
mod state;

pub use controller::{
    CameraScreen, CaptureOutcome, CaptureTicket, ScreenError, ScreenOptions, ScreenStats,
};
pub use state::{InvalidTransition, ScreenAction, ViewEvent, ViewMode, ViewState};
