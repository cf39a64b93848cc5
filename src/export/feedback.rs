//! Shutter feedback.
//!
//! Feedback is fire-and-forget: callers log failures and carry on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback playback failed: {0}")]
    Playback(#[from] std::io::Error),
}

/// Signals a successful capture to the user.
pub trait FeedbackSink {
    fn notify_captured(&self) -> Result<(), FeedbackError>;
}

/// Records the shutter event in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn notify_captured(&self) -> Result<(), FeedbackError> {
        tracing::info!("Shutter");
        Ok(())
    }
}
