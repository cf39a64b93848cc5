//! View state and its transitions.
//!
//! The screen is always in exactly one of three modes. Transitions are
//! pure: [`ViewState::apply`] returns the next state or refuses the
//! event, and never touches devices.

use crate::capture::CameraFacing;
use crate::compose::{CapturedImage, OverlayDescriptor};
use std::fmt;
use thiserror::Error;

/// Buttons on the bottom action bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenAction {
    ToggleOverlayPicker,
    Capture,
    SwitchFacing,
    Cancel,
    Download,
    Retry,
}

impl fmt::Display for ScreenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScreenAction::ToggleOverlayPicker => "toggle-overlay-picker",
            ScreenAction::Capture => "capture",
            ScreenAction::SwitchFacing => "switch-facing",
            ScreenAction::Cancel => "cancel",
            ScreenAction::Download => "download",
            ScreenAction::Retry => "retry",
        };
        f.write_str(name)
    }
}

const LIVE_ACTIONS: &[ScreenAction] = &[
    ScreenAction::ToggleOverlayPicker,
    ScreenAction::Capture,
    ScreenAction::SwitchFacing,
];
const CAPTURED_ACTIONS: &[ScreenAction] = &[ScreenAction::Cancel, ScreenAction::Download];
const ERROR_ACTIONS: &[ScreenAction] = &[ScreenAction::Retry];

/// What the screen is showing.
#[derive(Debug, Clone)]
pub enum ViewMode {
    /// Live preview, optionally with an overlay and the picker open.
    Live {
        overlay: Option<OverlayDescriptor>,
        picker_open: bool,
    },
    /// A captured still replaces the preview.
    Captured { image: CapturedImage },
    /// The stream could not be acquired; only a retry leaves this mode.
    Error { message: String },
}

impl ViewMode {
    pub fn name(&self) -> &'static str {
        match self {
            ViewMode::Live { .. } => "live",
            ViewMode::Captured { .. } => "captured",
            ViewMode::Error { .. } => "error",
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// A stream for `facing` is attached.
    StreamReady(CameraFacing),
    /// Acquisition for `facing` failed with a user-facing message.
    StreamFailed { facing: CameraFacing, message: String },
    TogglePicker,
    SelectOverlay(OverlayDescriptor),
    ClearOverlay,
    Captured(CapturedImage),
    Cancelled,
}

impl ViewEvent {
    fn name(&self) -> &'static str {
        match self {
            ViewEvent::StreamReady(_) => "attach a stream",
            ViewEvent::StreamFailed { .. } => "report a stream failure",
            ViewEvent::TogglePicker => "toggle the overlay picker",
            ViewEvent::SelectOverlay(_) => "select an overlay",
            ViewEvent::ClearOverlay => "clear the overlay",
            ViewEvent::Captured(_) => "show a capture",
            ViewEvent::Cancelled => "cancel",
        }
    }
}

/// An event that is not valid in the current mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {event} while {mode}")]
pub struct InvalidTransition {
    pub event: &'static str,
    pub mode: &'static str,
}

/// The complete view state.
#[derive(Debug, Clone)]
pub struct ViewState {
    mode: ViewMode,
    facing: CameraFacing,
}

impl ViewState {
    /// Live with no overlay, before any stream is attached.
    pub fn new(facing: CameraFacing) -> Self {
        Self {
            mode: ViewMode::Live {
                overlay: None,
                picker_open: false,
            },
            facing,
        }
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    pub fn is_live(&self) -> bool {
        matches!(self.mode, ViewMode::Live { .. })
    }

    /// Active overlay, only ever set while live.
    pub fn overlay(&self) -> Option<&OverlayDescriptor> {
        match &self.mode {
            ViewMode::Live { overlay, .. } => overlay.as_ref(),
            _ => None,
        }
    }

    pub fn picker_open(&self) -> bool {
        matches!(
            self.mode,
            ViewMode::Live {
                picker_open: true,
                ..
            }
        )
    }

    pub fn captured_image(&self) -> Option<&CapturedImage> {
        match &self.mode {
            ViewMode::Captured { image } => Some(image),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.mode {
            ViewMode::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Actions on the bottom bar for the current mode.
    pub fn available_actions(&self) -> &'static [ScreenAction] {
        match self.mode {
            ViewMode::Live { .. } => LIVE_ACTIONS,
            ViewMode::Captured { .. } => CAPTURED_ACTIONS,
            ViewMode::Error { .. } => ERROR_ACTIONS,
        }
    }

    pub fn allows(&self, action: ScreenAction) -> bool {
        self.available_actions().contains(&action)
    }

    /// Computes the state after `event`.
    pub fn apply(&self, event: ViewEvent) -> Result<ViewState, InvalidTransition> {
        let invalid = |event: &ViewEvent| InvalidTransition {
            event: event.name(),
            mode: self.mode.name(),
        };

        let mode = match (&self.mode, event) {
            (_, ViewEvent::StreamFailed { facing, message }) => {
                return Ok(ViewState {
                    mode: ViewMode::Error { message },
                    facing,
                });
            }

            (ViewMode::Error { .. }, ViewEvent::StreamReady(facing)) => {
                return Ok(ViewState::new(facing));
            }
            (ViewMode::Live { overlay, picker_open }, ViewEvent::StreamReady(facing)) => {
                return Ok(ViewState {
                    mode: ViewMode::Live {
                        overlay: overlay.clone(),
                        picker_open: *picker_open,
                    },
                    facing,
                });
            }

            (ViewMode::Live { overlay, picker_open }, ViewEvent::TogglePicker) => ViewMode::Live {
                overlay: overlay.clone(),
                picker_open: !picker_open,
            },
            (ViewMode::Live { .. }, ViewEvent::SelectOverlay(descriptor)) => ViewMode::Live {
                overlay: Some(descriptor),
                picker_open: false,
            },
            (ViewMode::Live { picker_open, .. }, ViewEvent::ClearOverlay) => ViewMode::Live {
                overlay: None,
                picker_open: *picker_open,
            },
            (ViewMode::Live { .. }, ViewEvent::Captured(image)) => ViewMode::Captured { image },
            (ViewMode::Captured { .. }, ViewEvent::Cancelled) => ViewMode::Live {
                overlay: None,
                picker_open: false,
            },

            (_, event) => return Err(invalid(&event)),
        };

        Ok(ViewState {
            mode,
            facing: self.facing,
        })
    }
}
