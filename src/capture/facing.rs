//! Camera facing mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which physical camera a stream is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// User-facing camera.
    Front,
    /// Environment-facing camera.
    #[default]
    Rear,
}

impl CameraFacing {
    /// Returns the other facing mode.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Rear,
            CameraFacing::Rear => CameraFacing::Front,
        }
    }
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraFacing::Front => f.write_str("front"),
            CameraFacing::Rear => f.write_str("rear"),
        }
    }
}
