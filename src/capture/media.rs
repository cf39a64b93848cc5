//! Device media access.
//!
//! This module provides a trait-based abstraction over the platform's
//! camera grant, allowing for both real devices and a mock
//! implementation for tests and demos.

use super::{CameraFacing, Frame};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while acquiring or reading a device stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("stream has been stopped")]
    StreamStopped,
}

impl MediaError {
    /// Message shown in place of the live view.
    pub fn user_message(&self) -> &'static str {
        match self {
            MediaError::PermissionDenied => {
                "Camera access was denied. Allow camera access and try again."
            }
            MediaError::DeviceUnavailable(_) | MediaError::StreamStopped => {
                "No camera is available right now. Check the device and try again."
            }
        }
    }
}

/// Constraints passed with a stream request.
///
/// The ideal resolution is a hint; devices may grant something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: CameraFacing,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl StreamConstraints {
    /// Constraints for `facing` with the default 1920x1080 hint.
    pub fn new(facing: CameraFacing) -> Self {
        Self {
            facing,
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// Platform entry point for camera grants.
#[allow(async_fn_in_trait)]
pub trait MediaAccess {
    /// Stream type handed out on a successful grant.
    type Stream: LiveStream;

    /// Requests a live stream. Suspends until the platform grants or denies.
    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Self::Stream, MediaError>;
}

/// A granted device stream.
pub trait LiveStream {
    /// Facing mode the stream was granted for.
    fn facing(&self) -> CameraFacing;

    /// Native resolution actually delivered by the device.
    fn native_size(&self) -> (u32, u32);

    /// Reads the most recent frame.
    fn current_frame(&mut self) -> Result<Frame, MediaError>;

    /// Stops all device tracks. Idempotent.
    fn stop(&mut self);

    /// True until `stop` is called.
    fn is_live(&self) -> bool;
}

#[derive(Debug, Default)]
struct MockState {
    live: AtomicUsize,
    peak_live: AtomicUsize,
    requests: AtomicU64,
    deny: AtomicBool,
    unavailable: AtomicBool,
}

/// Mock device that generates synthetic gradient frames.
///
/// Clones share grant accounting, so tests can hold one copy while the
/// session owns another.
#[derive(Debug, Clone)]
pub struct MockMedia {
    state: Arc<MockState>,
    rear_size: (u32, u32),
    front_size: (u32, u32),
}

impl Default for MockMedia {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            rear_size: (640, 360),
            front_size: (480, 640),
        }
    }
}

impl MockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the resolution granted for `facing`.
    pub fn with_resolution(mut self, facing: CameraFacing, width: u32, height: u32) -> Self {
        match facing {
            CameraFacing::Rear => self.rear_size = (width, height),
            CameraFacing::Front => self.front_size = (width, height),
        }
        self
    }

    /// Makes subsequent requests fail with `PermissionDenied`.
    pub fn set_denied(&self, deny: bool) {
        self.state.deny.store(deny, Ordering::SeqCst);
    }

    /// Makes subsequent requests fail with `DeviceUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of streams currently granted and not stopped.
    pub fn live_grants(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live grants ever observed.
    pub fn peak_live_grants(&self) -> usize {
        self.state.peak_live.load(Ordering::SeqCst)
    }

    /// Total stream requests received.
    pub fn requests(&self) -> u64 {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl MediaAccess for MockMedia {
    type Stream = MockStream;

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<MockStream, MediaError> {
        self.state.requests.fetch_add(1, Ordering::SeqCst);

        if self.state.deny.load(Ordering::SeqCst) {
            return Err(MediaError::PermissionDenied);
        }
        if self.state.unavailable.load(Ordering::SeqCst) {
            return Err(MediaError::DeviceUnavailable(format!(
                "no {} camera",
                constraints.facing
            )));
        }

        let (width, height) = match constraints.facing {
            CameraFacing::Rear => self.rear_size,
            CameraFacing::Front => self.front_size,
        };

        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_live.fetch_max(live, Ordering::SeqCst);

        tracing::info!(
            facing = %constraints.facing,
            ideal_width = constraints.ideal_width,
            ideal_height = constraints.ideal_height,
            width,
            height,
            "MockMedia granted stream"
        );

        Ok(MockStream {
            state: Arc::clone(&self.state),
            facing: constraints.facing,
            width,
            height,
            sequence: 0,
            live: true,
        })
    }
}

/// Stream handed out by [`MockMedia`].
#[derive(Debug)]
pub struct MockStream {
    state: Arc<MockState>,
    facing: CameraFacing,
    width: u32,
    height: u32,
    sequence: u64,
    live: bool,
}

impl LiveStream for MockStream {
    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_frame(&mut self) -> Result<Frame, MediaError> {
        if !self.live {
            return Err(MediaError::StreamStopped);
        }

        // Deterministic gradient; the blue channel tags the facing mode.
        let (w, h) = (self.width.max(1), self.height.max(1));
        let tag = match self.facing {
            CameraFacing::Rear => 64,
            CameraFacing::Front => 192,
        };
        let image = RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, tag, 255])
        });

        self.sequence += 1;
        Ok(Frame::from_image(image, self.sequence))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.state.live.fetch_sub(1, Ordering::SeqCst);
            tracing::info!(facing = %self.facing, "MockStream stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_stream_lifecycle() {
        let media = MockMedia::new();
        let mut stream = media
            .request_stream(&StreamConstraints::new(CameraFacing::Rear))
            .await
            .unwrap();

        assert!(stream.is_live());
        assert_eq!(media.live_grants(), 1);

        let frame = stream.current_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 360));
        assert_eq!(frame.sequence(), 1);

        let frame2 = stream.current_frame().unwrap();
        assert_eq!(frame2.sequence(), 2);

        stream.stop();
        stream.stop();
        assert!(!stream.is_live());
        assert_eq!(media.live_grants(), 0);
        assert!(matches!(
            stream.current_frame(),
            Err(MediaError::StreamStopped)
        ));
    }

    #[tokio::test]
    async fn test_granted_resolution_ignores_hint() {
        let media = MockMedia::new().with_resolution(CameraFacing::Front, 720, 1280);
        let stream = media
            .request_stream(&StreamConstraints::new(CameraFacing::Front))
            .await
            .unwrap();
        assert_eq!(stream.native_size(), (720, 1280));
    }

    #[tokio::test]
    async fn test_denied_and_unavailable() {
        let media = MockMedia::new();
        media.set_denied(true);
        let err = media
            .request_stream(&StreamConstraints::new(CameraFacing::Rear))
            .await
            .unwrap_err();
        assert_eq!(err, MediaError::PermissionDenied);

        media.set_denied(false);
        media.set_unavailable(true);
        let err = media
            .request_stream(&StreamConstraints::new(CameraFacing::Rear))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::DeviceUnavailable(_)));
        assert_eq!(media.live_grants(), 0);
        assert_eq!(media.requests(), 2);
    }

    #[tokio::test]
    async fn test_drop_releases_grant() {
        let media = MockMedia::new();
        {
            let _stream = media
                .request_stream(&StreamConstraints::new(CameraFacing::Rear))
                .await
                .unwrap();
            assert_eq!(media.live_grants(), 1);
        }
        assert_eq!(media.live_grants(), 0);
    }
}
