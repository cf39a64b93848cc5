//! Native camera backend built on `nokhwa`.
//!
//! Desktop devices do not report a facing direction, so front and rear
//! are mapped to configured device indices.

use super::{
    CameraFacing, CaptureConfig, Frame, LiveStream, MediaAccess, MediaError, StreamConstraints,
};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::{Camera, NokhwaError};

/// Media access through the platform's native camera API.
#[derive(Debug, Clone)]
pub struct NokhwaMedia {
    rear_device: u32,
    front_device: u32,
    fps: u32,
}

impl NokhwaMedia {
    /// Creates a backend using the device indices from `config`.
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            rear_device: config.rear_device,
            front_device: config.front_device,
            fps: 30,
        }
    }

    fn device_for(&self, facing: CameraFacing) -> u32 {
        match facing {
            CameraFacing::Rear => self.rear_device,
            CameraFacing::Front => self.front_device,
        }
    }
}

fn map_error(e: NokhwaError) -> MediaError {
    let message = e.to_string();
    if message.to_ascii_lowercase().contains("permission") {
        MediaError::PermissionDenied
    } else {
        MediaError::DeviceUnavailable(message)
    }
}

impl MediaAccess for NokhwaMedia {
    type Stream = NokhwaStream;

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<NokhwaStream, MediaError> {
        let index = self.device_for(constraints.facing);
        let hint = CameraFormat::new(
            Resolution::new(constraints.ideal_width, constraints.ideal_height),
            FrameFormat::MJPEG,
            self.fps,
        );
        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(hint));

        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(map_error)?;
        camera.open_stream().map_err(map_error)?;

        let resolution = camera.resolution();
        tracing::info!(
            device = index,
            facing = %constraints.facing,
            width = resolution.width(),
            height = resolution.height(),
            "Native camera stream opened"
        );

        Ok(NokhwaStream {
            camera,
            facing: constraints.facing,
            sequence: 0,
            live: true,
        })
    }
}

/// A stream backed by an open `nokhwa` camera.
pub struct NokhwaStream {
    camera: Camera,
    facing: CameraFacing,
    sequence: u64,
    live: bool,
}

impl LiveStream for NokhwaStream {
    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn native_size(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    fn current_frame(&mut self) -> Result<Frame, MediaError> {
        if !self.live {
            return Err(MediaError::StreamStopped);
        }
        let buffer = self.camera.frame().map_err(map_error)?;
        let decoded = buffer.decode_image::<RgbAFormat>().map_err(map_error)?;
        let (width, height) = (decoded.width(), decoded.height());

        self.sequence += 1;
        Frame::from_rgba(decoded.into_raw(), width, height, self.sequence)
            .ok_or_else(|| MediaError::DeviceUnavailable("malformed frame buffer".to_string()))
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!(error = %e, facing = %self.facing, "Failed to stop native stream");
        } else {
            tracing::info!(facing = %self.facing, "Native camera stream stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop();
    }
}
