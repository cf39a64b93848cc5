//! Stream ownership and the live display surface.

use super::{CameraFacing, Frame, FrameSource, LiveStream};

/// Exclusive ownership of one granted device stream.
///
/// Dropping a handle stops the stream, so a grant can never outlive
/// its owner.
pub struct StreamHandle<S: LiveStream> {
    stream: S,
    facing: CameraFacing,
    generation: u64,
}

impl<S: LiveStream> StreamHandle<S> {
    pub(crate) fn new(stream: S, facing: CameraFacing, generation: u64) -> Self {
        Self {
            stream,
            facing,
            generation,
        }
    }

    /// Facing mode this handle was granted for.
    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Session generation the grant belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Native resolution of the underlying stream.
    pub fn native_size(&self) -> (u32, u32) {
        self.stream.native_size()
    }

    /// True while the stream has not been stopped.
    pub fn is_live(&self) -> bool {
        self.stream.is_live()
    }

    /// Stops all tracks and consumes the handle.
    pub fn release(mut self) {
        self.stream.stop();
    }

    fn read_frame(&mut self) -> Frame {
        match self.stream.current_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, facing = %self.facing, "Frame read failed");
                Frame::empty()
            }
        }
    }
}

impl<S: LiveStream> Drop for StreamHandle<S> {
    fn drop(&mut self) {
        self.stream.stop();
    }
}

impl<S: LiveStream> std::fmt::Debug for StreamHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("facing", &self.facing)
            .field("generation", &self.generation)
            .field("native_size", &self.stream.native_size())
            .finish()
    }
}

/// The on-screen sink a stream is rendered into.
///
/// The viewport is whatever box layout gave the preview; it is
/// independent of the stream's native resolution. Every bind gets a
/// fresh binding key so renderers can tell a rebound surface from a
/// continuing one.
pub struct DisplaySurface<S: LiveStream> {
    handle: Option<StreamHandle<S>>,
    viewport_width: u32,
    viewport_height: u32,
    binding_key: u64,
}

impl<S: LiveStream> DisplaySurface<S> {
    /// Creates an unbound surface with the given viewport.
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            handle: None,
            viewport_width,
            viewport_height,
            binding_key: 0,
        }
    }

    /// Updates the rendered viewport size (window resize, rotation).
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
        tracing::debug!(width, height, "Display surface resized");
    }

    /// Current rendered viewport size.
    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// Native size of the bound stream, if any.
    pub fn native_size(&self) -> Option<(u32, u32)> {
        self.handle.as_ref().map(StreamHandle::native_size)
    }

    /// Key of the current binding; changes on every bind.
    pub fn binding_key(&self) -> u64 {
        self.binding_key
    }

    /// Returns the bound handle.
    pub fn handle(&self) -> Option<&StreamHandle<S>> {
        self.handle.as_ref()
    }

    /// True when a stream is attached.
    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Attaches `handle`, returning whatever was bound before.
    pub(crate) fn bind(&mut self, handle: StreamHandle<S>) -> Option<StreamHandle<S>> {
        self.binding_key += 1;
        self.handle.replace(handle)
    }

    /// Detaches the bound handle.
    pub(crate) fn unbind(&mut self) -> Option<StreamHandle<S>> {
        self.handle.take()
    }

    /// Snapshots the live buffer together with the viewport it is shown in.
    ///
    /// Returns `None` when nothing is bound.
    pub fn frame_source(&mut self) -> Option<FrameSource> {
        let (width, height) = self.viewport_size();
        let handle = self.handle.as_mut()?;
        Some(FrameSource::new(handle.read_frame(), width, height))
    }
}
