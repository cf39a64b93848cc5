//! Stream session lifecycle.
//!
//! The session is the single owner of the device grant and the display
//! surface it is attached to. Acquisition is split into a ticket and a
//! completion so an event loop can interleave other work while the
//! platform decides; completions carrying an outdated ticket are
//! stopped and ignored.

use super::{
    CameraFacing, CaptureConfig, DisplaySurface, LiveStream, MediaAccess, MediaError,
    StreamConstraints, StreamHandle,
};
use std::sync::Arc;

/// Counters describing session activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Streams successfully attached.
    pub acquisitions: u64,
    /// Streams stopped and detached.
    pub releases: u64,
    /// Failed acquisitions.
    pub failures: u64,
    /// Completions discarded because the session had moved on.
    pub stale_discarded: u64,
}

/// Outcome of completing an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The stream is now attached to the surface.
    Attached,
    /// The session moved on; the stream was stopped and dropped.
    Stale,
}

/// Token recorded when an acquisition starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireTicket {
    generation: u64,
    constraints: StreamConstraints,
}

impl AcquireTicket {
    /// Constraints to pass to [`MediaAccess::request_stream`].
    pub fn constraints(&self) -> &StreamConstraints {
        &self.constraints
    }

    /// Facing mode requested.
    pub fn facing(&self) -> CameraFacing {
        self.constraints.facing
    }

    /// Session generation at the time of the request.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the live stream and its display surface.
pub struct StreamSession<M: MediaAccess> {
    media: Arc<M>,
    config: CaptureConfig,
    surface: DisplaySurface<M::Stream>,
    facing: CameraFacing,
    generation: u64,
    last_error: Option<MediaError>,
    stats: SessionStats,
}

impl<M: MediaAccess> StreamSession<M> {
    /// Creates an idle session. Nothing is acquired until [`Self::acquire`].
    pub fn new(media: M, config: CaptureConfig, viewport: (u32, u32)) -> Self {
        Self {
            media: Arc::new(media),
            facing: config.initial_facing,
            config,
            surface: DisplaySurface::new(viewport.0, viewport.1),
            generation: 0,
            last_error: None,
            stats: SessionStats::default(),
        }
    }

    /// Shared handle to the media backend, for driving split acquisitions.
    pub fn media(&self) -> Arc<M> {
        Arc::clone(&self.media)
    }

    /// Current facing mode.
    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Current generation; bumped by every acquire or release.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The display surface.
    pub fn surface(&self) -> &DisplaySurface<M::Stream> {
        &self.surface
    }

    /// Mutable access to the display surface (resize, snapshot).
    pub fn surface_mut(&mut self) -> &mut DisplaySurface<M::Stream> {
        &mut self.surface
    }

    /// True when a stream is attached.
    pub fn is_live(&self) -> bool {
        self.surface.is_bound()
    }

    /// Error from the most recent failed acquisition, cleared on success.
    pub fn last_error(&self) -> Option<&MediaError> {
        self.last_error.as_ref()
    }

    /// Activity counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Starts an acquisition for `facing`.
    ///
    /// Any attached stream is released first, and any acquisition still
    /// pending becomes stale.
    pub fn begin_acquire(&mut self, facing: CameraFacing) -> AcquireTicket {
        self.detach();
        self.generation += 1;
        self.facing = facing;

        let ticket = AcquireTicket {
            generation: self.generation,
            constraints: StreamConstraints {
                facing,
                ideal_width: self.config.ideal_width,
                ideal_height: self.config.ideal_height,
            },
        };
        tracing::debug!(
            facing = %facing,
            generation = ticket.generation,
            "Stream acquisition started"
        );
        ticket
    }

    /// Finishes an acquisition started with [`Self::begin_acquire`].
    pub fn complete_acquire(
        &mut self,
        ticket: AcquireTicket,
        result: Result<M::Stream, MediaError>,
    ) -> Result<AcquireOutcome, MediaError> {
        if ticket.generation != self.generation {
            if let Ok(mut stream) = result {
                stream.stop();
            }
            self.stats.stale_discarded += 1;
            tracing::debug!(
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "Discarded stale stream acquisition"
            );
            return Ok(AcquireOutcome::Stale);
        }

        match result {
            Ok(stream) => {
                let (width, height) = stream.native_size();
                let handle = StreamHandle::new(stream, ticket.facing(), ticket.generation);
                if let Some(previous) = self.surface.bind(handle) {
                    previous.release();
                    self.stats.releases += 1;
                }
                self.stats.acquisitions += 1;
                self.last_error = None;
                tracing::info!(
                    facing = %ticket.facing(),
                    width,
                    height,
                    binding_key = self.surface.binding_key(),
                    "Stream attached"
                );
                Ok(AcquireOutcome::Attached)
            }
            Err(e) => {
                self.stats.failures += 1;
                self.last_error = Some(e.clone());
                tracing::warn!(facing = %ticket.facing(), error = %e, "Stream acquisition failed");
                Err(e)
            }
        }
    }

    /// Acquires a stream for `facing` and attaches it.
    pub async fn acquire(&mut self, facing: CameraFacing) -> Result<AcquireOutcome, MediaError> {
        let ticket = self.begin_acquire(facing);
        let media = Arc::clone(&self.media);
        let request = media.request_stream(ticket.constraints());

        let result = match self.config.acquire_timeout() {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => Err(MediaError::DeviceUnavailable(format!(
                    "no response within {} ms",
                    limit.as_millis()
                ))),
            },
            None => request.await,
        };

        self.complete_acquire(ticket, result)
    }

    /// Stops the attached stream and detaches the surface.
    pub fn release(&mut self) {
        self.detach();
        self.generation += 1;
    }

    /// Toggles facing and reacquires for the new mode.
    pub async fn switch_facing(&mut self) -> Result<CameraFacing, MediaError> {
        let next = self.facing.opposite();
        self.release();
        self.acquire(next).await?;
        Ok(next)
    }

    /// Full release-then-reacquire for the current facing.
    ///
    /// The surface is rebound with a new key even though the facing
    /// mode is unchanged.
    pub async fn reset(&mut self) -> Result<AcquireOutcome, MediaError> {
        let facing = self.facing;
        self.release();
        self.acquire(facing).await
    }

    fn detach(&mut self) {
        if let Some(handle) = self.surface.unbind() {
            let facing = handle.facing();
            handle.release();
            self.stats.releases += 1;
            tracing::info!(facing = %facing, "Stream released");
        }
    }
}
