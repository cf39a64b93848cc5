//! The camera screen controller.

use super::state::{InvalidTransition, ScreenAction, ViewEvent, ViewState};
use crate::capture::{
    AcquireOutcome, CameraFacing, FileConfig, FrameSource, MediaAccess, MediaError, OverlayEntry,
    StreamSession,
};
use crate::compose::{
    AssetLoader, ComposeError, CompositionResult, Compositor, CpuBackend, OverlayDescriptor,
    OverlaySizing, RasterBackend, ViewportClass,
};
use crate::export::{DownloadSink, ExportError, FeedbackSink};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by screen operations.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("{action} is not available while {mode}")]
    Unavailable {
        action: ScreenAction,
        mode: &'static str,
    },
    #[error("no overlay at index {0}")]
    UnknownOverlay(usize),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Screen behaviour knobs.
#[derive(Debug, Clone)]
pub struct ScreenOptions {
    /// Viewport widths up to this are narrow.
    pub narrow_breakpoint: u32,
    /// Sizing given to overlays picked from the catalog.
    pub sizing: OverlaySizing,
    /// Overlays offered by the picker.
    pub catalog: Vec<OverlayEntry>,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            narrow_breakpoint: 768,
            sizing: OverlaySizing::default(),
            catalog: Vec::new(),
        }
    }
}

impl ScreenOptions {
    pub fn from_config(config: &FileConfig) -> Self {
        Self {
            narrow_breakpoint: config.compositor.narrow_breakpoint,
            sizing: config.compositor.sizing(),
            catalog: config.overlays.clone(),
        }
    }
}

/// Capture counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenStats {
    pub captures: u64,
    pub capture_failures: u64,
    /// Compositions finished after the screen had moved on.
    pub stale_discarded: u64,
    pub downloads: u64,
}

/// Everything a composition needs, snapshotted when the shutter is pressed.
#[derive(Debug, Clone)]
pub struct CaptureTicket {
    epoch: u64,
    frame: FrameSource,
    overlay: Option<OverlayDescriptor>,
    is_narrow: bool,
}

impl CaptureTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn frame(&self) -> &FrameSource {
        &self.frame
    }

    pub fn overlay(&self) -> Option<&OverlayDescriptor> {
        self.overlay.as_ref()
    }

    pub fn is_narrow(&self) -> bool {
        self.is_narrow
    }

    /// Runs the composition for this ticket.
    pub async fn compose<L, B>(
        &self,
        compositor: &Compositor<L, B>,
    ) -> Result<CompositionResult, ComposeError>
    where
        L: AssetLoader,
        B: RasterBackend,
    {
        compositor
            .compose(&self.frame, self.overlay.as_ref(), self.is_narrow)
            .await
    }
}

/// What happened to a finished composition.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// The still is now shown.
    Captured(CompositionResult),
    /// The screen moved on while composing; the result was dropped.
    Discarded,
}

/// Drives one camera screen: live preview, overlay picking, capture and
/// review.
///
/// Compositions are tagged with an epoch. Changing the overlay, switching
/// facing or leaving live mode bumps it, so a composition that finishes
/// afterwards is dropped instead of replacing newer state.
pub struct CameraScreen<M, L, D, F, B = CpuBackend>
where
    M: MediaAccess,
{
    session: StreamSession<M>,
    compositor: Compositor<L, B>,
    download: D,
    feedback: F,
    options: ScreenOptions,
    state: ViewState,
    epoch: u64,
    stats: ScreenStats,
}

impl<M, L, D, F, B> CameraScreen<M, L, D, F, B>
where
    M: MediaAccess,
    L: AssetLoader,
    D: DownloadSink,
    F: FeedbackSink,
    B: RasterBackend,
{
    pub fn new(
        session: StreamSession<M>,
        compositor: Compositor<L, B>,
        download: D,
        feedback: F,
        options: ScreenOptions,
    ) -> Self {
        let state = ViewState::new(session.facing());
        Self {
            session,
            compositor,
            download,
            feedback,
            options,
            state,
            epoch: 0,
            stats: ScreenStats::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn session(&self) -> &StreamSession<M> {
        &self.session
    }

    pub fn compositor(&self) -> &Compositor<L, B> {
        &self.compositor
    }

    pub fn stats(&self) -> ScreenStats {
        self.stats
    }

    /// Current capture epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn available_actions(&self) -> &'static [ScreenAction] {
        self.state.available_actions()
    }

    pub fn overlay_catalog(&self) -> &[OverlayEntry] {
        &self.options.catalog
    }

    /// Whether the current viewport counts as narrow for overlay sizing.
    pub fn is_narrow_viewport(&self) -> bool {
        let (width, _) = self.session.surface().viewport_size();
        ViewportClass::from_width(width, self.options.narrow_breakpoint).is_narrow()
    }

    /// Resizes the viewport the preview is shown in.
    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.session.surface_mut().resize(width, height);
    }

    /// Acquires the stream for the current facing mode.
    pub async fn start(&mut self) -> Result<(), ScreenError> {
        let facing = self.state.facing();
        let result = self.session.acquire(facing).await;
        self.settle_acquire(facing, result)
    }

    /// Leaves the error mode by trying the acquisition again.
    pub async fn retry(&mut self) -> Result<(), ScreenError> {
        self.require(ScreenAction::Retry)?;
        self.start().await
    }

    pub fn toggle_overlay_picker(&mut self) -> Result<(), ScreenError> {
        self.require(ScreenAction::ToggleOverlayPicker)?;
        self.transition(ViewEvent::TogglePicker)
    }

    /// Makes `descriptor` the active overlay. Reselecting the active
    /// overlay changes nothing.
    pub fn select_overlay(&mut self, descriptor: OverlayDescriptor) -> Result<(), ScreenError> {
        if self.state.overlay() == Some(&descriptor) {
            return Ok(());
        }
        self.transition(ViewEvent::SelectOverlay(descriptor))?;
        self.epoch += 1;
        tracing::debug!(
            overlay = self.state.overlay().map(OverlayDescriptor::uri),
            epoch = self.epoch,
            "Overlay selected"
        );
        Ok(())
    }

    /// Selects an overlay from the catalog by position.
    pub fn select_catalog_overlay(&mut self, index: usize) -> Result<(), ScreenError> {
        let entry = self
            .options
            .catalog
            .get(index)
            .ok_or(ScreenError::UnknownOverlay(index))?;
        let descriptor = OverlayDescriptor::new(entry.uri.clone()).with_sizing(self.options.sizing);
        self.select_overlay(descriptor)
    }

    pub fn clear_overlay(&mut self) -> Result<(), ScreenError> {
        let had_overlay = self.state.overlay().is_some();
        self.transition(ViewEvent::ClearOverlay)?;
        if had_overlay {
            self.epoch += 1;
        }
        Ok(())
    }

    /// Snapshots the live frame and overlay for a composition.
    pub fn begin_capture(&mut self) -> Result<CaptureTicket, ScreenError> {
        self.require(ScreenAction::Capture)?;

        let is_narrow = self.is_narrow_viewport();
        let surface = self.session.surface_mut();
        let (viewport_width, viewport_height) = surface.viewport_size();
        let frame = match surface.frame_source() {
            Some(frame) if !frame.is_degenerate() => frame,
            other => {
                let (native_width, native_height) =
                    other.map(|f| f.native_size()).unwrap_or((0, 0));
                self.stats.capture_failures += 1;
                let err = ComposeError::FrameNotReady {
                    native_width,
                    native_height,
                    viewport_width,
                    viewport_height,
                };
                tracing::warn!(error = %err, "Capture refused");
                return Err(err.into());
            }
        };

        Ok(CaptureTicket {
            epoch: self.epoch,
            frame,
            overlay: self.state.overlay().cloned(),
            is_narrow,
        })
    }

    /// Applies a finished composition.
    ///
    /// Results for an outdated ticket are dropped. A failed composition
    /// leaves the screen live.
    pub fn finish_capture(
        &mut self,
        ticket: CaptureTicket,
        result: Result<CompositionResult, ComposeError>,
    ) -> Result<CaptureOutcome, ScreenError> {
        if ticket.epoch != self.epoch || !self.state.is_live() {
            self.stats.stale_discarded += 1;
            tracing::debug!(
                ticket_epoch = ticket.epoch,
                current_epoch = self.epoch,
                "Discarded stale capture"
            );
            return Ok(CaptureOutcome::Discarded);
        }

        match result {
            Ok(composition) => {
                self.transition(ViewEvent::Captured(composition.image.clone()))?;
                self.epoch += 1;
                self.stats.captures += 1;
                tracing::info!(
                    width = composition.image.width(),
                    height = composition.image.height(),
                    bytes = composition.image.bytes().len(),
                    digest = %composition.image.digest().to_hex(),
                    "Captured"
                );
                if let Err(e) = self.feedback.notify_captured() {
                    tracing::warn!(error = %e, "Shutter feedback failed");
                }
                Ok(CaptureOutcome::Captured(composition))
            }
            Err(e) => {
                self.stats.capture_failures += 1;
                tracing::warn!(error = %e, "Capture failed");
                Err(e.into())
            }
        }
    }

    /// Captures in one step.
    pub async fn capture(&mut self) -> Result<CaptureOutcome, ScreenError> {
        let ticket = self.begin_capture()?;
        let compositor = self.compositor.clone();
        let result = ticket.compose(&compositor).await;
        self.finish_capture(ticket, result)
    }

    /// Discards the capture and the overlay, then fully reacquires the
    /// stream for the same facing mode.
    pub async fn cancel(&mut self) -> Result<(), ScreenError> {
        self.require(ScreenAction::Cancel)?;
        self.transition(ViewEvent::Cancelled)?;
        self.epoch += 1;

        let facing = self.state.facing();
        let result = self.session.reset().await;
        self.settle_acquire(facing, result)
    }

    /// Offers the shown capture through the download sink.
    pub fn download(&mut self) -> Result<PathBuf, ScreenError> {
        self.require(ScreenAction::Download)?;
        let image = self
            .state
            .captured_image()
            .ok_or(ExportError::NothingCaptured)?;
        let path = self.download.offer(image)?;
        self.stats.downloads += 1;
        Ok(path)
    }

    /// Toggles between rear and front cameras.
    pub async fn switch_facing(&mut self) -> Result<CameraFacing, ScreenError> {
        self.require(ScreenAction::SwitchFacing)?;
        self.epoch += 1;

        let target = self.state.facing().opposite();
        let result = self.session.switch_facing().await.map(|_| AcquireOutcome::Attached);
        self.settle_acquire(target, result)?;
        Ok(self.state.facing())
    }

    fn settle_acquire(
        &mut self,
        facing: CameraFacing,
        result: Result<AcquireOutcome, MediaError>,
    ) -> Result<(), ScreenError> {
        match result {
            Ok(AcquireOutcome::Attached) => self.transition(ViewEvent::StreamReady(facing)),
            Ok(AcquireOutcome::Stale) => Ok(()),
            Err(e) => {
                self.transition(ViewEvent::StreamFailed {
                    facing,
                    message: e.user_message().to_string(),
                })?;
                Err(e.into())
            }
        }
    }

    fn require(&self, action: ScreenAction) -> Result<(), ScreenError> {
        if self.state.allows(action) {
            Ok(())
        } else {
            Err(ScreenError::Unavailable {
                action,
                mode: self.state.mode().name(),
            })
        }
    }

    fn transition(&mut self, event: ViewEvent) -> Result<(), ScreenError> {
        self.state = self.state.apply(event)?;
        Ok(())
    }
}
