//! Metrics collection and registry.

use crate::capture::{MediaAccess, SessionStats};
use crate::compose::{AssetLoader, RasterBackend};
use crate::export::{DownloadSink, FeedbackSink};
use crate::screen::{CameraScreen, ScreenStats, ViewMode};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of screen and session state for a metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Stills captured and shown.
    pub captures: u64,
    /// Capture attempts that failed.
    pub capture_failures: u64,
    /// Compositions dropped because the screen moved on.
    pub stale_captures: u64,
    /// Captures offered for download.
    pub downloads: u64,
    /// Streams attached.
    pub stream_acquisitions: u64,
    /// Streams stopped.
    pub stream_releases: u64,
    /// Failed stream acquisitions.
    pub stream_failures: u64,
    /// Whether a stream is attached right now.
    pub stream_live: bool,
    /// Whether an overlay is selected.
    pub overlay_active: bool,
    /// Encoded size of the capture on display, if any.
    pub last_capture_bytes: Option<usize>,
}

/// Prometheus metrics registry for the camera screen.
pub struct MetricsRegistry {
    registry: Registry,

    // Capture metrics
    captures_total: IntCounter,
    capture_failures_total: IntCounter,
    stale_captures_total: IntCounter,
    downloads_total: IntCounter,
    last_capture_bytes: IntGauge,
    overlay_active: IntGauge,

    // Stream metrics
    stream_acquisitions_total: IntCounter,
    stream_releases_total: IntCounter,
    stream_failures_total: IntCounter,
    stream_live: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let captures_total = IntCounter::new(
            "snapframe_captures_total",
            "Total number of stills captured",
        )?;
        let capture_failures_total = IntCounter::new(
            "snapframe_capture_failures_total",
            "Total number of failed capture attempts",
        )?;
        let stale_captures_total = IntCounter::new(
            "snapframe_stale_captures_total",
            "Compositions discarded because the screen moved on",
        )?;
        let downloads_total = IntCounter::new(
            "snapframe_downloads_total",
            "Total number of captures offered for download",
        )?;
        let last_capture_bytes = IntGauge::new(
            "snapframe_last_capture_bytes",
            "Encoded size of the capture on display (0 when none)",
        )?;
        let overlay_active = IntGauge::new(
            "snapframe_overlay_active",
            "Whether an overlay is selected (1=yes, 0=no)",
        )?;

        let stream_acquisitions_total = IntCounter::new(
            "snapframe_stream_acquisitions_total",
            "Total number of camera streams attached",
        )?;
        let stream_releases_total = IntCounter::new(
            "snapframe_stream_releases_total",
            "Total number of camera streams stopped",
        )?;
        let stream_failures_total = IntCounter::new(
            "snapframe_stream_failures_total",
            "Total number of failed stream acquisitions",
        )?;
        let stream_live = IntGauge::new(
            "snapframe_stream_live",
            "Whether a camera stream is attached (1=yes, 0=no)",
        )?;

        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(capture_failures_total.clone()))?;
        registry.register(Box::new(stale_captures_total.clone()))?;
        registry.register(Box::new(downloads_total.clone()))?;
        registry.register(Box::new(last_capture_bytes.clone()))?;
        registry.register(Box::new(overlay_active.clone()))?;
        registry.register(Box::new(stream_acquisitions_total.clone()))?;
        registry.register(Box::new(stream_releases_total.clone()))?;
        registry.register(Box::new(stream_failures_total.clone()))?;
        registry.register(Box::new(stream_live.clone()))?;

        Ok(Self {
            registry,
            captures_total,
            capture_failures_total,
            stale_captures_total,
            downloads_total,
            last_capture_bytes,
            overlay_active,
            stream_acquisitions_total,
            stream_releases_total,
            stream_failures_total,
            stream_live,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // Counters only move forward, so apply the difference
        advance(&self.captures_total, snapshot.captures);
        advance(&self.capture_failures_total, snapshot.capture_failures);
        advance(&self.stale_captures_total, snapshot.stale_captures);
        advance(&self.downloads_total, snapshot.downloads);
        advance(&self.stream_acquisitions_total, snapshot.stream_acquisitions);
        advance(&self.stream_releases_total, snapshot.stream_releases);
        advance(&self.stream_failures_total, snapshot.stream_failures);

        self.stream_live.set(i64::from(snapshot.stream_live));
        self.overlay_active.set(i64::from(snapshot.overlay_active));
        self.last_capture_bytes
            .set(snapshot.last_capture_bytes.unwrap_or(0) as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Builds a snapshot from raw counters.
    pub fn from_components(session: &SessionStats, screen: &ScreenStats, mode: &ViewMode) -> Self {
        let (overlay_active, last_capture_bytes) = match mode {
            ViewMode::Live { overlay, .. } => (overlay.is_some(), None),
            ViewMode::Captured { image } => (false, Some(image.bytes().len())),
            ViewMode::Error { .. } => (false, None),
        };

        Self {
            captures: screen.captures,
            capture_failures: screen.capture_failures,
            stale_captures: screen.stale_discarded,
            downloads: screen.downloads,
            stream_acquisitions: session.acquisitions,
            stream_releases: session.releases,
            stream_failures: session.failures,
            stream_live: false,
            overlay_active,
            last_capture_bytes,
        }
    }

    /// Builds a snapshot of a running screen.
    pub fn from_screen<M, L, D, F, B>(screen: &CameraScreen<M, L, D, F, B>) -> Self
    where
        M: MediaAccess,
        L: AssetLoader,
        D: DownloadSink,
        F: FeedbackSink,
        B: RasterBackend,
    {
        Self {
            stream_live: screen.session().is_live(),
            ..Self::from_components(
                &screen.session().stats(),
                &screen.stats(),
                screen.state().mode(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{CaptureFormat, CapturedImage, OverlayDescriptor};

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            captures: 3,
            capture_failures: 1,
            stream_acquisitions: 2,
            stream_live: true,
            last_capture_bytes: Some(2048),
            ..Default::default()
        };
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("snapframe_captures_total 3"));
        assert!(output.contains("snapframe_capture_failures_total 1"));
        assert!(output.contains("snapframe_stream_acquisitions_total 2"));
        assert!(output.contains("snapframe_stream_live 1"));
        assert!(output.contains("snapframe_last_capture_bytes 2048"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            captures: 5,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            captures: 2,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("snapframe_captures_total 5"));
    }

    #[test]
    fn test_snapshot_from_components() {
        let session = SessionStats {
            acquisitions: 4,
            releases: 3,
            failures: 1,
            stale_discarded: 0,
        };
        let screen = ScreenStats {
            captures: 2,
            ..Default::default()
        };

        let live = ViewMode::Live {
            overlay: Some(OverlayDescriptor::new("smile.png")),
            picker_open: false,
        };
        let snapshot = MetricsSnapshot::from_components(&session, &screen, &live);
        assert!(snapshot.overlay_active);
        assert_eq!(snapshot.stream_releases, 3);
        assert_eq!(snapshot.last_capture_bytes, None);

        let captured = ViewMode::Captured {
            image: CapturedImage::new(vec![0; 10], CaptureFormat::Png, 1, 1),
        };
        let snapshot = MetricsSnapshot::from_components(&session, &screen, &captured);
        assert!(!snapshot.overlay_active);
        assert_eq!(snapshot.last_capture_bytes, Some(10));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("snapframe_captures_total"));
        assert!(output.contains("snapframe_stream_live"));
        assert!(output.contains("snapframe_overlay_active"));
    }
}
