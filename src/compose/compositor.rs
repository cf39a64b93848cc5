//! The capture compositor.

use super::canvas::{CpuBackend, RasterBackend, RasterCanvas};
use super::geometry::{cover_fit, overlay_rect, DrawRect};
use super::output::{CapturedImage, CompositionResult, EncodeSettings};
use super::overlay::{AssetError, AssetLoader, OverlayDescriptor};
use crate::capture::{CompositorConfig, FrameSource};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single compose call. None of them affect the live session.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(
        "frame not ready (native {native_width}x{native_height}, viewport {viewport_width}x{viewport_height})"
    )]
    FrameNotReady {
        native_width: u32,
        native_height: u32,
        viewport_width: u32,
        viewport_height: u32,
    },
    #[error("overlay failed to load: {0}")]
    OverlayLoad(#[from] AssetError),
    #[error("failed to encode capture: {0}")]
    Encode(#[from] image::ImageError),
}

/// Compositor settings.
#[derive(Debug, Clone, Default)]
pub struct CompositorSettings {
    pub encoding: EncodeSettings,
    /// Upper bound on overlay loading; `None` waits forever.
    pub overlay_load_timeout: Option<Duration>,
}

impl CompositorSettings {
    pub fn from_config(config: &CompositorConfig) -> Self {
        Self {
            encoding: EncodeSettings {
                format: config.format,
                jpeg_quality: config.jpeg_quality,
            },
            overlay_load_timeout: config.overlay_load_timeout(),
        }
    }
}

/// Turns a live frame plus an optional overlay into one encoded still
/// that matches what the preview showed.
///
/// Composition is pure apart from loading the overlay asset. Cloning is
/// cheap and shares the loader and backend.
pub struct Compositor<L, B = CpuBackend> {
    loader: Arc<L>,
    backend: Arc<B>,
    settings: CompositorSettings,
}

impl<L, B> Clone for Compositor<L, B> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            backend: Arc::clone(&self.backend),
            settings: self.settings.clone(),
        }
    }
}

impl<L: AssetLoader> Compositor<L, CpuBackend> {
    /// Creates a compositor drawing on the in-memory CPU backend.
    pub fn new(loader: L, settings: CompositorSettings) -> Self {
        Self::with_backend(loader, CpuBackend::default(), settings)
    }
}

impl<L: AssetLoader, B: RasterBackend> Compositor<L, B> {
    /// Creates a compositor drawing on `backend`.
    pub fn with_backend(loader: L, backend: B, settings: CompositorSettings) -> Self {
        Self {
            loader: Arc::new(loader),
            backend: Arc::new(backend),
            settings,
        }
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    /// Composes one still.
    ///
    /// The output is exactly the viewport size. The frame is cover-fitted
    /// into it, then the overlay (if any) is drawn as a centered square
    /// whose side is a fraction of the output width chosen by
    /// `is_narrow_viewport`.
    pub async fn compose(
        &self,
        frame: &FrameSource,
        overlay: Option<&OverlayDescriptor>,
        is_narrow_viewport: bool,
    ) -> Result<CompositionResult, ComposeError> {
        let native = frame.native_size();
        let viewport = frame.viewport_size();

        let placement = cover_fit(native, viewport).ok_or(ComposeError::FrameNotReady {
            native_width: native.0,
            native_height: native.1,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
        })?;
        let source = placement.source_region(native, DrawRect::canvas(viewport.0, viewport.1));

        let mut canvas = self.backend.create_canvas(viewport.0, viewport.1);
        canvas.draw_image(frame.frame().image(), placement);

        let overlay_placement = match overlay {
            Some(descriptor) => {
                let asset = self.load_overlay(descriptor).await?;
                let fraction = descriptor.sizing().fraction(is_narrow_viewport);
                let rect = overlay_rect(viewport, fraction);
                canvas.draw_image(&asset, rect);
                Some(rect)
            }
            None => None,
        };

        let encoding = &self.settings.encoding;
        let bytes = canvas.encode(encoding)?;
        let (width, height) = canvas.dimensions();
        let image = CapturedImage::new(bytes, encoding.format, width, height);

        tracing::debug!(
            native_width = native.0,
            native_height = native.1,
            width,
            height,
            offset_x = placement.x,
            offset_y = placement.y,
            overlay = overlay.map(OverlayDescriptor::uri),
            bytes = image.bytes().len(),
            "Composed capture"
        );

        Ok(CompositionResult {
            image,
            placement,
            source,
            overlay: overlay_placement,
        })
    }

    async fn load_overlay(&self, descriptor: &OverlayDescriptor) -> Result<RgbaImage, AssetError> {
        let load = self.loader.load(descriptor.uri());
        match self.settings.overlay_load_timeout {
            Some(limit) => tokio::time::timeout(limit, load)
                .await
                .map_err(|_| AssetError::TimedOut(descriptor.uri().to_string()))?,
            None => load.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::compose::{CaptureFormat, MemoryAssetLoader, OverlaySizing};
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        Frame::from_image(
            RgbaImage::from_fn(width, height, |x, y| {
                Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
            }),
            1,
        )
    }

    fn smiley_loader() -> MemoryAssetLoader {
        let mut loader = MemoryAssetLoader::new();
        let smiley = RgbaImage::from_fn(16, 16, |x, y| {
            if (4..12).contains(&x) && (4..12).contains(&y) {
                Rgba([255, 255, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        loader.insert_image("smile.png", &smiley).unwrap();
        loader
    }

    #[tokio::test]
    async fn test_landscape_frame_into_portrait_viewport() {
        let compositor = Compositor::new(MemoryAssetLoader::new(), CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(1920, 1080), 400, 800);

        let result = compositor.compose(&source, None, true).await.unwrap();

        assert_eq!(result.image.width(), 400);
        assert_eq!(result.image.height(), 800);
        assert_eq!(result.placement.height, 800.0);
        assert!((result.placement.width - 1422.22).abs() < 0.01);
        assert!((result.placement.x - -511.11).abs() < 0.01);
        assert_eq!(result.placement.y, 0.0);
        assert!((result.source.x - 690.0).abs() < 1e-6);
        assert!((result.source.width - 540.0).abs() < 1e-6);
        assert!(result.overlay.is_none());

        let decoded = image::load_from_memory(result.image.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 800));
    }

    #[tokio::test]
    async fn test_output_size_independent_of_native() {
        let compositor = Compositor::new(MemoryAssetLoader::new(), CompositorSettings::default());
        for (nw, nh) in [(1920, 1080), (640, 480), (720, 1280), (37, 91)] {
            let source = FrameSource::new(gradient_frame(nw, nh), 320, 240);
            let result = compositor.compose(&source, None, true).await.unwrap();
            assert_eq!((result.image.width(), result.image.height()), (320, 240));
        }
    }

    #[tokio::test]
    async fn test_zero_dimensions_not_ready() {
        let compositor = Compositor::new(MemoryAssetLoader::new(), CompositorSettings::default());

        let no_viewport = FrameSource::new(gradient_frame(64, 64), 0, 100);
        assert!(matches!(
            compositor.compose(&no_viewport, None, true).await,
            Err(ComposeError::FrameNotReady { .. })
        ));

        let no_frame = FrameSource::new(Frame::empty(), 100, 100);
        assert!(matches!(
            compositor.compose(&no_frame, None, true).await,
            Err(ComposeError::FrameNotReady { .. })
        ));
    }

    #[tokio::test]
    async fn test_overlay_centered_narrow_scenario() {
        let compositor = Compositor::new(smiley_loader(), CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(1920, 1080), 400, 800);
        let overlay = OverlayDescriptor::new("smile.png");

        let result = compositor
            .compose(&source, Some(&overlay), true)
            .await
            .unwrap();
        let rect = result.overlay.unwrap();
        assert!((rect.width - 280.0).abs() < 1e-9);
        assert!((rect.x - 60.0).abs() < 1e-9);
        assert!((rect.y - 260.0).abs() < 1e-9);

        // Opaque center of the smiley lands on the canvas center.
        let decoded = image::load_from_memory(result.image.bytes())
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.get_pixel(200, 400), &Rgba([255, 255, 0, 255]));
        // Transparent border leaves the frame visible.
        assert_ne!(decoded.get_pixel(62, 262), &Rgba([255, 255, 0, 255]));
    }

    #[tokio::test]
    async fn test_overlay_fraction_by_viewport_class() {
        let compositor = Compositor::new(smiley_loader(), CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(640, 480), 1000, 600);
        let overlay = OverlayDescriptor::new("smile.png");

        let narrow = compositor
            .compose(&source, Some(&overlay), true)
            .await
            .unwrap()
            .overlay
            .unwrap();
        let wide = compositor
            .compose(&source, Some(&overlay), false)
            .await
            .unwrap()
            .overlay
            .unwrap();
        let wide_again = compositor
            .compose(&source, Some(&overlay), false)
            .await
            .unwrap()
            .overlay
            .unwrap();

        assert!((narrow.width - 700.0).abs() < 1e-9);
        assert!((wide.width - 400.0).abs() < 1e-9);
        assert_eq!(wide, wide_again);
    }

    #[tokio::test]
    async fn test_custom_sizing_respected() {
        let compositor = Compositor::new(smiley_loader(), CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(640, 480), 500, 500);
        let overlay = OverlayDescriptor::new("smile.png").with_sizing(OverlaySizing {
            narrow_fraction: 0.8,
            wide_fraction: 0.5,
        });

        let rect = compositor
            .compose(&source, Some(&overlay), true)
            .await
            .unwrap()
            .overlay
            .unwrap();
        assert!((rect.width - 400.0).abs() < 1e-9);
        assert!((rect.x - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_overlay_fails_whole_compose() {
        let compositor = Compositor::new(MemoryAssetLoader::new(), CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(64, 64), 64, 64);
        let overlay = OverlayDescriptor::new("gone.png");

        assert!(matches!(
            compositor.compose(&source, Some(&overlay), true).await,
            Err(ComposeError::OverlayLoad(AssetError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_no_overlay_is_pixel_identical() {
        let compositor = Compositor::new(MemoryAssetLoader::new(), CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(1280, 720), 360, 640);

        let first = compositor.compose(&source, None, true).await.unwrap();
        let second = compositor.compose(&source, None, true).await.unwrap();
        assert_eq!(first.image.bytes(), second.image.bytes());
        assert_eq!(first.image.digest(), second.image.digest());
    }

    #[tokio::test]
    async fn test_jpeg_output() {
        let settings = CompositorSettings {
            encoding: EncodeSettings {
                format: CaptureFormat::Jpeg,
                jpeg_quality: 100,
            },
            ..Default::default()
        };
        let compositor = Compositor::new(MemoryAssetLoader::new(), settings);
        let source = FrameSource::new(gradient_frame(320, 240), 160, 120);

        let result = compositor.compose(&source, None, false).await.unwrap();
        assert_eq!(result.image.mime_type(), "image/jpeg");
        assert_eq!(result.image.file_name("captured_image"), "captured_image.jpg");
        let decoded = image::load_from_memory(result.image.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 120));
    }

    struct SlowLoader;

    impl AssetLoader for SlowLoader {
        async fn load(&self, _uri: &str) -> Result<RgbaImage, AssetError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_timeout() {
        let settings = CompositorSettings {
            overlay_load_timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let compositor = Compositor::new(SlowLoader, settings);
        let source = FrameSource::new(gradient_frame(64, 64), 64, 64);
        let overlay = OverlayDescriptor::new("slow.png");

        assert!(matches!(
            compositor.compose(&source, Some(&overlay), true).await,
            Err(ComposeError::OverlayLoad(AssetError::TimedOut(_)))
        ));
    }

    #[derive(Default, Clone)]
    struct RecordingBackend {
        calls: Rc<RefCell<Vec<((u32, u32), DrawRect)>>>,
    }

    struct RecordingCanvas {
        size: (u32, u32),
        calls: Rc<RefCell<Vec<((u32, u32), DrawRect)>>>,
    }

    impl RasterBackend for RecordingBackend {
        type Canvas = RecordingCanvas;

        fn create_canvas(&self, width: u32, height: u32) -> RecordingCanvas {
            RecordingCanvas {
                size: (width, height),
                calls: Rc::clone(&self.calls),
            }
        }
    }

    impl RasterCanvas for RecordingCanvas {
        fn dimensions(&self) -> (u32, u32) {
            self.size
        }

        fn draw_image(&mut self, image: &RgbaImage, dest: DrawRect) {
            self.calls.borrow_mut().push((image.dimensions(), dest));
        }

        fn encode(&self, _settings: &EncodeSettings) -> Result<Vec<u8>, image::ImageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_draw_order_frame_then_overlay() {
        let backend = RecordingBackend::default();
        let calls = Rc::clone(&backend.calls);
        let compositor =
            Compositor::with_backend(smiley_loader(), backend, CompositorSettings::default());
        let source = FrameSource::new(gradient_frame(1920, 1080), 400, 800);
        let overlay = OverlayDescriptor::new("smile.png");

        let result = compositor
            .compose(&source, Some(&overlay), true)
            .await
            .unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ((1920, 1080), result.placement));
        assert_eq!(calls[1].0, (16, 16));
        assert_eq!(Some(calls[1].1), result.overlay);
    }
}
