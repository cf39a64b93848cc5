//! Raster drawing capability.
//!
//! The compositor only needs two primitives: draw an image stretched
//! into a rectangle, and encode the result. Backends implement these
//! against whatever 2D surface the host offers; [`CpuBackend`] does it
//! in memory with the `image` crate.

use super::geometry::DrawRect;
use super::output::{CaptureFormat, EncodeSettings};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError, Rgba, RgbaImage};

/// A one-shot drawing surface.
pub trait RasterCanvas {
    /// Canvas size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Draws `image` stretched into `dest`, alpha-blended over existing
    /// content and clipped to the canvas.
    fn draw_image(&mut self, image: &RgbaImage, dest: DrawRect);

    /// Encodes the canvas.
    fn encode(&self, settings: &EncodeSettings) -> Result<Vec<u8>, ImageError>;
}

/// Creates canvases. One canvas is created per compose call.
pub trait RasterBackend {
    type Canvas: RasterCanvas;

    fn create_canvas(&self, width: u32, height: u32) -> Self::Canvas;
}

/// In-memory backend using the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct CpuBackend {
    filter: FilterType,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl CpuBackend {
    /// Uses `filter` when scaling.
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl RasterBackend for CpuBackend {
    type Canvas = CpuCanvas;

    fn create_canvas(&self, width: u32, height: u32) -> CpuCanvas {
        CpuCanvas {
            pixels: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            filter: self.filter,
        }
    }
}

/// RGBA8 canvas held in memory, cleared to opaque black.
pub struct CpuCanvas {
    pixels: RgbaImage,
    filter: FilterType,
}

impl CpuCanvas {
    /// The current pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl RasterCanvas for CpuCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: DrawRect) {
        let (width, height) = self.pixels.dimensions();
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let Some(target) = dest.clip_to(width, height) else {
            tracing::trace!(?dest, "Draw skipped: outside canvas");
            return;
        };

        let region = dest
            .source_region(image.dimensions(), target.to_draw_rect())
            .to_pixels(image.width(), image.height());
        let cropped =
            imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();

        let scaled = if cropped.dimensions() == (target.width, target.height) {
            cropped
        } else {
            imageops::resize(&cropped, target.width, target.height, self.filter)
        };

        imageops::overlay(&mut self.pixels, &scaled, target.x as i64, target.y as i64);
    }

    fn encode(&self, settings: &EncodeSettings) -> Result<Vec<u8>, ImageError> {
        let (width, height) = self.pixels.dimensions();
        let mut buf = Vec::new();
        match settings.format {
            CaptureFormat::Png => {
                PngEncoder::new(&mut buf).write_image(
                    self.pixels.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )?;
            }
            CaptureFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).into_rgb8();
                JpegEncoder::new_with_quality(&mut buf, settings.jpeg_quality)
                    .encode_image(&rgb)?;
            }
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_draw_fills_target_only() {
        let mut canvas = CpuBackend::default().create_canvas(10, 10);
        canvas.draw_image(
            &solid(2, 2, [255, 0, 0, 255]),
            DrawRect {
                x: 2.0,
                y: 3.0,
                width: 4.0,
                height: 4.0,
            },
        );

        let px = canvas.pixels();
        assert_eq!(px.get_pixel(2, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(px.get_pixel(5, 6), &Rgba([255, 0, 0, 255]));
        assert_eq!(px.get_pixel(1, 3), &Rgba([0, 0, 0, 255]));
        assert_eq!(px.get_pixel(6, 6), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_crops_overflow() {
        // Left half green, right half blue; draw so only the right half shows.
        let image = RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut canvas = CpuBackend::with_filter(FilterType::Nearest).create_canvas(4, 4);
        canvas.draw_image(
            &image,
            DrawRect {
                x: -4.0,
                y: 0.0,
                width: 8.0,
                height: 4.0,
            },
        );

        for (_, _, px) in canvas.pixels().enumerate_pixels() {
            assert_eq!(px, &Rgba([0, 0, 255, 255]));
        }
    }

    #[test]
    fn test_transparent_pixels_keep_background() {
        let mut canvas = CpuBackend::default().create_canvas(4, 4);
        canvas.draw_image(&solid(4, 4, [0, 255, 0, 255]), DrawRect::canvas(4, 4));
        canvas.draw_image(&solid(4, 4, [255, 255, 255, 0]), DrawRect::canvas(4, 4));
        assert_eq!(canvas.pixels().get_pixel(1, 1), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_encode_png_roundtrips_dimensions() {
        let canvas = CpuBackend::default().create_canvas(7, 3);
        let bytes = canvas.encode(&EncodeSettings::default()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
    }

    #[test]
    fn test_encode_jpeg() {
        let canvas = CpuBackend::default().create_canvas(16, 16);
        let settings = EncodeSettings {
            format: CaptureFormat::Jpeg,
            jpeg_quality: 90,
        };
        let bytes = canvas.encode(&settings).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
