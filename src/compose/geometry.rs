//! Placement math for cover-fit frames and centered overlays.
//!
//! All rectangles are in floating point so the placement reported back
//! to callers is exact; only the raster backend rounds to pixels.

use serde::Serialize;

/// A rectangle in output (canvas) coordinates. May extend past the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in source image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DrawRect {
    /// The rectangle covering a whole `width` x `height` canvas.
    pub fn canvas(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f64,
            height: height as f64,
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Pixels of a `canvas_width` x `canvas_height` canvas this rect covers.
    ///
    /// Returns `None` when the rect lies entirely outside the canvas.
    pub fn clip_to(&self, canvas_width: u32, canvas_height: u32) -> Option<PixelRect> {
        let (cw, ch) = (canvas_width as f64, canvas_height as f64);
        let x0 = self.x.round().clamp(0.0, cw);
        let x1 = self.right().round().clamp(0.0, cw);
        let y0 = self.y.round().clamp(0.0, ch);
        let y1 = self.bottom().round().clamp(0.0, ch);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Part of a `source` sized image that ends up inside `area` when the
    /// whole image is drawn stretched into this rect.
    pub fn source_region(&self, source: (u32, u32), area: DrawRect) -> SourceRect {
        let sx = source.0 as f64 / self.width;
        let sy = source.1 as f64 / self.height;
        SourceRect {
            x: (area.x - self.x) * sx,
            y: (area.y - self.y) * sy,
            width: area.width * sx,
            height: area.height * sy,
        }
    }
}

impl PixelRect {
    pub fn to_draw_rect(self) -> DrawRect {
        DrawRect {
            x: self.x as f64,
            y: self.y as f64,
            width: self.width as f64,
            height: self.height as f64,
        }
    }
}

impl SourceRect {
    /// Rounds to whole pixels inside a `width` x `height` image.
    ///
    /// The result is never empty as long as the image is not.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f64, height as f64);
        let x0 = self.x.round().clamp(0.0, (w - 1.0).max(0.0));
        let y0 = self.y.round().clamp(0.0, (h - 1.0).max(0.0));
        let x1 = (self.x + self.width).round().clamp(x0 + 1.0, w.max(1.0));
        let y1 = (self.y + self.height).round().clamp(y0 + 1.0, h.max(1.0));
        PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }
}

/// Where a `native` sized frame is drawn so it fills `viewport`
/// with its aspect ratio intact, overflow split evenly on both sides.
///
/// Returns `None` if any dimension is zero.
pub fn cover_fit(native: (u32, u32), viewport: (u32, u32)) -> Option<DrawRect> {
    let (nw, nh) = native;
    let (vw, vh) = viewport;
    if nw == 0 || nh == 0 || vw == 0 || vh == 0 {
        return None;
    }

    let video_ratio = nw as f64 / nh as f64;
    let display_ratio = vw as f64 / vh as f64;
    let (vw, vh) = (vw as f64, vh as f64);

    let rect = if video_ratio > display_ratio {
        let height = vh;
        let width = height * video_ratio;
        DrawRect {
            x: (vw - width) / 2.0,
            y: 0.0,
            width,
            height,
        }
    } else {
        let width = vw;
        let height = width / video_ratio;
        DrawRect {
            x: 0.0,
            y: (vh - height) / 2.0,
            width,
            height,
        }
    };
    Some(rect)
}

/// Square overlay of side `output.width * fraction`, centered on the output.
pub fn overlay_rect(output: (u32, u32), fraction: f64) -> DrawRect {
    let (w, h) = (output.0 as f64, output.1 as f64);
    let side = w * fraction;
    DrawRect {
        x: (w - side) / 2.0,
        y: (h - side) / 2.0,
        width: side,
        height: side,
    }
}

/// Viewport size class used to pick the overlay fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportClass {
    /// Phone-class widths.
    Narrow,
    /// Desktop-class widths.
    Wide,
}

impl ViewportClass {
    /// Classifies a viewport width; widths up to `breakpoint` are narrow.
    pub fn from_width(width: u32, breakpoint: u32) -> Self {
        if width <= breakpoint {
            ViewportClass::Narrow
        } else {
            ViewportClass::Wide
        }
    }

    #[inline]
    pub fn is_narrow(self) -> bool {
        self == ViewportClass::Narrow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_landscape_into_portrait() {
        let rect = cover_fit((1920, 1080), (400, 800)).unwrap();
        assert_eq!(rect.height, 800.0);
        assert!((rect.width - 1422.22).abs() < 0.01);
        assert!((rect.x - -511.11).abs() < 0.01);
        assert_eq!(rect.y, 0.0);

        let source = rect.source_region((1920, 1080), DrawRect::canvas(400, 800));
        assert!(close(source.x, 690.0));
        assert!(close(source.width, 540.0));
        assert!(close(source.height, 1080.0));
        assert_eq!(
            source.to_pixels(1920, 1080),
            PixelRect {
                x: 690,
                y: 0,
                width: 540,
                height: 1080
            }
        );
    }

    #[test]
    fn test_portrait_into_landscape() {
        let rect = cover_fit((720, 1280), (800, 600)).unwrap();
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.width, 800.0);
        assert!(close(rect.height, 800.0 * 1280.0 / 720.0));
        assert!(rect.y < 0.0);
    }

    #[test]
    fn test_matching_ratio_is_identity() {
        let rect = cover_fit((1280, 720), (640, 360)).unwrap();
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.width, 640.0);
        assert!(close(rect.height, 360.0));
        assert!(close(rect.y, 0.0));
        assert_eq!(
            rect.clip_to(640, 360),
            Some(PixelRect {
                x: 0,
                y: 0,
                width: 640,
                height: 360
            })
        );
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(cover_fit((0, 1080), (400, 800)).is_none());
        assert!(cover_fit((1920, 1080), (400, 0)).is_none());
    }

    #[test]
    fn test_overlay_rect_narrow_scenario() {
        let rect = overlay_rect((400, 800), 0.7);
        assert!(close(rect.width, 280.0));
        assert!(close(rect.x, 60.0));
        assert!(close(rect.y, 260.0));
        assert_eq!(
            rect.clip_to(400, 800),
            Some(PixelRect {
                x: 60,
                y: 260,
                width: 280,
                height: 280
            })
        );
    }

    #[test]
    fn test_clip_outside_canvas() {
        let rect = DrawRect {
            x: 500.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        assert!(rect.clip_to(400, 800).is_none());
    }

    #[test]
    fn test_viewport_class() {
        assert_eq!(ViewportClass::from_width(768, 768), ViewportClass::Narrow);
        assert_eq!(ViewportClass::from_width(769, 768), ViewportClass::Wide);
        assert!(ViewportClass::from_width(400, 768).is_narrow());
    }

    proptest! {
        #[test]
        fn prop_cover_fit_fills_viewport(
            nw in 1u32..5000,
            nh in 1u32..5000,
            vw in 1u32..4000,
            vh in 1u32..4000,
        ) {
            let rect = cover_fit((nw, nh), (vw, vh)).unwrap();

            // Aspect ratio of the drawn region matches the source.
            prop_assert!(close(rect.width / rect.height, nw as f64 / nh as f64));

            // No blank margin on any side.
            prop_assert!(rect.x <= EPS && rect.y <= EPS);
            prop_assert!(rect.right() >= vw as f64 - EPS * vw as f64);
            prop_assert!(rect.bottom() >= vh as f64 - EPS * vh as f64);

            // One axis is matched exactly, overflow is centered on the other.
            prop_assert!(rect.x == 0.0 || rect.y == 0.0);
            prop_assert!(close(rect.x + rect.right(), vw as f64));
            prop_assert!(close(rect.y + rect.bottom(), vh as f64));
        }

        #[test]
        fn prop_sampled_source_maps_back_onto_canvas(
            nw in 1u32..5000,
            nh in 1u32..5000,
            vw in 1u32..4000,
            vh in 1u32..4000,
        ) {
            let rect = cover_fit((nw, nh), (vw, vh)).unwrap();
            let source = rect.source_region((nw, nh), DrawRect::canvas(vw, vh));

            let scale_x = rect.width / nw as f64;
            let scale_y = rect.height / nh as f64;
            prop_assert!((source.x * scale_x + rect.x).abs() <= 1e-6 * vw as f64);
            prop_assert!(close((source.x + source.width) * scale_x + rect.x, vw as f64));
            prop_assert!((source.y * scale_y + rect.y).abs() <= 1e-6 * vh as f64);
            prop_assert!(close((source.y + source.height) * scale_y + rect.y, vh as f64));

            // The sampled region stays inside the native frame.
            prop_assert!(source.x >= -1e-6 && source.y >= -1e-6);
            prop_assert!(source.x + source.width <= nw as f64 * (1.0 + 1e-9));
            prop_assert!(source.y + source.height <= nh as f64 * (1.0 + 1e-9));

            let pixels = rect.clip_to(vw, vh).unwrap();
            prop_assert_eq!((pixels.x, pixels.y, pixels.width, pixels.height), (0, 0, vw, vh));
        }

        #[test]
        fn prop_overlay_is_centered(
            w in 1u32..4000,
            h in 1u32..4000,
            fraction in 0.05f64..1.0,
        ) {
            let rect = overlay_rect((w, h), fraction);
            prop_assert!(close(rect.width, rect.height));
            prop_assert!(close(rect.x * 2.0 + rect.width, w as f64));
            prop_assert!(close(rect.y * 2.0 + rect.height, h as f64));
        }
    }
}
