//! Drawing surface for the ink layer
//!
//! Strokes are rasterized immediately, one segment at a time, the same way a
//! 2D canvas context is driven. [`RecordingCanvas`] keeps the call log for
//! inspection; [`RasterCanvas`] paints into an RGBA image.

use image::{Rgba, RgbaImage};

use crate::annotation::{Color, ContainerPoint};

/// Minimal 2D context used by the ink engine
///
/// Segments are stroked with round caps and joins.
pub trait Canvas {
    /// Erase every pixel
    fn clear(&mut self);

    /// Opacity multiplier applied to subsequent segments (0.0 to 1.0)
    fn set_global_alpha(&mut self, alpha: f64);

    fn global_alpha(&self) -> f64;

    /// Stroke one straight segment of the given width
    fn stroke_segment(&mut self, from: ContainerPoint, to: ContainerPoint, color: Color, width: f64);
}

/// One recorded canvas call
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    Clear,
    GlobalAlpha(f64),
    Segment { from: ContainerPoint, to: ContainerPoint, color: Color, width: f64, alpha: f64 },
}

/// Canvas that records calls instead of painting
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    ops: Vec<CanvasOp>,
    alpha: f64,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self { ops: Vec::new(), alpha: 1.0 }
    }

    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    /// Segments painted since the last clear
    pub fn visible_segments(&self) -> Vec<&CanvasOp> {
        let start = self.ops.iter().rposition(|op| *op == CanvasOp::Clear).map_or(0, |i| i + 1);
        self.ops[start..].iter().filter(|op| matches!(op, CanvasOp::Segment { .. })).collect()
    }

    pub fn reset_log(&mut self) {
        self.ops.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self) {
        self.ops.push(CanvasOp::Clear);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
        self.ops.push(CanvasOp::GlobalAlpha(self.alpha));
    }

    fn global_alpha(&self) -> f64 {
        self.alpha
    }

    fn stroke_segment(&mut self, from: ContainerPoint, to: ContainerPoint, color: Color, width: f64) {
        self.ops.push(CanvasOp::Segment { from, to, color, width, alpha: self.alpha });
    }
}

/// Canvas backed by an RGBA pixel buffer
///
/// Each segment is a capsule (round caps) composited source-over with the
/// color's own alpha times the global alpha.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
    alpha: f64,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height), alpha: 1.0 }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl Canvas for RasterCanvas {
    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn global_alpha(&self) -> f64 {
        self.alpha
    }

    fn stroke_segment(&mut self, from: ContainerPoint, to: ContainerPoint, color: Color, width: f64) {
        let radius = (width / 2.0).max(0.5);
        let (img_w, img_h) = self.image.dimensions();
        if img_w == 0 || img_h == 0 {
            return;
        }

        let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
        let max_x = (from.x.max(to.x) + radius).ceil().min(img_w as f64 - 1.0);
        let max_y = (from.y.max(to.y) + radius).ceil().min(img_h as f64 - 1.0);
        if max_x < min_x || max_y < min_y {
            return;
        }

        let coverage = (color.a as f64 / 255.0) * self.alpha;
        for py in min_y as u32..=max_y as u32 {
            for px in min_x as u32..=max_x as u32 {
                let center = ContainerPoint::new(px as f64 + 0.5, py as f64 + 0.5);
                if distance_to_segment(&center, &from, &to) <= radius {
                    blend(self.image.get_pixel_mut(px, py), color, coverage);
                }
            }
        }
    }
}

/// Distance from a point to the closest point of a segment
fn distance_to_segment(point: &ContainerPoint, start: &ContainerPoint, end: &ContainerPoint) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-12 {
        return point.distance_to(start);
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = ContainerPoint::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest)
}

/// Source-over compositing of `color` at `coverage` onto `dst`
fn blend(dst: &mut Rgba<u8>, color: Color, coverage: f64) {
    let src_a = coverage.clamp(0.0, 1.0);
    let dst_a = dst[3] as f64 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }

    let mix = |src: u8, dst: u8| -> u8 {
        let value = (src as f64 * src_a + dst as f64 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    *dst = Rgba([
        mix(color.r, dst[0]),
        mix(color.g, dst[1]),
        mix(color.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]);
}
