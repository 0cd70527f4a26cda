//! Geometry types for layout regions and anchored decorations.
//!
//! `Rect` and `Point2D` are normalized to the output canvas; `PixelRect`
//! addresses concrete pixels once the canvas size is known.

use serde::{Deserialize, Serialize};

/// A rectangle in normalized canvas coordinates.
///
/// `(0.0, 0.0)` is top-left, `(1.0, 1.0)` is bottom-right of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (normalized).
    pub x: f64,
    /// Top edge (normalized).
    pub y: f64,
    /// Width (normalized).
    pub w: f64,
    /// Height (normalized).
    pub h: f64,
}

impl Rect {
    /// The whole canvas.
    pub const FULL: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Create a new rect, clamping values to valid range.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            w: w.clamp(0.0, 1.0),
            h: h.clamp(0.0, 1.0),
        }
    }

    /// Create a rect centered at `(cx, cy)`, kept inside the canvas.
    pub fn centered(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        let w = w.clamp(0.0, 1.0);
        let h = h.clamp(0.0, 1.0);

        let x = (cx - w / 2.0).clamp(0.0, 1.0 - w);
        let y = (cy - h / 2.0).clamp(0.0, 1.0 - h);

        Self { x, y, w, h }
    }

    /// The center point of this rect.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        (self.x + self.w).min(1.0)
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        (self.y + self.h).min(1.0)
    }

    /// Check if a normalized point is within this rect.
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Map onto a canvas of the given pixel size.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let x0 = (self.x * width as f64).round() as u32;
        let y0 = (self.y * height as f64).round() as u32;
        let x1 = (self.right() * width as f64).round() as u32;
        let y1 = (self.bottom() * height as f64).round() as u32;
        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::FULL
    }
}

/// A 2D normalized point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Midpoint between two points.
    pub fn midpoint(a: &Point2D, b: &Point2D) -> Point2D {
        Point2D::lerp(a, b, 0.5)
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        let t = t.clamp(0.0, 1.0);
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }

    /// Convert to pixel coordinates on a canvas.
    pub fn to_pixels(&self, width: u32, height: u32) -> (f64, f64) {
        (self.x * width as f64, self.y * height as f64)
    }
}

/// A rectangle of whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect covering a whole canvas.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersection with a canvas of the given size.
    pub fn clamp_to(&self, width: u32, height: u32) -> PixelRect {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        PixelRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_rect() {
        let r = Rect::FULL;
        assert!(r.contains(Point2D::new(0.5, 0.5)));
        assert!(r.contains(Point2D::new(0.0, 0.0)));
        assert!(r.contains(Point2D::new(1.0, 1.0)));
    }

    #[test]
    fn test_centered_rect_clamps() {
        let r = Rect::centered(0.1, 0.1, 0.5, 0.5);
        assert!(r.x >= 0.0);
        assert!(r.y >= 0.0);
        assert!(r.right() <= 1.0);
        assert!(r.bottom() <= 1.0);
    }

    #[test]
    fn test_rect_to_pixels() {
        let r = Rect::new(0.5, 0.0, 0.5, 1.0);
        let px = r.to_pixels(640, 360);
        assert_eq!(px, PixelRect::new(320, 0, 320, 360));
    }

    #[test]
    fn test_pixel_rect_clamp() {
        let r = PixelRect::new(600, 300, 100, 100).clamp_to(640, 360);
        assert_eq!(r, PixelRect::new(600, 300, 40, 60));
        assert!(PixelRect::new(700, 0, 10, 10).clamp_to(640, 360).is_empty());
    }

    #[test]
    fn test_point2d_distance_and_midpoint() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(1.0, 0.0);
        assert!((a.distance_to(&b) - 1.0).abs() < 1e-9);
        assert_eq!(Point2D::midpoint(&a, &b), Point2D::new(0.5, 0.0));
    }
}
