//! Anchored decorations drawn relative to facial landmarks.
//!
//! Sizes derive from the face box so decorations follow the subject as they
//! move closer or further away. Intensity controls opacity; geometry can
//! nudge and rescale each decoration around its default placement.

use duet_media_model::anchor::AnchorFrame;
use duet_media_model::effect::{AnchoredDecoration, DecorationKind, MAX_INTENSITY};
use duet_media_model::frame::{Frame, Rgba};
use duet_media_model::geometry::Point2D;

use crate::raster::{draw_line, draw_sparkle, fill_circle, fill_rect, fill_triangle, stroke_ring};

const EAR_OUTER: Rgba = Rgba::rgb(120, 82, 60);
const EAR_INNER: Rgba = Rgba::rgb(244, 160, 180);
const HORN: Rgba = Rgba::rgb(200, 30, 40);
const GLASSES: Rgba = Rgba::rgb(20, 20, 20);
const CROWN: Rgba = Rgba::rgb(242, 194, 48);
const SPARKLE: Rgba = Rgba::rgb(255, 236, 140);

/// Sparkle particle count at intensity 100.
pub const MAX_SPARKLES: u32 = 24;

/// Golden angle in radians; spreads sparkles evenly without randomness.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Pixel-space view of an anchor, with the decoration's geometry applied.
struct Placement {
    face_x: f64,
    face_y: f64,
    face_w: f64,
    face_h: f64,
    scale: f64,
}

impl Placement {
    fn new(frame: &Frame, anchor: &AnchorFrame, decoration: &AnchoredDecoration) -> Self {
        let (w, h) = (frame.width() as f64, frame.height() as f64);
        let face_w = anchor.face.w * w;
        let face_h = anchor.face.h * h;
        Self {
            face_x: anchor.face.x * w + decoration.geometry.offset.x * face_w,
            face_y: anchor.face.y * h + decoration.geometry.offset.y * face_h,
            face_w,
            face_h,
            scale: decoration.geometry.scale.max(0.0),
        }
    }

    /// Point at fractional face-box coordinates.
    fn at(&self, fx: f64, fy: f64) -> (f64, f64) {
        (self.face_x + fx * self.face_w, self.face_y + fy * self.face_h)
    }
}

/// Draw one decoration onto the frame.
pub fn draw_decoration(frame: &mut Frame, decoration: &AnchoredDecoration, anchor: &AnchorFrame) {
    let alpha = decoration.intensity.min(MAX_INTENSITY) as f32 / MAX_INTENSITY as f32;
    if alpha <= 0.0 || frame.is_empty() {
        return;
    }
    let p = Placement::new(frame, anchor, decoration);
    if p.face_w <= 0.0 || p.face_h <= 0.0 || p.scale <= 0.0 {
        return;
    }

    match decoration.kind {
        DecorationKind::Ears => draw_ears(frame, &p, alpha),
        DecorationKind::Horns => draw_horns(frame, &p, alpha),
        DecorationKind::Glasses => draw_glasses(frame, anchor, decoration, &p, alpha),
        DecorationKind::Crown => draw_crown(frame, &p, alpha),
        DecorationKind::Sparkles => draw_sparkles(frame, &p, decoration.intensity, alpha),
    }
}

fn draw_ears(frame: &mut Frame, p: &Placement, alpha: f32) {
    let outer = 0.22 * p.face_w * p.scale;
    let inner = outer * 0.55;
    for fx in [0.18, 0.82] {
        let (cx, cy) = p.at(fx, -0.04);
        fill_circle(frame, cx, cy, outer, EAR_OUTER, alpha);
        fill_circle(frame, cx, cy, inner, EAR_INNER, alpha);
    }
}

fn draw_horns(frame: &mut Frame, p: &Placement, alpha: f32) {
    let half_base = 0.08 * p.face_w * p.scale;
    let height = 0.35 * p.face_h * p.scale;
    for (fx, lean) in [(0.28, -0.35), (0.72, 0.35)] {
        let (bx, by) = p.at(fx, 0.02);
        let tip = (bx + lean * height * 0.5, by - height);
        fill_triangle(frame, (bx - half_base, by), (bx + half_base, by), tip, HORN, alpha);
    }
}

fn draw_glasses(
    frame: &mut Frame,
    anchor: &AnchorFrame,
    decoration: &AnchoredDecoration,
    p: &Placement,
    alpha: f32,
) {
    let (w, h) = (frame.width() as f64, frame.height() as f64);
    let shift = (
        decoration.geometry.offset.x * p.face_w,
        decoration.geometry.offset.y * p.face_h,
    );
    let eye = |pt: Point2D| (pt.x * w + shift.0, pt.y * h + shift.1);
    let left = eye(anchor.left_eye);
    let right = eye(anchor.right_eye);

    let eye_gap = ((right.0 - left.0).powi(2) + (right.1 - left.1).powi(2)).sqrt();
    let radius = (eye_gap * 0.38 * p.scale).max(1.0);
    let thickness = (radius * 0.2).max(1.0);

    stroke_ring(frame, left.0, left.1, radius, thickness, GLASSES, alpha);
    stroke_ring(frame, right.0, right.1, radius, thickness, GLASSES, alpha);
    draw_line(
        frame,
        (left.0 + radius, left.1),
        (right.0 - radius, right.1),
        thickness,
        GLASSES,
        alpha,
    );
}

fn draw_crown(frame: &mut Frame, p: &Placement, alpha: f32) {
    let band_w = 0.7 * p.face_w * p.scale;
    let band_h = 0.09 * p.face_h * p.scale;
    let (cx, top) = p.at(0.5, -0.02);
    let left = cx - band_w / 2.0;
    let band_top = top - band_h;
    fill_rect(frame, left, band_top, band_w, band_h, CROWN, alpha);

    let spike_w = band_w / 3.0;
    let spike_h = band_h * 2.2;
    for i in 0..3 {
        let x0 = left + spike_w * i as f64;
        fill_triangle(
            frame,
            (x0, band_top),
            (x0 + spike_w, band_top),
            (x0 + spike_w / 2.0, band_top - spike_h),
            CROWN,
            alpha,
        );
    }
}

/// Number of sparkles drawn at an intensity.
pub fn sparkle_count(intensity: u8) -> u32 {
    let strength = intensity.min(MAX_INTENSITY) as f64 / MAX_INTENSITY as f64;
    ((strength * MAX_SPARKLES as f64).round() as u32).max(1)
}

fn draw_sparkles(frame: &mut Frame, p: &Placement, intensity: u8, alpha: f32) {
    let (cx, cy) = p.at(0.5, 0.45);
    let base_radius = 0.5 * p.face_w.max(p.face_h) * p.scale;
    let size = (0.05 * p.face_w * p.scale).max(1.0);

    for i in 0..sparkle_count(intensity) {
        let angle = i as f64 * GOLDEN_ANGLE;
        let spread = 1.05 + 0.3 * ((i as f64 * 0.618_033_988_75).fract());
        let x = cx + angle.cos() * base_radius * spread;
        let y = cy + angle.sin() * base_radius * spread;
        draw_sparkle(frame, x, y, size, SPARKLE, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_media_model::effect::DecorationGeometry;
    use duet_media_model::geometry::Rect;

    fn anchor() -> AnchorFrame {
        AnchorFrame::from_face_box(Rect::new(0.3, 0.3, 0.4, 0.4))
    }

    fn decoration(kind: DecorationKind, intensity: u8) -> AnchoredDecoration {
        AnchoredDecoration {
            kind,
            intensity,
            geometry: DecorationGeometry::default(),
        }
    }

    #[test]
    fn every_decoration_draws_something() {
        for kind in DecorationKind::ALL {
            let mut frame = Frame::new(96, 96);
            let before = frame.clone();
            draw_decoration(&mut frame, &decoration(kind, 100), &anchor());
            assert_ne!(frame, before, "{kind:?} drew nothing");
        }
    }

    #[test]
    fn zero_intensity_draws_nothing() {
        let mut frame = Frame::new(64, 64);
        let before = frame.clone();
        draw_decoration(&mut frame, &decoration(DecorationKind::Crown, 0), &anchor());
        assert_eq!(frame, before);
    }

    #[test]
    fn decorations_are_deterministic() {
        let mut a = Frame::new(80, 80);
        let mut b = Frame::new(80, 80);
        let sparkles = decoration(DecorationKind::Sparkles, 60);
        draw_decoration(&mut a, &sparkles, &anchor());
        draw_decoration(&mut b, &sparkles, &anchor());
        assert_eq!(a, b);
    }

    #[test]
    fn geometry_offset_moves_the_decoration() {
        let mut base = Frame::new(80, 80);
        let mut moved = Frame::new(80, 80);
        let ears = decoration(DecorationKind::Ears, 100);
        let shifted = AnchoredDecoration {
            geometry: DecorationGeometry {
                offset: Point2D::new(0.0, 0.5),
                scale: 1.0,
            },
            ..ears
        };
        draw_decoration(&mut base, &ears, &anchor());
        draw_decoration(&mut moved, &shifted, &anchor());
        assert_ne!(base, moved);
    }

    #[test]
    fn sparkle_count_scales_with_intensity() {
        assert_eq!(sparkle_count(0), 1);
        assert_eq!(sparkle_count(50), 12);
        assert_eq!(sparkle_count(100), MAX_SPARKLES);
    }
}
