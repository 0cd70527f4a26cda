//! Layout composition: places source frames onto the output canvas.
//!
//! Composition happens in two steps. [`plan_layout`] turns a layout mode and
//! canvas size into per-source placement instructions, and [`compose`]
//! executes them. Every placement scales its source to fill the target
//! rectangle (cover), center-cropping whatever overflows. Blend-overlay
//! placements accumulate additively onto the canvas.

use serde::{Deserialize, Serialize};

use duet_common::error::{DuetError, DuetResult};
use duet_media_model::frame::{Frame, Rgba};
use duet_media_model::geometry::PixelRect;
use duet_media_model::layout::LayoutMode;

/// Picture-in-picture inset size relative to the canvas.
pub const PIP_SCALE: f64 = 0.3;

/// Gap between the picture-in-picture inset and the canvas corner.
pub const PIP_MARGIN_PX: u32 = 16;

/// Opacity of the first source in blend-overlay mode.
pub const BLEND_PRIMARY_OPACITY: f32 = 0.7;

/// Opacity of the second source in blend-overlay mode.
pub const BLEND_SECONDARY_OPACITY: f32 = 0.5;

/// How a placement combines with what is already on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Blend {
    /// Source-over with the placement opacity.
    Over,
    /// `canvas + opacity * source`, saturating at white.
    Add,
}

/// Where and how one source is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Index into the layout's source list.
    pub source: usize,

    /// Target rectangle in canvas pixels.
    pub rect: PixelRect,

    /// Opacity (or additive weight) in `[0.0, 1.0]`.
    pub opacity: f32,

    pub blend: Blend,
}

impl Placement {
    fn opaque(source: usize, rect: PixelRect) -> Self {
        Self {
            source,
            rect,
            opacity: 1.0,
            blend: Blend::Over,
        }
    }

    fn additive(source: usize, rect: PixelRect, weight: f32) -> Self {
        Self {
            source,
            rect,
            opacity: weight,
            blend: Blend::Add,
        }
    }
}

/// Placement instructions for one layout, in draw order.
pub fn plan_layout(mode: LayoutMode, width: u32, height: u32) -> Vec<Placement> {
    let full = PixelRect::full(width, height);
    match mode {
        LayoutMode::PairedSideBySide => {
            let left = width / 2;
            vec![
                Placement::opaque(0, PixelRect::new(0, 0, left, height)),
                Placement::opaque(1, PixelRect::new(left, 0, width - left, height)),
            ]
        }
        LayoutMode::PairedStacked => {
            let top = height / 2;
            vec![
                Placement::opaque(0, PixelRect::new(0, 0, width, top)),
                Placement::opaque(1, PixelRect::new(0, top, width, height - top)),
            ]
        }
        LayoutMode::PictureInPicture => vec![
            Placement::opaque(0, full),
            Placement::opaque(1, pip_rect(width, height)),
        ],
        LayoutMode::BlendOverlay => vec![
            Placement::additive(0, full, BLEND_PRIMARY_OPACITY),
            Placement::additive(1, full, BLEND_SECONDARY_OPACITY),
        ],
        LayoutMode::SingleAnchored => vec![Placement::opaque(0, full)],
    }
}

/// Bottom-right picture-in-picture inset. The margin shrinks on tiny canvases.
pub fn pip_rect(width: u32, height: u32) -> PixelRect {
    let w = ((width as f64 * PIP_SCALE).round() as u32).clamp(1.min(width), width);
    let h = ((height as f64 * PIP_SCALE).round() as u32).clamp(1.min(height), height);
    let margin_x = PIP_MARGIN_PX.min((width - w) / 2);
    let margin_y = PIP_MARGIN_PX.min((height - h) / 2);
    PixelRect::new(width - w - margin_x, height - h - margin_y, w, h)
}

/// Compose `sources` onto `canvas` according to `mode`.
///
/// The canvas is cleared to black first, so blended layouts accumulate from
/// black rather than from the previous tick.
pub fn compose(canvas: &mut Frame, mode: LayoutMode, sources: &[&Frame]) -> DuetResult<()> {
    mode.validate_source_count(sources.len())?;
    if canvas.is_empty() {
        return Err(DuetError::invalid_layout("output canvas has no pixels"));
    }

    canvas.fill(Rgba::BLACK);
    for placement in plan_layout(mode, canvas.width(), canvas.height()) {
        draw_cover(
            canvas,
            sources[placement.source],
            placement.rect,
            placement.opacity,
            placement.blend,
        );
    }
    Ok(())
}

/// Draw `src` into `region`, scaled to cover it with a center crop.
///
/// Nearest-neighbour sampling. With [`Blend::Over`], opacity below 1.0 blends
/// source-over; [`Blend::Add`] always accumulates.
pub fn draw_cover(canvas: &mut Frame, src: &Frame, region: PixelRect, opacity: f32, blend: Blend) {
    let region = region.clamp_to(canvas.width(), canvas.height());
    if region.is_empty() || src.is_empty() || opacity <= 0.0 {
        return;
    }

    let (sw, sh) = (src.width() as f64, src.height() as f64);
    let (rw, rh) = (region.width as f64, region.height as f64);
    let scale = (rw / sw).max(rh / sh);
    let crop_x = (sw * scale - rw) / 2.0;
    let crop_y = (sh * scale - rh) / 2.0;

    let max_x = src.width() - 1;
    let max_y = src.height() - 1;
    let column: Vec<u32> = (0..region.width)
        .map(|dx| (((dx as f64 + 0.5 + crop_x) / scale).floor().max(0.0) as u32).min(max_x))
        .collect();

    for dy in 0..region.height {
        let sy = (((dy as f64 + 0.5 + crop_y) / scale).floor().max(0.0) as u32).min(max_y);
        for (dx, &sx) in column.iter().enumerate() {
            let Some(color) = src.pixel(sx, sy) else {
                continue;
            };
            let (x, y) = (region.x + dx as u32, region.y + dy);
            match blend {
                Blend::Add => canvas.add_pixel(x, y, color, opacity),
                Blend::Over if opacity >= 1.0 => canvas.put_pixel(x, y, color),
                Blend::Over => canvas.blend_pixel(x, y, color, opacity),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: Rgba) -> Frame {
        Frame::filled(w, h, color)
    }

    #[test]
    fn side_by_side_splits_the_canvas() {
        let red = solid(4, 4, Rgba::rgb(255, 0, 0));
        let blue = solid(4, 4, Rgba::rgb(0, 0, 255));
        let mut canvas = Frame::new(10, 6);
        compose(&mut canvas, LayoutMode::PairedSideBySide, &[&red, &blue]).unwrap();
        assert_eq!(canvas.pixel(0, 0), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(4, 5), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(5, 0), Some(Rgba::rgb(0, 0, 255)));
        assert_eq!(canvas.pixel(9, 5), Some(Rgba::rgb(0, 0, 255)));
    }

    #[test]
    fn stacked_splits_top_and_bottom() {
        let red = solid(3, 3, Rgba::rgb(255, 0, 0));
        let blue = solid(3, 3, Rgba::rgb(0, 0, 255));
        let mut canvas = Frame::new(8, 9);
        compose(&mut canvas, LayoutMode::PairedStacked, &[&red, &blue]).unwrap();
        assert_eq!(canvas.pixel(7, 3), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(0, 4), Some(Rgba::rgb(0, 0, 255)));
    }

    #[test]
    fn pip_inset_sits_bottom_right_with_margin() {
        let rect = pip_rect(1280, 720);
        assert_eq!(rect, PixelRect::new(1280 - 384 - 16, 720 - 216 - 16, 384, 216));
    }

    #[test]
    fn pip_margin_shrinks_on_tiny_canvas() {
        let rect = pip_rect(10, 10);
        assert!(rect.right() <= 10 && rect.bottom() <= 10);
        assert_eq!(rect.width, 3);
    }

    #[test]
    fn pip_draws_secondary_over_primary() {
        let red = solid(8, 8, Rgba::rgb(255, 0, 0));
        let blue = solid(8, 8, Rgba::rgb(0, 0, 255));
        let mut canvas = Frame::new(200, 100);
        compose(&mut canvas, LayoutMode::PictureInPicture, &[&red, &blue]).unwrap();
        let inset = pip_rect(200, 100);
        assert_eq!(canvas.pixel(0, 0), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(
            canvas.pixel(inset.x + 1, inset.y + 1),
            Some(Rgba::rgb(0, 0, 255))
        );
        assert_eq!(canvas.pixel(199, 99), Some(Rgba::rgb(255, 0, 0)));
    }

    #[test]
    fn blend_overlay_adds_weighted_sources() {
        let red = solid(2, 2, Rgba::rgb(200, 0, 0));
        let green = solid(2, 2, Rgba::rgb(0, 200, 0));
        // Stale content from a previous tick must not leak through.
        let mut canvas = Frame::filled(2, 2, Rgba::rgb(0, 0, 255));
        compose(&mut canvas, LayoutMode::BlendOverlay, &[&red, &green]).unwrap();
        assert_eq!(canvas.pixel(1, 1), Some(Rgba::rgb(140, 100, 0)));
    }

    #[test]
    fn blend_overlay_saturates_at_white() {
        let white = solid(2, 2, Rgba::WHITE);
        let mut canvas = Frame::new(2, 2);
        compose(&mut canvas, LayoutMode::BlendOverlay, &[&white, &white]).unwrap();
        assert_eq!(canvas.pixel(0, 0), Some(Rgba::rgb(255, 255, 255)));
    }

    #[test]
    fn cover_center_crops_wide_sources() {
        // Wide source: left third red, middle green, right third blue.
        let mut src = Frame::new(3, 1);
        src.put_pixel(0, 0, Rgba::rgb(255, 0, 0));
        src.put_pixel(1, 0, Rgba::rgb(0, 255, 0));
        src.put_pixel(2, 0, Rgba::rgb(0, 0, 255));
        let mut canvas = Frame::new(4, 4);
        let bounds = canvas.bounds();
        draw_cover(&mut canvas, &src, bounds, 1.0, Blend::Over);
        // Square target keeps only the middle column.
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(canvas.pixel(x, y), Some(Rgba::rgb(0, 255, 0)));
            }
        }
    }

    #[test]
    fn wrong_source_count_is_rejected() {
        let one = solid(2, 2, Rgba::WHITE);
        let mut canvas = Frame::new(4, 4);
        let err = compose(&mut canvas, LayoutMode::PairedSideBySide, &[&one]).unwrap_err();
        assert!(matches!(err, DuetError::InvalidLayout { .. }));
    }
}
