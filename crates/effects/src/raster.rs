//! Small anti-alias-free raster primitives used by decorations.
//!
//! Coordinates are in pixels (floating point, pixel centers at `+0.5`).
//! Everything is clipped to the frame and blended source-over.

use duet_media_model::frame::{Frame, Rgba};

/// Pixel-space bounding box clipped to the frame: `(x0, y0, x1, y1)` exclusive.
fn clip_box(frame: &Frame, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 || !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return None;
    }
    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(w);
    let y1 = (max_y.ceil().max(0.0) as u32).min(h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// Filled disc.
pub fn fill_circle(frame: &mut Frame, cx: f64, cy: f64, radius: f64, color: Rgba, alpha: f32) {
    if radius <= 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = clip_box(frame, cx - radius, cy - radius, cx + radius, cy + radius)
    else {
        return;
    };
    let r2 = radius * radius;
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                frame.blend_pixel(x, y, color, alpha);
            }
        }
    }
}

/// Circle outline of the given stroke thickness.
pub fn stroke_ring(
    frame: &mut Frame,
    cx: f64,
    cy: f64,
    radius: f64,
    thickness: f64,
    color: Rgba,
    alpha: f32,
) {
    if radius <= 0.0 || thickness <= 0.0 {
        return;
    }
    let outer = radius + thickness / 2.0;
    let inner = (radius - thickness / 2.0).max(0.0);
    let Some((x0, y0, x1, y1)) = clip_box(frame, cx - outer, cy - outer, cx + outer, cy + outer)
    else {
        return;
    };
    let (outer2, inner2) = (outer * outer, inner * inner);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 <= outer2 && d2 >= inner2 {
                frame.blend_pixel(x, y, color, alpha);
            }
        }
    }
}

/// Filled triangle.
pub fn fill_triangle(
    frame: &mut Frame,
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    color: Rgba,
    alpha: f32,
) {
    let min_x = a.0.min(b.0).min(c.0);
    let min_y = a.1.min(b.1).min(c.1);
    let max_x = a.0.max(b.0).max(c.0);
    let max_y = a.1.max(b.1).max(c.1);
    let Some((x0, y0, x1, y1)) = clip_box(frame, min_x, min_y, max_x, max_y) else {
        return;
    };

    let edge = |p: (f64, f64), q: (f64, f64), x: f64, y: f64| {
        (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
    };
    let area = edge(a, b, c.0, c.1);
    if area.abs() < f64::EPSILON {
        return;
    }

    for y in y0..y1 {
        for x in x0..x1 {
            let px = x as f64 + 0.5;
            let py = y as f64 + 0.5;
            let w0 = edge(b, c, px, py);
            let w1 = edge(c, a, px, py);
            let w2 = edge(a, b, px, py);
            let inside = if area > 0.0 {
                w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
            } else {
                w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
            };
            if inside {
                frame.blend_pixel(x, y, color, alpha);
            }
        }
    }
}

/// Axis-aligned filled rectangle in floating pixel coordinates.
pub fn fill_rect(frame: &mut Frame, x: f64, y: f64, w: f64, h: f64, color: Rgba, alpha: f32) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = clip_box(frame, x, y, x + w, y + h) else {
        return;
    };
    for py in y0..y1 {
        for px in x0..x1 {
            frame.blend_pixel(px, py, color, alpha);
        }
    }
}

/// Thick line segment.
pub fn draw_line(
    frame: &mut Frame,
    from: (f64, f64),
    to: (f64, f64),
    thickness: f64,
    color: Rgba,
    alpha: f32,
) {
    let half = (thickness / 2.0).max(0.5);
    let Some((x0, y0, x1, y1)) = clip_box(
        frame,
        from.0.min(to.0) - half,
        from.1.min(to.1) - half,
        from.0.max(to.0) + half,
        from.1.max(to.1) + half,
    ) else {
        return;
    };

    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len2 = dx * dx + dy * dy;
    for y in y0..y1 {
        for x in x0..x1 {
            let px = x as f64 + 0.5;
            let py = y as f64 + 0.5;
            let t = if len2 > 0.0 {
                (((px - from.0) * dx + (py - from.1) * dy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (nx, ny) = (from.0 + dx * t, from.1 + dy * t);
            if (px - nx).powi(2) + (py - ny).powi(2) <= half * half {
                frame.blend_pixel(x, y, color, alpha);
            }
        }
    }
}

/// Four-point twinkle: a cross of two thin lines plus a bright core.
pub fn draw_sparkle(frame: &mut Frame, cx: f64, cy: f64, size: f64, color: Rgba, alpha: f32) {
    let arm = size.max(1.0);
    let thickness = (arm / 4.0).max(1.0);
    draw_line(frame, (cx - arm, cy), (cx + arm, cy), thickness, color, alpha);
    draw_line(frame, (cx, cy - arm), (cx, cy + arm), thickness, color, alpha);
    fill_circle(frame, cx, cy, (arm / 3.0).max(0.75), Rgba::WHITE, alpha);
}
