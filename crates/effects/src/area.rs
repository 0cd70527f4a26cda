//! Area transforms: filters applied over the whole frame or a fixed region.
//!
//! Every transform is the identity at intensity 0 and scales linearly with
//! intensity into its own parameter.

use duet_media_model::effect::{AreaKind, AreaTransform, MAX_INTENSITY};
use duet_media_model::frame::{Frame, Rgba};
use duet_media_model::geometry::PixelRect;

/// Blur radius in pixels at intensity 100.
pub const MAX_BLUR_RADIUS: u32 = 12;

/// Tint color.
pub const TINT_COLOR: Rgba = Rgba::rgb(255, 105, 180);

/// Tint opacity at intensity 100.
pub const MAX_TINT_ALPHA: f32 = 0.5;

/// Brightness gain added at intensity 100 (1.0 + this).
pub const MAX_BRIGHTNESS_GAIN: f32 = 0.5;

/// Apply one area transform in place.
pub fn apply_area(frame: &mut Frame, transform: &AreaTransform) {
    let strength = transform.intensity.min(MAX_INTENSITY) as f32 / MAX_INTENSITY as f32;
    if strength <= 0.0 || frame.is_empty() {
        return;
    }

    let rect = match transform.region {
        Some(region) => region.to_pixels(frame.width(), frame.height()),
        None => frame.bounds(),
    }
    .clamp_to(frame.width(), frame.height());
    if rect.is_empty() {
        return;
    }

    match transform.kind {
        AreaKind::Blur => box_blur(frame, rect, blur_radius(transform.intensity)),
        AreaKind::Grayscale => map_pixels(frame, rect, |px| {
            let l = px.luma();
            mix(px, [l, l, l], strength)
        }),
        AreaKind::Sepia => map_pixels(frame, rect, |px| {
            let (r, g, b) = (px.r as f32, px.g as f32, px.b as f32);
            let sepia = [
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ];
            mix(px, sepia, strength)
        }),
        AreaKind::Tint => {
            let alpha = strength * MAX_TINT_ALPHA;
            let tint = [TINT_COLOR.r as f32, TINT_COLOR.g as f32, TINT_COLOR.b as f32];
            map_pixels(frame, rect, |px| mix(px, tint, alpha))
        }
        AreaKind::Brightness => {
            let gain = 1.0 + strength * MAX_BRIGHTNESS_GAIN;
            map_pixels(frame, rect, |px| {
                to_rgba(
                    [px.r as f32 * gain, px.g as f32 * gain, px.b as f32 * gain],
                    px.a,
                )
            })
        }
        AreaKind::Invert => map_pixels(frame, rect, |px| {
            let inverted = [
                255.0 - px.r as f32,
                255.0 - px.g as f32,
                255.0 - px.b as f32,
            ];
            mix(px, inverted, strength)
        }),
    }
}

/// Blur radius for an intensity: `intensity / 100 * MAX_BLUR_RADIUS`, rounded.
pub fn blur_radius(intensity: u8) -> u32 {
    let strength = intensity.min(MAX_INTENSITY) as f64 / MAX_INTENSITY as f64;
    (strength * MAX_BLUR_RADIUS as f64).round() as u32
}

fn mix(px: Rgba, target: [f32; 3], t: f32) -> Rgba {
    let lerp = |a: u8, b: f32| a as f32 + (b - a as f32) * t;
    to_rgba([lerp(px.r, target[0]), lerp(px.g, target[1]), lerp(px.b, target[2])], px.a)
}

fn to_rgba(c: [f32; 3], a: u8) -> Rgba {
    let q = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Rgba::rgba(q(c[0]), q(c[1]), q(c[2]), a)
}

fn map_pixels(frame: &mut Frame, rect: PixelRect, f: impl Fn(Rgba) -> Rgba) {
    let stride = frame.width() as usize * Frame::BPP;
    let data = frame.data_mut();
    for y in rect.y..rect.bottom() {
        let row = y as usize * stride;
        for x in rect.x..rect.right() {
            let i = row + x as usize * Frame::BPP;
            let out = f(Rgba::rgba(data[i], data[i + 1], data[i + 2], data[i + 3]));
            data[i] = out.r;
            data[i + 1] = out.g;
            data[i + 2] = out.b;
            data[i + 3] = out.a;
        }
    }
}

/// Separable box blur restricted to `rect`; edges clamp to the region.
fn box_blur(frame: &mut Frame, rect: PixelRect, radius: u32) {
    if radius == 0 {
        return;
    }
    let (w, h) = (rect.width as usize, rect.height as usize);
    let stride = frame.width() as usize * Frame::BPP;

    let mut region = vec![0u8; w * h * Frame::BPP];
    for row in 0..h {
        let src = (rect.y as usize + row) * stride + rect.x as usize * Frame::BPP;
        region[row * w * Frame::BPP..(row + 1) * w * Frame::BPP]
            .copy_from_slice(&frame.data()[src..src + w * Frame::BPP]);
    }

    let mut scratch = vec![0u8; region.len()];
    blur_pass(&region, &mut scratch, w, h, radius as usize, true);
    blur_pass(&scratch, &mut region, w, h, radius as usize, false);

    let data = frame.data_mut();
    for row in 0..h {
        let dst = (rect.y as usize + row) * stride + rect.x as usize * Frame::BPP;
        data[dst..dst + w * Frame::BPP]
            .copy_from_slice(&region[row * w * Frame::BPP..(row + 1) * w * Frame::BPP]);
    }
}

fn blur_pass(src: &[u8], dst: &mut [u8], w: usize, h: usize, radius: usize, horizontal: bool) {
    let (lines, len) = if horizontal { (h, w) } else { (w, h) };
    let index = |line: usize, i: usize| {
        if horizontal {
            (line * w + i) * Frame::BPP
        } else {
            (i * w + line) * Frame::BPP
        }
    };
    let last = len - 1;
    let window = (2 * radius + 1) as u32;

    for line in 0..lines {
        for c in 0..3 {
            let mut sum: u32 = 0;
            for k in 0..=2 * radius {
                let i = (k as isize - radius as isize).clamp(0, last as isize) as usize;
                sum += src[index(line, i) + c] as u32;
            }
            for i in 0..len {
                dst[index(line, i) + c] = ((sum + window / 2) / window) as u8;
                let leaving = i.saturating_sub(radius);
                let entering = (i + radius + 1).min(last);
                sum = sum + src[index(line, entering) + c] as u32 - src[index(line, leaving) + c] as u32;
            }
        }
        for i in 0..len {
            dst[index(line, i) + 3] = src[index(line, i) + 3];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_media_model::geometry::Rect;

    fn checker(w: u32, h: u32) -> Frame {
        let mut frame = Frame::new(w, h);
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    frame.put_pixel(x, y, Rgba::WHITE);
                }
            }
        }
        frame
    }

    fn area(kind: AreaKind, intensity: u8) -> AreaTransform {
        AreaTransform {
            kind,
            intensity,
            region: None,
        }
    }

    #[test]
    fn zero_intensity_is_identity() {
        for kind in AreaKind::ALL {
            let mut frame = checker(9, 7);
            let before = frame.clone();
            apply_area(&mut frame, &area(kind, 0));
            assert_eq!(frame, before, "{kind:?} at 0 should not change the frame");
        }
    }

    #[test]
    fn blur_radius_scales_linearly() {
        assert_eq!(blur_radius(0), 0);
        assert_eq!(blur_radius(50), 6);
        assert_eq!(blur_radius(100), MAX_BLUR_RADIUS);
    }

    #[test]
    fn blur_smooths_a_checkerboard() {
        let mut frame = checker(16, 16);
        apply_area(&mut frame, &area(AreaKind::Blur, 100));
        let px = frame.pixel(8, 8).unwrap();
        assert!(px.r > 90 && px.r < 165, "expected mid grey, got {px:?}");
    }

    #[test]
    fn blur_keeps_flat_color_flat() {
        let mut frame = Frame::filled(10, 6, Rgba::rgb(40, 80, 120));
        let before = frame.clone();
        apply_area(&mut frame, &area(AreaKind::Blur, 75));
        assert_eq!(frame, before);
    }

    #[test]
    fn grayscale_full_equalizes_channels() {
        let mut frame = Frame::filled(2, 2, Rgba::rgb(200, 50, 10));
        apply_area(&mut frame, &area(AreaKind::Grayscale, 100));
        let px = frame.pixel(1, 1).unwrap();
        assert_eq!(px.r, px.g);
        assert_eq!(px.g, px.b);
    }

    #[test]
    fn sepia_warms_white() {
        let mut frame = Frame::filled(1, 1, Rgba::rgb(128, 128, 128));
        apply_area(&mut frame, &area(AreaKind::Sepia, 100));
        let px = frame.pixel(0, 0).unwrap();
        assert!(px.r > px.g && px.g > px.b);
    }

    #[test]
    fn region_limits_the_transform() {
        let mut frame = Frame::filled(10, 10, Rgba::rgb(10, 200, 30));
        let transform = AreaTransform {
            kind: AreaKind::Invert,
            intensity: 100,
            region: Some(Rect::new(0.0, 0.0, 0.5, 1.0)),
        };
        apply_area(&mut frame, &transform);
        assert_eq!(frame.pixel(0, 0), Some(Rgba::rgb(245, 55, 225)));
        assert_eq!(frame.pixel(9, 9), Some(Rgba::rgb(10, 200, 30)));
    }

    #[test]
    fn tint_pulls_toward_tint_color() {
        let mut frame = Frame::filled(1, 1, Rgba::BLACK);
        apply_area(&mut frame, &area(AreaKind::Tint, 100));
        let px = frame.pixel(0, 0).unwrap();
        assert_eq!(px.r, 128);
        assert!(px.b > px.g);
    }
}
