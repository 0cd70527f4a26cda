//! RGBA frame buffers.

use duet_common::error::{DuetError, DuetResult};
use serde::{Deserialize, Serialize};

use crate::geometry::PixelRect;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Rec. 601 luma in `[0, 255]`.
    pub fn luma(&self) -> f32 {
        0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32
    }
}

/// A row-major RGBA8 pixel buffer.
///
/// Frames are always opaque canvases: compositing writes color channels and
/// keeps alpha at 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel.
    pub const BPP: usize = 4;

    /// Create an opaque black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::BLACK)
    }

    /// Create a frame filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let mut frame = Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * Self::BPP],
        };
        frame.fill(color);
        frame
    }

    /// Wrap an existing RGBA buffer.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> DuetResult<Self> {
        let expected = width as usize * height as usize * Self::BPP;
        if data.len() != expected {
            return Err(DuetError::invalid_state(format!(
                "RGBA buffer for {width}x{height} must be {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::full(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::BPP
    }

    /// Read one pixel. Out-of-bounds reads return `None`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some(Rgba::rgba(
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ))
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i] = color.r;
        self.data[i + 1] = color.g;
        self.data[i + 2] = color.b;
        self.data[i + 3] = color.a;
    }

    /// Source-over blend of `color` at `alpha` onto one pixel.
    ///
    /// `alpha` is multiplied with the color's own alpha channel.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba, alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let a = (alpha * color.a as f32 / 255.0).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let i = self.offset(x, y);
        self.data[i] = blend_channel(self.data[i], color.r, a);
        self.data[i + 1] = blend_channel(self.data[i + 1], color.g, a);
        self.data[i + 2] = blend_channel(self.data[i + 2], color.b, a);
        self.data[i + 3] = 255;
    }

    /// Add `weight * color` to the pixel, saturating each channel at 255.
    pub fn add_pixel(&mut self, x: u32, y: u32, color: Rgba, weight: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = (weight * color.a as f32 / 255.0).clamp(0.0, 1.0);
        if w <= 0.0 {
            return;
        }
        let i = self.offset(x, y);
        self.data[i] = add_channel(self.data[i], color.r, w);
        self.data[i + 1] = add_channel(self.data[i + 1], color.g, w);
        self.data[i + 2] = add_channel(self.data[i + 2], color.b, w);
        self.data[i + 3] = 255;
    }

    /// Fill the whole frame with one color.
    pub fn fill(&mut self, color: Rgba) {
        for px in self.data.chunks_exact_mut(Self::BPP) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = color.a;
        }
    }

    /// Fill a pixel region with one color (clipped to the frame).
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        let rect = rect.clamp_to(self.width, self.height);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.put_pixel(x, y, color);
            }
        }
    }

    /// Overwrite this frame with the contents of `other`, reusing the
    /// allocation when the sizes match.
    pub fn copy_from(&mut self, other: &Frame) {
        if self.data.len() == other.data.len() {
            self.data.copy_from_slice(&other.data);
        } else {
            self.data.clear();
            self.data.extend_from_slice(&other.data);
        }
        self.width = other.width;
        self.height = other.height;
    }

    /// Flip the frame horizontally in place (selfie mirroring).
    pub fn mirror_horizontal(&mut self) {
        let w = self.width as usize;
        let row_len = w * Self::BPP;
        for row in self.data.chunks_exact_mut(row_len.max(1)) {
            for x in 0..w / 2 {
                let left = x * Self::BPP;
                let right = (w - 1 - x) * Self::BPP;
                for c in 0..Self::BPP {
                    row.swap(left + c, right + c);
                }
            }
        }
    }
}

#[inline]
fn blend_channel(dst: u8, src: u8, alpha: f32) -> u8 {
    (src as f32 * alpha + dst as f32 * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}

#[inline]
fn add_channel(dst: u8, src: u8, weight: f32) -> u8 {
    (dst as f32 + src as f32 * weight).round().min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_opaque_black() {
        let frame = Frame::new(4, 2);
        assert_eq!(frame.data().len(), 4 * 2 * 4);
        assert_eq!(frame.pixel(3, 1), Some(Rgba::BLACK));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(Frame::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(Frame::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn blend_half_alpha_averages() {
        let mut frame = Frame::filled(1, 1, Rgba::rgb(0, 100, 200));
        frame.blend_pixel(0, 0, Rgba::rgb(200, 100, 0), 0.5);
        assert_eq!(frame.pixel(0, 0), Some(Rgba::rgb(100, 100, 100)));
    }

    #[test]
    fn blend_respects_color_alpha() {
        let mut frame = Frame::filled(1, 1, Rgba::BLACK);
        frame.blend_pixel(0, 0, Rgba::rgba(255, 255, 255, 0), 1.0);
        assert_eq!(frame.pixel(0, 0), Some(Rgba::BLACK));
    }

    #[test]
    fn add_saturates_per_channel() {
        let mut frame = Frame::filled(1, 1, Rgba::rgb(200, 10, 0));
        frame.add_pixel(0, 0, Rgba::rgb(200, 100, 40), 0.5);
        assert_eq!(frame.pixel(0, 0), Some(Rgba::rgb(255, 60, 20)));
    }

    #[test]
    fn mirror_swaps_columns() {
        let mut frame = Frame::new(3, 1);
        frame.put_pixel(0, 0, Rgba::rgb(255, 0, 0));
        frame.put_pixel(2, 0, Rgba::rgb(0, 0, 255));
        frame.mirror_horizontal();
        assert_eq!(frame.pixel(0, 0), Some(Rgba::rgb(0, 0, 255)));
        assert_eq!(frame.pixel(2, 0), Some(Rgba::rgb(255, 0, 0)));
    }

    #[test]
    fn copy_from_resizes_when_needed() {
        let mut a = Frame::new(2, 2);
        let b = Frame::filled(3, 1, Rgba::WHITE);
        a.copy_from(&b);
        assert_eq!(a, b);
    }
}
