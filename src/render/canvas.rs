//! Caller-owned pixel buffer.
//!
//! Pixels are premultiplied ARGB packed as `0xAARRGGBB`. Every write is
//! clipped per pixel, so layout output that overflows the panel is simply
//! cut off.

use image::RgbaImage;
use thiserror::Error;

use crate::document::{Rect, Rgb};
use crate::interaction::InteractionIndex;

/// Alpha given to transparent pixels under clickable regions.
pub const HIT_ALPHA: u32 = 0x01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("pixel buffer holds {len} pixels but {width}x{height} needs {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        len: usize,
        expected: usize,
    },
}

pub struct Canvas<'a> {
    pixels: &'a mut [u32],
    width: u32,
    height: u32,
}

const fn pack(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << 24) | (r << 16) | (g << 8) | b
}

const fn channels(pixel: u32) -> [u32; 4] {
    [pixel >> 24, (pixel >> 16) & 0xFF, (pixel >> 8) & 0xFF, pixel & 0xFF]
}

// x * a / 255 with rounding
const fn mul_div(x: u32, a: u32) -> u32 {
    let t = x * a + 128;
    (t + (t >> 8)) >> 8
}

impl<'a> Canvas<'a> {
    pub fn new(pixels: &'a mut [u32], width: u32, height: u32) -> Result<Self, CanvasError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(CanvasError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
                expected,
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        self.pixels
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Fill with an opaque color, or transparent when `None`.
    pub fn clear(&mut self, background: Option<Rgb>) {
        let value = background.map_or(0, |c| {
            pack(0xFF, u32::from(c.r), u32::from(c.g), u32::from(c.b))
        });
        self.pixels.fill(value);
    }

    /// Composite `color` at `coverage` over the pixel (source-over).
    pub fn blend(&mut self, x: i32, y: i32, color: Rgb, coverage: u8) {
        if coverage == 0 {
            return;
        }
        let Some(i) = self.index(x, y) else {
            return;
        };
        let a = u32::from(coverage);
        let src = [
            a,
            mul_div(u32::from(color.r), a),
            mul_div(u32::from(color.g), a),
            mul_div(u32::from(color.b), a),
        ];
        let dst = channels(self.pixels[i]);
        let keep = 255 - a;
        self.pixels[i] = pack(
            src[0] + mul_div(dst[0], keep),
            src[1] + mul_div(dst[1], keep),
            src[2] + mul_div(dst[2], keep),
            src[3] + mul_div(dst[3], keep),
        );
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let (x0, x1) = (rect.left.max(0), rect.right.min(self.width as i32));
        let (y0, y1) = (rect.top.max(0), rect.bottom.min(self.height as i32));
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color, 255);
            }
        }
    }

    /// Outline of `rect`, `stroke` pixels wide, drawn inside it.
    pub fn stroke_rect(&mut self, rect: Rect, stroke: i32, color: Rgb) {
        let stroke = stroke.max(1);
        let Rect {
            left,
            top,
            right,
            bottom,
        } = rect;
        self.fill_rect(Rect::new(left, top, right, top + stroke), color);
        self.fill_rect(Rect::new(left, bottom - stroke, right, bottom), color);
        self.fill_rect(Rect::new(left, top + stroke, left + stroke, bottom - stroke), color);
        self.fill_rect(Rect::new(right - stroke, top + stroke, right, bottom - stroke), color);
    }

    /// Give fully transparent pixels inside clickable regions a minimal alpha
    /// so a layered window still receives clicks between glyph strokes.
    pub fn mark_hit_regions(&mut self, index: &InteractionIndex) {
        for hit in index.regions() {
            let rect = hit.rect;
            for y in rect.top.max(0)..rect.bottom.min(self.height as i32) {
                for x in rect.left.max(0)..rect.right.min(self.width as i32) {
                    if let Some(i) = self.index(x, y)
                        && self.pixels[i] >> 24 == 0
                    {
                        self.pixels[i] = HIT_ALPHA << 24;
                    }
                }
            }
        }
    }

    /// Straight-alpha RGBA copy for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let pixel = self.pixels[y as usize * self.width as usize + x as usize];
            let [a, r, g, b] = channels(pixel);
            let unmultiply = |c: u32| {
                if a == 0 {
                    0
                } else {
                    ((c * 255 + a / 2) / a).min(255) as u8
                }
            };
            image::Rgba([unmultiply(r), unmultiply(g), unmultiply(b), a as u8])
        })
    }
}
