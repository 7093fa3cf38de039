// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offscreen pixel buffers.
//!
//! Every component draws into its own [`Bitmap`]. Pixels are stored as
//! premultiplied RGBA8, row-major. The logical [`size`](Bitmap::size) is the
//! allotted size exactly; the pixel grid covers it rounded up.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Size};

/// A straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the premultiplied `[r, g, b, a]` bytes.
    #[must_use]
    pub fn premultiplied(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let mul = |c: u8| div255(u16::from(c) * a);
        [mul(self.r), mul(self.g), mul(self.b), self.a]
    }
}

/// Rounded `x / 255` for `x <= 255 * 255`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the quotient of a product of two bytes by 255 fits in a byte"
)]
fn div255(x: u16) -> u8 {
    ((u32::from(x) + 127) / 255) as u8
}

/// A premultiplied RGBA8 pixel buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bitmap {
    size: Size,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Creates a transparent bitmap of logical size `size`.
    #[must_use]
    pub fn new(size: Size) -> Self {
        let mut bitmap = Self::default();
        bitmap.resize(size);
        bitmap
    }

    /// Resizes to `size`, clearing every pixel.
    pub fn resize(&mut self, size: Size) {
        let (width, height) = pixel_extent(size);
        self.size = size;
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize * 4, 0);
    }

    /// Returns the logical size, as last allotted.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns the pixel width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the pixel height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the premultiplied RGBA8 bytes, row-major.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the premultiplied pixel at `(x, y)`, or `None` out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.offset(x, y)?;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrites the pixel at `(x, y)` with premultiplied bytes.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(i) = self.offset(x, y) {
            self.data[i..i + 4].copy_from_slice(&rgba);
        }
    }

    /// Makes every pixel transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Overwrites every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        let px = color.premultiplied();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Composites `color` over the pixels covered by `rect`.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let px = color.premultiplied();
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, px, 255);
            }
        }
    }

    /// Composites a `width`-pixel outline of `rect`.
    pub fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) {
        let r = rect.abs();
        let w = width.min(r.width() / 2.0).min(r.height() / 2.0).max(0.0);
        if w == 0.0 {
            return;
        }
        self.fill_rect(Rect::new(r.x0, r.y0, r.x1, r.y0 + w), color);
        self.fill_rect(Rect::new(r.x0, r.y1 - w, r.x1, r.y1), color);
        self.fill_rect(Rect::new(r.x0, r.y0 + w, r.x0 + w, r.y1 - w), color);
        self.fill_rect(Rect::new(r.x1 - w, r.y0 + w, r.x1, r.y1 - w), color);
    }

    /// Composites `src` at `origin` with the given opacity (source-over).
    pub fn draw(&mut self, src: &Self, origin: Point, opacity: f64) {
        let alpha = opacity_byte(opacity);
        if alpha == 0 {
            return;
        }
        let ox = round_to_i64(origin.x);
        let oy = round_to_i64(origin.y);
        for sy in 0..src.height {
            let dy = oy + i64::from(sy);
            if dy < 0 || dy >= i64::from(self.height) {
                continue;
            }
            for sx in 0..src.width {
                let dx = ox + i64::from(sx);
                if dx < 0 || dx >= i64::from(self.width) {
                    continue;
                }
                if let Some(px) = src.pixel(sx, sy) {
                    #[expect(
                        clippy::cast_possible_truncation,
                        reason = "bounds were checked against u32 dimensions above"
                    )]
                    self.blend(dx as u32, dy as u32, px, alpha);
                }
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    /// Source-over blend of premultiplied `src` scaled by `alpha`.
    fn blend(&mut self, x: u32, y: u32, src: [u8; 4], alpha: u8) {
        let Some(i) = self.offset(x, y) else {
            return;
        };
        let scale = |c: u8| div255(u16::from(c) * u16::from(alpha));
        let src = src.map(scale);
        let inv = 255 - u16::from(src[3]);
        for c in 0..4 {
            let dst = u16::from(self.data[i + c]);
            self.data[i + c] = src[c].saturating_add(div255(dst * inv));
        }
    }

    /// Clips `rect` to the pixel grid.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "values are clamped into the pixel grid first"
    )]
    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let r = rect.abs();
        let x0 = r.x0.round().clamp(0.0, f64::from(self.width)) as u32;
        let y0 = r.y0.round().clamp(0.0, f64::from(self.height)) as u32;
        let x1 = r.x1.round().clamp(0.0, f64::from(self.width)) as u32;
        let y1 = r.y1.round().clamp(0.0, f64::from(self.height)) as u32;
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

/// Pixel grid covering `size`, rounded up.
#[expect(
    clippy::cast_possible_truncation,
    reason = "sizes are validated finite and non-negative; the grid saturates"
)]
fn pixel_extent(size: Size) -> (u32, u32) {
    let w = size.width.max(0.0).ceil();
    let h = size.height.max(0.0).ceil();
    (w as u32, h as u32)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "opacity is clamped into 0..=1 first"
)]
fn opacity_byte(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "screen coordinates are far below i64 range"
)]
fn round_to_i64(v: f64) -> i64 {
    v.round() as i64
}
