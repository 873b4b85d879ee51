// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU pixel storage and the compositing surface seam.

use core::fmt;

use kurbo::{Point, Rect};

use crate::error::RasterError;
use crate::geometry::{PixelSpan, pixel_span};

/// A premultiplied RGBA8 pixel.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red, premultiplied by alpha.
    pub r: u8,
    /// Green, premultiplied by alpha.
    pub g: u8,
    /// Blue, premultiplied by alpha.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Creates a pixel from premultiplied components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque pixel.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Composites `self` over `dst` (premultiplied source-over).
    #[must_use]
    pub fn over(self, dst: Self) -> Self {
        match self.a {
            255 => self,
            0 => dst,
            a => {
                let inv = 255 - u16::from(a);
                Self {
                    r: blend_channel(self.r, dst.r, inv),
                    g: blend_channel(self.g, dst.g, inv),
                    b: blend_channel(self.b, dst.b, inv),
                    a: blend_channel(self.a, dst.a, inv),
                }
            }
        }
    }
}

impl fmt::Debug for Rgba8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rgba8(#{:02x}{:02x}{:02x}{:02x})",
            self.r, self.g, self.b, self.a
        )
    }
}

fn blend_channel(src: u8, dst: u8, inv_alpha: u16) -> u8 {
    // Rounded division by 255; the sum never exceeds 255 for premultiplied input.
    let scaled = (u16::from(dst) * inv_alpha + 127) / 255;
    u8::try_from(u16::from(src) + scaled).unwrap_or(u8::MAX)
}

/// A `width × height` buffer of [`Rgba8`] pixels in row-major order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Allocates a buffer filled with `fill`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::DimensionsOverflow`] if the pixel count does not
    /// fit in memory addressing, or [`RasterError::AllocationFailed`] if the
    /// allocator refuses the request.
    pub fn try_new(width: u32, height: u32, fill: Rgba8) -> Result<Self, RasterError> {
        let len = pixel_count(width, height)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| RasterError::AllocationFailed { width, height })?;
        pixels.resize(len, fill);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Returns a zero-sized buffer that owns no storage.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `true` if the buffer holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The buffer's extent as a rectangle at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Returns the pixel at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Row-major view of all pixels.
    #[must_use]
    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// Overwrites every pixel with `color`.
    pub fn clear(&mut self, color: Rgba8) {
        self.pixels.fill(color);
    }

    /// Overwrites the pixels covered by `rect` with `color` (no blending).
    pub fn clear_rect(&mut self, rect: Rect, color: Rgba8) {
        if let Some(span) = pixel_span(rect, self.width, self.height) {
            for y in span.y0..span.y1 {
                let row = self.row_range(y, span);
                self.pixels[row].fill(color);
            }
        }
    }

    /// Composites `color` over the pixels covered by `rect`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        if color.a == 255 {
            self.clear_rect(rect, color);
            return;
        }
        if let Some(span) = pixel_span(rect, self.width, self.height) {
            for y in span.y0..span.y1 {
                let row = self.row_range(y, span);
                for px in &mut self.pixels[row] {
                    *px = color.over(*px);
                }
            }
        }
    }

    /// Copies `src` into this buffer with its top-left corner at `dest`,
    /// replacing the destination pixels.
    ///
    /// Parts of `src` that fall outside this buffer are dropped.
    pub fn copy_from(&mut self, src: &Self, dest: Point) {
        self.transfer(src, src.bounds(), dest, |s, _| s);
    }

    /// Composites `src_rect` of `src` over this buffer with the rectangle's
    /// top-left corner landing at `dest`.
    pub fn blend_from(&mut self, src: &Self, src_rect: Rect, dest: Point) {
        self.transfer(src, src_rect, dest, Rgba8::over);
    }

    fn transfer(
        &mut self,
        src: &Self,
        src_rect: Rect,
        dest: Point,
        mut combine: impl FnMut(Rgba8, Rgba8) -> Rgba8,
    ) {
        let Some(src_span) = pixel_span(src_rect, src.width, src.height) else {
            return;
        };
        let dest_rect = src_span.to_rect() + (dest.round() - src_span.to_rect().origin());
        let Some(dest_span) = pixel_span(dest_rect, self.width, self.height) else {
            return;
        };
        // Offset from destination to source coordinates, in pixels.
        let dx = dest_rect.x0 - f64::from(src_span.x0);
        let dy = dest_rect.y0 - f64::from(src_span.y0);
        for y in dest_span.y0..dest_span.y1 {
            let Some(sy) = offset(y, dy) else { continue };
            for x in dest_span.x0..dest_span.x1 {
                let Some(sx) = offset(x, dx) else { continue };
                if let Some(s) = src.pixel(sx, sy) {
                    let idx = self.index(x, y);
                    self.pixels[idx] = combine(s, self.pixels[idx]);
                }
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn row_range(&self, y: u32, span: PixelSpan) -> core::ops::Range<usize> {
        self.index(span.x0, y)..self.index(span.x1, y)
    }
}

/// Maps a destination coordinate back to the source by subtracting `delta`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "delta is an integral pixel offset and the result is range-checked"
)]
fn offset(v: u32, delta: f64) -> Option<u32> {
    let s = f64::from(v) - delta;
    (s >= 0.0 && s < f64::from(u32::MAX)).then(|| s as u32)
}

fn pixel_count(width: u32, height: u32) -> Result<usize, RasterError> {
    (width as usize)
        .checked_mul(height as usize)
        .filter(|len| len.checked_mul(size_of::<Rgba8>()).is_some())
        .ok_or(RasterError::DimensionsOverflow { width, height })
}

/// Destination of a compositing draw.
///
/// The compositor's screen surface implements this; [`PixelBuffer`] does too,
/// which is what tests and CPU compositing use.
pub trait CompositeSurface {
    /// Draws `src_rect` of `src` with its top-left corner at `dest_origin`.
    fn draw_pixels(&mut self, src: &PixelBuffer, src_rect: Rect, dest_origin: Point);
}

impl CompositeSurface for PixelBuffer {
    fn draw_pixels(&mut self, src: &PixelBuffer, src_rect: Rect, dest_origin: Point) {
        self.blend_from(src, src_rect, dest_origin);
    }
}
