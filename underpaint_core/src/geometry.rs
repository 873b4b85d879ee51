// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversions between `kurbo` layer-space geometry and integer pixel spans.
//!
//! Layer, tile, and dirty geometry is carried as [`kurbo::Rect`] and
//! [`kurbo::Size`] throughout the crate. Pixel buffers are addressed with
//! unsigned integers, so every place where the two meet goes through the
//! helpers here.

use kurbo::{Rect, Size};

/// A half-open, non-empty span of pixels `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelSpan {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive).
    pub y0: u32,
    /// Right edge (exclusive).
    pub x1: u32,
    /// Bottom edge (exclusive).
    pub y1: u32,
}

impl PixelSpan {
    /// Width in pixels.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.x1 - self.x0
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.y1 - self.y0
    }

    /// Returns the span as a layer-space rectangle.
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }
}

/// Returns `true` if `rect` covers no area.
///
/// Inverted and NaN rectangles count as empty.
#[must_use]
pub fn is_empty_rect(rect: Rect) -> bool {
    !(rect.width() > 0.0 && rect.height() > 0.0)
}

/// Returns `true` if `size` covers no area.
#[must_use]
pub fn is_empty_size(size: Size) -> bool {
    !(size.width > 0.0 && size.height > 0.0)
}

/// Returns `true` if the two rectangles share a non-empty area.
#[must_use]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    !is_empty_rect(a.intersect(b))
}

/// Clips `rect` to `clip`, returning `None` when nothing remains.
#[must_use]
pub fn clip_rect(rect: Rect, clip: Rect) -> Option<Rect> {
    let clipped = rect.abs().intersect(clip);
    (!is_empty_rect(clipped)).then_some(clipped)
}

/// Returns the pixel dimensions of a layer of the given size.
///
/// Fractional sizes round up so the bitmap always covers the layer.
/// Returns `None` for empty sizes.
#[must_use]
pub fn pixel_size(size: Size) -> Option<(u32, u32)> {
    if is_empty_size(size) {
        return None;
    }
    let size = size.ceil();
    Some((to_pixel(size.width), to_pixel(size.height)))
}

/// Converts `rect` to the pixel span it covers inside a `width × height`
/// buffer.
///
/// Edges are rounded to the nearest pixel boundary and clamped to the
/// buffer. Returns `None` when nothing remains.
#[must_use]
pub fn pixel_span(rect: Rect, width: u32, height: u32) -> Option<PixelSpan> {
    let rect = rect.abs().round();
    let x0 = to_pixel(rect.x0).min(width);
    let y0 = to_pixel(rect.y0).min(height);
    let x1 = to_pixel(rect.x1).min(width);
    let y1 = to_pixel(rect.y1).min(height);
    (x0 < x1 && y0 < y1).then_some(PixelSpan { x0, y0, x1, y1 })
}

/// Saturating conversion of a layer-space coordinate to a pixel index.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to the u32 range before the cast"
)]
fn to_pixel(v: f64) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else if v >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        v as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_and_nan_rects_are_empty() {
        assert!(is_empty_rect(Rect::new(10.0, 0.0, 0.0, 10.0)));
        assert!(is_empty_rect(Rect::new(0.0, 0.0, f64::NAN, 10.0)));
        assert!(!is_empty_rect(Rect::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn clip_rect_normalizes_before_clipping() {
        let clipped = clip_rect(
            Rect::new(50.0, 50.0, -10.0, -10.0),
            Rect::new(0.0, 0.0, 20.0, 20.0),
        );
        assert_eq!(clipped, Some(Rect::new(0.0, 0.0, 20.0, 20.0)));
    }

    #[test]
    fn clip_rect_outside_is_none() {
        let clipped = clip_rect(
            Rect::new(30.0, 30.0, 40.0, 40.0),
            Rect::new(0.0, 0.0, 20.0, 20.0),
        );
        assert_eq!(clipped, None);
    }

    #[test]
    fn pixel_size_rounds_up() {
        assert_eq!(pixel_size(Size::new(10.2, 3.0)), Some((11, 3)));
        assert_eq!(pixel_size(Size::new(0.0, 3.0)), None);
    }

    #[test]
    fn pixel_span_clamps_to_buffer() {
        let span = pixel_span(Rect::new(-5.0, 2.4, 120.0, 7.6), 100, 50).unwrap();
        assert_eq!(
            span,
            PixelSpan {
                x0: 0,
                y0: 2,
                x1: 100,
                y1: 8,
            }
        );
        assert_eq!(span.width(), 100);
        assert_eq!(span.height(), 6);
    }

    #[test]
    fn pixel_span_outside_buffer_is_none() {
        assert_eq!(pixel_span(Rect::new(200.0, 0.0, 300.0, 10.0), 100, 50), None);
    }
}
