// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded display lists.
//!
//! A [`PictureRecorder`] captures a layer's draw commands on the UI thread.
//! [`PictureRecorder::finish`] seals them into an immutable [`Picture`] that
//! is moved into exactly one raster task and replayed there, possibly on a
//! worker thread. The dispatcher never looks inside a picture.

use kurbo::{Point, Rect};

use crate::geometry::clip_rect;
use crate::pixel::{PixelBuffer, Rgba8};

/// A single recorded draw command, in picture coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
enum DrawOp {
    /// Replace every pixel inside the picture bounds.
    Clear(Rgba8),
    /// Composite a solid rectangle.
    FillRect { rect: Rect, color: Rgba8 },
}

/// Records draw commands into a [`Picture`].
#[derive(Debug)]
pub struct PictureRecorder {
    bounds: Rect,
    ops: Vec<DrawOp>,
}

impl PictureRecorder {
    /// Begins recording a picture covering `bounds`.
    ///
    /// Commands outside `bounds` are dropped at record time.
    #[must_use]
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ops: Vec::new(),
        }
    }

    /// The rectangle this recording is bounded by.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Records a clear of the whole picture to `color`.
    pub fn clear(&mut self, color: Rgba8) {
        // Everything recorded so far is now invisible.
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    /// Records a solid rectangle fill.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        if color.a == 0 {
            return;
        }
        if let Some(rect) = clip_rect(rect, self.bounds) {
            self.ops.push(DrawOp::FillRect { rect, color });
        }
    }

    /// Number of commands recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Seals the recording.
    #[must_use]
    pub fn finish(self) -> Picture {
        Picture {
            bounds: self.bounds,
            ops: self.ops.into_boxed_slice(),
        }
    }
}

/// An immutable, replayable list of draw commands bounded by a rectangle.
///
/// Pictures are `Send` so they can be replayed on a raster worker, and not
/// `Clone`: each recording feeds exactly one raster task.
#[derive(Debug, PartialEq)]
pub struct Picture {
    bounds: Rect,
    ops: Box<[DrawOp]>,
}

impl Picture {
    /// The rectangle the picture was recorded against.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if the picture paints nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replays the picture into `target`.
    ///
    /// `origin` is the picture-space point that maps to the target's
    /// top-left pixel, so a target covering only part of the picture can be
    /// painted by passing that part's origin.
    pub fn playback(&self, target: &mut PixelBuffer, origin: Point) {
        let shift = Point::ZERO - origin;
        let visible = target.bounds().intersect(self.bounds + shift);
        for op in &self.ops {
            match *op {
                DrawOp::Clear(color) => target.clear_rect(visible, color),
                DrawOp::FillRect { rect, color } => target.fill_rect(rect + shift, color),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: Rgba8 = Rgba8::opaque(0, 0, 255);

    #[test]
    fn commands_outside_bounds_are_dropped() {
        let mut rec = PictureRecorder::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        rec.fill_rect(Rect::new(20.0, 20.0, 30.0, 30.0), BLUE);
        rec.fill_rect(Rect::new(5.0, 5.0, 30.0, 30.0), BLUE);
        rec.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Rgba8::TRANSPARENT);
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn clear_discards_earlier_commands() {
        let mut rec = PictureRecorder::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        rec.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), BLUE);
        rec.clear(Rgba8::WHITE);
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn playback_with_origin_paints_sub_region() {
        let mut rec = PictureRecorder::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        rec.fill_rect(Rect::new(6.0, 6.0, 8.0, 8.0), BLUE);
        let picture = rec.finish();

        let mut target = PixelBuffer::try_new(4, 4, Rgba8::TRANSPARENT).unwrap();
        picture.playback(&mut target, Point::new(5.0, 5.0));
        assert_eq!(target.pixel(0, 0), Some(Rgba8::TRANSPARENT));
        assert_eq!(target.pixel(1, 1), Some(BLUE));
        assert_eq!(target.pixel(2, 2), Some(BLUE));
        assert_eq!(target.pixel(3, 3), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn clear_is_limited_to_picture_bounds() {
        let mut rec = PictureRecorder::new(Rect::new(0.0, 0.0, 2.0, 2.0));
        rec.clear(BLUE);
        let picture = rec.finish();

        let mut target = PixelBuffer::try_new(4, 4, Rgba8::TRANSPARENT).unwrap();
        picture.playback(&mut target, Point::ZERO);
        assert_eq!(target.pixel(1, 1), Some(BLUE));
        assert_eq!(target.pixel(2, 2), Some(Rgba8::TRANSPARENT));
    }
}
