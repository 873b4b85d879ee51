// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster tasks and the seam through which they reach a worker pool.

use std::sync::Arc;

use kurbo::Rect;

use crate::bitmap::SharedRasterBitmap;
use crate::error::RasterError;
use crate::geometry::pixel_span;
use crate::picture::Picture;
use crate::pixel::{PixelBuffer, Rgba8};

/// One unit of raster work: paint `picture` into `bitmap` within
/// `target_rect`, then release the bitmap reference.
///
/// The task owns its bitmap reference, so the release happens exactly once
/// when the task is consumed by [`run`](Self::run) or dropped unrun, and also
/// while unwinding from a panicking playback.
///
/// A task released before its copy lands (dropped unrun, failed, or
/// panicked) marks the bitmap with
/// [`needs_repaint`](SharedRasterBitmap::needs_repaint) first.
#[derive(Debug)]
pub struct RasterTask {
    bitmap: SharedRasterBitmap,
    picture: Picture,
    target_rect: Rect,
    clear_color: Rgba8,
    finished: bool,
}

impl RasterTask {
    /// Creates a task. `bitmap` should be a reference acquired for this task.
    #[must_use]
    pub fn new(
        bitmap: SharedRasterBitmap,
        picture: Picture,
        target_rect: Rect,
        clear_color: Rgba8,
    ) -> Self {
        Self {
            bitmap,
            picture,
            target_rect,
            clear_color,
            finished: false,
        }
    }

    /// The bitmap generation this task writes into.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.bitmap.generation()
    }

    /// The region of the bitmap this task repaints.
    #[must_use]
    pub fn target_rect(&self) -> Rect {
        self.target_rect
    }

    /// Paints the picture and releases the bitmap reference.
    ///
    /// Playback goes into a scratch buffer first; the bitmap lock is only
    /// taken for the final copy, so compositor reads are never blocked for
    /// the duration of playback. The target region is replaced, not blended,
    /// so stale pixels from an earlier pass never show through.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if the scratch buffer cannot be created.
    /// The bitmap keeps its previous content in that case, is marked as
    /// needing a repaint, and the reference is still released.
    pub fn run(mut self) -> Result<(), RasterError> {
        let (width, height) = self.bitmap.size();
        let Some(span) = pixel_span(self.target_rect, width, height) else {
            self.finished = true;
            return Ok(());
        };
        let mut scratch = PixelBuffer::try_new(span.width(), span.height(), self.clear_color)?;
        let origin = span.to_rect().origin();
        self.picture.playback(&mut scratch, origin);
        self.bitmap
            .lock_for_write(|pixels| pixels.copy_from(&scratch, origin));
        self.finished = true;
        Ok(())
    }
}

impl Drop for RasterTask {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!(
                "raster task for generation {} released unfinished",
                self.bitmap.generation()
            );
            self.bitmap.mark_needs_repaint();
        }
    }
}

/// Accepts raster tasks for asynchronous execution.
///
/// Fire-and-forget: implementations must eventually either
/// [`run`](RasterTask::run) or drop every task they accept, since both
/// release the task's bitmap reference. The dispatcher's teardown blocks on
/// that release.
pub trait RasterTaskSink {
    /// Submits a task.
    fn post_raster_task(&self, task: RasterTask);
}

impl<T: RasterTaskSink + ?Sized> RasterTaskSink for &T {
    fn post_raster_task(&self, task: RasterTask) {
        (**self).post_raster_task(task);
    }
}

impl<T: RasterTaskSink + ?Sized> RasterTaskSink for Arc<T> {
    fn post_raster_task(&self, task: RasterTask) {
        (**self).post_raster_task(task);
    }
}

/// A [`RasterTaskSink`] that runs each task on the calling thread.
///
/// Useful for tests and for single-threaded embedders.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateRasterSink;

impl RasterTaskSink for ImmediateRasterSink {
    fn post_raster_task(&self, task: RasterTask) {
        let generation = task.generation();
        if let Err(err) = task.run() {
            log::warn!("raster task for generation {generation} failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::PictureRecorder;
    use kurbo::Point;

    const GREEN: Rgba8 = Rgba8::opaque(0, 255, 0);

    fn picture(bounds: Rect, fill: Rect) -> Picture {
        let mut rec = PictureRecorder::new(bounds);
        rec.fill_rect(fill, GREEN);
        rec.finish()
    }

    #[test]
    fn run_releases_reference_exactly_once() {
        let owner = SharedRasterBitmap::allocate(8, 8, 1, Rgba8::TRANSPARENT).unwrap();
        let bounds = Rect::new(0.0, 0.0, 8.0, 8.0);
        let task = RasterTask::new(
            owner.acquire(),
            picture(bounds, bounds),
            bounds,
            Rgba8::TRANSPARENT,
        );
        assert_eq!(owner.holders(), 2);
        task.run().unwrap();
        assert_eq!(owner.holders(), 1);
    }

    #[test]
    fn dropping_an_unrun_task_releases_reference() {
        let owner = SharedRasterBitmap::allocate(8, 8, 1, Rgba8::TRANSPARENT).unwrap();
        let bounds = Rect::new(0.0, 0.0, 8.0, 8.0);
        let task = RasterTask::new(
            owner.acquire(),
            picture(bounds, bounds),
            bounds,
            Rgba8::TRANSPARENT,
        );
        drop(task);
        assert_eq!(owner.holders(), 1);
        assert!(owner.needs_repaint(), "unrun task must mark the bitmap");
    }

    #[test]
    fn completed_task_leaves_no_repaint_mark() {
        let owner = SharedRasterBitmap::allocate(8, 8, 1, Rgba8::TRANSPARENT).unwrap();
        let bounds = Rect::new(0.0, 0.0, 8.0, 8.0);
        RasterTask::new(
            owner.acquire(),
            picture(bounds, bounds),
            bounds,
            Rgba8::TRANSPARENT,
        )
        .run()
        .unwrap();
        // A target outside the bitmap paints nothing and still counts as done.
        RasterTask::new(
            owner.acquire(),
            picture(bounds, bounds),
            Rect::new(20.0, 20.0, 30.0, 30.0),
            Rgba8::TRANSPARENT,
        )
        .run()
        .unwrap();
        assert!(!owner.needs_repaint());
    }

    #[test]
    fn panicking_playback_marks_bitmap() {
        let owner = SharedRasterBitmap::allocate(8, 8, 1, Rgba8::TRANSPARENT).unwrap();
        let bounds = Rect::new(0.0, 0.0, 8.0, 8.0);
        let task = RasterTask::new(
            owner.acquire(),
            picture(bounds, bounds),
            bounds,
            Rgba8::TRANSPARENT,
        );
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _task = task;
            panic!("playback blew up");
        }));
        assert!(result.is_err());
        assert_eq!(owner.holders(), 1);
        assert!(owner.needs_repaint());
    }

    #[test]
    fn partial_target_only_touches_its_region() {
        let white = Rgba8::WHITE;
        let owner = SharedRasterBitmap::allocate(8, 8, 1, white).unwrap();
        let bounds = Rect::new(0.0, 0.0, 8.0, 8.0);
        let target = Rect::new(4.0, 4.0, 8.0, 8.0);
        ImmediateRasterSink.post_raster_task(RasterTask::new(
            owner.acquire(),
            picture(bounds, bounds),
            target,
            Rgba8::TRANSPARENT,
        ));
        owner.lock_for_read(|px| {
            assert_eq!(px.pixel(0, 0), Some(white));
            assert_eq!(px.pixel(3, 3), Some(white));
            assert_eq!(px.pixel(4, 4), Some(GREEN));
            assert_eq!(px.pixel(7, 7), Some(GREEN));
        });
    }

    #[test]
    fn target_region_is_replaced_not_blended() {
        let owner =
            SharedRasterBitmap::allocate(4, 4, 1, Rgba8::opaque(255, 0, 0)).unwrap();
        let bounds = Rect::new(0.0, 0.0, 4.0, 4.0);
        // Empty picture: the target must come back as the clear color.
        let empty = PictureRecorder::new(bounds).finish();
        RasterTask::new(owner.acquire(), empty, bounds, Rgba8::TRANSPARENT)
            .run()
            .unwrap();
        owner.lock_for_read(|px| assert_eq!(px.pixel(2, 2), Some(Rgba8::TRANSPARENT)));
    }

    #[test]
    fn round_trip_matches_direct_playback() {
        let bounds = Rect::new(0.0, 0.0, 16.0, 12.0);
        let record = || {
            let mut rec = PictureRecorder::new(bounds);
            rec.clear(Rgba8::WHITE);
            rec.fill_rect(Rect::new(2.0, 1.0, 9.0, 7.0), GREEN);
            rec.fill_rect(Rect::new(5.0, 4.0, 14.0, 11.0), Rgba8::new(0, 0, 100, 128));
            rec.finish()
        };

        let mut direct = PixelBuffer::try_new(16, 12, Rgba8::TRANSPARENT).unwrap();
        record().playback(&mut direct, Point::ZERO);

        let owner = SharedRasterBitmap::allocate(16, 12, 1, Rgba8::TRANSPARENT).unwrap();
        ImmediateRasterSink.post_raster_task(RasterTask::new(
            owner.acquire(),
            record(),
            bounds,
            Rgba8::TRANSPARENT,
        ));
        owner.lock_for_read(|px| assert_eq!(*px, direct));
    }
}
