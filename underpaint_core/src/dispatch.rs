// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer raster dispatch and compositing reads.
//!
//! A [`LayerRasterDispatcher`] owns one [`SharedRasterBitmap`] per layer. On
//! each paint pass it decides whether the layer needs repainting, records the
//! layer into a [`Picture`](crate::picture::Picture), and hands the picture
//! plus a fresh bitmap reference to the injected [`RasterTaskSink`]. The
//! compositor reads the bitmap back with
//! [`draw_to_surface`](LayerRasterDispatcher::draw_to_surface).
//!
//! # Bitmap generations
//!
//! At most one raster task writes into a bitmap at a time. When the layer's
//! bounds change, or a repaint is requested under
//! [`BusyPolicy::NewGeneration`] while a task is still in flight, the
//! dispatcher allocates a new generation and drops its reference to the old
//! one. The outstanding task finishes into the retired generation, which is
//! freed once the task releases it.
//!
//! # Teardown
//!
//! Dropping the dispatcher blocks until every in-flight task targeting the
//! current generation has released its reference. The wait sleeps on the
//! bitmap's release condition variable; it does not spin.
//!
//! The sink is dropped after that wait, so a sink owned by the dispatcher
//! must run its tasks independently of being dropped; one that only queues
//! them would never release.

use kurbo::{Point, Rect, Size};

use crate::bitmap::SharedRasterBitmap;
use crate::config::{BusyPolicy, RasterConfig};
use crate::error::RasterError;
use crate::geometry::{clip_rect, is_empty_rect, is_empty_size, pixel_size};
use crate::layer::RasterLayer;
use crate::picture::PictureRecorder;
use crate::pixel::CompositeSurface;
use crate::task::{RasterTask, RasterTaskSink};
use crate::trace::{
    RasterDeferEvent, RasterDispatchEvent, RasterErrorEvent, RasterSkipEvent, Tracer,
};

/// Why [`record_and_dispatch`](LayerRasterDispatcher::record_and_dispatch)
/// did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The layer does not draw content.
    NoContent,
    /// The layer reported an empty invalidated region.
    NoInvalidation,
    /// The layer's bounds are empty.
    EmptyBounds,
}

/// Details of a posted raster task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DispatchInfo {
    /// Bitmap generation the task writes into.
    pub generation: u64,
    /// Region of the bitmap the task repaints.
    pub target_rect: Rect,
    /// Whether a new generation was allocated for this pass.
    pub reallocated: bool,
}

/// Result of a [`record_and_dispatch`](LayerRasterDispatcher::record_and_dispatch) call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing to do.
    Skipped(SkipReason),
    /// A task is still writing into the current bitmap; the invalidated
    /// region is remembered and folded into the next pass.
    Deferred,
    /// A raster task was posted.
    Dispatched(DispatchInfo),
}

/// Records a layer's draw commands and rasterizes them off the UI thread.
pub struct LayerRasterDispatcher<S: RasterTaskSink> {
    sink: S,
    config: RasterConfig,
    bitmap: Option<SharedRasterBitmap>,
    bounds: Size,
    position: Point,
    draws_content: bool,
    next_generation: u64,
    deferred: Option<Rect>,
}

impl<S: RasterTaskSink> core::fmt::Debug for LayerRasterDispatcher<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayerRasterDispatcher")
            .field("config", &self.config)
            .field("bitmap", &self.bitmap)
            .field("bounds", &self.bounds)
            .field("position", &self.position)
            .field("draws_content", &self.draws_content)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

impl<S: RasterTaskSink> LayerRasterDispatcher<S> {
    /// Creates a dispatcher that posts its raster tasks to `sink`.
    #[must_use]
    pub fn new(sink: S, config: RasterConfig) -> Self {
        Self {
            sink,
            config,
            bitmap: None,
            bounds: Size::ZERO,
            position: Point::ORIGIN,
            draws_content: false,
            next_generation: 1,
            deferred: None,
        }
    }

    /// The configuration this dispatcher was built with.
    #[must_use]
    pub fn config(&self) -> RasterConfig {
        self.config
    }

    /// The task sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The current bitmap generation, if one has been allocated.
    #[must_use]
    pub fn bitmap(&self) -> Option<&SharedRasterBitmap> {
        self.bitmap.as_ref()
    }

    /// Layer bounds recorded by the last pass.
    #[must_use]
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    /// Returns `true` if a raster task still holds the current bitmap.
    #[must_use]
    pub fn is_raster_in_flight(&self) -> bool {
        self.bitmap.as_ref().is_some_and(|b| b.holders() > 1)
    }

    /// Returns `true` if a repaint was deferred and has not been retried.
    #[must_use]
    pub fn has_deferred_dispatch(&self) -> bool {
        self.deferred.is_some()
    }

    /// Union of the invalidated regions of deferred passes, in layer space.
    #[must_use]
    pub fn deferred_region(&self) -> Option<Rect> {
        self.deferred
    }

    /// Blocks until no raster task holds the current bitmap.
    pub fn wait_for_raster(&self) {
        if let Some(bitmap) = &self.bitmap {
            bitmap.wait_until_sole_holder();
        }
    }

    /// Repaints `layer` if it needs it.
    ///
    /// The layer's bounds and position are recorded on every call, so a layer
    /// that moves without repainting composites at its new position. The
    /// repainted region covers the layer's invalidated region plus whatever
    /// earlier passes deferred, and the whole layer if the last task on the
    /// bitmap never finished.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if a new bitmap generation was needed and
    /// could not be allocated. The previous bitmap stays in place, so the
    /// compositor keeps drawing the last completed content.
    pub fn record_and_dispatch(
        &mut self,
        layer: &dyn RasterLayer,
        tracer: &mut Tracer<'_>,
    ) -> Result<DispatchOutcome, RasterError> {
        let layer_id = layer.layer_id();
        let bounds = layer.bounds();
        self.draws_content = layer.draws_content();
        self.position = layer.position();
        self.bounds = bounds;
        if !self.draws_content {
            return Ok(self.skip(layer_id, SkipReason::NoContent, tracer));
        }
        let layer_rect = Rect::from_origin_size(Point::ORIGIN, bounds);
        let mut invalidated = union_region(layer.invalidated_region(), self.deferred);
        if self.bitmap.as_ref().is_some_and(SharedRasterBitmap::needs_repaint) {
            invalidated = layer_rect;
        }
        if is_empty_rect(invalidated) {
            return Ok(self.skip(layer_id, SkipReason::NoInvalidation, tracer));
        }
        let Some((width, height)) = pixel_size(bounds) else {
            return Ok(self.skip(layer_id, SkipReason::EmptyBounds, tracer));
        };

        let current = self
            .bitmap
            .as_ref()
            .filter(|bitmap| bitmap.size() == (width, height));
        let mut reused = None;
        if let Some(bitmap) = current {
            let holders = bitmap.holders();
            if holders == 1 {
                reused = Some(bitmap.acquire());
            } else if self.config.busy_policy == BusyPolicy::Defer {
                self.deferred = Some(invalidated);
                tracer.raster_defer(&RasterDeferEvent {
                    layer_id,
                    generation: bitmap.generation(),
                    holders,
                });
                log::debug!(
                    "layer {layer_id}: deferring repaint, generation {} busy",
                    bitmap.generation()
                );
                return Ok(DispatchOutcome::Deferred);
            }
        }

        let mut recorder = PictureRecorder::new(layer_rect);
        layer.paint(&mut recorder);
        let picture = recorder.finish();

        let reallocated = reused.is_none();
        let (task_bitmap, target_rect) = match reused {
            Some(bitmap) => {
                let target = if bitmap.take_needs_repaint() {
                    layer_rect
                } else {
                    clip_rect(invalidated, layer_rect).map_or(layer_rect, |r| r.expand())
                };
                (bitmap, target)
            }
            None => {
                let fresh = SharedRasterBitmap::allocate(
                    width,
                    height,
                    self.next_generation,
                    self.config.clear_color,
                )
                .inspect_err(|&error| {
                    tracer.raster_error(&RasterErrorEvent { layer_id, error });
                    log::warn!("layer {layer_id}: skipping raster pass: {error}");
                })?;
                self.next_generation += 1;
                let task_bitmap = fresh.acquire();
                // Retires the previous generation; an in-flight task keeps it
                // alive until it releases.
                self.bitmap = Some(fresh);
                (task_bitmap, layer_rect)
            }
        };

        let info = DispatchInfo {
            generation: task_bitmap.generation(),
            target_rect,
            reallocated,
        };
        self.sink.post_raster_task(RasterTask::new(
            task_bitmap,
            picture,
            target_rect,
            self.config.clear_color,
        ));
        self.deferred = None;
        tracer.raster_dispatch(&RasterDispatchEvent {
            layer_id,
            generation: info.generation,
            target_rect,
            width,
            height,
            reallocated,
        });
        Ok(DispatchOutcome::Dispatched(info))
    }

    /// Composites the layer's bitmap onto `surface`.
    ///
    /// `clip` is in layer space; it is clipped to the bitmap and to the
    /// layer's bounds, and the result lands at `position + clip.origin()`.
    /// Returns `false` if nothing was drawn.
    ///
    /// A task may still be writing a newer picture; the surface then gets the
    /// last completed content, which the next frame corrects.
    pub fn draw_to_surface(&self, surface: &mut dyn CompositeSurface, clip: Rect) -> bool {
        if !self.draws_content || is_empty_size(self.bounds) {
            return false;
        }
        let Some(bitmap) = &self.bitmap else {
            return false;
        };
        let layer_rect = Rect::from_origin_size(Point::ORIGIN, self.bounds);
        bitmap.lock_for_read(|pixels| {
            let Some(src) = clip_rect(clip, layer_rect.intersect(pixels.bounds())) else {
                return false;
            };
            surface.draw_pixels(pixels, src, self.position + src.origin().to_vec2());
            true
        })
    }

    fn skip(
        &self,
        layer_id: u64,
        reason: SkipReason,
        tracer: &mut Tracer<'_>,
    ) -> DispatchOutcome {
        tracer.raster_skip(&RasterSkipEvent { layer_id, reason });
        DispatchOutcome::Skipped(reason)
    }
}

/// Unions `rect` with a pending region, ignoring whichever side is empty.
fn union_region(rect: Rect, pending: Option<Rect>) -> Rect {
    match pending {
        Some(pending) if is_empty_rect(rect) => pending,
        Some(pending) => rect.union(pending),
        None => rect,
    }
}

impl<S: RasterTaskSink> Drop for LayerRasterDispatcher<S> {
    fn drop(&mut self) {
        if let Some(bitmap) = self.bitmap.take() {
            if bitmap.holders() > 1 {
                log::debug!(
                    "waiting for in-flight raster task on generation {}",
                    bitmap.generation()
                );
            }
            bitmap.wait_until_sole_holder();
        }
    }
}
