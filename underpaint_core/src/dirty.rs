// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-region accumulation and distribution to tiles.
//!
//! A [`DirtyRegionTracker`] collects invalidated rectangles for one layer
//! between frames and, once per update pass, writes them into the tiles of a
//! [`TileGrid`].
//!
//! # Region model
//!
//! Pending invalidations are merged into a single bounding rectangle. This
//! over-invalidates when two small disjoint rectangles are far apart, but it
//! never loses a stale pixel: every tile that intersects any invalidated
//! rectangle also intersects the union.
//!
//! # States
//!
//! ```text
//!   Clean ──invalidate──► Dirty ──apply_dirty_rects──► Clean
//!                          │  ▲
//!                          └──┘ invalidate (union)
//! ```
//!
//! The first invalidation after a clean state schedules one update
//! notification through the tracker's [`CoalescedScheduler`]; the caller's
//! event loop delivers it with [`fire_update`](DirtyRegionTracker::fire_update).
//!
//! # Threading
//!
//! The tracker is not synchronised. Invalidation and apply must run on the
//! same thread, or be serialised by the caller; `&mut self` on both enforces
//! this for safe code.

use kurbo::{Point, Rect, Size};

use crate::coalesce::{CoalescedScheduler, FireOutcome, Reschedule};
use crate::geometry::clip_rect;
use crate::tile::{TileGrid, TilePriority};
use crate::trace::{TileUpdateEvent, Tracer};

/// Summary of one [`apply_dirty_rects`](DirtyRegionTracker::apply_dirty_rects) pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TileUpdate {
    /// The pending region that was applied, or `None` for a no-op pass.
    pub dirty_rect: Option<Rect>,
    /// Tiles touched this pass that are now urgent.
    pub urgent: usize,
    /// Tiles touched this pass that are now deferrable.
    pub deferrable: usize,
}

impl TileUpdate {
    /// Number of tiles touched this pass.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.urgent + self.deferrable
    }
}

/// Accumulates a layer's invalidations and marks the affected tiles.
#[derive(Debug)]
pub struct DirtyRegionTracker {
    bounds: Size,
    pending: Option<Rect>,
    update: CoalescedScheduler,
    pass_index: u64,
}

impl DirtyRegionTracker {
    /// Creates a clean tracker for a layer of size `bounds`.
    #[must_use]
    pub fn new(bounds: Size) -> Self {
        Self::with_update_callback(bounds, |_| {})
    }

    /// Creates a clean tracker that runs `callback` when a scheduled update
    /// is fired.
    #[must_use]
    pub fn with_update_callback(
        bounds: Size,
        callback: impl FnMut(&mut Reschedule) + 'static,
    ) -> Self {
        Self {
            bounds,
            pending: None,
            update: CoalescedScheduler::boxed(callback),
            pass_index: 0,
        }
    }

    /// The layer's logical size.
    #[must_use]
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    /// The pending dirty rectangle, already clipped to the bounds.
    #[must_use]
    pub fn pending_rect(&self) -> Option<Rect> {
        self.pending
    }

    /// Returns `true` if invalidations are waiting for an apply pass.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns `true` if an update notification is waiting to be fired.
    #[must_use]
    pub fn is_update_pending(&self) -> bool {
        self.update.is_pending()
    }

    /// Number of non-empty apply passes so far.
    #[must_use]
    pub fn pass_index(&self) -> u64 {
        self.pass_index
    }

    /// Marks `rect` stale.
    ///
    /// The rectangle is clipped to the layer bounds; an empty result is
    /// ignored. Returns `true` if this call scheduled a new update.
    pub fn invalidate(&mut self, rect: Rect) -> bool {
        let Some(rect) = clip_rect(rect, self.layer_rect()) else {
            return false;
        };
        self.pending = Some(self.pending.map_or(rect, |p| p.union(rect)));
        self.update.schedule()
    }

    /// Updates the layer's logical size.
    ///
    /// The pending region is clipped to the new bounds. If nothing remains,
    /// the pending update notification is cancelled.
    pub fn set_size(&mut self, bounds: Size) {
        self.bounds = bounds;
        self.pending = self.pending.and_then(|p| clip_rect(p, self.layer_rect()));
        if self.pending.is_none() {
            self.update.cancel();
        }
    }

    /// Delivers a scheduled update notification.
    pub fn fire_update(&mut self) -> FireOutcome {
        self.update.fire()
    }

    /// Writes the pending region into the tiles of `grid`.
    ///
    /// Every tile whose position intersects the pending rectangle gets the
    /// intersection unioned into its dirty rectangle, and is marked
    /// [`Urgent`](TilePriority::Urgent) if that dirty rectangle intersects
    /// `visible`, [`Deferrable`](TilePriority::Deferrable) otherwise. The
    /// pending region is then cleared and any pending update notification is
    /// cancelled.
    ///
    /// A clean tracker, an empty grid, or a region that misses every tile
    /// leaves the grid untouched.
    pub fn apply_dirty_rects(
        &mut self,
        grid: &mut TileGrid,
        visible: Rect,
        tracer: &mut Tracer<'_>,
    ) -> TileUpdate {
        let Some(dirty) = self.pending.take() else {
            return TileUpdate::default();
        };
        self.update.cancel();
        self.pass_index += 1;

        let mut update = TileUpdate {
            dirty_rect: Some(dirty),
            ..TileUpdate::default()
        };
        #[cfg(feature = "trace-rich")]
        let mut rich = tracer.is_enabled().then(Vec::new);
        for (index, tile) in grid.tiles_mut().iter_mut().enumerate() {
            if !tile.mark_dirty(dirty, visible) {
                continue;
            }
            match tile.priority() {
                Some(TilePriority::Urgent) => update.urgent += 1,
                _ => update.deferrable += 1,
            }
            #[cfg(feature = "trace-rich")]
            if let (Some(events), Some(dirty_rect), Some(priority)) =
                (&mut rich, tile.dirty_rect(), tile.priority())
            {
                events.push(crate::trace::DirtyTileEvent {
                    tile_index: index,
                    dirty_rect,
                    priority,
                });
            }
            #[cfg(not(feature = "trace-rich"))]
            {
                _ = index;
            }
        }

        log::trace!(
            "dirty pass {}: {dirty:?} -> {} urgent, {} deferrable",
            self.pass_index,
            update.urgent,
            update.deferrable
        );
        tracer.tile_update(&TileUpdateEvent {
            pass_index: self.pass_index,
            dirty_rect: dirty,
            urgent: update.urgent,
            deferrable: update.deferrable,
        });
        #[cfg(feature = "trace-rich")]
        if let Some(events) = rich {
            tracer.dirty_tiles(self.pass_index, &events);
        }
        update
    }

    fn layer_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.bounds)
    }
}
