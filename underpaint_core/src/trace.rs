// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for raster passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! dispatcher and dirty tracker call at each decision point. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-tile [`DirtyTileEvent`]s and
//!   the corresponding `TraceSink` method.

use kurbo::Rect;

use crate::dispatch::SkipReason;
use crate::error::RasterError;
#[cfg(feature = "trace-rich")]
use crate::tile::TilePriority;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a raster task is posted.
#[derive(Clone, Copy, Debug)]
pub struct RasterDispatchEvent {
    /// Layer the task paints.
    pub layer_id: u64,
    /// Bitmap generation the task writes into.
    pub generation: u64,
    /// Region of the bitmap being repainted.
    pub target_rect: Rect,
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Whether a new bitmap generation was allocated for this pass.
    pub reallocated: bool,
}

/// Emitted when a repaint request does no work.
#[derive(Clone, Copy, Debug)]
pub struct RasterSkipEvent {
    /// Layer that was asked to repaint.
    pub layer_id: u64,
    /// Why nothing was dispatched.
    pub reason: SkipReason,
}

/// Emitted when a repaint is postponed because a task is still in flight.
#[derive(Clone, Copy, Debug)]
pub struct RasterDeferEvent {
    /// Layer that was asked to repaint.
    pub layer_id: u64,
    /// Generation still being written.
    pub generation: u64,
    /// Holder count observed on that generation.
    pub holders: usize,
}

/// Emitted when a repaint pass fails.
#[derive(Clone, Copy, Debug)]
pub struct RasterErrorEvent {
    /// Layer that was asked to repaint.
    pub layer_id: u64,
    /// The failure.
    pub error: RasterError,
}

/// Emitted after the dirty tracker distributes its pending region to tiles.
#[derive(Clone, Copy, Debug)]
pub struct TileUpdateEvent {
    /// Monotonic count of non-empty apply passes.
    pub pass_index: u64,
    /// The pending region that was applied.
    pub dirty_rect: Rect,
    /// Tiles that must be rerastered before the next composite.
    pub urgent: usize,
    /// Tiles that can wait.
    pub deferrable: usize,
}

/// A per-pass dirty tile record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DirtyTileEvent {
    /// Index of the tile in its grid.
    pub tile_index: usize,
    /// The tile's accumulated dirty rectangle.
    pub dirty_rect: Rect,
    /// Priority assigned to the tile.
    pub priority: TilePriority,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from raster passes.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a raster task is posted.
    fn on_raster_dispatch(&mut self, e: &RasterDispatchEvent) {
        _ = e;
    }

    /// Called when a repaint request is skipped.
    fn on_raster_skip(&mut self, e: &RasterSkipEvent) {
        _ = e;
    }

    /// Called when a repaint request is deferred.
    fn on_raster_defer(&mut self, e: &RasterDeferEvent) {
        _ = e;
    }

    /// Called when a repaint pass fails.
    fn on_raster_error(&mut self, e: &RasterErrorEvent) {
        _ = e;
    }

    /// Called after dirty rectangles are applied to a tile grid.
    fn on_tile_update(&mut self, e: &TileUpdateEvent) {
        _ = e;
    }

    /// Called with the tiles dirtied by an apply pass (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_dirty_tiles(&mut self, pass_index: u64, tiles: &[DirtyTileEvent]) {
        _ = (pass_index, tiles);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`RasterDispatchEvent`].
    #[inline]
    pub fn raster_dispatch(&mut self, e: &RasterDispatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_raster_dispatch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RasterSkipEvent`].
    #[inline]
    pub fn raster_skip(&mut self, e: &RasterSkipEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_raster_skip(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RasterDeferEvent`].
    #[inline]
    pub fn raster_defer(&mut self, e: &RasterDeferEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_raster_defer(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RasterErrorEvent`].
    #[inline]
    pub fn raster_error(&mut self, e: &RasterErrorEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_raster_error(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TileUpdateEvent`].
    #[inline]
    pub fn tile_update(&mut self, e: &TileUpdateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tile_update(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits dirty tile records (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn dirty_tiles(&mut self, pass_index: u64, tiles: &[DirtyTileEvent]) {
        if let Some(s) = &mut self.sink {
            s.on_dirty_tiles(pass_index, tiles);
        }
    }

    /// Returns `true` if events reach a sink.
    ///
    /// Lets callers skip building expensive event payloads.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
