// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use underpaint_core::dispatch::SkipReason;
use underpaint_core::tile::TilePriority;
use underpaint_core::trace::{
    DirtyTileEvent, RasterDeferEvent, RasterDispatchEvent, RasterErrorEvent, RasterSkipEvent,
    TileUpdateEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub(crate) fn skip_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoContent => "no-content",
        SkipReason::NoInvalidation => "no-invalidation",
        SkipReason::EmptyBounds => "empty-bounds",
    }
}

pub(crate) fn priority_name(priority: TilePriority) -> &'static str {
    match priority {
        TilePriority::Urgent => "urgent",
        TilePriority::Deferrable => "deferrable",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_raster_dispatch(&mut self, e: &RasterDispatchEvent) {
        let r = e.target_rect;
        let _ = writeln!(
            self.writer,
            "[dispatch] layer={} gen={} size={}x{} target=({}, {}, {}, {}){}",
            e.layer_id,
            e.generation,
            e.width,
            e.height,
            r.x0,
            r.y0,
            r.x1,
            r.y1,
            if e.reallocated { " realloc" } else { "" },
        );
    }

    fn on_raster_skip(&mut self, e: &RasterSkipEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] layer={} reason={}",
            e.layer_id,
            skip_name(e.reason),
        );
    }

    fn on_raster_defer(&mut self, e: &RasterDeferEvent) {
        let _ = writeln!(
            self.writer,
            "[defer] layer={} gen={} holders={}",
            e.layer_id, e.generation, e.holders,
        );
    }

    fn on_raster_error(&mut self, e: &RasterErrorEvent) {
        let _ = writeln!(self.writer, "[error] layer={} {}", e.layer_id, e.error);
    }

    fn on_tile_update(&mut self, e: &TileUpdateEvent) {
        let r = e.dirty_rect;
        let _ = writeln!(
            self.writer,
            "[tiles] pass={} dirty=({}, {}, {}, {}) urgent={} deferrable={}",
            e.pass_index, r.x0, r.y0, r.x1, r.y1, e.urgent, e.deferrable,
        );
    }

    fn on_dirty_tiles(&mut self, pass_index: u64, tiles: &[DirtyTileEvent]) {
        for t in tiles {
            let r = t.dirty_rect;
            let _ = writeln!(
                self.writer,
                "  [tile] pass={pass_index} index={} dirty=({}, {}, {}, {}) {}",
                t.tile_index,
                r.x0,
                r.y0,
                r.x1,
                r.y1,
                priority_name(t.priority),
            );
        }
    }
}
