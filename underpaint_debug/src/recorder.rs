// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps every event together
//! with the time it arrived, measured from the recorder's creation. Per-tile
//! rich events ([`on_dirty_tiles`](TraceSink::on_dirty_tiles)) store only the
//! count.

use std::time::{Duration, Instant};

use underpaint_core::trace::{
    DirtyTileEvent, RasterDeferEvent, RasterDispatchEvent, RasterErrorEvent, RasterSkipEvent,
    TileUpdateEvent, TraceSink,
};

/// A recorded event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A raster task was posted.
    RasterDispatch(RasterDispatchEvent),
    /// A repaint request was skipped.
    RasterSkip(RasterSkipEvent),
    /// A repaint request was deferred.
    RasterDefer(RasterDeferEvent),
    /// A repaint pass failed.
    RasterError(RasterErrorEvent),
    /// The dirty tracker applied its pending region.
    TileUpdate(TileUpdateEvent),
    /// Number of per-tile records emitted for a pass.
    DirtyTilesCount {
        /// Apply pass the tiles belong to.
        pass_index: u64,
        /// Number of dirty tile records.
        count: usize,
    },
}

/// A recorded event and when it arrived.
#[derive(Clone, Copy, Debug)]
pub struct Record {
    /// Time since the recorder was created.
    pub at: Duration,
    /// The event.
    pub event: RecordedEvent,
}

/// A [`TraceSink`] that keeps events in memory.
#[derive(Debug)]
pub struct RecorderSink {
    start: Instant,
    records: Vec<Record>,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder; timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            records: Vec::new(),
        }
    }

    /// The recorded events, oldest first.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Forgets everything recorded so far. Timestamps keep counting from the
    /// original start.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn push(&mut self, event: RecordedEvent) {
        self.records.push(Record {
            at: self.start.elapsed(),
            event,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_raster_dispatch(&mut self, e: &RasterDispatchEvent) {
        self.push(RecordedEvent::RasterDispatch(*e));
    }

    fn on_raster_skip(&mut self, e: &RasterSkipEvent) {
        self.push(RecordedEvent::RasterSkip(*e));
    }

    fn on_raster_defer(&mut self, e: &RasterDeferEvent) {
        self.push(RecordedEvent::RasterDefer(*e));
    }

    fn on_raster_error(&mut self, e: &RasterErrorEvent) {
        self.push(RecordedEvent::RasterError(*e));
    }

    fn on_tile_update(&mut self, e: &TileUpdateEvent) {
        self.push(RecordedEvent::TileUpdate(*e));
    }

    fn on_dirty_tiles(&mut self, pass_index: u64, tiles: &[DirtyTileEvent]) {
        self.push(RecordedEvent::DirtyTilesCount {
            pass_index,
            count: tiles.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Rect, Size};
    use underpaint_core::trace::Tracer;
    use underpaint_core::{
        DirtyRegionTracker, ImmediateRasterSink, LayerRasterDispatcher, PictureRecorder,
        RasterConfig, RasterLayer, Rgba8, TileGrid,
    };

    struct Solid;

    impl RasterLayer for Solid {
        fn layer_id(&self) -> u64 {
            9
        }

        fn bounds(&self) -> Size {
            Size::new(32.0, 32.0)
        }

        fn position(&self) -> Point {
            Point::ORIGIN
        }

        fn draws_content(&self) -> bool {
            true
        }

        fn invalidated_region(&self) -> Rect {
            Rect::new(0.0, 0.0, 32.0, 32.0)
        }

        fn paint(&self, recorder: &mut PictureRecorder) {
            recorder.fill_rect(recorder.bounds(), Rgba8::BLACK);
        }
    }

    #[test]
    fn records_dispatcher_and_tracker_events_in_order() {
        let mut sink = RecorderSink::new();
        {
            let mut tracer = Tracer::new(&mut sink);
            let mut tracker = DirtyRegionTracker::new(Size::new(32.0, 32.0));
            let mut grid = TileGrid::new(Size::new(32.0, 32.0), 16.0);
            tracker.invalidate(Rect::new(0.0, 0.0, 20.0, 20.0));
            tracker.apply_dirty_rects(&mut grid, Rect::new(0.0, 0.0, 16.0, 16.0), &mut tracer);

            let mut dispatcher =
                LayerRasterDispatcher::new(ImmediateRasterSink, RasterConfig::default());
            dispatcher.record_and_dispatch(&Solid, &mut tracer).unwrap();
        }

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(
            matches!(records[0].event, RecordedEvent::TileUpdate(e) if e.urgent == 1 && e.deferrable == 3),
            "got {:?}",
            records[0]
        );
        assert!(
            matches!(
                records[1].event,
                RecordedEvent::DirtyTilesCount { pass_index: 1, count: 4 }
            ),
            "got {:?}",
            records[1]
        );
        assert!(
            matches!(records[2].event, RecordedEvent::RasterDispatch(e) if e.layer_id == 9),
            "got {:?}",
            records[2]
        );
        assert!(records[0].at <= records[2].at, "timestamps must not go backwards");
    }

    #[test]
    fn clear_forgets_records() {
        let mut sink = RecorderSink::default();
        sink.on_raster_defer(&RasterDeferEvent {
            layer_id: 1,
            generation: 1,
            holders: 2,
        });
        assert_eq!(sink.records().len(), 1);
        sink.clear();
        assert!(sink.records().is_empty());
    }
}
