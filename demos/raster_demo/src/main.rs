// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated paint loop that exercises the whole raster pipeline.
//!
//! A 512×384 layer is invalidated in a few places each frame. The dirty
//! tracker distributes the invalidations to tiles, the dispatcher records
//! the layer and rasterizes it on a [`RasterWorkerPool`], the result is
//! composited onto a screen buffer, and the frame's resources go through a
//! [`TransferableResourceLedger`]. Events are printed with a
//! [`PrettyPrintSink`] and exported as Chrome trace JSON.
//!
//! Set `RUST_LOG=debug` for pool and dispatcher diagnostics.

use std::cell::Cell;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use kurbo::{Point, Rect, Size};
use underpaint_core::trace::{
    DirtyTileEvent, RasterDeferEvent, RasterDispatchEvent, RasterErrorEvent, RasterSkipEvent,
    TileUpdateEvent, TraceSink, Tracer,
};
use underpaint_core::{
    DirtyRegionTracker, DispatchOutcome, LayerRasterDispatcher, PictureRecorder, PixelBuffer,
    RasterConfig, RasterLayer, Rgba8, TileGrid,
};
use underpaint_debug::chrome;
use underpaint_debug::pretty::PrettyPrintSink;
use underpaint_debug::recorder::RecorderSink;
use underpaint_pool::{PoolConfig, RasterWorkerPool};
use underpaint_transfer::{ResourceId, ReturnedResource, TransferableResourceLedger};

const FRAME_COUNT: u32 = 8;
const LAYER_SIZE: Size = Size::new(512.0, 384.0);
const TILE_SIZE: f64 = 128.0;
const VIEWPORT: Rect = Rect::new(0.0, 0.0, 256.0, 256.0);
const OUTPUT_PATH: &str = "raster_trace.json";

/// Forwards every event to two sinks.
struct Tee<'a> {
    a: &'a mut dyn TraceSink,
    b: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_raster_dispatch(&mut self, e: &RasterDispatchEvent) {
        self.a.on_raster_dispatch(e);
        self.b.on_raster_dispatch(e);
    }

    fn on_raster_skip(&mut self, e: &RasterSkipEvent) {
        self.a.on_raster_skip(e);
        self.b.on_raster_skip(e);
    }

    fn on_raster_defer(&mut self, e: &RasterDeferEvent) {
        self.a.on_raster_defer(e);
        self.b.on_raster_defer(e);
    }

    fn on_raster_error(&mut self, e: &RasterErrorEvent) {
        self.a.on_raster_error(e);
        self.b.on_raster_error(e);
    }

    fn on_tile_update(&mut self, e: &TileUpdateEvent) {
        self.a.on_tile_update(e);
        self.b.on_tile_update(e);
    }

    fn on_dirty_tiles(&mut self, pass_index: u64, tiles: &[DirtyTileEvent]) {
        self.a.on_dirty_tiles(pass_index, tiles);
        self.b.on_dirty_tiles(pass_index, tiles);
    }
}

/// A layer of vertical stripes; one stripe moves every frame.
struct StripeLayer {
    frame: u32,
    invalidated: Rect,
}

impl StripeLayer {
    fn stripe(frame: u32) -> Rect {
        let x = f64::from(frame % 8) * 64.0;
        Rect::new(x, 0.0, x + 64.0, LAYER_SIZE.height)
    }
}

impl RasterLayer for StripeLayer {
    fn layer_id(&self) -> u64 {
        1
    }

    fn bounds(&self) -> Size {
        LAYER_SIZE
    }

    fn position(&self) -> Point {
        Point::new(16.0, 16.0)
    }

    fn draws_content(&self) -> bool {
        true
    }

    fn invalidated_region(&self) -> Rect {
        self.invalidated
    }

    fn paint(&self, recorder: &mut PictureRecorder) {
        recorder.clear(Rgba8::opaque(24, 24, 32));
        recorder.fill_rect(Self::stripe(self.frame), Rgba8::opaque(240, 160, 32));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- pipeline ----------------------------------------------------------
    let frame_due = Rc::new(Cell::new(false));
    let due = Rc::clone(&frame_due);
    let mut tracker =
        DirtyRegionTracker::with_update_callback(LAYER_SIZE, move |_| due.set(true));
    let mut grid = TileGrid::new(LAYER_SIZE, TILE_SIZE);
    let pool = RasterWorkerPool::new(PoolConfig::default())?;
    log::info!("raster pool running {} workers", pool.worker_count());
    let mut dispatcher = LayerRasterDispatcher::new(&pool, RasterConfig::deferring());
    let mut screen = PixelBuffer::try_new(560, 420, Rgba8::BLACK)?;
    let mut ledger = TransferableResourceLedger::new();
    let mut returned = 0_u32;

    let mut layer = StripeLayer {
        frame: 0,
        invalidated: Rect::ZERO,
    };

    for frame in 0..FRAME_COUNT {
        let mut tee = Tee {
            a: &mut pretty,
            b: &mut recorder,
        };
        let mut tracer = Tracer::new(&mut tee);

        // 1. Invalidate the old and new stripe positions.
        let old = if frame == 0 {
            Rect::from_origin_size(Point::ORIGIN, LAYER_SIZE)
        } else {
            StripeLayer::stripe(layer.frame)
        };
        layer.frame = frame;
        tracker.invalidate(old);
        tracker.invalidate(StripeLayer::stripe(frame));

        // 2. The event loop delivers the coalesced update notification.
        tracker.fire_update();
        if !frame_due.replace(false) {
            continue;
        }

        // 3. Distribute dirt to tiles; remember what to repaint.
        layer.invalidated = tracker.pending_rect().unwrap_or(Rect::ZERO);
        let update = tracker.apply_dirty_rects(&mut grid, VIEWPORT, &mut tracer);
        log::debug!("frame {frame}: {} tiles dirty", update.touched());

        // 4. Record and rasterize off-thread.
        match dispatcher.record_and_dispatch(&layer, &mut tracer)? {
            DispatchOutcome::Dispatched(info) => {
                // Each generation is a resource the compositor references.
                ledger.receive([ResourceId(info.generation)]);
            }
            DispatchOutcome::Deferred | DispatchOutcome::Skipped(_) => {}
        }
        dispatcher.wait_for_raster();
        grid.mark_all_clean();

        // 5. Composite and give back this frame's resource.
        screen.clear(Rgba8::BLACK);
        dispatcher.draw_to_surface(&mut screen, Rect::from_origin_size(Point::ORIGIN, LAYER_SIZE));
        if let Some(bitmap) = dispatcher.bitmap() {
            let id = ResourceId(bitmap.generation());
            let release = [ReturnedResource::new(id, ledger.holders(id))];
            ledger.release_refs(&release, &mut |batch: &[ReturnedResource]| {
                returned += batch.iter().map(|r| r.count).sum::<u32>();
            });
        }
    }

    drop(dispatcher);
    let stats = pool.shutdown();
    log::info!(
        "rasterized {} tasks ({} failed, {} panicked), returned {returned} resources",
        stats.completed,
        stats.failed,
        stats.panicked
    );

    // -- export ------------------------------------------------------------
    let file = File::create(OUTPUT_PATH)?;
    chrome::export(recorder.records(), &mut BufWriter::new(file))?;
    println!(
        "wrote {} events to {OUTPUT_PATH}; screen pixel at (48, 48) = {:?}",
        recorder.records().len(),
        screen.pixel(48, 48)
    );
    Ok(())
}
