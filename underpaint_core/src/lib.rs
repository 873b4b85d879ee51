// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Off-thread layer rasterization and dirty tracking.
//!
//! `underpaint_core` turns a layer's draw commands into pixels on a worker
//! thread and hands the result back to the compositor, tracking which parts
//! of a layer are stale in between.
//!
//! # Architecture
//!
//! ```text
//!   invalidate ──► DirtyRegionTracker ──► TileGrid (urgent / deferrable)
//!                        │
//!                        ▼ update notification (CoalescedScheduler)
//!   RasterLayer ──► LayerRasterDispatcher::record_and_dispatch()
//!                        │  Picture + SharedRasterBitmap reference
//!                        ▼
//!                  RasterTaskSink ──► RasterTask::run() (worker)
//!                                          │ release
//!                        ┌─────────────────┘
//!                        ▼
//!   LayerRasterDispatcher::draw_to_surface() ──► CompositeSurface
//! ```
//!
//! **[`bitmap`]**: Reference-counted pixel storage shared between the UI
//! thread and raster workers, with a blocking wait for teardown.
//!
//! **[`dispatch`]**: Per-layer orchestration. Records pictures, manages
//! bitmap generations, posts tasks and composites the result.
//!
//! **[`task`]**: The unit of work posted to a worker, and the
//! [`RasterTaskSink`](task::RasterTaskSink) seam a pool implements.
//!
//! **[`dirty`]** and **[`tile`]**: Conservative dirty-region accumulation and
//! its distribution into tiles.
//!
//! **[`coalesce`]**: Single-flight deferred notifications.
//!
//! **[`picture`]** and **[`pixel`]**: A minimal recorded display list and the
//! premultiplied RGBA buffers it plays into.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! raster-pass instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-tile dirty
//!   events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bitmap;
pub mod coalesce;
pub mod config;
pub mod dirty;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod picture;
pub mod pixel;
pub mod task;
pub mod tile;
pub mod trace;

pub use bitmap::SharedRasterBitmap;
pub use coalesce::{CoalescedScheduler, FireOutcome, Reschedule};
pub use config::{BusyPolicy, RasterConfig};
pub use dirty::{DirtyRegionTracker, TileUpdate};
pub use dispatch::{DispatchInfo, DispatchOutcome, LayerRasterDispatcher, SkipReason};
pub use error::RasterError;
pub use layer::RasterLayer;
pub use picture::{Picture, PictureRecorder};
pub use pixel::{CompositeSurface, PixelBuffer, Rgba8};
pub use task::{ImmediateRasterSink, RasterTask, RasterTaskSink};
pub use tile::{MAX_GRID_TILES, Tile, TileGrid, TilePriority};
