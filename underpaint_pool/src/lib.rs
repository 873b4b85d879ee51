// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Worker threads for [`underpaint_core`] raster tasks.
//!
//! [`RasterWorkerPool`] implements
//! [`RasterTaskSink`](underpaint_core::RasterTaskSink): tasks posted by a
//! [`LayerRasterDispatcher`](underpaint_core::LayerRasterDispatcher) go into
//! an unbounded channel and are run by a fixed set of named threads.
//!
//! A panic inside a task is caught and counted; the worker keeps running and
//! the unwinding task still releases its bitmap reference, so dispatcher
//! teardown never waits on a task that died. Dropping the pool closes the
//! channel, lets the workers drain what was already queued, and joins them.

mod config;
mod error;
mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::{PoolStats, RasterWorkerPool};
