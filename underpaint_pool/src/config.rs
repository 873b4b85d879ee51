// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pool configuration.

use std::num::NonZeroUsize;
use std::thread;

/// Configuration for a [`RasterWorkerPool`](crate::RasterWorkerPool).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Thread name prefix; workers are named `{thread_name}-{index}`.
    pub thread_name: &'static str,
}

impl PoolConfig {
    /// Upper bound for [`from_available_parallelism`](Self::from_available_parallelism).
    pub const MAX_DEFAULT_WORKERS: usize = 4;

    /// A pool with `worker_count` workers.
    #[must_use]
    pub const fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            thread_name: "underpaint-raster",
        }
    }

    /// A single worker. Tasks run in posting order.
    #[must_use]
    pub const fn single_threaded() -> Self {
        Self::new(1)
    }

    /// One worker per available core, capped at
    /// [`MAX_DEFAULT_WORKERS`](Self::MAX_DEFAULT_WORKERS).
    #[must_use]
    pub fn from_available_parallelism() -> Self {
        let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::new(cores.min(Self::MAX_DEFAULT_WORKERS))
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub const fn with_thread_name(mut self, thread_name: &'static str) -> Self {
        self.thread_name = thread_name;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_available_parallelism()
    }
}
