// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pool construction errors.

use std::fmt;
use std::io;

/// Failure to start a [`RasterWorkerPool`](crate::RasterWorkerPool).
#[derive(Debug)]
pub enum PoolError {
    /// The OS refused to spawn a worker thread.
    Spawn(io::Error),
    /// The configuration asked for zero workers.
    NoWorkers,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to spawn raster worker: {err}"),
            Self::NoWorkers => f.write_str("raster pool needs at least one worker"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::NoWorkers => None,
        }
    }
}

impl From<io::Error> for PoolError {
    fn from(err: io::Error) -> Self {
        Self::Spawn(err)
    }
}
