// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by a repaint pass.

use core::fmt;

/// Failure of the current repaint pass.
///
/// None of these are fatal: the dispatcher keeps the previous bitmap, so the
/// worst visible outcome is a stale frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterError {
    /// The allocator refused the pixel storage for a bitmap.
    AllocationFailed {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// `width × height × 4` does not fit in the address space.
    DimensionsOverflow {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The bitmap is still referenced by an in-flight raster task.
    BitmapBusy {
        /// Number of holders observed, including the caller.
        holders: usize,
    },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { width, height } => {
                write!(f, "failed to allocate a {width}x{height} raster bitmap")
            }
            Self::DimensionsOverflow { width, height } => {
                write!(f, "raster bitmap dimensions {width}x{height} overflow")
            }
            Self::BitmapBusy { holders } => {
                write!(f, "raster bitmap is busy ({holders} holders)")
            }
        }
    }
}

impl core::error::Error for RasterError {}
