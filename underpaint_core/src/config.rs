// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatcher configuration.

use crate::pixel::Rgba8;

/// What the dispatcher does when asked to repaint while a raster task is
/// still writing into the current bitmap.
///
/// Passed to the dispatcher via [`RasterConfig::busy_policy`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BusyPolicy {
    /// Report [`Deferred`](crate::dispatch::DispatchOutcome::Deferred) and
    /// remember the request; the caller retries on a later pass.
    ///
    /// The compositor keeps showing the previous content until the
    /// outstanding task lands.
    #[default]
    Defer,
    /// Allocate a new bitmap generation and dispatch against it immediately.
    ///
    /// The outstanding task finishes into the retired generation, whose
    /// result is discarded. The new generation starts out cleared, so the
    /// layer may briefly composite as [`RasterConfig::clear_color`].
    NewGeneration,
}

/// Configuration for a [`LayerRasterDispatcher`](crate::dispatch::LayerRasterDispatcher).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterConfig {
    /// Behavior when a repaint is requested while a task is in flight.
    pub busy_policy: BusyPolicy,
    /// Color freshly allocated bitmaps and re-rastered regions are cleared to.
    pub clear_color: Rgba8,
}

impl RasterConfig {
    /// Defers repaints while a task is in flight. This is the default.
    #[must_use]
    pub const fn deferring() -> Self {
        Self {
            busy_policy: BusyPolicy::Defer,
            clear_color: Rgba8::TRANSPARENT,
        }
    }

    /// Starts a new bitmap generation whenever the current one is busy.
    #[must_use]
    pub const fn reallocating() -> Self {
        Self {
            busy_policy: BusyPolicy::NewGeneration,
            clear_color: Rgba8::TRANSPARENT,
        }
    }

    /// Returns a copy with a different clear color.
    #[must_use]
    pub const fn with_clear_color(mut self, clear_color: Rgba8) -> Self {
        self.clear_color = clear_color;
        self
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self::deferring()
    }
}
