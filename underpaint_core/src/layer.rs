// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The read-only view of a layer the dispatcher rasterizes.

use kurbo::{Point, Rect, Size};

use crate::picture::PictureRecorder;

/// Queries a layout/paint engine answers for one visual layer.
///
/// Everything here is read on the UI thread during
/// [`record_and_dispatch`](crate::dispatch::LayerRasterDispatcher::record_and_dispatch).
pub trait RasterLayer {
    /// Stable identifier used in trace events and logs.
    fn layer_id(&self) -> u64 {
        0
    }

    /// Size of the layer's painted area, in layer space.
    fn bounds(&self) -> Size;

    /// Where the layer's origin lands on the composited surface.
    fn position(&self) -> Point;

    /// Whether the layer paints anything at all.
    fn draws_content(&self) -> bool;

    /// Region invalidated since the last raster pass, in layer space.
    fn invalidated_region(&self) -> Rect;

    /// Records the layer's draw commands.
    fn paint(&self, recorder: &mut PictureRecorder);
}
