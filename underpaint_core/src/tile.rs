// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiles of a layer's painted area.
//!
//! A [`TileGrid`] splits a layer into fixed rectangles that can be marked
//! dirty and rerastered independently. The grid is owned by the caller; the
//! [`DirtyRegionTracker`](crate::dirty::DirtyRegionTracker) only writes dirty
//! rectangles and priorities into it.

use kurbo::{Rect, Size};

use crate::geometry::{clip_rect, is_empty_size, overlaps};

/// Largest number of tiles [`TileGrid::new`] will build.
pub const MAX_GRID_TILES: usize = 1 << 20;

/// How soon a dirty tile must be rerastered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TilePriority {
    /// Intersects the visible area; reraster before the next composite.
    Urgent,
    /// Off screen; can wait.
    Deferrable,
}

/// One tile: a fixed position plus its pending dirty state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    position: Rect,
    dirty: Option<Rect>,
    priority: TilePriority,
}

impl Tile {
    /// Creates a clean tile covering `position` in layer space.
    #[must_use]
    pub fn new(position: Rect) -> Self {
        Self {
            position: position.abs(),
            dirty: None,
            priority: TilePriority::Deferrable,
        }
    }

    /// The tile's rectangle in layer space.
    #[must_use]
    pub fn position(&self) -> Rect {
        self.position
    }

    /// The stale part of the tile, if any.
    #[must_use]
    pub fn dirty_rect(&self) -> Option<Rect> {
        self.dirty
    }

    /// The tile's priority while it is dirty.
    #[must_use]
    pub fn priority(&self) -> Option<TilePriority> {
        self.dirty.map(|_| self.priority)
    }

    /// Returns `true` if part of the tile is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Forgets the dirty state after the tile was rerastered.
    pub fn mark_clean(&mut self) {
        self.dirty = None;
        self.priority = TilePriority::Deferrable;
    }

    /// Unions the part of `rect` inside this tile into its dirty rectangle.
    ///
    /// Priority only upgrades while the tile stays dirty. Returns `false` if
    /// `rect` misses the tile.
    pub(crate) fn mark_dirty(&mut self, rect: Rect, visible: Rect) -> bool {
        let Some(part) = clip_rect(rect, self.position) else {
            return false;
        };
        let dirty = self.dirty.map_or(part, |d| d.union(part));
        let priority = if overlaps(dirty, visible) {
            TilePriority::Urgent
        } else {
            TilePriority::Deferrable
        };
        if self.dirty.is_none() || priority == TilePriority::Urgent {
            self.priority = priority;
        }
        self.dirty = Some(dirty);
        true
    }
}

/// Number of `tile_size` steps needed to cover `extent`, if it fits in a `u32`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is a positive integer checked against the u32 range before the cast"
)]
fn tile_count(extent: f64, tile_size: f64) -> Option<u32> {
    let count = (extent / tile_size).ceil();
    (count.is_finite() && count <= f64::from(u32::MAX)).then(|| count as u32)
}

/// A set of tiles, usually a row-major grid over a layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileGrid {
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Builds a row-major grid of `tile_size` squares covering `bounds`.
    ///
    /// Tiles on the right and bottom edges are clipped to the bounds. Empty
    /// bounds, a non-positive tile size, or a grid of more than
    /// [`MAX_GRID_TILES`] tiles produce an empty grid.
    #[must_use]
    pub fn new(bounds: Size, tile_size: f64) -> Self {
        if is_empty_size(bounds) || !tile_size.is_finite() || tile_size <= 0.0 {
            return Self::default();
        }
        let columns = tile_count(bounds.width, tile_size);
        let rows = tile_count(bounds.height, tile_size);
        let within_limit = columns
            .zip(rows)
            .and_then(|(c, r)| usize::try_from(u64::from(c) * u64::from(r)).ok())
            .is_some_and(|n| n <= MAX_GRID_TILES);
        let (Some(columns), Some(rows), true) = (columns, rows, within_limit) else {
            log::warn!("tile grid for {bounds:?} at tile size {tile_size} is too large");
            return Self::default();
        };
        let steps = move |count: u32, extent: f64| {
            (0..count)
                .map(move |i| f64::from(i) * tile_size)
                .take_while(move |&start| start < extent)
        };
        let tiles = steps(rows, bounds.height)
            .flat_map(|y0| {
                steps(columns, bounds.width).map(move |x0| {
                    Tile::new(Rect::new(
                        x0,
                        y0,
                        (x0 + tile_size).min(bounds.width),
                        (y0 + tile_size).min(bounds.height),
                    ))
                })
            })
            .collect();
        Self { tiles }
    }

    /// Builds a grid from arbitrary tile positions.
    #[must_use]
    pub fn from_tiles(positions: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            tiles: positions.into_iter().map(Tile::new).collect(),
        }
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns `true` if the grid has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All tiles, in grid order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// The tile at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    /// Dirty tiles with their indices.
    pub fn dirty(&self) -> impl Iterator<Item = (usize, &Tile)> {
        self.tiles.iter().enumerate().filter(|(_, t)| t.is_dirty())
    }

    /// Dirty tiles that must be rerastered before the next composite.
    pub fn urgent(&self) -> impl Iterator<Item = (usize, &Tile)> {
        self.with_priority(TilePriority::Urgent)
    }

    /// Dirty tiles that can wait.
    pub fn deferrable(&self) -> impl Iterator<Item = (usize, &Tile)> {
        self.with_priority(TilePriority::Deferrable)
    }

    /// Marks the tile at `index` clean. Returns `false` if it was not dirty.
    pub fn mark_clean(&mut self, index: usize) -> bool {
        match self.tiles.get_mut(index) {
            Some(tile) if tile.is_dirty() => {
                tile.mark_clean();
                true
            }
            _ => false,
        }
    }

    /// Marks every tile clean.
    pub fn mark_all_clean(&mut self) {
        self.tiles.iter_mut().for_each(Tile::mark_clean);
    }

    fn with_priority(&self, priority: TilePriority) -> impl Iterator<Item = (usize, &Tile)> {
        self.dirty()
            .filter(move |(_, t)| t.priority() == Some(priority))
    }
}
