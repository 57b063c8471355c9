//! Tile partitioning and the shared work queue.
//!
//! The map is cut into equal rectangles which sit in a FIFO behind one
//! mutex, followed by one [`TileWork::Done`] marker per worker. A worker pops
//! until it sees its marker, so every tile is claimed exactly once.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::pixmap::Image;
use crate::util::{Error, Result};

/// Rectangle of texels, origin at its top-left `(x = col, y = row)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// Texel count.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(row, col)` of every texel in row-major order.
    pub fn texels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |row| (self.x..self.x + self.width).map(move |col| (row, col)))
    }
}

/// Item in the tile queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileWork {
    Tile(Tile),
    /// No more work for the worker that pops this.
    Done,
}

/// Mutex-guarded FIFO of tiles.
#[derive(Debug)]
pub struct TileQueue {
    items: Mutex<VecDeque<TileWork>>,
}

impl TileQueue {
    /// Queue `tiles` followed by `workers` done markers.
    pub fn new(tiles: Vec<Tile>, workers: usize) -> Self {
        let mut items: VecDeque<TileWork> = tiles.into_iter().map(TileWork::Tile).collect();
        items.extend(std::iter::repeat(TileWork::Done).take(workers));
        Self { items: Mutex::new(items) }
    }

    /// Pop the next item. An exhausted queue answers `Done`.
    pub fn claim(&self) -> TileWork {
        self.items.lock().pop_front().unwrap_or(TileWork::Done)
    }

    /// Items still queued, markers included.
    pub fn remaining(&self) -> usize {
        self.items.lock().len()
    }
}

/// Cut a `width x height` map into `tile_width x tile_height` tiles, row by row.
///
/// Tile sizes must divide the map exactly.
pub fn partition_tiles(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Result<Vec<Tile>> {
    if tile_width == 0 || tile_height == 0 {
        return Err(Error::config(format!("tile size {tile_width}x{tile_height} must be non-zero")));
    }
    if width % tile_width != 0 {
        return Err(Error::config(format!("tile_width {tile_width} does not divide map width {width}")));
    }
    if height % tile_height != 0 {
        return Err(Error::config(format!("tile_height {tile_height} does not divide map height {height}")));
    }

    let tiles = (0..height / tile_height)
        .flat_map(|ty| {
            (0..width / tile_width).map(move |tx| Tile {
                x: tx * tile_width,
                y: ty * tile_height,
                width: tile_width,
                height: tile_height,
            })
        })
        .collect();
    Ok(tiles)
}

/// Values a worker computed for one tile, row-major. `None` leaves the
/// destination texel untouched.
#[derive(Debug, Clone)]
pub struct TileResult {
    pub tile: Tile,
    pub values: Vec<Option<f32>>,
}

impl TileResult {
    pub fn new(tile: Tile) -> Self {
        Self { tile, values: vec![None; tile.len()] }
    }

    /// Texels with a value.
    pub fn written(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Copy the written values into `map`.
    pub fn blit_into(&self, map: &mut Image<f32>) {
        for ((row, col), value) in self.tile.texels().zip(&self.values) {
            if let Some(v) = *value {
                map[(row, col)] = v;
            }
        }
    }
}
