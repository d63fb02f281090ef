//! Tile-based work units for progressive rendering.
//!
//! The image is cut into horizontal slices, one per worker slot. A
//! [`WorkItem`] carries everything a worker needs to render one batch of
//! samples over its slice; the [`TileResult`] it produces goes back to the
//! coordinator for merging.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::accumulation::GenerationCounter;
use crate::integrator::trace;
use crate::{Camera, Color, RenderConfig, Scene};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Get the total number of pixels in this tile.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Split a `width` x `height` image into `count` full-width horizontal slices.
///
/// Every slice is `ceil(height / count)` rows tall except at the bottom, where
/// slices are clipped to the image. Slices past the last row come out empty,
/// so the result always has `count` entries and together they cover every row
/// exactly once.
pub fn split_horizontal(width: u32, height: u32, count: usize) -> Vec<Tile> {
    let count = count.max(1);
    let rows_per_slice = (height as usize).div_ceil(count) as u32;

    (0..count as u32)
        .map(|i| {
            let y = (i * rows_per_slice).min(height);
            let bottom = (y + rows_per_slice).min(height);
            Tile::new(0, y, width, bottom - y)
        })
        .collect()
}

/// One batch of samples over one tile, self-contained so a worker can run it
/// without touching coordinator state.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub scene: Arc<Scene>,
    pub camera: Camera,
    pub tile: Tile,
    /// Worker slot that owns the tile
    pub slot: usize,
    /// Generation the item was issued under
    pub generation: u64,
    pub samples_per_pixel: u32,
    /// Seed for this batch's random stream
    pub seed: u64,
    pub config: RenderConfig,
}

/// Radiance summed over one batch, tile-local and row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TileResult {
    pub tile: Tile,
    pub slot: usize,
    pub generation: u64,
    /// Sum of `sample_count` radiance samples per pixel
    pub radiance_sum: Vec<[f32; 3]>,
    pub sample_count: u32,
}

impl TileResult {
    /// Radiance sums as a flat `[r, g, b, r, g, b, ...]` slice.
    pub fn radiance_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.radiance_sum)
    }
}

/// Worker entry point: render `item` unless its generation is already over.
///
/// An item whose generation no longer matches `live` comes back with no
/// samples and no sums. The coordinator still gets a reply for the slot and
/// drops it as stale.
pub fn run_work_item(item: &WorkItem, live: &GenerationCounter) -> TileResult {
    if live.current() != item.generation {
        log::trace!("Slot {} skipped batch for old generation {}", item.slot, item.generation);
        return TileResult {
            tile: item.tile,
            slot: item.slot,
            generation: item.generation,
            radiance_sum: Vec::new(),
            sample_count: 0,
        };
    }
    render_tile(item)
}

/// Render one batch: `samples_per_pixel` jittered paths per pixel of the tile.
///
/// Non-finite samples are dropped (counted, contributing zero) so a single
/// bad path cannot poison the accumulation buffer.
pub fn render_tile(item: &WorkItem) -> TileResult {
    let mut rng = StdRng::seed_from_u64(item.seed);
    let tile = item.tile;
    let mut radiance_sum = Vec::with_capacity(tile.pixel_count());
    let mut dropped = 0u32;

    for y in tile.y..tile.y + tile.height {
        for x in tile.x..tile.x + tile.width {
            let mut pixel = Color::ZERO;
            for _ in 0..item.samples_per_pixel {
                let ray = item.camera.get_ray(x, y, &mut rng);
                let sample = trace(&ray, &item.scene, 0, Color::ONE, 0, &item.config, &mut rng);
                if sample.is_finite() {
                    pixel += sample;
                } else {
                    dropped += 1;
                }
            }
            radiance_sum.push(pixel.to_array());
        }
    }

    if dropped > 0 {
        log::warn!(
            "Slot {} dropped {} non-finite samples (generation {})",
            item.slot,
            dropped,
            item.generation
        );
    }

    TileResult {
        tile,
        slot: item.slot,
        generation: item.generation,
        radiance_sum,
        sample_count: item.samples_per_pixel,
    }
}
