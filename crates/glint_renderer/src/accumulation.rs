//! Progressive accumulation buffer.
//!
//! Holds per-pixel radiance sums and sample counts. Tile results are merged
//! only if they were rendered under the current generation; anything older
//! is discarded. The display image is derived on demand as `sum / count`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::tile::TileResult;
use crate::Color;

/// Display gamma.
pub const GAMMA: f32 = 2.2;

/// Monotonic generation id shared between the buffer and the workers, which
/// check it before starting a batch.
///
/// Clones observe the same counter. Only the owning buffer bumps it.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance to the next generation and return it.
    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// What happened to a tile result handed to [`AccumulationBuffer::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Added to the buffer.
    Merged,
    /// Rendered under an older generation; dropped.
    Stale,
    /// Current generation but its tile does not fit the buffer. This is a
    /// fault, not staleness.
    Mismatched,
}

/// Per-pixel radiance sums and sample counts, row-major.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    radiance: Vec<[f32; 3]>,
    samples: Vec<u32>,
    generation: GenerationCounter,
}

impl AccumulationBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            radiance: vec![[0.0; 3]; len],
            samples: vec![0; len],
            generation: GenerationCounter::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// A read-only view of the generation counter.
    pub fn generation_counter(&self) -> GenerationCounter {
        self.generation.clone()
    }

    /// Zero every pixel and start a new generation. Returns the new generation.
    pub fn reset(&mut self) -> u64 {
        self.radiance.fill([0.0; 3]);
        self.samples.fill(0);
        self.generation.bump()
    }

    /// Change dimensions, clearing all data and starting a new generation.
    pub fn resize(&mut self, width: u32, height: u32) -> u64 {
        let len = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.radiance = vec![[0.0; 3]; len];
        self.samples = vec![0; len];
        self.generation.bump()
    }

    /// Add a tile's sums and sample count to every pixel it covers.
    pub fn merge(&mut self, result: &TileResult) -> MergeOutcome {
        if result.generation != self.generation.current() {
            return MergeOutcome::Stale;
        }

        let tile = result.tile;
        let fits = tile.x as u64 + tile.width as u64 <= self.width as u64
            && tile.y as u64 + tile.height as u64 <= self.height as u64
            && result.radiance_sum.len() == tile.pixel_count();
        if !fits {
            return MergeOutcome::Mismatched;
        }

        let width = tile.width as usize;
        if width == 0 {
            return MergeOutcome::Merged;
        }
        for (row, sums) in result.radiance_sum.chunks_exact(width).enumerate() {
            let start = (tile.y as usize + row) * self.width as usize + tile.x as usize;
            let pixels = self.radiance[start..start + width].iter_mut();
            let counts = self.samples[start..start + width].iter_mut();

            for ((pixel, count), sum) in pixels.zip(counts).zip(sums) {
                pixel[0] += sum[0];
                pixel[1] += sum[1];
                pixel[2] += sum[2];
                *count += result.sample_count;
            }
        }

        MergeOutcome::Merged
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn samples_at(&self, x: u32, y: u32) -> u32 {
        self.samples[self.index(x, y)]
    }

    pub fn radiance_sum_at(&self, x: u32, y: u32) -> Color {
        Color::from_array(self.radiance[self.index(x, y)])
    }

    /// Mean radiance of a pixel; zero before any samples arrive.
    pub fn mean_radiance(&self, x: u32, y: u32) -> Color {
        let count = self.samples_at(x, y);
        if count == 0 {
            return Color::ZERO;
        }
        self.radiance_sum_at(x, y) / count as f32
    }

    /// Smallest per-pixel sample count (0 for an empty image).
    pub fn min_samples(&self) -> u32 {
        self.samples.iter().copied().min().unwrap_or(0)
    }

    pub fn total_samples(&self) -> u64 {
        self.samples.iter().map(|&n| n as u64).sum()
    }

    /// Radiance sums as a flat `[r, g, b, r, g, b, ...]` slice.
    pub fn radiance_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.radiance)
    }

    pub fn sample_counts(&self) -> &[u32] {
        &self.samples
    }

    /// The display image: mean radiance, gamma corrected, 8-bit RGBA row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(self.samples.len() * 4);
        for (sum, &count) in self.radiance.iter().zip(&self.samples) {
            let mean = if count == 0 {
                Color::ZERO
            } else {
                Color::from_array(*sum) / count as f32
            };
            pixels.extend_from_slice(&color_to_rgba(mean));
        }
        pixels
    }
}

/// Apply display gamma (1 / 2.2).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.powf(1.0 / GAMMA)
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * linear_to_gamma(color.x).clamp(0.0, 1.0)) as u8;
    let g = (255.0 * linear_to_gamma(color.y).clamp(0.0, 1.0)) as u8;
    let b = (255.0 * linear_to_gamma(color.z).clamp(0.0, 1.0)) as u8;
    [r, g, b, 255]
}
