//! Progressive render coordinator.
//!
//! Owns the accumulation buffer and a worker pool. Each worker slot renders
//! one horizontal slice; when its result comes back it is merged (or dropped
//! as stale) and the slot is immediately handed the next batch for the
//! current scene and camera. Only the coordinator touches the buffer, so
//! merging needs no locks; workers communicate through a channel.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

use crate::accumulation::{AccumulationBuffer, MergeOutcome};
use crate::tile::{run_work_item, split_horizontal, Tile, TileResult, WorkItem};
use crate::{Camera, ConfigError, RenderConfig, Scene};

/// Worker stack size; paths recurse once per bounce.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Errors that can occur while starting a progressive render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid render config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Counters describing the render so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Batches merged into the buffer
    pub merged: u64,
    /// Batches dropped because the generation moved on
    pub stale: u64,
    /// Current-generation batches that did not fit the buffer
    pub mismatched: u64,
    /// Samples accumulated over all pixels this generation
    pub total_samples: u64,
    /// Generation of the accumulation buffer
    pub generation: u64,
}

/// Bookkeeping for one worker's slice.
#[derive(Debug, Clone, Copy)]
struct Slot {
    tile: Tile,
    /// A work item for this slot is in flight
    busy: bool,
    /// Batches dispatched since the slot was created, feeds the seed
    batches: u64,
    /// Samples per pixel merged this generation
    samples: u32,
}

impl Slot {
    fn new(tile: Tile) -> Self {
        Self {
            tile,
            busy: false,
            batches: 0,
            samples: 0,
        }
    }
}

/// Progressive path tracer driving a pool of workers over horizontal slices.
pub struct ProgressiveRenderer {
    config: RenderConfig,
    scene: Arc<Scene>,
    camera: Camera,
    accumulation: AccumulationBuffer,
    pool: ThreadPool,
    slots: Vec<Slot>,
    tx: Sender<TileResult>,
    rx: Receiver<TileResult>,
    in_flight: usize,
    stats: RenderStats,
    started: Instant,
}

impl ProgressiveRenderer {
    /// Create a renderer. Nothing is dispatched until [`start`](Self::start).
    pub fn new(scene: Scene, camera: Camera, config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;

        let workers = config.worker_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("glint-worker-{}", i))
            .stack_size(WORKER_STACK_SIZE)
            .build()?;

        let slots = split_horizontal(camera.width, camera.height, workers)
            .into_iter()
            .map(Slot::new)
            .collect();
        let (tx, rx) = channel();

        log::info!(
            "Progressive renderer: {}x{}, {} workers, {} spp per batch",
            camera.width,
            camera.height,
            workers,
            config.samples_per_pixel
        );

        Ok(Self {
            accumulation: AccumulationBuffer::new(camera.width, camera.height),
            config,
            scene: Arc::new(scene),
            camera,
            pool,
            slots,
            tx,
            rx,
            in_flight: 0,
            stats: RenderStats::default(),
            started: Instant::now(),
        })
    }

    /// Dispatch work to every idle slot.
    pub fn start(&mut self) {
        for index in 0..self.slots.len() {
            self.dispatch(index);
        }
    }

    /// Hand the next batch to `index` if it is idle and has work to do.
    fn dispatch(&mut self, index: usize) -> bool {
        let generation = self.accumulation.generation();
        let target = self.config.target_samples;
        let slot = &mut self.slots[index];

        if slot.busy || slot.tile.is_empty() || target.is_some_and(|t| slot.samples >= t) {
            return false;
        }

        let item = WorkItem {
            scene: Arc::clone(&self.scene),
            camera: self.camera,
            tile: slot.tile,
            slot: index,
            generation,
            samples_per_pixel: self.config.samples_per_pixel,
            seed: batch_seed(generation, index, slot.batches),
            config: self.config.clone(),
        };
        slot.busy = true;
        slot.batches += 1;
        self.in_flight += 1;

        let tx = self.tx.clone();
        let live = self.accumulation.generation_counter();
        self.pool.spawn(move || {
            let result = run_work_item(&item, &live);
            // Receiver gone means the renderer was dropped
            let _ = tx.send(result);
        });
        true
    }

    fn handle_result(&mut self, result: TileResult) {
        let index = result.slot;
        self.in_flight = self.in_flight.saturating_sub(1);

        match self.accumulation.merge(&result) {
            MergeOutcome::Merged => {
                self.stats.merged += 1;
                if let Some(slot) = self.slots.get_mut(index) {
                    slot.samples += result.sample_count;
                }
            }
            MergeOutcome::Stale => {
                self.stats.stale += 1;
                log::trace!(
                    "Dropped stale batch from slot {} (generation {} < {})",
                    index,
                    result.generation,
                    self.accumulation.generation()
                );
            }
            MergeOutcome::Mismatched => {
                self.stats.mismatched += 1;
                log::warn!(
                    "Slot {} returned a tile that does not fit the buffer: {:?}",
                    index,
                    result.tile
                );
            }
        }

        if let Some(slot) = self.slots.get_mut(index) {
            slot.busy = false;
            self.dispatch(index);
        }

        if self.is_converged() && self.in_flight == 0 {
            log::info!(
                "Converged at {} spp in {:.2?}",
                self.accumulation.min_samples(),
                self.started.elapsed()
            );
        }
    }

    /// Merge every result that has already arrived, without blocking.
    /// Returns the number of results handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(result) = self.rx.try_recv() {
            self.handle_result(result);
            handled += 1;
        }
        handled
    }

    /// Block until every pixel has at least `samples` samples, or until no
    /// more work can be dispatched (e.g. `target_samples` was reached first).
    pub fn wait_for_samples(&mut self, samples: u32) {
        self.start();
        while self.accumulation.min_samples() < samples {
            if self.in_flight == 0 {
                self.start();
                if self.in_flight == 0 {
                    break;
                }
            }
            match self.rx.recv() {
                Ok(result) => self.handle_result(result),
                Err(_) => break,
            }
        }
    }

    /// Replace the camera and restart accumulation.
    ///
    /// A resolution change resizes the buffer and re-splits the slices.
    /// Batches already in flight finish and are discarded as stale.
    pub fn set_camera(&mut self, camera: Camera) {
        if (camera.width, camera.height) != (self.camera.width, self.camera.height) {
            self.accumulation.resize(camera.width, camera.height);
            let tiles = split_horizontal(camera.width, camera.height, self.slots.len());
            for (slot, tile) in self.slots.iter_mut().zip(tiles) {
                slot.tile = tile;
            }
            log::debug!("Resized to {}x{}", camera.width, camera.height);
        } else {
            self.accumulation.reset();
        }
        self.camera = camera;
        self.restart();
    }

    /// Replace the scene and restart accumulation.
    pub fn set_scene(&mut self, scene: Scene) {
        self.scene = Arc::new(scene);
        self.accumulation.reset();
        self.restart();
    }

    /// Discard accumulated samples and start over with the current inputs.
    pub fn reset(&mut self) {
        self.accumulation.reset();
        self.restart();
    }

    fn restart(&mut self) {
        for slot in &mut self.slots {
            slot.samples = 0;
        }
        self.stats.generation = self.accumulation.generation();
        self.started = Instant::now();
        log::debug!("Restarting accumulation at generation {}", self.stats.generation);
        self.start();
    }

    /// True once `target_samples` is set and every slice has reached it.
    pub fn is_converged(&self) -> bool {
        match self.config.target_samples {
            Some(target) => self
                .slots
                .iter()
                .filter(|s| !s.tile.is_empty())
                .all(|s| s.samples >= target),
            None => false,
        }
    }

    /// Current display image as 8-bit RGBA.
    pub fn frame_rgba(&self) -> Vec<u8> {
        self.accumulation.to_rgba()
    }

    pub fn accumulation(&self) -> &AccumulationBuffer {
        &self.accumulation
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.accumulation.generation()
    }

    /// Number of work items dispatched but not yet handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            generation: self.accumulation.generation(),
            total_samples: self.accumulation.total_samples(),
            ..self.stats
        }
    }
}

/// Distinct, well-mixed seed per (generation, slot, batch).
fn batch_seed(generation: u64, slot: usize, batch: u64) -> u64 {
    let key = generation
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((slot as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F))
        .wrapping_add(batch);
    splitmix64(key)
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
