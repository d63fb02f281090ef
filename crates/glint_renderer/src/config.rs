//! Render configuration.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Color;

/// Upper bound on `max_bounces`; the integrator recurses once per bounce.
pub const MAX_BOUNCES_LIMIT: u32 = 256;

/// Errors that can occur while loading or validating a [`RenderConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("samples_per_pixel must be at least 1")]
    ZeroSamples,

    #[error("max_bounces must be at least 1")]
    ZeroBounces,

    #[error("max_bounces {0} exceeds the limit of {}", MAX_BOUNCES_LIMIT)]
    TooManyBounces(u32),

    #[error("workers must be at least 1 when set")]
    ZeroWorkers,

    #[error("Background color must be finite and non-negative, got {0:?}")]
    InvalidBackground([f32; 3]),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per pixel traced by one work item
    pub samples_per_pixel: u32,
    /// Maximum path depth; paths reaching it return the surface albedo
    pub max_bounces: u32,
    /// Depth at which Russian roulette starts
    pub roulette_start_depth: u32,
    /// Cap on chained mirror/glass bounces before falling back to diffuse
    pub max_specular_depth: u32,
    /// Worker pool size (None = hardware concurrency)
    pub workers: Option<usize>,
    /// Stop dispatching once every pixel has this many samples (None = never)
    pub target_samples: Option<u32>,
    /// Radiance returned by rays that leave the scene
    pub background: [f32; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 4,
            max_bounces: 10,
            roulette_start_depth: 3,
            max_specular_depth: 10,
            workers: None,
            target_samples: None,
            background: [0.0; 3],
        }
    }
}

impl RenderConfig {
    /// Parse a config from JSON. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded render config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Check the invariants the renderer relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.max_bounces == 0 {
            return Err(ConfigError::ZeroBounces);
        }
        if self.max_bounces > MAX_BOUNCES_LIMIT {
            return Err(ConfigError::TooManyBounces(self.max_bounces));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.background.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(ConfigError::InvalidBackground(self.background));
        }
        Ok(())
    }

    /// Number of workers to run: the configured count or the hardware concurrency.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
            .max(1)
    }

    pub fn background_color(&self) -> Color {
        Color::from_array(self.background)
    }
}
