//! Glint renderer - progressive CPU path tracing.
//!
//! A Monte Carlo path tracer over spheres and BVH-accelerated triangles.
//! Work is split into horizontal slices rendered by a worker pool; results
//! accumulate into a running per-pixel average that refines over time and
//! restarts whenever the camera or scene changes.

mod accumulation;
mod bvh;
mod camera;
mod config;
mod hittable;
mod integrator;
mod material;
mod progressive;
mod sampling;
mod scene;
mod sphere;
mod tile;
mod triangle;

pub use accumulation::{
    color_to_rgba, linear_to_gamma, AccumulationBuffer, GenerationCounter, MergeOutcome, GAMMA,
};
pub use bvh::{Bvh, BvhNode, LEAF_MAX_SIZE, MAX_DEPTH};
pub use camera::Camera;
pub use config::{ConfigError, ConfigResult, RenderConfig, MAX_BOUNCES_LIMIT};
pub use hittable::{HitRecord, T_EPSILON};
pub use integrator::{beer_lambert, trace, RAY_EPSILON};
pub use material::{energy_split, fresnel_dielectric, rgb8, Color, Material, MaterialId, Surface};
pub use progressive::{ProgressiveRenderer, RenderError, RenderResult, RenderStats};
pub use sampling::{cosine_sample_hemisphere, random_in_unit_ball};
pub use scene::{Scene, SceneBuilder, SceneError, SceneResult};
pub use sphere::{intersect_sphere, Sphere};
pub use tile::{render_tile, run_work_item, split_horizontal, Tile, TileResult, WorkItem};
pub use triangle::{intersect_triangle, Triangle, DET_EPSILON};

/// Re-export common math types from glint_math
pub use glint_math::{Aabb, Interval, Ray, Vec3};
