//! Pinhole camera snapshot used to generate primary rays.

use crate::sampling::sample_square;
use glint_math::{safe_normalize, Ray, Vec3};
use rand::RngCore;

/// Camera state handed to workers by value.
///
/// `forward`, `right` and `up` form an orthonormal basis; `fov` is the
/// vertical field of view in degrees. Pixel (0, 0) is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    /// Create a camera from an explicit basis.
    pub fn new(
        position: Vec3,
        forward: Vec3,
        right: Vec3,
        up: Vec3,
        fov: f32,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            position,
            forward,
            right,
            up,
            fov,
            width,
            height,
        }
    }

    /// Create a camera at `position` looking at `target`, 60 degree fov, 320x240.
    pub fn look_at(position: Vec3, target: Vec3, world_up: Vec3) -> Self {
        let forward = safe_normalize(target - position);
        let right = forward
            .cross(world_up)
            .try_normalize()
            .or_else(|| forward.cross(Vec3::Z).try_normalize())
            .unwrap_or(Vec3::X);
        let up = right.cross(forward);

        Self::new(position, forward, right, up, 60.0, 320, 240)
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Ray through a continuous image position (pixel units, y down).
    pub fn ray_through(&self, px: f32, py: f32) -> Ray {
        let half_height = (self.fov.to_radians() * 0.5).tan();
        let half_width = half_height * self.aspect();

        let sx = (2.0 * px / self.width.max(1) as f32 - 1.0) * half_width;
        let sy = (1.0 - 2.0 * py / self.height.max(1) as f32) * half_height;

        let direction = self.forward + self.right * sx + self.up * sy;
        Ray::new(self.position, safe_normalize(direction))
    }

    /// Generate a ray for pixel (x, y), jittered inside the pixel for anti-aliasing.
    pub fn get_ray(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        let (dx, dy) = sample_square(rng);
        self.ray_through(x as f32 + 0.5 + dx, y as f32 + 0.5 + dy)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::ZERO, -Vec3::Z, Vec3::Y)
    }
}
