//! Sphere primitive and its closed-form intersection kernel.

use crate::hittable::{HitRecord, T_EPSILON};
use crate::MaterialId;
use glint_math::{Aabb, Ray, Vec3};
use std::f32::consts::PI;

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: MaterialId,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        let rvec = Vec3::splat(self.radius);
        Aabb::from_points(self.center - rvec, self.center + rvec)
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn get_sphere_uv(p: Vec3) -> (f32, f32) {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        (phi / (2.0 * PI), theta / PI)
    }
}

/// Intersect a ray with a sphere.
///
/// Solves `|o + t d - c|^2 = r^2` and returns the nearer root greater than
/// [`T_EPSILON`]. The returned normal always faces against the ray.
pub fn intersect_sphere(ray: &Ray, sphere: &Sphere) -> Option<HitRecord> {
    let oc = sphere.center - ray.origin();
    let a = ray.direction().length_squared();
    if a <= 0.0 || !a.is_finite() {
        return None;
    }
    let h = ray.direction().dot(oc);
    let c = oc.length_squared() - sphere.radius * sphere.radius;

    let discriminant = h * h - a * c;
    if !(discriminant >= 0.0) {
        return None;
    }

    let sqrtd = discriminant.sqrt();

    // Find the nearest positive root
    let mut root = (h - sqrtd) / a;
    if root <= T_EPSILON {
        root = (h + sqrtd) / a;
        if root <= T_EPSILON {
            return None;
        }
    }
    if !root.is_finite() {
        return None;
    }

    let p = ray.at(root);
    let outward_normal = (p - sphere.center) / sphere.radius;
    let mut rec = HitRecord::new(ray, root, outward_normal, sphere.material);
    (rec.u, rec.v) = Sphere::get_sphere_uv(outward_normal);
    Some(rec)
}
