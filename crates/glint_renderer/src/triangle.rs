//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::hittable::{HitRecord, T_EPSILON};
use crate::MaterialId;
use glint_math::{safe_normalize, Aabb, Ray, Vec3};

/// Determinant threshold below which a ray counts as parallel to the triangle.
pub const DET_EPSILON: f32 = 1e-6;

/// A triangle primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices, counter-clockwise when seen from the front
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    /// Material
    pub material: MaterialId,
    /// Copied from the material's surface when the scene is built
    pub double_sided: bool,
}

impl Triangle {
    /// Create a new single-sided triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: MaterialId) -> Self {
        Self {
            v0,
            v1,
            v2,
            material,
            double_sided: false,
        }
    }

    /// Geometric normal (unit length) following the winding order.
    pub fn normal(&self) -> Vec3 {
        safe_normalize((self.v1 - self.v0).cross(self.v2 - self.v0))
    }

    /// Tight bounding box of the three vertices.
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_slice(&[self.v0, self.v1, self.v2])
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    pub fn is_finite(&self) -> bool {
        self.v0.is_finite() && self.v1.is_finite() && self.v2.is_finite()
    }
}

/// Möller-Trumbore ray-triangle intersection.
///
/// Near-parallel rays (`|det| < 1e-6`) and hits at `t <= 1e-6` are misses.
/// A ray arriving from behind a single-sided triangle is culled; otherwise the
/// normal is flipped to face the ray. `u` and `v` of the returned record are
/// the barycentric weights of `v1` and `v2`.
pub fn intersect_triangle(ray: &Ray, tri: &Triangle) -> Option<HitRecord> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = ray.direction().cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle (or the triangle is degenerate)
    if !(a.abs() >= DET_EPSILON) {
        return None;
    }

    // Negative determinant: approaching from the back side
    if a < 0.0 && !tri.double_sided {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - tri.v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction().dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !(t > T_EPSILON) || !t.is_finite() {
        return None;
    }

    let mut rec = HitRecord::new(ray, t, safe_normalize(edge1.cross(edge2)), tri.material);
    rec.u = u;
    rec.v = v;
    Some(rec)
}
