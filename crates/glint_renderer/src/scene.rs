//! Immutable render scene: materials, spheres, triangles and the triangle BVH.
//!
//! A [`Scene`] is assembled once through [`SceneBuilder`] and never mutated
//! afterwards. Any geometry change means building a new scene; workers share
//! it read-only through an `Arc`.

use std::time::Instant;

use glint_math::{Aabb, Ray, Vec3};
use thiserror::Error;

use crate::bvh::Bvh;
use crate::hittable::HitRecord;
use crate::sphere::{intersect_sphere, Sphere};
use crate::triangle::{intersect_triangle, Triangle};
use crate::{MaterialId, Surface};

/// Errors that can occur while assembling a scene.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("Unknown material id {0} (scene has {1} materials)")]
    UnknownMaterial(u32, usize),

    #[error("Sphere {index} has invalid radius {radius}")]
    InvalidRadius { index: usize, radius: f32 },

    #[error("{kind} {index} has non-finite coordinates")]
    NonFinite { kind: &'static str, index: usize },
}

/// Result type for scene construction.
pub type SceneResult<T> = Result<T, SceneError>;

/// Collects materials and primitives, then builds an immutable [`Scene`].
#[derive(Debug, Default, Clone)]
pub struct SceneBuilder {
    materials: Vec<Surface>,
    spheres: Vec<Sphere>,
    triangles: Vec<Triangle>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and get its id.
    pub fn add_material(&mut self, surface: impl Into<Surface>) -> MaterialId {
        self.materials.push(surface.into());
        MaterialId(self.materials.len() as u32 - 1)
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: MaterialId) -> &mut Self {
        self.spheres.push(Sphere::new(center, radius, material));
        self
    }

    pub fn add_triangle(
        &mut self,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        material: MaterialId,
    ) -> &mut Self {
        self.triangles.push(Triangle::new(v0, v1, v2, material));
        self
    }

    /// Add a planar quad `a b c d` (counter-clockwise from the front) as two triangles.
    pub fn add_quad(
        &mut self,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        d: Vec3,
        material: MaterialId,
    ) -> &mut Self {
        self.add_triangle(a, b, c, material);
        self.add_triangle(a, c, d, material)
    }

    /// Validate the collected primitives and build the scene and its BVH.
    pub fn build(self) -> SceneResult<Scene> {
        let SceneBuilder {
            materials,
            spheres,
            mut triangles,
        } = self;

        for (index, sphere) in spheres.iter().enumerate() {
            lookup_material(&materials, sphere.material)?;
            if !sphere.center.is_finite() {
                return Err(SceneError::NonFinite { kind: "Sphere", index });
            }
            if !(sphere.radius > 0.0) || !sphere.radius.is_finite() {
                return Err(SceneError::InvalidRadius {
                    index,
                    radius: sphere.radius,
                });
            }
        }

        for (index, tri) in triangles.iter_mut().enumerate() {
            let surface = lookup_material(&materials, tri.material)?;
            if !tri.is_finite() {
                return Err(SceneError::NonFinite { kind: "Triangle", index });
            }
            tri.double_sided = surface.double_sided;
        }

        let start = Instant::now();
        let bvh = Bvh::build(&triangles);
        log::info!(
            "Built BVH over {} triangles: {} nodes, {} leaves, depth {} in {:?}",
            triangles.len(),
            bvh.node_count(),
            bvh.leaf_count(),
            bvh.depth(),
            start.elapsed()
        );

        Ok(Scene {
            materials,
            spheres,
            triangles,
            bvh,
        })
    }
}

fn lookup_material(materials: &[Surface], id: MaterialId) -> SceneResult<&Surface> {
    materials
        .get(id.index())
        .ok_or(SceneError::UnknownMaterial(id.0, materials.len()))
}

/// An immutable set of spheres and triangles with their materials.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    materials: Vec<Surface>,
    spheres: Vec<Sphere>,
    triangles: Vec<Triangle>,
    bvh: Bvh,
}

impl Scene {
    /// A scene with nothing in it; every ray misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> SceneBuilder {
        SceneBuilder::new()
    }

    pub fn materials(&self) -> &[Surface] {
        &self.materials
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Look up a material. Ids are validated when the scene is built.
    #[inline]
    pub fn surface(&self, id: MaterialId) -> &Surface {
        &self.materials[id.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty() && self.triangles.is_empty()
    }

    /// Bounds of all geometry.
    pub fn bounding_box(&self) -> Aabb {
        self.spheres
            .iter()
            .fold(self.bvh.bounding_box(), |acc, s| Aabb::surrounding(&acc, &s.bounding_box()))
    }

    /// Nearest hit over the whole scene.
    ///
    /// Spheres are tested linearly; triangles go through the BVH, pruned by
    /// the nearest sphere hit found so far.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<HitRecord> {
        let mut closest: Option<HitRecord> = None;
        for sphere in &self.spheres {
            closest = HitRecord::nearest(closest, intersect_sphere(ray, sphere));
        }

        let t_max = closest.map_or(f32::INFINITY, |rec| rec.t);
        HitRecord::nearest(closest, self.bvh.query_nearest(&self.triangles, ray, t_max))
    }

    /// Exhaustive nearest hit without the BVH, as a reference for the
    /// accelerated query.
    pub fn nearest_hit_linear(&self, ray: &Ray) -> Option<HitRecord> {
        let spheres = self.spheres.iter().map(|s| intersect_sphere(ray, s));
        let triangles = self.triangles.iter().map(|t| intersect_triangle(ray, t));
        spheres.chain(triangles).fold(None, HitRecord::nearest)
    }
}
