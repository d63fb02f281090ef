//! Bounding Volume Hierarchy (BVH) over the scene's triangles.
//!
//! Nodes live in a flat vector and refer to each other by index; leaves hold
//! indices into the triangle slice the tree was built from. Traversal uses an
//! explicit fixed-size stack, never recursion.

use crate::hittable::HitRecord;
use crate::triangle::{intersect_triangle, Triangle};
use glint_math::{Aabb, Interval, Ray};

/// Maximum triangles per leaf node before splitting.
pub const LEAF_MAX_SIZE: usize = 4;

/// Nodes deeper than this become leaves regardless of size.
pub const MAX_DEPTH: usize = 16;

/// Enough for any tree honouring `MAX_DEPTH`: each level leaves at most one
/// sibling on the stack.
const STACK_SIZE: usize = 64;

/// BVH node - either a branch with two children or a leaf with triangles.
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    /// Internal node with two children (indices into the node array).
    Branch { left: u32, right: u32, bbox: Aabb },
    /// Leaf node with a small number of triangles.
    Leaf { triangles: Vec<u32>, bbox: Aabb },
}

impl BvhNode {
    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => *bbox,
        }
    }
}

/// A median-split BVH. The root is node 0; an empty tree has no nodes.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    depth: usize,
}

impl Bvh {
    /// Build a BVH over `triangles`.
    pub fn build(triangles: &[Triangle]) -> Self {
        Self::build_with_limits(triangles, LEAF_MAX_SIZE, MAX_DEPTH)
    }

    pub(crate) fn build_with_limits(
        triangles: &[Triangle],
        leaf_max: usize,
        max_depth: usize,
    ) -> Self {
        let mut bvh = Bvh::default();
        if triangles.is_empty() {
            return bvh;
        }

        let indices: Vec<u32> = (0..triangles.len() as u32).collect();
        bvh.nodes.reserve(2 * triangles.len() / leaf_max.max(1) + 1);
        bvh.build_node(triangles, indices, 0, leaf_max, max_depth);
        bvh
    }

    /// Recursive construction.
    ///
    /// Simple median-split approach: pick the longest axis of the node bounds,
    /// sort triangles by centroid on it, split in half, recurse.
    fn build_node(
        &mut self,
        triangles: &[Triangle],
        mut indices: Vec<u32>,
        depth: usize,
        leaf_max: usize,
        max_depth: usize,
    ) -> u32 {
        self.depth = self.depth.max(depth);

        let bounds = indices.iter().fold(Aabb::EMPTY, |acc, &i| {
            Aabb::surrounding(&acc, &triangles[i as usize].bounding_box())
        });

        let slot = self.nodes.len() as u32;

        // Create leaf for small sets or once the depth cap is exceeded
        if indices.len() <= leaf_max || depth > max_depth {
            self.nodes.push(BvhNode::Leaf {
                triangles: indices,
                bbox: bounds,
            });
            return slot;
        }

        let axis = bounds.longest_axis();
        indices.sort_unstable_by(|&a, &b| {
            let a_val = triangles[a as usize].centroid()[axis];
            let b_val = triangles[b as usize].centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        // Reserve our slot; children are patched in once built
        self.nodes.push(BvhNode::Branch {
            left: 0,
            right: 0,
            bbox: bounds,
        });

        let mid = indices.len() / 2;
        let right_indices = indices.split_off(mid);
        let left = self.build_node(triangles, indices, depth + 1, leaf_max, max_depth);
        let right = self.build_node(triangles, right_indices, depth + 1, leaf_max, max_depth);

        self.nodes[slot as usize] = BvhNode::Branch {
            left,
            right,
            bbox: bounds,
        };
        slot
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, BvhNode::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest node (root = 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bounds of the whole tree.
    pub fn bounding_box(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, BvhNode::bounding_box)
    }

    /// Nearest triangle hit with `t` below `t_max`.
    ///
    /// `triangles` must be the slice the tree was built from.
    pub fn query_nearest(
        &self,
        triangles: &[Triangle],
        ray: &Ray,
        t_max: f32,
    ) -> Option<HitRecord> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut stack = [0u32; STACK_SIZE];
        let mut top = 1;
        let mut closest: Option<HitRecord> = None;
        let mut closest_t = t_max;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if !node.bounding_box().hit(ray, Interval::new(0.0, closest_t)) {
                continue;
            }

            match node {
                BvhNode::Leaf { triangles: members, .. } => {
                    for &i in members {
                        if let Some(rec) = intersect_triangle(ray, &triangles[i as usize]) {
                            if rec.t < closest_t {
                                closest_t = rec.t;
                                closest = Some(rec);
                            }
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    stack[top] = *right;
                    stack[top + 1] = *left;
                    top += 2;
                }
            }
        }

        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MaterialId;
    use glint_math::Vec3;

    fn strip(count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|i| {
                let x = i as f32 * 2.0;
                Triangle::new(
                    Vec3::new(x - 0.5, -0.5, -5.0),
                    Vec3::new(x + 0.5, -0.5, -5.0),
                    Vec3::new(x, 0.5, -5.0),
                    MaterialId(0),
                )
            })
            .collect()
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[]);
        assert!(bvh.is_empty());
        assert!(bvh.query_nearest(&[], &Ray::new(Vec3::ZERO, -Vec3::Z), f32::INFINITY).is_none());
    }

    #[test]
    fn test_bvh_single_triangle_is_leaf() {
        let tris = strip(1);
        let bvh = Bvh::build(&tris);

        assert_eq!(bvh.node_count(), 1);
        assert!(matches!(bvh.nodes()[0], BvhNode::Leaf { .. }));

        let hit = bvh.query_nearest(&tris, &Ray::new(Vec3::ZERO, -Vec3::Z), f32::INFINITY);
        assert!(hit.is_some());
    }

    #[test]
    fn test_bvh_finds_the_right_triangle() {
        let tris = strip(40);
        let bvh = Bvh::build(&tris);
        assert!(bvh.node_count() > 1);

        // Ray aimed at triangle 17
        let ray = Ray::new(Vec3::new(34.0, 0.0, 0.0), -Vec3::Z);
        let rec = bvh.query_nearest(&tris, &ray, f32::INFINITY).unwrap();
        assert!((rec.t - 5.0).abs() < 1e-5);
        assert!((rec.p.x - 34.0).abs() < 1e-5);

        // Ray between two triangles
        let ray = Ray::new(Vec3::new(35.0, 0.0, 0.0), -Vec3::Z);
        assert!(bvh.query_nearest(&tris, &ray, f32::INFINITY).is_none());
    }

    #[test]
    fn test_bvh_respects_t_max() {
        let tris = strip(10);
        let bvh = Bvh::build(&tris);
        let ray = Ray::new(Vec3::new(4.0, 0.0, 0.0), -Vec3::Z);

        assert!(bvh.query_nearest(&tris, &ray, 4.0).is_none());
        assert!(bvh.query_nearest(&tris, &ray, 6.0).is_some());
    }

    #[test]
    fn test_leaves_and_bounds_invariants() {
        let tris = strip(100);
        let bvh = Bvh::build(&tris);
        let mut seen = vec![0usize; tris.len()];

        for node in bvh.nodes() {
            match node {
                BvhNode::Leaf { triangles, bbox } => {
                    assert!(!triangles.is_empty());
                    assert!(triangles.len() <= LEAF_MAX_SIZE);
                    let tight = triangles.iter().fold(Aabb::EMPTY, |acc, &i| {
                        Aabb::surrounding(&acc, &tris[i as usize].bounding_box())
                    });
                    assert_eq!(*bbox, tight);
                    for &i in triangles {
                        seen[i as usize] += 1;
                    }
                }
                BvhNode::Branch { left, right, bbox } => {
                    let l = bvh.nodes()[*left as usize].bounding_box();
                    let r = bvh.nodes()[*right as usize].bounding_box();
                    assert_eq!(*bbox, Aabb::surrounding(&l, &r));
                }
            }
        }

        assert!(seen.iter().all(|&count| count == 1));
        assert!(bvh.depth() <= MAX_DEPTH + 1);
    }

    #[test]
    fn test_depth_cap_forces_leaves() {
        let tris = vec![strip(1)[0]; 100];
        let bvh = Bvh::build_with_limits(&tris, 1, 3);

        // Leaves appear at depth 4 holding 100 / 16 triangles each
        assert_eq!(bvh.depth(), 4);
        let leaf_sizes: Vec<usize> = bvh
            .nodes()
            .iter()
            .filter_map(|n| match n {
                BvhNode::Leaf { triangles, .. } => Some(triangles.len()),
                _ => None,
            })
            .collect();
        assert_eq!(leaf_sizes.len(), 16);
        assert!(leaf_sizes.iter().all(|&n| n > 1));
        assert_eq!(leaf_sizes.iter().sum::<usize>(), tris.len());
    }
}
