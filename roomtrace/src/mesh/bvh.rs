//! Flat binary BVH over primitive bounding boxes.
//!
//! The tree knows nothing about triangles: traversal hands candidate
//! primitive indices to a caller-supplied hit test that returns the hit
//! distance, and prunes nodes farther than the nearest hit seen so far.

use roomtrace_core::math::{Aabb, Ray};

const LEAF_SIZE: usize = 4;

#[derive(Debug, Clone)]
struct Node {
    aabb: Aabb,
    left: u32,
    right: u32,
    /// Start of the primitive range for leaves, into `order`.
    start: u32,
    /// Number of primitives; zero for interior nodes.
    count: u32,
}

/// Bounding volume hierarchy with median splits on the longest axis.
#[derive(Debug, Clone, Default)]
pub(crate) struct Bvh {
    nodes: Vec<Node>,
    /// Permutation of primitive indices, partitioned per leaf.
    order: Vec<u32>,
}

impl Bvh {
    /// Builds a hierarchy over the given primitive bounds.
    pub fn build(aabbs: &[Aabb]) -> Self {
        let mut bvh = Self {
            nodes: Vec::new(),
            order: (0..aabbs.len() as u32).collect(),
        };
        if !aabbs.is_empty() {
            let n = aabbs.len();
            bvh.build_node(aabbs, 0, n);
        }
        bvh
    }

    /// Builds the subtree over `order[start..end]`, returning its index.
    fn build_node(&mut self, aabbs: &[Aabb], start: usize, end: usize) -> u32 {
        let mut bounds = Aabb::empty();
        let mut centroid_bounds = Aabb::empty();
        for &prim in &self.order[start..end] {
            bounds.extend(&aabbs[prim as usize]);
            centroid_bounds.extend_point(aabbs[prim as usize].center());
        }

        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            aabb: bounds,
            left: 0,
            right: 0,
            start: start as u32,
            count: 0,
        });

        let count = end - start;
        let axis = centroid_bounds.max_extent_axis();
        let extent = centroid_bounds.extent()[axis];
        if count <= LEAF_SIZE || extent <= 0.0 {
            self.nodes[index as usize].count = count as u32;
            return index;
        }

        let mid = start + count / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            aabbs[a as usize].center()[axis].total_cmp(&aabbs[b as usize].center()[axis])
        });

        let left = self.build_node(aabbs, start, mid);
        let right = self.build_node(aabbs, mid, end);
        self.nodes[index as usize].left = left;
        self.nodes[index as usize].right = right;
        index
    }

    /// Walks the tree front to back-ish, calling `hit` for every primitive
    /// in a leaf whose box the ray touches. `hit` receives the primitive
    /// index and the current pruning distance, and returns the new nearest
    /// hit distance if the primitive was hit closer than that.
    pub fn traverse(&self, ray: &Ray, mut hit: impl FnMut(usize, f64) -> Option<f64>) {
        if self.nodes.is_empty() {
            return;
        }
        let inv_dir = ray.dir.recip();
        let mut t_max = f64::INFINITY;
        let mut stack: Vec<u32> = vec![0];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.aabb.hit_by(ray.org, inv_dir, t_max) {
                continue;
            }
            if node.count > 0 {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.order[start..end] {
                    if let Some(t) = hit(prim as usize, t_max) {
                        t_max = t;
                    }
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomtrace_core::math::Vec3;

    fn grid_boxes(n: usize) -> Vec<Aabb> {
        (0..n)
            .map(|i| {
                let x = i as f64 * 2.0;
                Aabb::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0))
            })
            .collect()
    }

    #[test]
    fn traversal_visits_hit_boxes_only_within_pruning() {
        let aabbs = grid_boxes(64);
        let bvh = Bvh::build(&aabbs);
        let ray = Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::X);

        // Treat every box as a primitive hit at its entry distance and
        // keep the nearest.
        let mut nearest = f64::INFINITY;
        bvh.traverse(&ray, |index, t_max| {
            let entry = aabbs[index].min.x - ray.org.x;
            if entry < t_max {
                nearest = nearest.min(entry);
                Some(entry)
            } else {
                None
            }
        });
        // The first box starts at x = 0, one unit from the origin.
        assert!((nearest - 1.0).abs() < 1e-12);
    }

    #[test]
    fn traversal_of_empty_tree_is_a_noop() {
        let bvh = Bvh::build(&[]);
        let mut called = false;
        bvh.traverse(&Ray::new(Vec3::ZERO, Vec3::X), |_, _| {
            called = true;
            None
        });
        assert!(!called);
    }

    #[test]
    fn all_primitives_reachable() {
        let aabbs = grid_boxes(33);
        let bvh = Bvh::build(&aabbs);
        // A ray along the row of boxes must be offered every one of them
        // when nothing ever claims a hit.
        let mut seen = vec![false; aabbs.len()];
        bvh.traverse(&Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::X), |index, _| {
            seen[index] = true;
            None
        });
        assert!(seen.iter().all(|&s| s));
    }
}
