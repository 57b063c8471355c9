//! Sweep SAH builder.
//!
//! Each range is sorted by centroid along the widest centroid axis and every
//! split position is costed exactly. Nodes are emitted in depth-first
//! preorder with skip links, so traversal needs no stack.

use glam::Vec3;

use crate::geometry::{Aabb, BvhNode, Triangle};

/// Cost of one box test relative to one triangle test.
const BOX_COST: f32 = 0.5;

/// Ranges this small always become leaves.
const MIN_SPLIT: usize = 3;

/// SAH may keep a range as a leaf up to this size when splitting costs more.
const MAX_LEAF: usize = 12;

/// Beyond this depth ranges are halved at the median, which bounds depth
/// to this plus `log2(n)`.
const MAX_SAH_DEPTH: usize = 40;

/// Built hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    /// Preorder node array, root first. Empty when built over nothing.
    pub nodes: Vec<BvhNode>,
    /// Triangle indices in leaf order.
    pub order: Vec<u32>,
    depth: usize,
}

impl Bvh {
    /// Hierarchy over nothing. No ray can hit it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth of the deepest leaf (root = 1, empty = 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Leaf nodes with the triangle indices they hold.
    pub fn leaves(&self) -> impl Iterator<Item = (&BvhNode, &[u32])> + '_ {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| {
            let first = n.first_or_skip as usize;
            (n, &self.order[first..first + n.count as usize])
        })
    }
}

struct Builder {
    bounds: Vec<Aabb>,
    centroids: Vec<Vec3>,
    order: Vec<u32>,
    nodes: Vec<BvhNode>,
    /// Half areas of the suffix bounds of the range being split.
    suffix_area: Vec<f32>,
    depth: usize,
}

impl Builder {
    fn range_bounds(&self, start: usize, end: usize) -> (Aabb, Aabb) {
        let mut bounds = Aabb::EMPTY;
        let mut centroids = Aabb::EMPTY;
        for &i in &self.order[start..end] {
            bounds.grow(&self.bounds[i as usize]);
            centroids.grow_point(self.centroids[i as usize]);
        }
        (bounds, centroids)
    }

    fn emit(&mut self, start: usize, end: usize, depth: usize) {
        let index = self.nodes.len();
        let count = end - start;
        let (bounds, centroid_bounds) = self.range_bounds(start, end);
        self.depth = self.depth.max(depth);

        let axis = centroid_bounds.widest_axis();
        let spread = centroid_bounds.max[axis] - centroid_bounds.min[axis];
        if count < MIN_SPLIT || spread <= 0.0 {
            self.nodes.push(BvhNode::leaf(&bounds, start, count));
            return;
        }

        let centroids = &self.centroids;
        self.order[start..end].sort_unstable_by(|&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });

        let mid = if depth >= MAX_SAH_DEPTH {
            start + count / 2
        } else {
            let (mid, cost) = self.best_split(start, end);
            let cost = cost + BOX_COST * bounds.half_area();
            let leaf_cost = count as f32 * bounds.half_area();
            if cost >= leaf_cost && count <= MAX_LEAF {
                self.nodes.push(BvhNode::leaf(&bounds, start, count));
                return;
            }
            mid
        };

        self.nodes.push(BvhNode::interior(&bounds, 0));
        self.emit(start, mid, depth + 1);
        self.emit(mid, end, depth + 1);
        self.nodes[index] = BvhNode::interior(&bounds, self.nodes.len());
    }

    /// Cheapest split of a sorted range. Returns the first index of the
    /// right half and the cost of its two children in half-area units.
    fn best_split(&mut self, start: usize, end: usize) -> (usize, f32) {
        let count = end - start;
        self.suffix_area.clear();
        self.suffix_area.resize(count + 1, 0.0);

        let mut sweep = Aabb::EMPTY;
        for k in (1..count).rev() {
            sweep.grow(&self.bounds[self.order[start + k] as usize]);
            self.suffix_area[k] = sweep.half_area();
        }

        let mut best = (start + count / 2, f32::INFINITY);
        sweep = Aabb::EMPTY;
        for k in 1..count {
            sweep.grow(&self.bounds[self.order[start + k - 1] as usize]);
            let cost = k as f32 * sweep.half_area() + (count - k) as f32 * self.suffix_area[k];
            if cost < best.1 {
                best = (start + k, cost);
            }
        }
        best
    }
}

/// Build a BVH over `triangles`. Triangles are not moved; leaves index into
/// the original slice through [`Bvh::order`].
#[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
pub fn build_bvh(triangles: &[Triangle]) -> Bvh {
    if triangles.is_empty() {
        return Bvh::empty();
    }

    let mut builder = Builder {
        bounds: triangles.iter().map(Triangle::aabb).collect(),
        centroids: triangles.iter().map(Triangle::centroid).collect(),
        order: (0..triangles.len() as u32).collect(),
        nodes: Vec::with_capacity(triangles.len()),
        suffix_area: Vec::new(),
        depth: 0,
    };
    builder.emit(0, triangles.len(), 1);

    tracing::debug!(nodes = builder.nodes.len(), depth = builder.depth, "bvh built");
    Bvh {
        nodes: builder.nodes,
        order: builder.order,
        depth: builder.depth,
    }
}
