//! Primitive types shared by the builder and the traversal.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// `1 + 2 * gamma(3)` rounded up, with `gamma(n) = n*u / (1 - n*u)` and
/// `u = f32::EPSILON / 2`. Scaling the slab exit distance by this bounds the
/// rounding of the subtract, reciprocal and multiply in [`Aabb::hit`].
const EXIT_SCALE: f32 = 1.000_000_4;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn grow(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Half the surface area. Only ratios matter to the SAH.
    #[inline]
    pub fn half_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        d.x * d.y + d.y * d.z + d.z * d.x
    }

    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Index of the widest axis.
    #[inline]
    pub fn widest_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Grown outward by a few ulps of its own magnitude.
    ///
    /// Stored node bounds are padded so a triangle lying on a box face
    /// is never culled by rounding in the slab test.
    pub fn padded(&self) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let magnitude = self.min.abs().max(self.max.abs());
        let pad = magnitude * (4.0 * f32::EPSILON) + Vec3::splat(f32::MIN_POSITIVE);
        Aabb {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Conservative slab test. Returns the entry distance when the ray
    /// overlaps the box inside `[t_min, t_max]`.
    ///
    /// `inv_dir` holds true reciprocals, so zero components are infinite.
    /// A `0 * inf` NaN (origin on a slab plane, ray parallel to it) leaves
    /// that axis unconstrained; `f32::min`/`max` drop the NaN operand.
    #[inline]
    pub fn hit(&self, origin: Vec3, inv_dir: Vec3, t_min: f32, t_max: f32) -> Option<f32> {
        let mut t_enter = t_min;
        let mut t_exit = t_max;
        for axis in 0..3 {
            let a = (self.min[axis] - origin[axis]) * inv_dir[axis];
            let b = (self.max[axis] - origin[axis]) * inv_dir[axis];
            let (near, far) = if a > b { (b, a) } else { (a, b) };
            t_enter = t_enter.max(near);
            t_exit = t_exit.min(far * EXIT_SCALE);
        }
        (t_enter <= t_exit).then_some(t_enter)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Flat BVH node (32 bytes) in depth-first preorder.
///
/// The first child of an interior node is always the next node.
/// Leaf: `first_or_skip` = first slot in `Bvh::order`, `count` > 0.
/// Interior: `first_or_skip` = index of the node after this subtree, `count` = 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: [f32; 3],
    pub first_or_skip: u32,
    pub aabb_max: [f32; 3],
    pub count: u32,
}

impl BvhNode {
    pub(crate) fn leaf(bounds: &Aabb, first: usize, count: usize) -> Self {
        Self::with(bounds, first as u32, count as u32)
    }

    pub(crate) fn interior(bounds: &Aabb, skip: usize) -> Self {
        Self::with(bounds, skip as u32, 0)
    }

    fn with(bounds: &Aabb, first_or_skip: u32, count: u32) -> Self {
        let b = bounds.padded();
        Self {
            aabb_min: b.min.to_array(),
            first_or_skip,
            aabb_max: b.max.to_array(),
            count,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    /// Where traversal continues when this node is missed or finished.
    #[inline]
    pub fn skip(&self, index: usize) -> usize {
        if self.is_leaf() {
            index + 1
        } else {
            self.first_or_skip as usize
        }
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb {
            min: Vec3::from_array(self.aabb_min),
            max: Vec3::from_array(self.aabb_max),
        }
    }
}

/// Triangle as three world-space corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb {
            min: self.v0.min(self.v1).min(self.v2),
            max: self.v0.max(self.v1).max(self.v2),
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    pub fn is_finite(&self) -> bool {
        self.v0.is_finite() && self.v1.is_finite() && self.v2.is_finite()
    }
}

/// Ray segment `origin + t * dir` for `t` in `(t_min, t_max)`.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3, t_min: f32, t_max: f32) -> Self {
        Self { origin, dir, t_min, t_max }
    }

    /// Component-wise `1 / dir`; zero components become signed infinities.
    #[inline]
    pub(crate) fn inv_dir(&self) -> Vec3 {
        Vec3::new(1.0 / self.dir.x, 1.0 / self.dir.y, 1.0 / self.dir.z)
    }
}

/// Closest intersection found by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into the triangle slice the BVH was built from.
    pub prim: u32,
    /// Parametric distance along the ray.
    pub t: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_grow_and_area() {
        let mut b = Aabb::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.half_area(), 0.0);

        b.grow_point(Vec3::ZERO);
        b.grow_point(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.centroid(), Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(b.half_area(), 2.0 + 6.0 + 3.0);
        assert_eq!(b.widest_axis(), 2);
    }

    #[test]
    fn test_aabb_slab_hit() {
        let b = Aabb { min: Vec3::splat(-1.0), max: Vec3::splat(1.0) };
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, 100.0);
        let t = b.hit(ray.origin, ray.inv_dir(), ray.t_min, ray.t_max);
        assert_eq!(t, Some(4.0));

        // Segment ends before the box
        assert!(b.hit(ray.origin, ray.inv_dir(), 0.0, 3.0).is_none());

        // Axis-parallel ray outside the slab
        let miss = Ray::new(Vec3::new(2.0, 0.0, -5.0), Vec3::Z, 0.0, 100.0);
        assert!(b.hit(miss.origin, miss.inv_dir(), 0.0, 100.0).is_none());
    }

    #[test]
    fn test_axis_parallel_ray_on_face_plane_hits() {
        // x = 1 is a face plane and the ray never moves in x: 0 * inf
        let b = Aabb { min: Vec3::splat(-1.0), max: Vec3::splat(1.0) };
        let ray = Ray::new(Vec3::new(1.0, 0.0, -5.0), Vec3::Z, 0.0, 100.0);
        assert_eq!(b.hit(ray.origin, ray.inv_dir(), 0.0, 100.0), Some(4.0));

        let flat = Aabb { min: Vec3::new(-1.0, -1.0, 0.0), max: Vec3::new(1.0, 1.0, 0.0) };
        let along = Ray::new(Vec3::new(-3.0, 0.0, 0.0), Vec3::X, 0.0, 100.0);
        assert_eq!(flat.hit(along.origin, along.inv_dir(), 0.0, 100.0), Some(2.0));
    }

    #[test]
    fn test_ray_through_padded_box_edge_is_kept() {
        // Enters through y = 3 exactly where it leaves through z = 0
        let b = Aabb { min: Vec3::new(3.0, 3.0, 0.0), max: Vec3::new(5.9, 5.9, 1.3) };
        let dir = Vec3::new(0.1, 0.05, -1.0).normalize();
        let ray = Ray::new(Vec3::new(2.45, 2.5, 10.0), dir, 1e-4, 100.0);
        assert!(b.padded().hit(ray.origin, ray.inv_dir(), ray.t_min, ray.t_max).is_some());
    }

    #[test]
    fn test_padding_grows_outward() {
        let b = Aabb { min: Vec3::new(-2.0, 0.0, 3.0), max: Vec3::new(-1.0, 0.0, 4.0) };
        let p = b.padded();
        assert!(p.min.cmplt(b.min).all());
        assert!(p.max.cmpgt(b.max).all());
        assert!((p.max - b.max).max_element() < 1e-5);
        assert!(Aabb::EMPTY.padded().is_empty());
    }

    #[test]
    fn test_node_pod_size() {
        assert_eq!(std::mem::size_of::<BvhNode>(), 32);
    }
}
