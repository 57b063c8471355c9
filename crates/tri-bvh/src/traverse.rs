//! Closest-hit and any-hit queries.

use glam::Vec3;

use crate::build::Bvh;
use crate::geometry::{Hit, Ray, Triangle};

/// Determinant threshold below which a ray counts as parallel to the triangle.
const PARALLEL_EPS: f32 = 1e-9;

/// Möller–Trumbore intersection. Returns `t` when the hit lies strictly
/// inside `(ray.t_min, ray.t_max)`. Both faces are hit.
#[inline]
pub fn intersect_triangle(tri: &Triangle, ray: &Ray) -> Option<f32> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = ray.dir.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / det;
    let s = ray.origin - tri.v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > ray.t_min && t < ray.t_max).then_some(t)
}

impl Bvh {
    /// Nearest hit along the ray segment.
    pub fn closest_hit(&self, triangles: &[Triangle], ray: &Ray) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        self.walk(ray, |prim, seg| {
            if let Some(t) = intersect_triangle(&triangles[prim as usize], seg) {
                best = Some(Hit { prim, t });
                return Visit::Shrink(t);
            }
            Visit::Continue
        });
        best
    }

    /// True as soon as anything blocks the ray segment.
    pub fn any_hit(&self, triangles: &[Triangle], ray: &Ray) -> bool {
        let mut hit = false;
        self.walk(ray, |prim, seg| {
            hit = intersect_triangle(&triangles[prim as usize], seg).is_some();
            if hit {
                Visit::Stop
            } else {
                Visit::Continue
            }
        });
        hit
    }

    /// Stackless preorder walk: a missed box or a finished leaf jumps to
    /// the node's skip link, a hit interior box steps to its first child.
    fn walk<F>(&self, ray: &Ray, mut visit: F)
    where
        F: FnMut(u32, &Ray) -> Visit,
    {
        let inv_dir: Vec3 = ray.inv_dir();
        let mut seg = *ray;
        let mut i = 0;

        while let Some(node) = self.nodes.get(i) {
            if node.bounds().hit(seg.origin, inv_dir, seg.t_min, seg.t_max).is_none() {
                i = node.skip(i);
                continue;
            }
            if node.is_leaf() {
                let first = node.first_or_skip as usize;
                for &prim in &self.order[first..first + node.count as usize] {
                    match visit(prim, &seg) {
                        Visit::Continue => {}
                        Visit::Shrink(t) => seg.t_max = t,
                        Visit::Stop => return,
                    }
                }
            }
            i += 1;
        }
    }
}

/// What the walk does after a primitive test.
enum Visit {
    Continue,
    /// Only hits closer than this are wanted from now on.
    Shrink(f32),
    Stop,
}
