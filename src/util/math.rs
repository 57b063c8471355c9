//! Math type re-exports and scalar helpers used by the kernels.

pub use glam::{DVec3, Vec2, Vec3};

/// Clamp to `[0, 1]`.
#[inline]
pub fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Z component of the 3D cross product of two 2D vectors.
#[inline]
pub fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Inclusive point-in-triangle test: points on an edge count as inside.
/// Works for either winding.
pub fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    same_side(p, a, b, c) && same_side(p, b, a, c) && same_side(p, c, a, b)
}

/// Whether `p1` and `p2` lie on the same side of the line through `a` and `b`.
fn same_side(p1: Vec2, p2: Vec2, a: Vec2, b: Vec2) -> bool {
    let ab = b - a;
    cross2(ab, p1 - a) * cross2(ab, p2 - a) >= 0.0
}
