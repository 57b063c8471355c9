//! Cosine-weighted hemisphere sampling.

use std::f64::consts::PI;

use crate::util::{DVec3, Sampler, Vec3};

/// Copy of `n` with its smallest-magnitude component set to 1.
/// Ties resolve x, then y, then z.
fn helper_vector(n: DVec3) -> DVec3 {
    let a = n.abs();
    let mut h = n;
    if a.x <= a.y && a.x <= a.z {
        h.x = 1.0;
    } else if a.y <= a.z {
        h.y = 1.0;
    } else {
        h.z = 1.0;
    }
    h
}

/// Two unit vectors spanning the plane orthogonal to `n`.
fn tangent_frame(n: DVec3) -> (DVec3, DVec3) {
    let x = helper_vector(n)
        .cross(n)
        .try_normalize()
        .unwrap_or_else(|| n.normalize().any_orthonormal_vector());
    let z = x.cross(n).normalize();
    (x, z)
}

/// Direction drawn from a cosine-weighted hemisphere around `n`.
///
/// `n` need not be unit length; it is used as given for the polar axis and
/// only its direction matters for the tangent frame. Computed in `f64`.
pub fn cosine_weighted_hemisphere_sample(n: Vec3, sampler: &mut Sampler) -> Vec3 {
    let xi1 = sampler.next_f64();
    let xi2 = sampler.next_f64();

    let theta = (1.0 - xi1).sqrt().acos();
    let phi = 2.0 * PI * xi2;
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();

    let n = n.as_dvec3();
    let (x, z) = tangent_frame(n);
    let dir = x * (sin_t * cos_p) + n * cos_t + z * (sin_t * sin_p);
    dir.normalize().as_vec3()
}
