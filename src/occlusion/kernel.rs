//! Per-texel occlusion estimate.

use crate::intersect::{IntersectionService, RayBatch, RAY_BATCH_SIZE};
use crate::mesh::Mesh;
use crate::util::{cross2, saturate, Sampler, Vec2, Vec3};

use super::sampling::cosine_weighted_hemisphere_sample;
use super::OcclusionParams;

/// UV triangles with a smaller doubled area are treated as degenerate.
const MIN_UV_AREA: f32 = 1e-12;

/// Result of sampling one texel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexelOcclusion {
    /// Normalized occlusion in `[0, 1]`; 0 when nothing was hit.
    pub value: f32,
    /// Rays that hit something.
    pub hits: u32,
}

/// Barycentric weights of `p` in the UV triangle by unsigned sub-area ratios.
///
/// Each weight is the area of the sub-triangle opposite a corner over the
/// full area, with absolute values taken so winding does not matter. Inside
/// the triangle the weights sum to 1; outside they sum to more than 1.
/// Returns `None` for a degenerate triangle.
pub fn barycentric_weights(p: Vec2, uv: [Vec2; 3]) -> Option<[f32; 3]> {
    let total = cross2(uv[1] - uv[0], uv[2] - uv[0]).abs();
    if total <= MIN_UV_AREA || !total.is_finite() {
        return None;
    }
    let sub = |a: Vec2, b: Vec2| cross2(a - p, b - p).abs() / total;
    Some([sub(uv[1], uv[2]), sub(uv[2], uv[0]), sub(uv[0], uv[1])])
}

/// UV of the center of texel `(row, col)` in a `width x height` map.
#[inline]
pub fn texel_center(row: u32, col: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new((col as f32 + 0.5) / width as f32, (row as f32 + 0.5) / height as f32)
}

/// Surface point and normal for a texel inside `face`.
///
/// `None` when the face is degenerate in UV space or the normal vanishes.
pub fn surface_sample(mesh: &Mesh, face: usize, uv: Vec2, smooth_normals: bool) -> Option<(Vec3, Vec3)> {
    let w = barycentric_weights(uv, mesh.face_texcoords(face))?;
    let p = mesh.face_positions(face);
    let n = mesh.face_normals(face);

    let position = p[0] * w[0] + p[1] * w[1] + p[2] * w[2];
    let normal = if smooth_normals {
        n[0] * w[0] + n[1] * w[1] + n[2] * w[2]
    } else {
        (n[0] + n[1] + n[2]) / 3.0
    };

    (position.is_finite() && normal.is_finite() && normal != Vec3::ZERO).then_some((position, normal))
}

/// Estimate occlusion at texel `(row, col)` covered by `face`.
///
/// Fires `quality` batches of cosine-distributed rays from the interpolated
/// surface point. Every hit contributes `1 - saturate(distance / max_distance)`;
/// the sum is normalized by the ray count, divided by the linear attenuation,
/// raised to the quadratic attenuation and clamped to `[0, 1]`.
///
/// Returns `None` when the texel has no usable surface point.
pub fn occlusion_at_texel<S>(
    service: &S,
    mesh: &Mesh,
    params: &OcclusionParams,
    face: usize,
    center: Vec2,
    sampler: &mut Sampler,
) -> Option<TexelOcclusion>
where
    S: IntersectionService + ?Sized,
{
    let (origin, normal) = surface_sample(mesh, face, center, params.smooth_normal_interpolation)?;

    let mut occlusion = 0.0f32;
    let mut hits = 0u32;
    for _ in 0..params.quality {
        let dirs = std::array::from_fn(|_| cosine_weighted_hemisphere_sample(normal, sampler));
        let batch = RayBatch::from_origin(origin, dirs);
        let result = service.intersect(&batch, params.max_distance, params.min_distance);
        for (_, distance) in result.hits() {
            occlusion += 1.0 - saturate(distance / params.max_distance);
            hits += 1;
        }
    }

    if hits == 0 {
        return Some(TexelOcclusion { value: 0.0, hits });
    }

    occlusion /= (params.quality as usize * RAY_BATCH_SIZE) as f32;
    occlusion /= params.linear_attenuation;
    occlusion = occlusion.powf(params.quadratic_attenuation);
    Some(TexelOcclusion { value: saturate(occlusion), hits })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::{CpuScene, GeometryId, IntersectResult, OccludedResult};
    use crate::mesh::Face;
    use crate::util::Result;

    fn flat_triangle(z: f32) -> Mesh {
        Mesh::new(
            vec![Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 0.0, z), Vec3::new(1.0, 1.0, z)],
            vec![Vec3::Z; 3],
            vec![Vec2::ZERO, Vec2::X, Vec2::ONE],
            vec![Face::new(0, 1, 2)],
        )
        .unwrap()
    }

    /// Reports every ray as a hit at a fixed distance.
    struct ConstantHits(f32);

    impl IntersectionService for ConstantHits {
        fn add_mesh(&mut self, _: &Mesh) -> GeometryId {
            0
        }
        fn remove_mesh(&mut self, _: GeometryId) -> Result<()> {
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_committed(&self) -> bool {
            true
        }
        fn intersect(&self, _: &RayBatch, _: f32, _: f32) -> IntersectResult {
            IntersectResult { ids: [0; RAY_BATCH_SIZE], distances: [self.0; RAY_BATCH_SIZE] }
        }
        fn occluded(&self, _: &RayBatch, _: f32, _: f32) -> OccludedResult {
            [true; RAY_BATCH_SIZE]
        }
    }

    #[test]
    fn test_weights_partition_unity() {
        let uv = [Vec2::new(0.1, 0.2), Vec2::new(0.9, 0.3), Vec2::new(0.4, 0.8)];
        let pos = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.5, 2.0), Vec3::new(0.0, 4.0, -1.0)];
        for p in [Vec2::new(0.4, 0.4), Vec2::new(0.5, 0.3), uv[0], (uv[0] + uv[1] + uv[2]) / 3.0] {
            let w = barycentric_weights(p, uv).unwrap();
            assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-5, "{p:?} -> {w:?}");

            // Weights reproduce the UV point and interpolate positions linearly
            let back = uv[0] * w[0] + uv[1] * w[1] + uv[2] * w[2];
            assert!((back - p).length() < 1e-5);
            let x = pos[0] * w[0] + pos[1] * w[1] + pos[2] * w[2];
            assert!(x.is_finite());
        }

        let w = barycentric_weights(uv[1], uv).unwrap();
        assert!((w[1] - 1.0).abs() < 1e-5 && w[0].abs() < 1e-5 && w[2].abs() < 1e-5);
    }

    #[test]
    fn test_weights_ignore_winding() {
        let p = Vec2::new(0.3, 0.2);
        let a = barycentric_weights(p, [Vec2::ZERO, Vec2::X, Vec2::Y]).unwrap();
        let b = barycentric_weights(p, [Vec2::ZERO, Vec2::Y, Vec2::X]).unwrap();
        assert_eq!(a[0], b[0]);
        assert_eq!(a[1], b[2]);
        assert_eq!(a[2], b[1]);
    }

    #[test]
    fn test_weights_outside_are_not_clamped() {
        // (1, 1) is outside; unsigned areas give 1 + 1 + 1
        let w = barycentric_weights(Vec2::ONE, [Vec2::ZERO, Vec2::X, Vec2::Y]).unwrap();
        assert!((w.iter().sum::<f32>() - 3.0).abs() < 1e-5, "{w:?}");
        assert!(w.iter().all(|&x| (x - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_degenerate_uv_triangle() {
        assert!(barycentric_weights(Vec2::ZERO, [Vec2::ZERO, Vec2::X, Vec2::X * 2.0]).is_none());
    }

    #[test]
    fn test_texel_center() {
        assert_eq!(texel_center(0, 0, 4, 4), Vec2::new(0.125, 0.125));
        assert_eq!(texel_center(3, 1, 4, 8), Vec2::new(0.375, 0.4375));
    }

    #[test]
    fn test_flat_isolated_triangle_has_no_hits() {
        let mesh = flat_triangle(0.0);
        let mut scene = CpuScene::new();
        scene.add_mesh(&mesh);
        scene.commit().unwrap();

        let mut sampler = Sampler::new(1);
        for quality in [1, 4, 16] {
            let params = OcclusionParams { quality, ..OcclusionParams::default() };
            let occ = occlusion_at_texel(&scene, &mesh, &params, 0, Vec2::new(0.6, 0.3), &mut sampler).unwrap();
            assert_eq!(occ.hits, 0);
            assert_eq!(occ.value, 0.0);
        }
    }

    #[test]
    fn test_constant_hits_normalization() {
        let mesh = flat_triangle(0.0);
        let params = OcclusionParams { quality: 2, max_distance: 4.0, ..OcclusionParams::default() };
        let mut sampler = Sampler::new(3);

        // Every ray hits at a quarter of max distance
        let occ = occlusion_at_texel(&ConstantHits(1.0), &mesh, &params, 0, Vec2::new(0.6, 0.3), &mut sampler).unwrap();
        assert_eq!(occ.hits, 16);
        assert!((occ.value - 0.75).abs() < 1e-6);

        // Attenuation: (0.75 / 1.5) ^ 2
        let attenuated = OcclusionParams { linear_attenuation: 1.5, quadratic_attenuation: 2.0, ..params.clone() };
        let occ = occlusion_at_texel(&ConstantHits(1.0), &mesh, &attenuated, 0, Vec2::new(0.6, 0.3), &mut sampler)
            .unwrap();
        assert!((occ.value - 0.25).abs() < 1e-6);

        // Boosting past 1 is clamped
        let boosted = OcclusionParams { linear_attenuation: 0.1, ..params };
        let occ = occlusion_at_texel(&ConstantHits(0.0), &mesh, &boosted, 0, Vec2::new(0.6, 0.3), &mut sampler).unwrap();
        assert_eq!(occ.value, 1.0);
    }

    #[test]
    fn test_occluder_above_raises_occlusion() {
        let base = flat_triangle(0.0);
        let lid = Mesh::new(
            vec![Vec3::new(-5.0, -5.0, 0.5), Vec3::new(5.0, -5.0, 0.5), Vec3::new(0.0, 5.0, 0.5)],
            vec![-Vec3::Z; 3],
            vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            vec![Face::new(0, 1, 2)],
        )
        .unwrap();
        let mut scene = CpuScene::new();
        scene.add_mesh(&base);
        scene.add_mesh(&lid);
        scene.commit().unwrap();

        let params = OcclusionParams { quality: 8, max_distance: 5.0, ..OcclusionParams::default() };
        let mut sampler = Sampler::new(9);
        let occ = occlusion_at_texel(&scene, &base, &params, 0, Vec2::new(0.6, 0.3), &mut sampler).unwrap();
        assert!(occ.hits > 0);
        assert!(occ.value > 0.0 && occ.value <= 1.0);
    }

    #[test]
    fn test_flat_normals_are_averaged() {
        let mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Vec3::Z, Vec3::X, Vec3::Y],
            vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            vec![Face::new(0, 1, 2)],
        )
        .unwrap();
        let (_, n) = surface_sample(&mesh, 0, Vec2::new(0.8, 0.1), false).unwrap();
        assert!((n - Vec3::ONE / 3.0).length() < 1e-6);

        let (p, n) = surface_sample(&mesh, 0, Vec2::new(0.8, 0.1), true).unwrap();
        assert!((p - Vec3::new(0.8, 0.1, 0.0)).length() < 1e-5);
        assert!((n - Vec3::new(0.8, 0.1, 0.1)).length() < 1e-5);
    }
}
