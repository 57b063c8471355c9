//! CPU intersection service backed by a preorder SAH BVH.

use tri_bvh::{build_bvh, Bvh, Ray, Triangle};

use super::{GeometryId, IntersectResult, IntersectionService, OccludedResult, RayBatch, RAY_BATCH_SIZE};
use crate::mesh::Mesh;
use crate::util::{Error, Result};

/// Static triangle scene. Every registered mesh keeps its id for the life of
/// the scene; removed ids are never reused.
pub struct CpuScene {
    /// Slot per id, `None` once removed.
    geometry: Vec<Option<Vec<Triangle>>>,
    /// Flattened triangles of the last commit.
    triangles: Vec<Triangle>,
    /// Owning geometry of each committed triangle.
    owners: Vec<GeometryId>,
    bvh: Bvh,
    committed: bool,
}

impl CpuScene {
    pub fn new() -> Self {
        Self {
            geometry: Vec::new(),
            triangles: Vec::new(),
            owners: Vec::new(),
            bvh: Bvh::empty(),
            committed: false,
        }
    }

    /// Number of live geometries.
    pub fn num_geometries(&self) -> usize {
        self.geometry.iter().filter(|g| g.is_some()).count()
    }

    /// Number of triangles in the committed hierarchy.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    fn ray(origin: crate::util::Vec3, dir: crate::util::Vec3, min: f32, max: f32) -> Option<Ray> {
        (origin.is_finite() && dir.is_finite() && dir != crate::util::Vec3::ZERO)
            .then(|| Ray::new(origin, dir, min, max))
    }
}

impl Default for CpuScene {
    fn default() -> Self {
        Self::new()
    }
}

impl IntersectionService for CpuScene {
    fn add_mesh(&mut self, mesh: &Mesh) -> GeometryId {
        let tris = (0..mesh.num_triangles())
            .map(|f| {
                let [a, b, c] = mesh.face_positions(f);
                Triangle::new(a, b, c)
            })
            .collect();
        let id = self.geometry.len() as GeometryId;
        self.geometry.push(Some(tris));
        self.committed = false;
        tracing::debug!(id, triangles = mesh.num_triangles(), "geometry added");
        id
    }

    fn remove_mesh(&mut self, id: GeometryId) -> Result<()> {
        match self.geometry.get_mut(id as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.committed = false;
                tracing::debug!(id, "geometry removed");
                Ok(())
            }
            _ => Err(Error::GeometryNotFound(id)),
        }
    }

    #[tracing::instrument(skip_all, fields(geometries = self.num_geometries()))]
    fn commit(&mut self) -> Result<()> {
        self.committed = false;

        let mut triangles = Vec::new();
        let mut owners = Vec::new();
        for (id, tris) in self.geometry.iter().enumerate() {
            let Some(tris) = tris else { continue };
            if let Some(bad) = tris.iter().position(|t| !t.is_finite()) {
                return Err(Error::CommitFailed(format!(
                    "geometry {id} triangle {bad} has non-finite vertices"
                )));
            }
            triangles.extend_from_slice(tris);
            owners.extend(std::iter::repeat(id as GeometryId).take(tris.len()));
        }

        self.bvh = build_bvh(&triangles);
        self.triangles = triangles;
        self.owners = owners;
        self.committed = true;

        tracing::info!(triangles = self.triangles.len(), depth = self.bvh.depth(), "scene committed");
        Ok(())
    }

    fn is_committed(&self) -> bool {
        self.committed
    }

    fn intersect(&self, rays: &RayBatch, max_distance: f32, min_distance: f32) -> IntersectResult {
        let mut result = IntersectResult::misses(max_distance);
        for k in 0..RAY_BATCH_SIZE {
            let Some(ray) = Self::ray(rays.origins[k], rays.directions[k], min_distance, max_distance) else {
                continue;
            };
            if let Some(hit) = self.bvh.closest_hit(&self.triangles, &ray) {
                result.ids[k] = self.owners[hit.prim as usize];
                result.distances[k] = hit.t;
            }
        }
        result
    }

    fn occluded(&self, rays: &RayBatch, max_distance: f32, min_distance: f32) -> OccludedResult {
        std::array::from_fn(|k| {
            Self::ray(rays.origins[k], rays.directions[k], min_distance, max_distance)
                .is_some_and(|ray| self.bvh.any_hit(&self.triangles, &ray))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::NO_HIT;
    use crate::mesh::Face;
    use crate::util::{Vec2, Vec3};

    /// Unit square in the XY plane at height `z`.
    fn square(z: f32) -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, z),
                Vec3::new(1.0, 0.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(0.0, 1.0, z),
            ],
            vec![Vec3::Z; 4],
            vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            vec![Face::new(0, 1, 2), Face::new(0, 2, 3)],
        )
        .unwrap()
    }

    fn up_batch() -> RayBatch {
        let dirs = std::array::from_fn(|k| if k % 2 == 0 { Vec3::Z } else { Vec3::X });
        RayBatch::from_origin(Vec3::new(0.5, 0.5, 0.0), dirs)
    }

    #[test]
    fn test_ids_are_sequential_and_not_reused() {
        let mut scene = CpuScene::new();
        assert_eq!(scene.add_mesh(&square(0.0)), 0);
        assert_eq!(scene.add_mesh(&square(1.0)), 1);
        scene.remove_mesh(0).unwrap();
        assert_eq!(scene.add_mesh(&square(2.0)), 2);
        assert_eq!(scene.num_geometries(), 2);

        assert!(matches!(scene.remove_mesh(0), Err(Error::GeometryNotFound(0))));
        assert!(matches!(scene.remove_mesh(9), Err(Error::GeometryNotFound(9))));
    }

    #[test]
    fn test_commit_state_tracks_edits() {
        let mut scene = CpuScene::new();
        assert!(!scene.is_committed());
        let id = scene.add_mesh(&square(1.0));
        scene.commit().unwrap();
        assert!(scene.is_committed());
        assert_eq!(scene.num_triangles(), 2);

        scene.remove_mesh(id).unwrap();
        assert!(!scene.is_committed());
        scene.commit().unwrap();
        assert_eq!(scene.num_triangles(), 0);
    }

    #[test]
    fn test_commit_rejects_non_finite() {
        let mut scene = CpuScene::new();
        let mut bad = square(0.0).positions().to_vec();
        bad[2].z = f32::NAN;
        let mesh = Mesh::new(bad, vec![Vec3::Z; 4], vec![Vec2::ZERO; 4], vec![Face::new(0, 1, 2)]).unwrap();
        scene.add_mesh(&mesh);
        assert!(matches!(scene.commit(), Err(Error::CommitFailed(_))));
        assert!(!scene.is_committed());
    }

    #[test]
    fn test_intersect_reports_owner_and_distance() {
        let mut scene = CpuScene::new();
        scene.add_mesh(&square(0.0));
        let lid = scene.add_mesh(&square(2.0));
        scene.commit().unwrap();

        let res = scene.intersect(&up_batch(), 10.0, 1e-4);
        for k in 0..RAY_BATCH_SIZE {
            if k % 2 == 0 {
                assert_eq!(res.ids[k], lid);
                assert!((res.distances[k] - 2.0).abs() < 1e-6);
            } else {
                assert_eq!(res.ids[k], NO_HIT);
                assert_eq!(res.distances[k], 10.0);
            }
        }
        assert_eq!(res.hits().count(), 4);

        // Lid out of reach
        let res = scene.intersect(&up_batch(), 1.5, 1e-4);
        assert_eq!(res.hits().count(), 0);
    }

    #[test]
    fn test_occluded_matches_intersect() {
        let mut scene = CpuScene::new();
        scene.add_mesh(&square(2.0));
        scene.commit().unwrap();

        let occ = scene.occluded(&up_batch(), 10.0, 1e-4);
        let hit = scene.intersect(&up_batch(), 10.0, 1e-4);
        for k in 0..RAY_BATCH_SIZE {
            assert_eq!(occ[k], hit.is_hit(k));
        }
    }

    /// `n` x `n` unit squares tiling `[0, n]^2` at height `z`.
    fn tiled_floor(n: u32, z: f32) -> Mesh {
        let mut positions = Vec::new();
        let mut faces = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let base = positions.len() as u32;
                let (x, y) = (i as f32, j as f32);
                positions.extend([
                    Vec3::new(x, y, z),
                    Vec3::new(x + 1.0, y, z),
                    Vec3::new(x + 1.0, y + 1.0, z),
                    Vec3::new(x, y + 1.0, z),
                ]);
                faces.push(Face::new(base, base + 1, base + 2));
                faces.push(Face::new(base, base + 2, base + 3));
            }
        }
        let count = positions.len();
        Mesh::new(positions, vec![Vec3::Z; count], vec![Vec2::ZERO; count], faces).unwrap()
    }

    #[test]
    fn test_rays_through_shared_edges_are_blocked() {
        let mut scene = CpuScene::new();
        scene.add_mesh(&tiled_floor(6, 1.0));
        scene.commit().unwrap();
        assert!(scene.bvh.depth() > 1);

        // Straight up through grid vertices, edge midpoints and square
        // centers; most lie on faces of the leaf boxes
        for i in 1..12 {
            for j in 1..12 {
                let origin = Vec3::new(i as f32 * 0.5, j as f32 * 0.5, 0.0);
                let batch = RayBatch::from_origin(origin, [Vec3::Z; RAY_BATCH_SIZE]);
                let occ = scene.occluded(&batch, 10.0, 1e-4);
                assert!(occ.iter().all(|&o| o), "origin {origin}: {occ:?}");
                let res = scene.intersect(&batch, 10.0, 1e-4);
                assert_eq!(res.hits().count(), RAY_BATCH_SIZE, "origin {origin}");
            }
        }
    }

    #[test]
    fn test_degenerate_direction_misses() {
        let mut scene = CpuScene::new();
        scene.add_mesh(&square(2.0));
        scene.commit().unwrap();

        let batch = RayBatch::from_origin(Vec3::new(0.5, 0.5, 0.0), [Vec3::ZERO; RAY_BATCH_SIZE]);
        assert_eq!(scene.intersect(&batch, 10.0, 1e-4).hits().count(), 0);
        assert!(scene.occluded(&batch, 10.0, 1e-4).iter().all(|o| !o));
    }
}
