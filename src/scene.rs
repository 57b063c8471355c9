//! Procedural scenes.
//!
//! A [`Scene`] owns a list of meshes and names one of them as the bake
//! target. Meshes are identified by their position in that list.

use crate::intersect::{GeometryId, IntersectionService};
use crate::mesh::{Face, Mesh};
use crate::util::{Error, Result, Vec2, Vec3};

/// Index into [`Scene::meshes`].
pub type MeshId = usize;

/// Names accepted by [`Scene::named`].
pub const SCENE_NAMES: &[&str] = &["triangle", "occluded-triangle", "box-on-plane"];

/// Collection of meshes with one bake target.
#[derive(Debug, Clone)]
pub struct Scene {
    meshes: Vec<Mesh>,
    target: MeshId,
}

impl Scene {
    /// Scene with `target` as its only mesh.
    pub fn new(target: Mesh) -> Self {
        Self { meshes: vec![target], target: 0 }
    }

    /// Add an occluder and return its id.
    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Build one of the [`SCENE_NAMES`].
    pub fn named(name: &str) -> Result<Self> {
        match name {
            "triangle" => Ok(Self::new(unit_triangle()?)),
            "occluded-triangle" => {
                let mut scene = Self::new(unit_triangle()?);
                scene.add(quad(Vec3::new(0.5, 0.5, 0.5), 0.6, -Vec3::Z)?);
                Ok(scene)
            }
            "box-on-plane" => {
                let mut scene = Self::new(quad(Vec3::ZERO, 4.0, Vec3::Z)?);
                scene.add(box_mesh(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(0.5, 0.5, 1.0))?);
                Ok(scene)
            }
            _ => Err(Error::UnknownScene(name.to_string())),
        }
    }

    #[inline]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    #[inline]
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    #[inline]
    pub fn target_id(&self) -> MeshId {
        self.target
    }

    pub fn target(&self) -> &Mesh {
        &self.meshes[self.target]
    }

    /// Register every mesh with `service`. Ids are returned in mesh order.
    pub fn register<S: IntersectionService + ?Sized>(&self, service: &mut S) -> Vec<GeometryId> {
        self.meshes.iter().map(|m| service.add_mesh(m)).collect()
    }
}

/// Flat triangle with UVs `(0,0), (1,0), (1,1)` lying in the XY plane.
pub fn unit_triangle() -> Result<Mesh> {
    let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::ONE];
    let positions = uvs.iter().map(|uv| uv.extend(0.0)).collect();
    Mesh::new(positions, vec![Vec3::Z; 3], uvs, vec![Face::new(0, 1, 2)])
}

/// Axis-aligned square of side `size` centered at `center`, facing `+Z` or
/// `-Z` depending on the sign of `normal.z`. UVs cover `[0, 1]^2`.
pub fn quad(center: Vec3, size: f32, normal: Vec3) -> Result<Mesh> {
    let h = size / 2.0;
    let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    let positions = uvs
        .iter()
        .map(|uv| center + Vec3::new((uv.x * 2.0 - 1.0) * h, (uv.y * 2.0 - 1.0) * h, 0.0))
        .collect();
    let n = if normal.z < 0.0 { -Vec3::Z } else { Vec3::Z };
    Mesh::new(positions, vec![n; 4], uvs, vec![Face::new(0, 1, 2), Face::new(0, 2, 3)])
}

/// Box between `min` and `max` with flat per-face normals. Each face gets
/// its own cell of a 3x2 UV atlas.
pub fn box_mesh(min: Vec3, max: Vec3) -> Result<Mesh> {
    // (normal, tangent u, tangent v) per face
    let sides = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (-Vec3::X, -Vec3::Y, Vec3::Z),
        (Vec3::Y, -Vec3::X, Vec3::Z),
        (-Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (-Vec3::Z, Vec3::X, -Vec3::Y),
    ];
    let center = (min + max) / 2.0;
    let half = (max - min) / 2.0;

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut texcoords = Vec::with_capacity(24);
    let mut faces = Vec::with_capacity(12);

    for (i, (n, u, v)) in sides.into_iter().enumerate() {
        let cell = Vec2::new((i % 3) as f32, (i / 3) as f32);
        let base = positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            positions.push(center + (n + u * su + v * sv) * half);
            normals.push(n);
            // Inset keeps neighbouring cells from sharing texel centers
            let local = Vec2::new(su * 0.5 + 0.5, sv * 0.5 + 0.5) * 0.9 + 0.05;
            texcoords.push((cell + local) / Vec2::new(3.0, 2.0));
        }
        faces.push(Face::new(base, base + 1, base + 2));
        faces.push(Face::new(base, base + 2, base + 3));
    }

    Mesh::new(positions, normals, texcoords, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::CpuScene;

    #[test]
    fn test_named_scenes() {
        for name in SCENE_NAMES {
            let scene = Scene::named(name).unwrap();
            assert!(!scene.meshes().is_empty());
            assert!(scene.target().num_triangles() > 0);
        }
        assert!(matches!(Scene::named("teapot"), Err(Error::UnknownScene(_))));
    }

    #[test]
    fn test_register_assigns_ids_in_order() {
        let scene = Scene::named("box-on-plane").unwrap();
        let mut service = CpuScene::new();
        let ids = scene.register(&mut service);
        assert_eq!(ids, vec![0, 1]);
        service.commit().unwrap();
        assert_eq!(service.num_triangles(), 2 + 12);
    }

    #[test]
    fn test_box_mesh() {
        let mesh = box_mesh(Vec3::ZERO, Vec3::ONE).unwrap();
        assert_eq!(mesh.num_triangles(), 12);
        assert_eq!(mesh.positions().len(), 24);
        for p in mesh.positions() {
            assert!(p.min_element() >= 0.0 && p.max_element() <= 1.0);
        }
        for uv in mesh.texcoords() {
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }
        // Face normals point away from the center
        for f in 0..mesh.num_triangles() {
            let p = mesh.face_positions(f);
            let n = mesh.face_normals(f)[0];
            let centroid = (p[0] + p[1] + p[2]) / 3.0;
            assert!((centroid - Vec3::splat(0.5)).dot(n) > 0.0);
        }
    }

    #[test]
    fn test_quad_orientation() {
        let up = quad(Vec3::new(0.0, 0.0, 2.0), 2.0, Vec3::Z).unwrap();
        assert_eq!(up.normals()[0], Vec3::Z);
        assert_eq!(up.positions()[0], Vec3::new(-1.0, -1.0, 2.0));
        assert_eq!(up.positions()[2], Vec3::new(1.0, 1.0, 2.0));

        let down = quad(Vec3::ZERO, 1.0, -Vec3::Z).unwrap();
        assert_eq!(down.normals()[3], -Vec3::Z);
    }
}
