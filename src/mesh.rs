//! Triangle mesh consumed by the baking pipeline.
//!
//! A [`Mesh`] is plain data: per-vertex positions, normals and UVs plus
//! triangle faces. It is validated once on construction and read-only
//! afterwards. Identity is not stored on the mesh; whoever owns a mesh
//! collection hands out ids (see [`crate::scene::MeshId`] and
//! [`crate::intersect::GeometryId`]).

use std::fmt;

use crate::util::{Error, Result, Vec2, Vec3};

/// Triangle as three vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Face {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
}

impl Face {
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self { v0, v1, v2 }
    }

    #[inline]
    pub fn indices(&self) -> [usize; 3] {
        [self.v0 as usize, self.v1 as usize, self.v2 as usize]
    }
}

/// Element counts, logged when a mesh enters the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshStats {
    pub vertices: usize,
    pub normals: usize,
    pub texcoords: usize,
    pub triangles: usize,
}

impl fmt::Display for MeshStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vertices, {} normals, {} texcoords, {} triangles",
            self.vertices, self.normals, self.texcoords, self.triangles
        )
    }
}

/// Immutable indexed triangle mesh with UVs.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    faces: Vec<Face>,
}

impl Mesh {
    /// Build a mesh, checking that all attribute arrays have the same length
    /// and every face index is in range.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, texcoords: Vec<Vec2>, faces: Vec<Face>) -> Result<Self> {
        if positions.is_empty() || faces.is_empty() {
            return Err(Error::mesh(format!(
                "mesh needs vertices and faces, got {} vertices and {} faces",
                positions.len(),
                faces.len()
            )));
        }
        if normals.len() != positions.len() || texcoords.len() != positions.len() {
            return Err(Error::mesh(format!(
                "attribute count mismatch: {} positions, {} normals, {} texcoords",
                positions.len(),
                normals.len(),
                texcoords.len()
            )));
        }
        if positions.len() > u32::MAX as usize {
            return Err(Error::mesh("too many vertices for 32-bit indices"));
        }
        let n = positions.len() as u32;
        if let Some((i, face)) = faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.v0 >= n || f.v1 >= n || f.v2 >= n)
        {
            return Err(Error::mesh(format!(
                "face {i} references vertex {:?} but mesh has {n} vertices",
                face.indices()
            )));
        }
        // u32::MAX is the "no triangle" sentinel in indices maps
        if faces.len() >= u32::MAX as usize {
            return Err(Error::mesh("too many faces for 32-bit triangle ids"));
        }

        Ok(Self { positions, normals, texcoords, faces })
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[inline]
    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    /// Corner UVs of a face.
    #[inline]
    pub fn face_texcoords(&self, face: usize) -> [Vec2; 3] {
        self.faces[face].indices().map(|i| self.texcoords[i])
    }

    /// Corner positions of a face.
    #[inline]
    pub fn face_positions(&self, face: usize) -> [Vec3; 3] {
        self.faces[face].indices().map(|i| self.positions[i])
    }

    /// Corner normals of a face.
    #[inline]
    pub fn face_normals(&self, face: usize) -> [Vec3; 3] {
        self.faces[face].indices().map(|i| self.normals[i])
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertices: self.positions.len(),
            normals: self.normals.len(),
            texcoords: self.texcoords.len(),
            triangles: self.faces.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_attrs() -> (Vec<Vec3>, Vec<Vec3>, Vec<Vec2>) {
        (
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Vec3::Z; 3],
            vec![Vec2::ZERO, Vec2::X, Vec2::Y],
        )
    }

    #[test]
    fn test_valid_triangle() {
        let (p, n, t) = tri_attrs();
        let mesh = Mesh::new(p, n, t, vec![Face::new(0, 1, 2)]).unwrap();
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.face_texcoords(0), [Vec2::ZERO, Vec2::X, Vec2::Y]);
        assert_eq!(mesh.face_positions(0)[1], Vec3::X);
        assert_eq!(mesh.stats().to_string(), "3 vertices, 3 normals, 3 texcoords, 1 triangles");
    }

    #[test]
    fn test_attribute_mismatch() {
        let (p, mut n, t) = tri_attrs();
        n.pop();
        let err = Mesh::new(p, n, t, vec![Face::new(0, 1, 2)]).unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_face_out_of_range() {
        let (p, n, t) = tri_attrs();
        let err = Mesh::new(p, n, t, vec![Face::new(0, 1, 3)]).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(Mesh::new(vec![], vec![], vec![], vec![]).is_err());
        let (p, n, t) = tri_attrs();
        assert!(Mesh::new(p, n, t, vec![]).is_err());
    }
}
