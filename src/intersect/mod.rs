//! Geometry intersection service.
//!
//! The baker only talks to an acceleration structure through
//! [`IntersectionService`]: register meshes, commit, then fire packets of
//! [`RAY_BATCH_SIZE`] rays. [`CpuScene`] is the bundled implementation;
//! a wrapper around any other ray tracing library can be dropped in.
//!
//! Once committed, a service is shared read-only between bake workers, so
//! implementations must be `Send + Sync` and must not mutate on queries.

mod cpu;

pub use cpu::CpuScene;

use crate::mesh::Mesh;
use crate::util::{Result, Vec3};

/// Rays per packet.
pub const RAY_BATCH_SIZE: usize = 8;

/// Identifier handed out by [`IntersectionService::add_mesh`].
pub type GeometryId = u32;

/// Reported for rays that hit nothing.
pub const NO_HIT: GeometryId = GeometryId::MAX;

/// Packet of rays sharing one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayBatch {
    pub origins: [Vec3; RAY_BATCH_SIZE],
    pub directions: [Vec3; RAY_BATCH_SIZE],
}

impl RayBatch {
    /// All rays starting at one point.
    pub fn from_origin(origin: Vec3, directions: [Vec3; RAY_BATCH_SIZE]) -> Self {
        Self {
            origins: [origin; RAY_BATCH_SIZE],
            directions,
        }
    }
}

/// Per-ray closest hit: geometry id (or [`NO_HIT`]) and distance.
///
/// For rays without a hit the distance is the query's `max_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectResult {
    pub ids: [GeometryId; RAY_BATCH_SIZE],
    pub distances: [f32; RAY_BATCH_SIZE],
}

impl IntersectResult {
    pub fn misses(max_distance: f32) -> Self {
        Self {
            ids: [NO_HIT; RAY_BATCH_SIZE],
            distances: [max_distance; RAY_BATCH_SIZE],
        }
    }

    #[inline]
    pub fn is_hit(&self, ray: usize) -> bool {
        self.ids[ray] != NO_HIT
    }

    /// `(ray, distance)` for every ray that hit.
    pub fn hits(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        (0..RAY_BATCH_SIZE)
            .filter(|&k| self.is_hit(k))
            .map(|k| (k, self.distances[k]))
    }
}

/// Per-ray "anything in the way" flags.
pub type OccludedResult = [bool; RAY_BATCH_SIZE];

/// Ray queries against committed triangle geometry.
pub trait IntersectionService: Send + Sync {
    /// Register a mesh. Takes effect on the next [`commit`](Self::commit).
    fn add_mesh(&mut self, mesh: &Mesh) -> GeometryId;

    /// Unregister a mesh. Takes effect on the next commit.
    fn remove_mesh(&mut self, id: GeometryId) -> Result<()>;

    /// Build the acceleration structure over the registered meshes.
    fn commit(&mut self) -> Result<()>;

    /// Whether the last commit succeeded and nothing changed since.
    fn is_committed(&self) -> bool;

    /// Closest hit per ray within `(min_distance, max_distance)`.
    fn intersect(&self, rays: &RayBatch, max_distance: f32, min_distance: f32) -> IntersectResult;

    /// Any hit per ray within `(min_distance, max_distance)`.
    fn occluded(&self, rays: &RayBatch, max_distance: f32, min_distance: f32) -> OccludedResult;
}
