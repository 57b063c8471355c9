//! # tri-bvh
//!
//! Flat bounding volume hierarchy over triangle soups for CPU ray queries.
//!
//! ```text
//! &[Triangle] → build_bvh (sorted sweep SAH) → Bvh { nodes, order } → closest_hit / any_hit
//! ```
//!
//! Nodes are 32-byte `Pod` records in depth-first preorder. Each interior
//! node stores a skip link past its subtree, so queries walk the array
//! front to back without a stack and `any_hit` can stop at the first
//! blocker. Stored bounds are padded and the slab test is conservative, so
//! hits on box faces and edges are never culled.

mod build;
mod geometry;
mod traverse;

pub use build::{build_bvh, Bvh};
pub use geometry::{Aabb, BvhNode, Hit, Ray, Triangle};
pub use traverse::intersect_triangle;
