//! # aobake
//!
//! Per-texel ambient occlusion baking for UV-mapped triangle meshes.
//!
//! Each texel of the output map is mapped back to a point on the surface by
//! rasterizing the mesh in UV space; rays are then shot from that point into
//! a cosine-weighted hemisphere and the hits are reduced to an occlusion
//! value in `[0, 1]`. The work is cut into tiles and spread over a worker
//! pool. The raw map can be blurred and inverted afterwards.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math helpers, random sampling
//! - [`mesh`] - Immutable triangle mesh with normals and UVs
//! - [`pixmap`] - Typed pixel buffers ([`Image`], [`DynImage`])
//! - [`intersect`] - Ray query interface plus the bundled BVH backend
//! - [`raster`] - UV-space rasterizer producing the indices map
//! - [`occlusion`] - Per-texel kernel and the tiled bake driver
//! - [`schedule`] - Tile partitioning and the shared tile queue
//! - [`pool`] - Fixed worker pool and task handles
//! - [`postprocess`] - Gaussian blur and inversion
//! - [`scene`] - Procedural test scenes
//! - [`config`] - JSON bake configuration
//! - [`codec`] - Image writer interface (and `image` crate backend)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aobake::prelude::*;
//!
//! let scene = Scene::named("box-on-plane")?;
//! let mut service = CpuScene::new();
//! scene.register(&mut service);
//! service.commit()?;
//!
//! let pool = WorkerPool::new(8);
//! let mesh = Arc::new(scene.target().clone());
//! let indices = Arc::new(rasterize(&mesh, 256, 256)?);
//! let params = OcclusionParams { quality: 4, ..Default::default() };
//!
//! let mut map = bake_occlusion(&pool, Arc::new(service), mesh, &params, indices, Image::new(256, 256))?
//!     .wait()?;
//! gaussian_blur(&mut map, 3, 3, 1.0)?;
//! invert(&mut map);
//! ```

pub mod util;
pub mod mesh;
pub mod pixmap;
pub mod intersect;
pub mod raster;
pub mod schedule;
pub mod pool;
pub mod occlusion;
pub mod postprocess;
pub mod scene;
pub mod config;
pub mod codec;

// Re-export commonly used types
pub use util::{Error, Result};
pub use pixmap::{DynImage, Image, PixelFormat};

/// Build metadata stamped by the build script.
pub mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const DATE: &str = env!("AOBAKE_BUILD_DATE");
    pub const TIME: &str = env!("AOBAKE_BUILD_TIME");
    pub const TARGET: &str = env!("AOBAKE_BUILD_TARGET");
}

/// Everything needed to run a bake.
pub mod prelude {
    pub use crate::codec::{ImageExtension, ImageWriter};
    #[cfg(feature = "codec")]
    pub use crate::codec::ImageCrateWriter;
    pub use crate::config::BakeConfig;
    pub use crate::intersect::{CpuScene, GeometryId, IntersectionService};
    pub use crate::mesh::{Face, Mesh};
    pub use crate::occlusion::{bake_occlusion, BakeHandle, OcclusionParams, ZeroHitPolicy};
    pub use crate::pixmap::{DynImage, Image, PixelFormat};
    pub use crate::pool::{TaskHandle, WorkerPool};
    pub use crate::postprocess::{gaussian_blur, invert, BlurParams};
    pub use crate::raster::{rasterize, rasterize_supersampled, NO_TRIANGLE};
    pub use crate::scene::Scene;
    pub use crate::util::{Error, Result};
}
