//! Ambient occlusion baking.
//!
//! [`bake_occlusion`] splits the map into tiles and hands them to worker
//! jobs on a [`WorkerPool`](crate::pool::WorkerPool). Each job samples the
//! texels of the tiles it claims with [`occlusion_at_texel`] and returns
//! the values; [`BakeHandle::wait`] writes them into the map once every job
//! is back.

mod bake;
mod kernel;
mod sampling;

pub use bake::{bake_occlusion, BakeHandle, BakeStats};
pub use kernel::{barycentric_weights, occlusion_at_texel, surface_sample, texel_center, TexelOcclusion};
pub use sampling::cosine_weighted_hemisphere_sample;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// What to store for a covered texel where no ray hit anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroHitPolicy {
    /// Leave the texel at its prior value.
    #[default]
    Keep,
    /// Store 0 (fully lit).
    Clear,
}

/// Occlusion sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionParams {
    /// Ray batches per texel; each batch is 8 rays
    pub quality: u32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
    /// Must divide the map width
    pub tile_width: u32,
    /// Must divide the map height
    pub tile_height: u32,
    pub worker_num: usize,
    /// Interpolate vertex normals; otherwise use the face's mean normal
    pub smooth_normal_interpolation: bool,
    pub zero_hit: ZeroHitPolicy,
    /// Fixed seed for reproducible bakes; clock-seeded when absent
    pub seed: Option<u64>,
}

impl Default for OcclusionParams {
    fn default() -> Self {
        Self {
            quality: 1,
            min_distance: 0.0001,
            max_distance: 100.0,
            linear_attenuation: 1.0,
            quadratic_attenuation: 1.0,
            tile_width: 64,
            tile_height: 64,
            worker_num: 8,
            smooth_normal_interpolation: true,
            zero_hit: ZeroHitPolicy::Keep,
            seed: None,
        }
    }
}

impl OcclusionParams {
    /// Check the parameters against a `width x height` map.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if self.quality == 0 {
            return Err(Error::config("quality must be at least 1"));
        }
        if self.worker_num == 0 {
            return Err(Error::config("worker_num must be at least 1"));
        }
        if !(self.min_distance.is_finite() && self.min_distance >= 0.0) {
            return Err(Error::config(format!("min_distance {} must be finite and >= 0", self.min_distance)));
        }
        if !(self.max_distance.is_finite() && self.max_distance > self.min_distance) {
            return Err(Error::config(format!(
                "max_distance {} must be finite and greater than min_distance {}",
                self.max_distance, self.min_distance
            )));
        }
        if !(self.linear_attenuation.is_finite() && self.linear_attenuation > 0.0) {
            return Err(Error::config(format!("linear_attenuation {} must be > 0", self.linear_attenuation)));
        }
        if !(self.quadratic_attenuation.is_finite() && self.quadratic_attenuation > 0.0) {
            return Err(Error::config(format!("quadratic_attenuation {} must be > 0", self.quadratic_attenuation)));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(Error::config(format!(
                "tile size {}x{} must be non-zero",
                self.tile_width, self.tile_height
            )));
        }
        if width % self.tile_width != 0 || height % self.tile_height != 0 {
            return Err(Error::config(format!(
                "tile size {}x{} does not divide map size {width}x{height}",
                self.tile_width, self.tile_height
            )));
        }
        Ok(())
    }
}
