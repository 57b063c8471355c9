//! Utility types shared across the baking pipeline.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math re-exports from glam plus small scalar helpers
//! - [`Sampler`] - Per-tile pseudo-random stream

mod error;
mod math;
mod rng;

pub use error::*;
pub use math::*;
pub use rng::*;
