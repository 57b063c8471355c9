//! Occlusion map post-processing: separable Gaussian blur and inversion.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pixmap::Image;
use crate::pool::{TaskHandle, WorkerPool};
use crate::util::{saturate, Error, Result};

/// Blur settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurParams {
    pub num_pass: u32,
    /// Odd tap count
    pub kernel_size: u32,
    pub sigma: f32,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            num_pass: 3,
            kernel_size: 3,
            sigma: 1.0,
        }
    }
}

impl BlurParams {
    pub fn validate(&self) -> Result<()> {
        check_kernel(self.kernel_size, self.sigma)
    }
}

fn check_kernel(kernel_size: u32, sigma: f32) -> Result<()> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(Error::config(format!("kernel_size {kernel_size} must be odd")));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(Error::config(format!("sigma {sigma} must be > 0")));
    }
    Ok(())
}

/// Normalized 1D Gaussian weights centered on the middle tap.
pub fn gaussian_kernel_1d(kernel_size: u32, sigma: f32) -> Result<Vec<f32>> {
    check_kernel(kernel_size, sigma)?;

    let half = (kernel_size / 2) as f64;
    let sigma = sigma as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let norm = (std::f64::consts::PI * two_sigma_sq).sqrt();

    let raw: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-(x * x) / two_sigma_sq).exp() / norm
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    Ok(raw.into_iter().map(|w| (w / sum) as f32).collect())
}

/// Blur `map` in place with `num_pass` separable Gaussian passes.
///
/// Each pass filters rows into a scratch buffer, then filters its columns
/// back into `map`. Samples past the border repeat the edge texel.
#[tracing::instrument(skip(map), fields(width = map.width(), height = map.height()))]
pub fn gaussian_blur(map: &mut Image<f32>, num_pass: u32, kernel_size: u32, sigma: f32) -> Result<()> {
    let weights = gaussian_kernel_1d(kernel_size, sigma)?;
    if num_pass == 0 {
        return Ok(());
    }

    let (w, h) = (map.width() as usize, map.height() as usize);
    let half = weights.len() as isize / 2;
    let mut scratch = vec![0.0f32; w * h];

    for _ in 0..num_pass {
        let src = map.as_slice();
        scratch.par_chunks_mut(w).enumerate().for_each(|(row, out)| {
            let line = &src[row * w..(row + 1) * w];
            for (col, texel) in out.iter_mut().enumerate() {
                *texel = weights
                    .iter()
                    .enumerate()
                    .map(|(k, wk)| wk * line[clamp_index(col as isize + k as isize - half, w)])
                    .sum();
            }
        });

        let tmp = &scratch;
        map.as_mut_slice().par_chunks_mut(w).enumerate().for_each(|(row, out)| {
            for (col, texel) in out.iter_mut().enumerate() {
                *texel = weights
                    .iter()
                    .enumerate()
                    .map(|(k, wk)| wk * tmp[clamp_index(row as isize + k as isize - half, h) * w + col])
                    .sum();
            }
        });
    }
    Ok(())
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// `1 - v`, saturated, for every texel.
pub fn invert(map: &mut Image<f32>) {
    map.as_mut_slice().par_iter_mut().for_each(|v| *v = saturate(1.0 - *v));
}

/// [`gaussian_blur`] on the pool. Parameters are checked before queueing.
pub fn gaussian_blur_async(
    pool: &WorkerPool,
    mut map: Image<f32>,
    num_pass: u32,
    kernel_size: u32,
    sigma: f32,
) -> Result<TaskHandle<Image<f32>>> {
    check_kernel(kernel_size, sigma)?;
    Ok(pool.try_submit(move || {
        gaussian_blur(&mut map, num_pass, kernel_size, sigma)?;
        Ok(map)
    }))
}

/// [`invert`] on the pool.
pub fn invert_async(pool: &WorkerPool, mut map: Image<f32>) -> TaskHandle<Image<f32>> {
    pool.submit(move || {
        invert(&mut map);
        map
    })
}
