//! UV-space scanline rasterizer.
//!
//! Produces the indices map: for every texel the index of the triangle whose
//! UV projection covers the texel center, or [`NO_TRIANGLE`].
//!
//! Corners are mapped to `uv * (width, height) + 0.5`, which puts the center
//! of row `r` on the line `y = r + 1` and the center of column `c` on
//! `x = c + 1`. Each triangle is split at its middle vertex: the edge with
//! the largest y extent (the long edge) is paired with each of the two short
//! edges, and every scanline between them is filled. Row ranges and spans are
//! closed, so centers lying exactly on an edge are covered; triangles are
//! drawn in face order and later ones overwrite earlier ones.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::mesh::Mesh;
use crate::pixmap::Image;
use crate::pool::{TaskHandle, WorkerPool};
use crate::util::{Error, Result, Vec2};

/// Indices map value for texels no triangle covers.
pub const NO_TRIANGLE: u32 = u32::MAX;

/// Edges with a smaller y extent (in pixels) are skipped.
const MIN_EDGE_HEIGHT: f32 = 1e-6;

/// Edge with endpoints ordered top to bottom.
#[derive(Debug, Clone, Copy)]
struct Edge {
    top: Vec2,
    bottom: Vec2,
}

impl Edge {
    fn new(a: Vec2, b: Vec2) -> Self {
        if a.y <= b.y {
            Self { top: a, bottom: b }
        } else {
            Self { top: b, bottom: a }
        }
    }

    #[inline]
    fn height(&self) -> f32 {
        self.bottom.y - self.top.y
    }

    /// X where the edge crosses the horizontal line at `y`.
    #[inline]
    fn x_at(&self, y: f32) -> f32 {
        let t = (y - self.top.y) / self.height();
        self.top.x + (self.bottom.x - self.top.x) * t
    }
}

/// Rasterize every face of `mesh` into a `width x height` indices map.
pub fn rasterize(mesh: &Mesh, width: u32, height: u32) -> Result<Image<u32>> {
    rasterize_supersampled(mesh, width, height, 1)
}

/// Rasterize at `factor` times the linear resolution and reduce each
/// `factor x factor` block by majority vote.
#[tracing::instrument(skip(mesh), fields(triangles = mesh.num_triangles()))]
pub fn rasterize_supersampled(mesh: &Mesh, width: u32, height: u32, factor: u32) -> Result<Image<u32>> {
    check_target(width, height, factor)?;
    let map = rasterize_checked(mesh, width, height, factor);
    tracing::debug!(coverage = coverage(&map), "indices map ready");
    Ok(map)
}

/// [`rasterize_supersampled`] as a pool task. Arguments are checked before
/// the task is queued.
pub fn rasterize_async(
    pool: &WorkerPool,
    mesh: Arc<Mesh>,
    width: u32,
    height: u32,
    factor: u32,
) -> Result<TaskHandle<Image<u32>>> {
    check_target(width, height, factor)?;
    Ok(pool.submit(move || rasterize_checked(&mesh, width, height, factor)))
}

/// Fraction of texels covered by some triangle.
pub fn coverage(map: &Image<u32>) -> f32 {
    let covered = map.as_slice().iter().filter(|&&id| id != NO_TRIANGLE).count();
    covered as f32 / map.len() as f32
}

fn check_target(width: u32, height: u32, factor: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::config(format!("map size {width}x{height} must be non-zero")));
    }
    if factor == 0 {
        return Err(Error::config("supersampling factor must be at least 1"));
    }
    if width.checked_mul(factor).is_none() || height.checked_mul(factor).is_none() {
        return Err(Error::config(format!("{width}x{height} at {factor}x supersampling overflows")));
    }
    Ok(())
}

fn rasterize_checked(mesh: &Mesh, width: u32, height: u32, factor: u32) -> Image<u32> {
    let mut fine = Image::filled(width * factor, height * factor, NO_TRIANGLE);
    for face in 0..mesh.num_triangles() {
        draw_triangle(&mut fine, mesh.face_texcoords(face), face as u32);
    }
    if factor == 1 {
        return fine;
    }
    downsample(&fine, width, height, factor)
}

fn draw_triangle(map: &mut Image<u32>, uvs: [Vec2; 3], id: u32) {
    let size = Vec2::new(map.width() as f32, map.height() as f32);
    let [a, b, c] = uvs.map(|uv| uv * size + 0.5);
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return;
    }

    let edges = [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)];
    let mut long = 0;
    for i in 1..3 {
        if edges[i].height() > edges[long].height() {
            long = i;
        }
    }
    if edges[long].height() < MIN_EDGE_HEIGHT {
        return;
    }

    for (i, short) in edges.iter().enumerate() {
        if i == long || short.height() < MIN_EDGE_HEIGHT {
            continue;
        }
        fill_between(map, &edges[long], short, id);
    }
}

/// Fill the rows whose center line lies within the short edge's y range.
fn fill_between(map: &mut Image<u32>, long: &Edge, short: &Edge, id: u32) {
    let Some((first_row, last_row)) = index_range(short.top.y, short.bottom.y, map.height()) else {
        return;
    };
    let width = map.width();
    for row in first_row..=last_row {
        let y = row as f32 + 1.0;
        let (xa, xb) = (long.x_at(y), short.x_at(y));
        let Some((first_col, last_col)) = index_range(xa.min(xb), xa.max(xb), width) else {
            continue;
        };
        map.row_mut(row)[first_col as usize..=last_col as usize].fill(id);
    }
}

/// Indices `k` in `[0, limit)` with `k + 1` inside the closed range `[lo, hi]`.
fn index_range(lo: f32, hi: f32, limit: u32) -> Option<(u32, u32)> {
    let first = (lo.ceil() - 1.0).max(0.0);
    let last = (hi.floor() - 1.0).min(limit as f32 - 1.0);
    (first <= last).then(|| (first as u32, last as u32))
}

fn downsample(fine: &Image<u32>, width: u32, height: u32, factor: u32) -> Image<u32> {
    let mut out = Image::filled(width, height, NO_TRIANGLE);
    for row in 0..height {
        for col in 0..width {
            let block = (0..factor).flat_map(|dy| {
                let fine_row = fine.row(row * factor + dy);
                let start = (col * factor) as usize;
                fine_row[start..start + factor as usize].iter().copied()
            });
            out[(row, col)] = majority_vote(block);
        }
    }
    out
}

/// Most frequent id. Ties go to a non-sentinel id, first seen among equals.
fn majority_vote(samples: impl Iterator<Item = u32>) -> u32 {
    let mut counts: SmallVec<[(u32, u32); 8]> = SmallVec::new();
    for id in samples {
        match counts.iter_mut().find(|(seen, _)| *seen == id) {
            Some((_, n)) => *n += 1,
            None => counts.push((id, 1)),
        }
    }

    let mut best = (NO_TRIANGLE, 0u32);
    for &(id, n) in &counts {
        let better = n > best.1 || (n == best.1 && best.0 == NO_TRIANGLE && id != NO_TRIANGLE);
        if better {
            best = (id, n);
        }
    }
    best.0
}
