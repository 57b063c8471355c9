//! Tiled, pooled bake driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::intersect::IntersectionService;
use crate::mesh::Mesh;
use crate::pixmap::Image;
use crate::pool::{TaskHandle, WorkerPool};
use crate::raster::NO_TRIANGLE;
use crate::schedule::{partition_tiles, Tile, TileQueue, TileResult, TileWork};
use crate::util::{clock_seed, Error, Result, Sampler};

use super::kernel::{occlusion_at_texel, texel_center};
use super::{OcclusionParams, ZeroHitPolicy};

/// Counters reported by a finished bake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakeStats {
    pub tiles: usize,
    /// Covered texels that were sampled.
    pub sampled: usize,
    /// Texels whose value was written.
    pub written: usize,
    pub rays: u64,
    pub hits: u64,
}

/// Output of one worker job.
#[derive(Default)]
struct WorkerOutput {
    results: Vec<TileResult>,
    stats: BakeStats,
}

/// A running bake.
pub struct BakeHandle {
    workers: Vec<TaskHandle<WorkerOutput>>,
    map: Image<f32>,
    started: Instant,
}

impl BakeHandle {
    /// True once every worker job has returned.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(TaskHandle::is_finished)
    }

    /// Block until all workers are done and return the populated map.
    pub fn wait(self) -> Result<Image<f32>> {
        self.wait_with_stats().map(|(map, _)| map)
    }

    /// [`wait`](Self::wait), also returning the bake counters.
    pub fn wait_with_stats(self) -> Result<(Image<f32>, BakeStats)> {
        let Self { workers, mut map, started } = self;

        // Join everyone before reporting the first failure
        let outputs: Vec<Result<WorkerOutput>> = workers.into_iter().map(TaskHandle::wait).collect();

        let mut stats = BakeStats::default();
        for output in outputs {
            let output = output?;
            for tile in &output.results {
                tile.blit_into(&mut map);
            }
            stats.tiles += output.stats.tiles;
            stats.sampled += output.stats.sampled;
            stats.written += output.stats.written;
            stats.rays += output.stats.rays;
            stats.hits += output.stats.hits;
        }

        let elapsed: Duration = started.elapsed();
        tracing::info!(
            tiles = stats.tiles,
            sampled = stats.sampled,
            written = stats.written,
            rays = stats.rays,
            hits = stats.hits,
            "occlusion baked in {:.2?}",
            elapsed
        );
        Ok((map, stats))
    }
}

/// Start baking occlusion into `occlusion` on `pool`.
///
/// `indices` is the rasterized indices map and must match `occlusion` in
/// size. Texels without a covering triangle, and texels where no ray hit
/// anything under [`ZeroHitPolicy::Keep`], keep the value they had.
///
/// Everything is checked before any work is queued: the parameters against
/// the map size, the map sizes against each other, the indices against the
/// mesh, and the service's commit state.
#[tracing::instrument(skip_all, fields(width = indices.width(), height = indices.height(), quality = params.quality))]
pub fn bake_occlusion<S>(
    pool: &WorkerPool,
    service: Arc<S>,
    mesh: Arc<Mesh>,
    params: &OcclusionParams,
    indices: Arc<Image<u32>>,
    occlusion: Image<f32>,
) -> Result<BakeHandle>
where
    S: IntersectionService + ?Sized + 'static,
{
    let (width, height) = indices.dimensions();
    params.validate(width, height)?;

    if occlusion.dimensions() != (width, height) {
        return Err(Error::DimensionMismatch {
            what: "occlusion map",
            expected_w: width,
            expected_h: height,
            actual_w: occlusion.width(),
            actual_h: occlusion.height(),
        });
    }

    let faces = mesh.num_triangles();
    if let Some(&bad) = indices.as_slice().iter().find(|&&id| id != NO_TRIANGLE && id as usize >= faces) {
        return Err(Error::InvalidImage(format!(
            "indices map references triangle {bad} but the mesh has {faces}"
        )));
    }

    if !service.is_committed() {
        return Err(Error::NotCommitted);
    }

    let tiles = partition_tiles(width, height, params.tile_width, params.tile_height)?;
    let seed = params.seed.unwrap_or_else(clock_seed);
    tracing::debug!(tiles = tiles.len(), workers = params.worker_num, seed, "queueing tiles");

    let queue = Arc::new(TileQueue::new(tiles, params.worker_num));
    let params = Arc::new(params.clone());

    let workers = (0..params.worker_num)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let service = Arc::clone(&service);
            let mesh = Arc::clone(&mesh);
            let params = Arc::clone(&params);
            let indices = Arc::clone(&indices);
            pool.submit(move || worker(&queue, &*service, &mesh, &params, &indices, seed))
        })
        .collect();

    Ok(BakeHandle {
        workers,
        map: occlusion,
        started: Instant::now(),
    })
}

/// Claim and sample tiles until the queue hands out a done marker.
fn worker<S>(
    queue: &TileQueue,
    service: &S,
    mesh: &Mesh,
    params: &OcclusionParams,
    indices: &Image<u32>,
    seed: u64,
) -> WorkerOutput
where
    S: IntersectionService + ?Sized,
{
    let mut out = WorkerOutput::default();
    while let TileWork::Tile(tile) = queue.claim() {
        let result = sample_tile(tile, service, mesh, params, indices, seed, &mut out.stats);
        out.stats.tiles += 1;
        out.stats.written += result.written();
        out.results.push(result);
    }
    out
}

fn sample_tile<S>(
    tile: Tile,
    service: &S,
    mesh: &Mesh,
    params: &OcclusionParams,
    indices: &Image<u32>,
    seed: u64,
    stats: &mut BakeStats,
) -> TileResult
where
    S: IntersectionService + ?Sized,
{
    let (width, height) = indices.dimensions();
    let rays_per_texel = params.quality as u64 * crate::intersect::RAY_BATCH_SIZE as u64;
    let mut sampler = Sampler::for_tile(seed, tile.x, tile.y);
    let mut result = TileResult::new(tile);

    for (slot, (row, col)) in tile.texels().enumerate() {
        let face = indices[(row, col)];
        if face == NO_TRIANGLE {
            continue;
        }
        let center = texel_center(row, col, width, height);
        let Some(texel) = occlusion_at_texel(service, mesh, params, face as usize, center, &mut sampler) else {
            continue;
        };

        stats.sampled += 1;
        stats.rays += rays_per_texel;
        stats.hits += texel.hits as u64;

        result.values[slot] = match (texel.hits, params.zero_hit) {
            (0, ZeroHitPolicy::Keep) => None,
            (0, ZeroHitPolicy::Clear) => Some(0.0),
            _ => Some(texel.value),
        };
    }
    result
}
