//! Parallel tile scheduler.
//!
//! The output planes are split into disjoint tile-row bands handed to rayon
//! workers; each worker owns one [`WorkerScratch`] reused across all tiles
//! it processes. Tiles are independent once their halo is filled from the
//! raw plane, so the only cross-worker state is the tiles-done counter
//! inside the progress reporter.

use crate::cfa::RawImage;
use crate::dcb::buffer::WorkerScratch;
use crate::dcb::geometry::{TileGrid, HALO};
use crate::dcb::passes::{process_tile, TileCtx};
use crate::dcb::{DcbParams, RgbPlanes};
use crate::error::{DcbError, DcbResult};
use crate::progress::{ProgressCallback, ProgressReporter};
use rayon::prelude::*;

pub(crate) fn run(
    raw: &RawImage<'_>,
    params: &DcbParams,
    output: &mut RgbPlanes,
    progress: Option<&ProgressCallback>,
) -> DcbResult<()> {
    let width = raw.width();
    let grid = TileGrid::new(width, raw.height(), params.tile_size);
    let reporter = ProgressReporter::new(grid.num_tiles(), progress);
    reporter.start(if params.enhance { "dcb (enhanced)" } else { "dcb" });
    log::debug!(
        "dcb: {}x{} image, {}x{} grid of {}px tiles, iterations={}, enhance={}, threads={}",
        width,
        raw.height(),
        grid.tiles_x,
        grid.tiles_y,
        grid.tile_size,
        params.iterations,
        params.enhance,
        params.threads,
    );

    let band_len = grid.tile_size * width;
    let (red, green, blue) = output.planes_mut();
    let mut body = || {
        red.par_chunks_mut(band_len)
            .zip(green.par_chunks_mut(band_len))
            .zip(blue.par_chunks_mut(band_len))
            .enumerate()
            .try_for_each_init(
                || WorkerScratch::try_new(grid.pad()),
                |scratch, (y_tile, ((band_r, band_g), band_b))| -> DcbResult<()> {
                    let scratch = match scratch {
                        Ok(s) => s,
                        Err(e) => return Err(e.clone()),
                    };
                    let (_, y0) = grid.origin(0, y_tile);
                    let band_rows = band_r.len() / width;
                    for x_tile in 0..grid.tiles_x {
                        let (x0, _) = grid.origin(x_tile, y_tile);
                        let ctx = TileCtx { raw: *raw, grid: &grid, x0, y0 };
                        process_tile(scratch, &ctx, params);
                        merge_tile(scratch, &grid, x0, band_rows, band_r, band_g, band_b);
                        reporter.tile_done();
                    }
                    Ok(())
                },
            )
    };

    if params.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads)
            .build()
            .map_err(|e| DcbError::ThreadPool(e.to_string()))?;
        pool.install(body)?;
    } else {
        body()?;
    }

    reporter.finish();
    Ok(())
}

/// Copy the tile's true interior (no halo) into the band slices.
fn merge_tile(
    scratch: &WorkerScratch,
    grid: &TileGrid,
    x0: usize,
    band_rows: usize,
    band_r: &mut [f32],
    band_g: &mut [f32],
    band_b: &mut [f32],
) {
    let pad = grid.pad();
    let width = grid.width;
    let x_end = (x0 + grid.tile_size).min(width);
    for dy in 0..band_rows {
        let src_row = (HALO + dy) * pad + HALO;
        let dst_row = dy * width;
        for x in x0..x_end {
            let px = scratch.tile.rgb[src_row + x - x0];
            band_r[dst_row + x] = px[0];
            band_g[dst_row + x] = px[1];
            band_b[dst_row + x] = px[2];
        }
    }
}
