//! The per-tile DCB stage pipeline.
//!
//! Every pass is a pure numeric transform over the padded tile buffer,
//! expressed with flat row-major indexing and precomputed row strides
//! (`u` = one row, `v` = two rows, `w3` = three rows). Values are never
//! clamped mid-pipeline; the only clamp is the overshoot guard at the end
//! of the enhanced-mode green refinement.
//!
//! Pass order per tile (driven by [`process_tile`]):
//!
//! 1. `fill_raw`, plus `fill_border` for tiles touching an image edge
//! 2. `hid` — initial green estimate
//! 3. `iterations` x (`hid2` x3, `map`, `correction`) — green refinement
//! 4. `color`, `pp`, then the fixed artifact-suppression repeats
//! 5. `restore_red_blue`, `color`
//! 6. enhanced mode only: `refinement`, `color_full`

use crate::cfa::{Channel, RawImage};
use crate::dcb::buffer::{TileCache, WorkerScratch};
use crate::dcb::geometry::{PassRect, TileGrid, FILL_MARGIN, HALO};
use crate::dcb::DcbParams;

const R: usize = 0;
const G: usize = 1;
const B: usize = 2;

/// Everything a pass needs to translate padded-buffer cells to image
/// coordinates: the raw capture, the tile grid and this tile's origin.
pub(crate) struct TileCtx<'a> {
    pub raw: RawImage<'a>,
    pub grid: &'a TileGrid,
    pub x0: usize,
    pub y0: usize,
}

impl TileCtx<'_> {
    #[inline]
    fn row_abs(&self, r: usize) -> usize {
        debug_assert!(self.y0 + r >= HALO);
        self.y0 + r - HALO
    }

    #[inline]
    fn col_abs(&self, c: usize) -> usize {
        debug_assert!(self.x0 + c >= HALO);
        self.x0 + c - HALO
    }

    #[inline]
    fn limits(&self, border: usize) -> PassRect {
        self.grid.pass_limits(self.x0, self.y0, border, FILL_MARGIN)
    }

    /// First column in `[col_min, ..)` whose CFA site is not green for the
    /// given buffer row. Bayer rows alternate, so this is `col_min` or
    /// `col_min + 1`.
    #[inline]
    fn first_sample_col(&self, r: usize, col_min: usize) -> usize {
        let row = self.row_abs(r);
        col_min + usize::from(self.raw.color_at(row, self.col_abs(col_min)) == Channel::Green)
    }

    /// First green column in `[col_min, ..)` for the given buffer row.
    #[inline]
    fn first_green_col(&self, r: usize, col_min: usize) -> usize {
        let row = self.row_abs(r);
        col_min + usize::from(self.raw.color_at(row, self.col_abs(col_min)) != Channel::Green)
    }

    fn is_edge_tile(&self) -> bool {
        self.x0 == 0
            || self.y0 == 0
            || self.x0 + self.grid.tile_size >= self.grid.width
            || self.y0 + self.grid.tile_size >= self.grid.height
    }
}

/// Run the full pipeline for one tile. The scratch is cleared first, so
/// nothing from the previous tile leaks in.
pub(crate) fn process_tile(scratch: &mut WorkerScratch, ctx: &TileCtx, params: &DcbParams) {
    scratch.clear();

    fill_raw(&mut scratch.tile, ctx);
    if ctx.is_edge_tile() {
        fill_border(&mut scratch.tile, ctx, FILL_MARGIN);
    }

    hid(&mut scratch.tile, ctx);
    for _ in 0..params.iterations {
        hid2(&mut scratch.tile, ctx);
        hid2(&mut scratch.tile, ctx);
        hid2(&mut scratch.tile, ctx);
        map(&scratch.tile, &mut scratch.map, ctx);
        correction(&mut scratch.tile, &scratch.map, ctx);
    }

    color(&mut scratch.tile, ctx);
    pp(&mut scratch.tile, ctx);
    for _ in 0..2 {
        map(&scratch.tile, &mut scratch.map, ctx);
        correction(&mut scratch.tile, &scratch.map, ctx);
        color(&mut scratch.tile, ctx);
    }
    // Leave a fresh direction map for the enhanced refinement.
    map(&scratch.tile, &mut scratch.map, ctx);

    restore_red_blue(&mut scratch.tile, ctx);
    color(&mut scratch.tile, ctx);

    if params.enhance {
        refinement(&mut scratch.tile, &scratch.map, ctx);
        color_full(&mut scratch.tile, &mut scratch.chroma, ctx);
    }
}

/// Copy every in-image raw sample into the channel slot its CFA site
/// recorded; the other two channels stay 0.
fn fill_raw(tile: &mut TileCache, ctx: &TileCtx) {
    let ext = ctx.grid.raw_extent(ctx.x0, ctx.y0);
    let u = tile.pad;
    for r in ext.rows() {
        let row = ctx.row_abs(r);
        for c in ext.cols() {
            let col = ctx.col_abs(c);
            let ch = ctx.raw.color_at(row, col) as usize;
            tile.rgb[r * u + c][ch] = ctx.raw.sample_at(row, col);
        }
    }
}

/// Synthesize the missing channels near image edges as per-channel averages
/// of the 3x3 neighborhood, skipping neighbors outside the image or the
/// padded buffer. Gives edge tiles the local statistics interior tiles get
/// from real neighboring data.
fn fill_border(tile: &mut TileCache, ctx: &TileCtx, margin: usize) {
    let (w_img, h_img) = (ctx.raw.width(), ctx.raw.height());
    let ext = ctx.grid.raw_extent(ctx.x0, ctx.y0);
    let u = tile.pad;
    for r in ext.rows() {
        let row = ctx.row_abs(r);
        for c in ext.cols() {
            let col = ctx.col_abs(c);
            if row >= margin && row < h_img - margin && col >= margin && col < w_img - margin {
                continue;
            }
            let mut sum = [0.0f32; 3];
            let mut cnt = [0u32; 3];
            for dr in -1i32..=1 {
                for dc in -1i32..=1 {
                    let nr = r as i32 + dr;
                    let nc = c as i32 + dc;
                    if nr < 0 || nr >= u as i32 || nc < 0 || nc >= u as i32 {
                        continue;
                    }
                    let ny = row as i32 + dr;
                    let nx = col as i32 + dc;
                    if ny < 0 || ny >= h_img as i32 || nx < 0 || nx >= w_img as i32 {
                        continue;
                    }
                    let nch = ctx.raw.color_at(ny as usize, nx as usize) as usize;
                    sum[nch] += tile.rgb[nr as usize * u + nc as usize][nch];
                    cnt[nch] += 1;
                }
            }
            let own = ctx.raw.color_at(row, col) as usize;
            let i = r * u + c;
            for ch in 0..3 {
                if ch != own && cnt[ch] > 0 {
                    tile.rgb[i][ch] = sum[ch] / cnt[ch] as f32;
                }
            }
        }
    }
}

/// Initial green at sample sites: plain average of the four orthogonal
/// green neighbors.
fn hid(tile: &mut TileCache, ctx: &TileCtx) {
    let rect = ctx.limits(1);
    let u = tile.pad;
    let t = &mut tile.rgb;
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        while c < rect.col_max {
            let i = r * u + c;
            t[i][G] = 0.25 * (t[i - 1][G] + t[i + 1][G] + t[i - u][G] + t[i + u][G]);
            c += 2;
        }
    }
}

/// Re-estimate green at sample sites from the gradient of the site's own
/// channel across its four same-channel neighbors at axis distance 2.
fn hid2(tile: &mut TileCache, ctx: &TileCtx) {
    let rect = ctx.limits(2);
    let u = tile.pad;
    let v = 2 * u;
    let t = &mut tile.rgb;
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        let ch = ctx.raw.color_at(ctx.row_abs(r), ctx.col_abs(c)) as usize;
        while c < rect.col_max {
            let i = r * u + c;
            t[i][G] = t[i][ch]
                + 0.25
                    * (t[i - v][G] + t[i + v][G] + t[i - 2][G] + t[i + 2][G]
                        - t[i - v][ch]
                        - t[i + v][ch]
                        - t[i - 2][ch]
                        - t[i + 2][ch]);
            c += 2;
        }
    }
}

/// Decide, per pixel, whether the local green gradient is smoother
/// vertically (flag 1) or horizontally (flag 0).
fn map(tile: &TileCache, map: &mut [u8], ctx: &TileCtx) {
    let rect = ctx.limits(2);
    let u = tile.pad;
    let t = &tile.rgb;
    for r in rect.rows() {
        for c in rect.cols() {
            let i = r * u + c;
            let g = t[i][G];
            let gw = t[i - 1][G];
            let ge = t[i + 1][G];
            let gn = t[i - u][G];
            let gs = t[i + u][G];
            map[i] = if 4.0 * g > gw + ge + gn + gs {
                u8::from(gw.min(ge) + gw + ge < gn.min(gs) + gn + gs)
            } else {
                u8::from(gw.max(ge) + gw + ge > gn.max(gs) + gn + gs)
            };
        }
    }
}

/// Weighted vote of the 3x3 direction-map neighborhood: center 4,
/// edge-adjacent 2, distance-2 cardinals 1 — 16 total.
#[inline]
fn map_weight(map: &[u8], i: usize, u: usize) -> f32 {
    let v = 2 * u;
    f32::from(
        4 * map[i]
            + 2 * (map[i - u] + map[i + u] + map[i - 1] + map[i + 1])
            + map[i - v]
            + map[i + v]
            + map[i - 2]
            + map[i + 2],
    )
}

/// Rebuild green at sample sites as a map-weighted blend of the horizontal
/// and vertical neighbor averages.
fn correction(tile: &mut TileCache, map: &[u8], ctx: &TileCtx) {
    let rect = ctx.limits(2);
    let u = tile.pad;
    let t = &mut tile.rgb;
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        while c < rect.col_max {
            let i = r * u + c;
            let cur = map_weight(map, i, u);
            t[i][G] = ((16.0 - cur) * 0.5 * (t[i - 1][G] + t[i + 1][G])
                + cur * 0.5 * (t[i - u][G] + t[i + u][G]))
                / 16.0;
            c += 2;
        }
    }
}

/// Interpolate the missing red/blue channels through green-anchored color
/// differences: diagonal neighbors at red/blue sites, the row and column
/// pairs at green sites.
fn color(tile: &mut TileCache, ctx: &TileCtx) {
    let rect = ctx.limits(2);
    let u = tile.pad;

    // Opposite channel at red/blue sites from the four diagonal neighbors.
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        if c >= rect.col_max {
            continue;
        }
        let o = ctx
            .raw
            .color_at(ctx.row_abs(r), ctx.col_abs(c))
            .opposite() as usize;
        let t = &mut tile.rgb;
        while c < rect.col_max {
            let i = r * u + c;
            t[i][o] = t[i][G]
                + 0.25
                    * (t[i - u - 1][o] - t[i - u - 1][G] + t[i - u + 1][o] - t[i - u + 1][G]
                        + t[i + u - 1][o]
                        - t[i + u - 1][G]
                        + t[i + u + 1][o]
                        - t[i + u + 1][G]);
            c += 2;
        }
    }

    // Both channels at green sites: the row-adjacent channel from the
    // horizontal pair, the column-adjacent one from the vertical pair.
    for r in rect.rows() {
        let mut c = ctx.first_green_col(r, rect.col_min);
        if c >= rect.col_max {
            continue;
        }
        let row_ch = ctx.raw.color_at(ctx.row_abs(r), ctx.col_abs(c) + 1) as usize;
        let col_ch = 2 - row_ch;
        let t = &mut tile.rgb;
        while c < rect.col_max {
            let i = r * u + c;
            t[i][row_ch] = t[i][G]
                + 0.5 * (t[i - 1][row_ch] - t[i - 1][G] + t[i + 1][row_ch] - t[i + 1][G]);
            t[i][col_ch] = t[i][G]
                + 0.5 * (t[i - u][col_ch] - t[i - u][G] + t[i + u][col_ch] - t[i + u][G]);
            c += 2;
        }
    }
}

/// Post-process smoothing: rebuild red and blue everywhere from the
/// 8-neighbor channel averages anchored to green, damping color fringing.
fn pp(tile: &mut TileCache, ctx: &TileCtx) {
    let rect = ctx.limits(2);
    let u = tile.pad;
    let t = &mut tile.rgb;
    for r in rect.rows() {
        for c in rect.cols() {
            let i = r * u + c;
            let mut s = [0.0f32; 3];
            for j in [
                i - u - 1,
                i - u,
                i - u + 1,
                i - 1,
                i + 1,
                i + u - 1,
                i + u,
                i + u + 1,
            ] {
                s[R] += t[j][R];
                s[G] += t[j][G];
                s[B] += t[j][B];
            }
            let g_avg = s[G] * 0.125;
            t[i][R] = s[R] * 0.125 + (t[i][G] - g_avg);
            t[i][B] = s[B] * 0.125 + (t[i][G] - g_avg);
        }
    }
}

/// Overwrite red/blue at their CFA sample sites with the untouched raw
/// values, discarding drift accumulated by the iterative passes.
fn restore_red_blue(tile: &mut TileCache, ctx: &TileCtx) {
    let ext = ctx.grid.raw_extent(ctx.x0, ctx.y0);
    let u = tile.pad;
    for r in ext.rows() {
        let row = ctx.row_abs(r);
        let mut c = ctx.first_sample_col(r, ext.col_min);
        while c < ext.col_max {
            let col = ctx.col_abs(c);
            let ch = ctx.raw.color_at(row, col) as usize;
            tile.rgb[r * u + c][ch] = ctx.raw.sample_at(row, col);
            c += 2;
        }
    }
}

/// Enhanced-mode green refinement at red/blue sample sites: blend
/// ratio-compensated vertical and horizontal green estimates by the
/// direction-map vote, then clamp into the four-neighbor green envelope.
fn refinement(tile: &mut TileCache, map: &[u8], ctx: &TileCtx) {
    let rect = ctx.limits(4);
    let u = tile.pad;
    let v = 2 * u;
    let w3 = 3 * u;
    let t = &mut tile.rgb;
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        if c >= rect.col_max {
            continue;
        }
        let ch = ctx.raw.color_at(ctx.row_abs(r), ctx.col_abs(c)) as usize;
        while c < rect.col_max {
            let i = r * u + c;
            let cur = map_weight(map, i, u);
            let cv = t[i][ch];

            if cv > 0.0 {
                // Vertical estimate: green-to-channel ratios along the column.
                let f0 = (t[i - u][G] + t[i + u][G]) / (2.0 * cv);
                let f1 = if t[i - v][ch] + cv > 0.0 {
                    2.0 * t[i - u][G] / (t[i - v][ch] + cv)
                } else {
                    f0
                };
                let f2 = if t[i - v][ch] > 0.0 {
                    (t[i - u][G] + t[i - w3][G]) / (2.0 * t[i - v][ch])
                } else {
                    f0
                };
                let f3 = if t[i + v][ch] + cv > 0.0 {
                    2.0 * t[i + u][G] / (t[i + v][ch] + cv)
                } else {
                    f0
                };
                let f4 = if t[i + v][ch] > 0.0 {
                    (t[i + u][G] + t[i + w3][G]) / (2.0 * t[i + v][ch])
                } else {
                    f0
                };
                let gv = (5.0 * f0 + 3.0 * (f1 + f3) + f2 + f4) / 13.0;

                // Horizontal estimate, same shape along the row.
                let h0 = (t[i - 1][G] + t[i + 1][G]) / (2.0 * cv);
                let h1 = if t[i - 2][ch] + cv > 0.0 {
                    2.0 * t[i - 1][G] / (t[i - 2][ch] + cv)
                } else {
                    h0
                };
                let h2 = if t[i - 2][ch] > 0.0 {
                    (t[i - 1][G] + t[i - 3][G]) / (2.0 * t[i - 2][ch])
                } else {
                    h0
                };
                let h3 = if t[i + 2][ch] + cv > 0.0 {
                    2.0 * t[i + 1][G] / (t[i + 2][ch] + cv)
                } else {
                    h0
                };
                let h4 = if t[i + 2][ch] > 0.0 {
                    (t[i + 1][G] + t[i + 3][G]) / (2.0 * t[i + 2][ch])
                } else {
                    h0
                };
                let gh = (5.0 * h0 + 3.0 * (h1 + h3) + h2 + h4) / 13.0;

                t[i][G] = cv * (cur * gv + (16.0 - cur) * gh) / 16.0;
            }

            // Overshoot guard: reconstructed green never leaves the
            // envelope of its four orthogonal green neighbors.
            let lo = t[i - 1][G].min(t[i + 1][G]).min(t[i - u][G]).min(t[i + u][G]);
            let hi = t[i - 1][G].max(t[i + 1][G]).max(t[i - u][G]).max(t[i + u][G]);
            t[i][G] = t[i][G].clamp(lo, hi);

            c += 2;
        }
    }
}

/// Directional weight: inverse of the chroma discontinuity across three
/// reference points, favoring smoother directions.
#[inline]
fn dir_weight(near: f32, across: f32, far: f32) -> f32 {
    1.0 / (1.0 + (near - across).abs() + (near - far).abs() + (across - far).abs())
}

/// Directional chroma extrapolation toward the center site.
#[inline]
fn extrapolate(near: f32, far: f32, side_a: f32, side_b: f32) -> f32 {
    1.325 * near - 0.175 * far - 0.075 * side_a - 0.075 * side_b
}

/// Enhanced-mode chroma reconstruction: seed R-G/B-G at sample sites,
/// smooth the missing chroma there from the four diagonal directions,
/// propagate both planes to green sites from the four orthogonal
/// directions, then rebuild red and blue as chroma + green. Sampled
/// channels are left untouched.
fn color_full(tile: &mut TileCache, chroma: &mut [[f32; 2]], ctx: &TileCtx) {
    let u = tile.pad;
    let v = 2 * u;
    let w3 = 3 * u;

    // Seed own-channel chroma at sample sites.
    let rect = ctx.limits(1);
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        if c >= rect.col_max {
            continue;
        }
        let ch = ctx.raw.color_at(ctx.row_abs(r), ctx.col_abs(c)) as usize;
        let d = ch / 2;
        while c < rect.col_max {
            let i = r * u + c;
            chroma[i][d] = tile.rgb[i][ch] - tile.rgb[i][G];
            c += 2;
        }
    }

    // Missing chroma at sample sites from the four diagonal directions.
    let rect = ctx.limits(4);
    for r in rect.rows() {
        let mut c = ctx.first_sample_col(r, rect.col_min);
        if c >= rect.col_max {
            continue;
        }
        let ch = ctx.raw.color_at(ctx.row_abs(r), ctx.col_abs(c)) as usize;
        let o = 1 - ch / 2;
        while c < rect.col_max {
            let i = r * u + c;
            let nw = i - u - 1;
            let ne = i - u + 1;
            let sw = i + u - 1;
            let se = i + u + 1;
            let f0 = dir_weight(chroma[nw][o], chroma[se][o], chroma[i - w3 - 3][o]);
            let f1 = dir_weight(chroma[ne][o], chroma[sw][o], chroma[i - w3 + 3][o]);
            let f2 = dir_weight(chroma[sw][o], chroma[ne][o], chroma[i + w3 - 3][o]);
            let f3 = dir_weight(chroma[se][o], chroma[nw][o], chroma[i + w3 + 3][o]);
            let g0 = extrapolate(
                chroma[nw][o],
                chroma[i - w3 - 3][o],
                chroma[i - u - 3][o],
                chroma[i - w3 - 1][o],
            );
            let g1 = extrapolate(
                chroma[ne][o],
                chroma[i - w3 + 3][o],
                chroma[i - u + 3][o],
                chroma[i - w3 + 1][o],
            );
            let g2 = extrapolate(
                chroma[sw][o],
                chroma[i + w3 - 3][o],
                chroma[i + u - 3][o],
                chroma[i + w3 - 1][o],
            );
            let g3 = extrapolate(
                chroma[se][o],
                chroma[i + w3 + 3][o],
                chroma[i + u + 3][o],
                chroma[i + w3 + 1][o],
            );
            chroma[i][o] =
                (f0 * g0 + f1 * g1 + f2 * g2 + f3 * g3) / (f0 + f1 + f2 + f3);
            c += 2;
        }
    }

    // Propagate both chroma planes to green sites from the four orthogonal
    // directions.
    for r in rect.rows() {
        let mut c = ctx.first_green_col(r, rect.col_min);
        while c < rect.col_max {
            let i = r * u + c;
            let n = i - u;
            let s = i + u;
            let west = i - 1;
            let east = i + 1;
            for d in 0..2 {
                let f0 = dir_weight(chroma[n][d], chroma[s][d], chroma[i - w3][d]);
                let f1 = dir_weight(chroma[east][d], chroma[west][d], chroma[i + 3][d]);
                let f2 = dir_weight(chroma[west][d], chroma[east][d], chroma[i - 3][d]);
                let f3 = dir_weight(chroma[s][d], chroma[n][d], chroma[i + w3][d]);
                let g0 = extrapolate(chroma[n][d], chroma[i - w3][d], chroma[n - 2][d], chroma[n + 2][d]);
                let g1 = extrapolate(chroma[east][d], chroma[i + 3][d], chroma[east - v][d], chroma[east + v][d]);
                let g2 = extrapolate(chroma[west][d], chroma[i - 3][d], chroma[west - v][d], chroma[west + v][d]);
                let g3 = extrapolate(chroma[s][d], chroma[i + w3][d], chroma[s - 2][d], chroma[s + 2][d]);
                chroma[i][d] =
                    (f0 * g0 + f1 * g1 + f2 * g2 + f3 * g3) / (f0 + f1 + f2 + f3);
            }
            c += 2;
        }
    }

    // Rebuild red and blue from chroma; CFA-sampled channels stay as
    // restored, exactly.
    let t = &mut tile.rgb;
    for r in rect.rows() {
        let row = ctx.row_abs(r);
        for c in rect.cols() {
            let i = r * u + c;
            match ctx.raw.color_at(row, ctx.col_abs(c)) {
                Channel::Green => {
                    t[i][R] = chroma[i][0] + t[i][G];
                    t[i][B] = chroma[i][1] + t[i][G];
                }
                Channel::Red => t[i][B] = chroma[i][1] + t[i][G],
                Channel::Blue => t[i][R] = chroma[i][0] + t[i][G],
            }
        }
    }
}
