//! Per-worker scratch buffers.
//!
//! Each worker owns one padded RGB tile cache, one direction map and one
//! chroma buffer, allocated once and reused (zeroed) for every tile the
//! worker processes. Allocation is the only fallible step of a run, so it
//! goes through `try_reserve_exact` and surfaces as
//! [`DcbError::Allocation`].
//!
//! The direction map and the chroma buffer have disjoint valid lifetimes
//! within a tile (map: green refinement; chroma: enhanced final stage) but
//! are kept as separate allocations here; see DESIGN.md.

use crate::error::{DcbError, DcbResult};

/// Padded RGB working tile: a flat row-major square of side `pad`, three
/// floats per cell. Channels that have not been written yet read as 0.
pub(crate) struct TileCache {
    pub rgb: Vec<[f32; 3]>,
    pub pad: usize,
}

impl TileCache {
    fn try_new(pad: usize) -> DcbResult<Self> {
        Ok(Self { rgb: try_zeroed_vec(pad * pad)?, pad })
    }
}

/// One worker's reusable working memory.
pub(crate) struct WorkerScratch {
    pub tile: TileCache,
    /// Per-cell interpolation-direction flag: 1 = prefer vertical.
    pub map: Vec<u8>,
    /// Per-cell (R-G, B-G) pairs, valid only during the enhanced final pass.
    pub chroma: Vec<[f32; 2]>,
}

impl WorkerScratch {
    pub(crate) fn try_new(pad: usize) -> DcbResult<Self> {
        Ok(Self {
            tile: TileCache::try_new(pad)?,
            map: try_zeroed_vec(pad * pad)?,
            chroma: try_zeroed_vec(pad * pad)?,
        })
    }

    /// Zero all buffers before processing the next tile.
    pub(crate) fn clear(&mut self) {
        self.tile.rgb.fill([0.0; 3]);
        self.map.fill(0);
        self.chroma.fill([0.0; 2]);
    }
}

fn try_zeroed_vec<T: Copy + Default>(len: usize) -> DcbResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| DcbError::Allocation(e.to_string()))?;
    v.resize(len, T::default());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_allocates_and_clears() {
        let mut scratch = WorkerScratch::try_new(34).unwrap();
        assert_eq!(scratch.tile.rgb.len(), 34 * 34);
        assert_eq!(scratch.map.len(), 34 * 34);
        assert_eq!(scratch.chroma.len(), 34 * 34);

        scratch.tile.rgb[5] = [1.0, 2.0, 3.0];
        scratch.map[5] = 1;
        scratch.chroma[5] = [0.5, -0.5];
        scratch.clear();
        assert_eq!(scratch.tile.rgb[5], [0.0; 3]);
        assert_eq!(scratch.map[5], 0);
        assert_eq!(scratch.chroma[5], [0.0; 2]);
    }
}
