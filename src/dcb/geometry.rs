//! Tile grid and halo range arithmetic.
//!
//! The image is partitioned into square tiles of edge `tile_size`; each
//! tile is processed inside a padded buffer of side `tile_size + 2 * HALO`
//! whose cell `(r, c)` maps to image pixel `(y0 - HALO + r, x0 - HALO + c)`.
//! Everything here is pure arithmetic clamping — no side effects, no
//! failure modes.

/// Halo width around each tile, in pixels. Wide enough for the largest
/// neighborhood any pipeline stage reads (radius 4).
pub(crate) const HALO: usize = 10;

/// Margin, in pixels from the image edge, inside which missing channels are
/// synthesized before the pipeline runs on an edge tile.
pub(crate) const FILL_MARGIN: usize = 6;

/// Tile partition of an image.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TileGrid {
    pub width: usize,
    pub height: usize,
    pub tile_size: usize,
    pub tiles_x: usize,
    pub tiles_y: usize,
}

impl TileGrid {
    pub(crate) fn new(width: usize, height: usize, tile_size: usize) -> Self {
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);
        Self { width, height, tile_size, tiles_x, tiles_y }
    }

    /// Side length of the padded tile buffer.
    #[inline]
    pub(crate) fn pad(&self) -> usize {
        self.tile_size + 2 * HALO
    }

    /// Total number of tiles.
    pub(crate) fn num_tiles(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    /// Image-space origin of tile `(x_tile, y_tile)`.
    #[inline]
    pub(crate) fn origin(&self, x_tile: usize, y_tile: usize) -> (usize, usize) {
        (x_tile * self.tile_size, y_tile * self.tile_size)
    }

    /// Padded-buffer range that is valid to process for a pass that reads
    /// `border` neighbors in every direction.
    ///
    /// Interior tiles get the full `[border, pad - border)` square. Tiles
    /// touching an image edge start `HALO + min(border, border_offset)`
    /// cells in from that edge of the buffer; ranges are further reduced
    /// where the buffer extends past the far edge of the image.
    pub(crate) fn pass_limits(
        &self,
        x0: usize,
        y0: usize,
        border: usize,
        border_offset: usize,
    ) -> PassRect {
        let pad = self.pad();
        let edge = border.min(border_offset);

        let mut row_min = border;
        let mut col_min = border;
        if y0 == 0 {
            row_min = HALO + edge;
        }
        if x0 == 0 {
            col_min = HALO + edge;
        }
        let row_max = (pad - border).min((HALO + self.height - y0).saturating_sub(edge));
        let col_max = (pad - border).min((HALO + self.width - x0).saturating_sub(edge));

        PassRect {
            row_min: row_min.min(row_max),
            row_max,
            col_min: col_min.min(col_max),
            col_max,
        }
    }

    /// Padded-buffer range whose cells map to in-image pixels.
    pub(crate) fn raw_extent(&self, x0: usize, y0: usize) -> PassRect {
        let pad = self.pad();
        PassRect {
            row_min: HALO.saturating_sub(y0),
            row_max: pad.min(HALO + self.height - y0),
            col_min: HALO.saturating_sub(x0),
            col_max: pad.min(HALO + self.width - x0),
        }
    }
}

/// Inclusive-exclusive row/column range within a padded tile buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PassRect {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
}

impl PassRect {
    #[inline]
    pub(crate) fn rows(&self) -> std::ops::Range<usize> {
        self.row_min..self.row_max
    }

    #[inline]
    pub(crate) fn cols(&self) -> std::ops::Range<usize> {
        self.col_min..self.col_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_counts() {
        let grid = TileGrid::new(1000, 600, 194);
        assert_eq!(grid.tiles_x, 6); // 5*194 = 970 < 1000
        assert_eq!(grid.tiles_y, 4); // 3*194 = 582 < 600
        assert_eq!(grid.num_tiles(), 24);
        assert_eq!(grid.origin(2, 1), (388, 194));
        assert_eq!(grid.pad(), 214);
    }

    #[test]
    fn exact_multiple_has_no_partial_tiles() {
        let grid = TileGrid::new(388, 388, 194);
        assert_eq!((grid.tiles_x, grid.tiles_y), (2, 2));
    }

    #[test]
    fn interior_tile_gets_full_range() {
        let grid = TileGrid::new(1000, 1000, 194);
        let (x0, y0) = grid.origin(2, 2);
        let rect = grid.pass_limits(x0, y0, 2, FILL_MARGIN);
        assert_eq!(rect.row_min, 2);
        assert_eq!(rect.col_min, 2);
        assert_eq!(rect.row_max, grid.pad() - 2);
        assert_eq!(rect.col_max, grid.pad() - 2);
    }

    #[test]
    fn top_left_tile_is_clipped() {
        let grid = TileGrid::new(1000, 1000, 194);
        let rect = grid.pass_limits(0, 0, 2, FILL_MARGIN);
        assert_eq!(rect.row_min, HALO + 2);
        assert_eq!(rect.col_min, HALO + 2);
        assert_eq!(rect.row_max, grid.pad() - 2);
    }

    #[test]
    fn far_edge_tile_is_clipped() {
        let grid = TileGrid::new(1000, 1000, 194);
        let (x0, y0) = grid.origin(5, 5); // partial tile: 1000 - 970 = 30 px
        let rect = grid.pass_limits(x0, y0, 2, FILL_MARGIN);
        assert_eq!(rect.row_max, HALO + 30 - 2);
        assert_eq!(rect.col_max, HALO + 30 - 2);
        assert_eq!(rect.row_min, 2);
    }

    #[test]
    fn border_offset_caps_the_edge_margin() {
        let grid = TileGrid::new(1000, 1000, 194);
        let wide = grid.pass_limits(0, 0, 8, 4);
        assert_eq!(wide.row_min, HALO + 4);
        let narrow = grid.pass_limits(0, 0, 2, 4);
        assert_eq!(narrow.row_min, HALO + 2);
    }

    #[test]
    fn raw_extent_clips_to_image() {
        let grid = TileGrid::new(200, 200, 194);
        // Top-left tile: halo hangs off the top and left.
        let rect = grid.raw_extent(0, 0);
        assert_eq!(rect.row_min, HALO);
        assert_eq!(rect.col_min, HALO);
        assert_eq!(rect.row_max, grid.pad());
        // Bottom-right partial tile (origin 194): only 6 image pixels left.
        let rect = grid.raw_extent(194, 194);
        assert_eq!(rect.row_min, 0);
        assert_eq!(rect.row_max, HALO + 6);
    }

    #[test]
    fn single_tile_image() {
        let grid = TileGrid::new(64, 64, 194);
        assert_eq!(grid.num_tiles(), 1);
        let rect = grid.pass_limits(0, 0, 2, FILL_MARGIN);
        assert_eq!(rect.row_min, HALO + 2);
        assert_eq!(rect.row_max, HALO + 64 - 2);
    }
}
