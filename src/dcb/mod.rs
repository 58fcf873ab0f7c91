//! DCB demosaicing: parameters, output planes and the entry point.
//!
//! The reconstruction runs tile by tile inside padded working buffers and
//! merges each tile's interior into three pre-allocated full-image float
//! planes. Callers only deal with [`DcbParams`], [`RgbPlanes`] and
//! [`demosaic`]; the stage pipeline and the scheduler live in private
//! submodules.

mod buffer;
mod geometry;
mod passes;
mod scheduler;

use crate::cfa::RawImage;
use crate::error::{DcbError, DcbResult};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: usize = 194;

/// Minimum accepted tile edge length.
pub const MIN_TILE_SIZE: usize = 32;

/// Maximum accepted tile edge length.
pub const MAX_TILE_SIZE: usize = 4096;

/// Tuning parameters for a reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcbParams {
    /// Number of green-refinement loop repeats. Must be positive.
    pub iterations: usize,
    /// Run the enhanced final color stage (green refinement + high-quality
    /// chroma reconstruction) instead of the fast one.
    pub enhance: bool,
    /// Tile edge length; clamped to `[MIN_TILE_SIZE, MAX_TILE_SIZE]`.
    pub tile_size: usize,
    /// Number of worker threads. `0` uses the global rayon pool.
    pub threads: usize,
}

impl Default for DcbParams {
    fn default() -> Self {
        Self {
            iterations: 2,
            enhance: true,
            tile_size: DEFAULT_TILE_SIZE,
            threads: 0,
        }
    }
}

impl DcbParams {
    /// Create parameters with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of green-refinement iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Enable or disable the enhanced final color stage.
    pub fn with_enhance(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    /// Set the tile edge length (clamped to the supported range).
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size.clamp(MIN_TILE_SIZE, MAX_TILE_SIZE);
        self
    }

    /// Set the worker thread count (`0` = use the global pool).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// Three full-image float planes produced by the reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbPlanes {
    red: Vec<f32>,
    green: Vec<f32>,
    blue: Vec<f32>,
    width: usize,
    height: usize,
}

impl RgbPlanes {
    /// Allocate zeroed planes for a `width` x `height` image.
    pub fn new(width: usize, height: usize) -> Self {
        let n = width * height;
        Self {
            red: vec![0.0; n],
            green: vec![0.0; n],
            blue: vec![0.0; n],
            width,
            height,
        }
    }

    /// Plane width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Plane height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The red plane, row-major.
    pub fn red(&self) -> &[f32] {
        &self.red
    }

    /// The green plane, row-major.
    pub fn green(&self) -> &[f32] {
        &self.green
    }

    /// The blue plane, row-major.
    pub fn blue(&self) -> &[f32] {
        &self.blue
    }

    /// The RGB triple at (row, col).
    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [f32; 3] {
        let i = row * self.width + col;
        [self.red[i], self.green[i], self.blue[i]]
    }

    /// Convert to interleaved `[R,G,B, R,G,B, ...]` layout, the format most
    /// image crates expect.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let n = self.width * self.height;
        let mut out = vec![0.0f32; 3 * n];
        for i in 0..n {
            out[3 * i] = self.red[i];
            out[3 * i + 1] = self.green[i];
            out[3 * i + 2] = self.blue[i];
        }
        out
    }

    pub(crate) fn planes_mut(&mut self) -> (&mut [f32], &mut [f32], &mut [f32]) {
        (&mut self.red, &mut self.green, &mut self.blue)
    }
}

/// Reconstruct full RGB planes from a Bayer CFA capture with the DCB
/// algorithm.
///
/// `output` must be allocated for the same dimensions as `raw`. On success
/// all three planes are fully populated. `progress`, when given, receives a
/// start event and completion fractions at >=5% increments ending with
/// `1.0`.
///
/// # Errors
///
/// - [`DcbError::InvalidIterations`] when `params.iterations == 0`
/// - [`DcbError::OutputMismatch`] when `output` has the wrong dimensions
/// - [`DcbError::Allocation`] when per-worker scratch cannot be allocated
/// - [`DcbError::ThreadPool`] when a dedicated pool cannot be built
pub fn demosaic(
    raw: &RawImage<'_>,
    params: &DcbParams,
    output: &mut RgbPlanes,
    progress: Option<&ProgressCallback>,
) -> DcbResult<()> {
    if params.iterations == 0 {
        return Err(DcbError::InvalidIterations);
    }
    if output.width != raw.width() || output.height != raw.height() {
        return Err(DcbError::OutputMismatch {
            out_width: output.width,
            out_height: output.height,
            width: raw.width(),
            height: raw.height(),
        });
    }

    let params = DcbParams {
        tile_size: params.tile_size.clamp(MIN_TILE_SIZE, MAX_TILE_SIZE),
        ..params.clone()
    };
    scheduler::run(raw, &params, output, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::CfaPattern;

    #[test]
    fn params_builder_and_clamping() {
        let params = DcbParams::new()
            .with_iterations(3)
            .with_enhance(false)
            .with_tile_size(8)
            .with_threads(2);
        assert_eq!(params.iterations, 3);
        assert!(!params.enhance);
        assert_eq!(params.tile_size, MIN_TILE_SIZE);
        assert_eq!(params.threads, 2);

        let params = DcbParams::new().with_tile_size(100_000);
        assert_eq!(params.tile_size, MAX_TILE_SIZE);
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let data = vec![0.5f32; 32 * 32];
        let raw = RawImage::new(&data, 32, 32, CfaPattern::rggb()).unwrap();
        let mut out = RgbPlanes::new(32, 32);
        let err = demosaic(&raw, &DcbParams::new().with_iterations(0), &mut out, None);
        assert_eq!(err.unwrap_err(), DcbError::InvalidIterations);
    }

    #[test]
    fn mismatched_output_is_rejected() {
        let data = vec![0.5f32; 32 * 32];
        let raw = RawImage::new(&data, 32, 32, CfaPattern::rggb()).unwrap();
        let mut out = RgbPlanes::new(16, 32);
        let err = demosaic(&raw, &DcbParams::default(), &mut out, None);
        assert!(matches!(err.unwrap_err(), DcbError::OutputMismatch { .. }));
    }

    #[test]
    fn planes_accessors() {
        let mut planes = RgbPlanes::new(4, 2);
        planes.planes_mut().0[5] = 0.25;
        planes.planes_mut().1[5] = 0.5;
        planes.planes_mut().2[5] = 0.75;
        assert_eq!(planes.pixel(1, 1), [0.25, 0.5, 0.75]);

        let inter = planes.to_interleaved();
        assert_eq!(&inter[15..18], &[0.25, 0.5, 0.75]);
        assert_eq!(planes.width(), 4);
        assert_eq!(planes.height(), 2);
    }
}
