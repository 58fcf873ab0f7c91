//! # Bimba - DCB Demosaicing
//!
//! Bimba reconstructs full three-channel RGB images from single-channel
//! Bayer CFA sensor captures using the DCB algorithm: an iterative,
//! direction-adaptive green reconstruction followed by chroma-stabilized
//! red/blue interpolation.
//!
//! ## Features
//!
//! - **Tiled processing**: memory stays bounded on arbitrarily large
//!   images; each tile carries a halo so results are independent of the
//!   tiling.
//! - **Parallel execution**: tiles are processed by a rayon worker pool,
//!   each worker reusing one set of scratch buffers.
//! - **Two quality modes**: a fast final color pass, or an enhanced mode
//!   with ratio-compensated green refinement and directional chroma
//!   smoothing.
//! - **Progress reporting**: an injected callback receives completion
//!   fractions at 5% granularity.
//!
//! ## Quick Start
//!
//! ```
//! use bimba::{demosaic, CfaPattern, DcbParams, RawImage, RgbPlanes};
//!
//! let (width, height) = (64, 64);
//! let samples = vec![0.5f32; width * height];
//! let raw = RawImage::new(&samples, width, height, CfaPattern::rggb()).unwrap();
//!
//! let mut planes = RgbPlanes::new(width, height);
//! demosaic(&raw, &DcbParams::default(), &mut planes, None).unwrap();
//!
//! assert_eq!(planes.pixel(32, 32), [0.5, 0.5, 0.5]);
//! ```
//!
//! ## Architecture
//!
//! - [`cfa`]: Bayer pattern descriptors and the raw-capture view
//! - [`dcb`]: parameters, output planes, tile pipeline and scheduler
//! - [`progress`]: progress update types
//! - [`error`]: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cfa;
pub mod dcb;
pub mod error;
pub mod progress;

pub use cfa::{CfaPattern, Channel, RawImage, MIN_IMAGE_SIZE};
pub use dcb::{demosaic, DcbParams, RgbPlanes, DEFAULT_TILE_SIZE, MAX_TILE_SIZE, MIN_TILE_SIZE};
pub use error::{DcbError, DcbResult};
pub use progress::{ProgressCallback, ProgressUpdate};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn doc_example_shape() {
        let (width, height) = (64, 48);
        let samples = vec![0.25f32; width * height];
        let raw = RawImage::new(&samples, width, height, CfaPattern::grbg()).unwrap();
        let mut planes = RgbPlanes::new(width, height);
        demosaic(&raw, &DcbParams::default(), &mut planes, None).unwrap();
        assert_eq!(planes.red().len(), width * height);
    }
}
