//! Error types for the reconstruction entry points.
//!
//! The pixel pipeline itself is infallible: every stage is a pure numeric
//! transform over pre-validated inputs, and index bounds are debug
//! assertions. What can fail is the contract around it — mismatched buffer
//! sizes, degenerate parameters, and resource exhaustion while setting up
//! per-worker scratch memory or the thread pool.

use thiserror::Error;

/// Errors surfaced by [`demosaic`](crate::dcb::demosaic) and the input
/// constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DcbError {
    /// Raw sample slice does not match `width * height`.
    #[error("raw data size mismatch: expected {expected} samples, got {got}")]
    SizeMismatch {
        /// Expected sample count (`width * height`).
        expected: usize,
        /// Actual slice length.
        got: usize,
    },

    /// Output planes were allocated for different dimensions than the input.
    #[error("output planes are {out_width}x{out_height}, raw image is {width}x{height}")]
    OutputMismatch {
        /// Output plane width.
        out_width: usize,
        /// Output plane height.
        out_height: usize,
        /// Raw image width.
        width: usize,
        /// Raw image height.
        height: usize,
    },

    /// Image is smaller than the minimum the kernel supports.
    #[error("image too small: {width}x{height}, need at least {min}x{min}")]
    ImageTooSmall {
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
        /// Minimum edge length.
        min: usize,
    },

    /// The green-refinement iteration count must be positive.
    #[error("iterations must be positive")]
    InvalidIterations,

    /// Allocating per-worker scratch buffers failed.
    #[error("failed to allocate tile scratch buffers: {0}")]
    Allocation(String),

    /// Building the dedicated worker thread pool failed.
    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(String),
}

/// Result type alias for reconstruction operations.
pub type DcbResult<T> = Result<T, DcbError>;
