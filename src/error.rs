//! Error types for quadpack operations.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, QuadError>;

/// Errors surfaced by build, finalise, and persistence operations.
///
/// Queries on a finalised tree are infallible; feeding a corrupted buffer
/// past [`QuadTree::load`](crate::QuadTree::load) is a precondition
/// violation and panics on out-of-range access.
#[derive(Debug, Error)]
pub enum QuadError {
    /// Underlying file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The bounding region is degenerate (`ne > sw` must hold strictly on
    /// both axes) or the bucket capacity is zero.
    #[error("invalid bounding region or bucket capacity")]
    InvalidRegion,

    /// An inserted point lies outside the tree's bounding region.
    #[error("point ({x}, {y}) lies outside the tree region")]
    OutOfRegion {
        /// X coordinate of the rejected point
        x: f64,
        /// Y coordinate of the rejected point
        y: f64,
    },

    /// A loaded buffer is not a finalised quadtree: shorter than a header,
    /// or its length disagrees with its own header counts.
    #[error("buffer is not a finalised quadtree")]
    InvalidFormat,
}
