//! Packed point quadtree index for 2-D points carrying a 64-bit payload.
//!
//! Build in memory, finalise into one contiguous buffer, then run range
//! queries over axis-aligned rectangles. The finalised buffer round-trips
//! to disk as a raw blob.
//!
//! ```rust
//! use quadpack::{BoundingBox, IndexedPoint, QuadTreeBuilder};
//!
//! let region = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
//! let mut builder = QuadTreeBuilder::new(region, 8)?;
//! builder.insert(IndexedPoint::new(1, 2.5, 7.5))?;
//! builder.insert(IndexedPoint::new(2, 9.0, 1.0))?;
//! let tree = builder.finalise();
//!
//! let hits = tree.query_array(&BoundingBox::new(0.0, 5.0, 5.0, 10.0), 0);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].payload, 1);
//! # Ok::<(), quadpack::QuadError>(())
//! ```

pub mod build;
pub mod error;
pub mod finalise;
mod persist;
pub mod query;
pub mod tree;
pub mod types;

pub use build::QuadTreeBuilder;
pub use error::{QuadError, Result};
pub use query::{QueryIter, QueryStats};
pub use tree::QuadTree;
pub use types::{BoundingBox, IndexedPoint, TreeStats};

pub use geo::{Point, Rect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{BoundingBox, IndexedPoint, QuadError, QuadTree, QuadTreeBuilder, Result};

    pub use crate::{QueryIter, QueryStats, TreeStats};

    pub use geo::Point;
}
