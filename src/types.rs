//! Geometry primitives and point records.
//!
//! The quadtree works on axis-aligned rectangles and 2-D points carrying an
//! opaque 64-bit payload. [`BoundingBox`] wraps `geo::Rect` with the
//! containment, overlap, and quadrant-splitting operations the index needs.

use geo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Index of the north-west child quadrant.
pub const NW: usize = 0;
/// Index of the north-east child quadrant.
pub const NE: usize = 1;
/// Index of the south-west child quadrant.
pub const SW: usize = 2;
/// Index of the south-east child quadrant.
pub const SE: usize = 3;
/// Number of child quadrants per inner node.
pub const QUAD_COUNT: usize = 4;

// Quadrant indices encode direction bits: bit 0 = east, bit 1 = south.
const EAST_BIT: usize = 1;
const SOUTH_BIT: usize = 2;

/// Pick the child quadrant for a coordinate pair given the split midpoint.
///
/// Points exactly on a dividing line go to the north/east child; the same
/// rule must hold during build and query traversal, or boundary points
/// become unreachable.
pub(crate) fn child_index(div_x: f64, div_y: f64, x: f64, y: f64) -> usize {
    let mut quad = NW;
    if x >= div_x {
        quad |= EAST_BIT;
    }
    if y < div_y {
        quad |= SOUTH_BIT;
    }
    quad
}

/// A 2-D point with an opaque 64-bit payload.
///
/// This is the unit the index stores and yields. Its packed serialised form
/// is 24 bytes: payload, x, y, in host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    /// Opaque payload carried alongside the coordinates
    pub payload: u64,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl IndexedPoint {
    /// Create a new indexed point.
    pub fn new(payload: u64, x: f64, y: f64) -> Self {
        Self { payload, x, y }
    }

    /// Create an indexed point from a `geo::Point`.
    pub fn from_point(payload: u64, point: Point) -> Self {
        Self::new(payload, point.x(), point.y())
    }

    /// The coordinates as a `geo::Point`.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exact coordinate equality, payloads ignored.
    pub(crate) fn same_coords(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// A 2-D axis-aligned bounding box.
///
/// A thin wrapper around `geo::Rect`. Containment is closed on both sides
/// in both axes. Construction normalises the corners so that
/// `min <= max` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// The underlying geometric rectangle
    pub rect: Rect,
}

impl BoundingBox {
    /// Create a new bounding box from minimum and maximum coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
        }
    }

    /// Create a bounding box from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self { rect }
    }

    /// Get the minimum x coordinate.
    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    /// Get the minimum y coordinate.
    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    /// Get the maximum x coordinate.
    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    /// Get the maximum y coordinate.
    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Get the width of the bounding box.
    pub fn width(&self) -> f64 {
        self.max_x() - self.min_x()
    }

    /// Get the height of the bounding box.
    pub fn height(&self) -> f64 {
        self.max_y() - self.min_y()
    }

    /// Get the center point of the bounding box.
    pub fn center(&self) -> Point {
        let (x, y) = self.midpoint();
        Point::new(x, y)
    }

    /// Dividing midpoint used when splitting into quadrants.
    ///
    /// Computed as `min + (max - min) / 2` per axis. Build and query both
    /// derive child rectangles through this one function, carrying the
    /// result down the descent path instead of recomputing it from the
    /// root, so a boundary point classifies identically in both phases.
    pub(crate) fn midpoint(&self) -> (f64, f64) {
        (
            self.min_x() + (self.max_x() - self.min_x()) / 2.0,
            self.min_y() + (self.max_y() - self.min_y()) / 2.0,
        )
    }

    /// Check if a coordinate pair is contained within this bounding box.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        x >= self.min_x() && x <= self.max_x() && y >= self.min_y() && y <= self.max_y()
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains_point(&self, point: &Point) -> bool {
        self.contains_xy(point.x(), point.y())
    }

    /// Check if `other` lies entirely within this bounding box.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.min_x() >= self.min_x()
            && other.min_y() >= self.min_y()
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Check if this bounding box intersects with another.
    ///
    /// Boxes sharing only an edge or a corner count as intersecting.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x() <= other.max_x()
            && self.min_y() <= other.max_y()
            && self.max_x() >= other.min_x()
            && self.max_y() >= other.min_y()
    }

    /// Split into the four child quadrants, indexed by [`NW`], [`NE`],
    /// [`SW`], [`SE`].
    pub fn split_quadrants(&self) -> [BoundingBox; QUAD_COUNT] {
        let (div_x, div_y) = self.midpoint();
        [
            Self::new(self.min_x(), div_y, div_x, self.max_y()),
            Self::new(div_x, div_y, self.max_x(), self.max_y()),
            Self::new(self.min_x(), self.min_y(), div_x, div_y),
            Self::new(div_x, self.min_y(), self.max_x(), div_y),
        ]
    }
}

/// Structural statistics of a tree, shared by the builder and the
/// finalised form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Number of indexed points
    pub len: u64,
    /// Deepest node count observed on any insertion descent
    pub max_depth: u32,
    /// Number of inner nodes
    pub inner_count: u64,
    /// Number of leaf nodes
    pub leaf_count: u64,
}
