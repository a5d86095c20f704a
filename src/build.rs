//! Build-phase tree: accepts points one at a time, then finalises.
//!
//! The builder owns a tree of transient nodes that exists only between
//! [`QuadTreeBuilder::new`] and finalisation. Buckets split on overflow
//! unless every point in them shares one coordinate pair, in which case the
//! bucket capacity doubles instead.

use crate::error::{QuadError, Result};
use crate::finalise;
use crate::tree::QuadTree;
use crate::types::{BoundingBox, IndexedPoint, QUAD_COUNT, TreeStats, child_index};
use std::path::Path;

/// A node of the build-phase tree.
///
/// Leaves keep an explicit `cap` next to the item vector: `cap` starts at
/// `maxfill` and doubles only for buckets of coordinate-identical points,
/// which is the single way a leaf may exceed `maxfill`.
pub(crate) enum TransNode {
    Inner {
        children: [Option<Box<TransNode>>; QUAD_COUNT],
    },
    Leaf {
        items: Vec<IndexedPoint>,
        cap: usize,
    },
}

impl TransNode {
    fn empty_inner() -> Self {
        TransNode::Inner {
            children: Default::default(),
        }
    }

    fn empty_leaf(cap: usize) -> Self {
        TransNode::Leaf {
            items: Vec::with_capacity(cap),
            cap,
        }
    }

    pub(crate) fn is_inner(&self) -> bool {
        matches!(self, TransNode::Inner { .. })
    }
}

/// Node and depth counters maintained during the build.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeCounts {
    pub(crate) max_depth: u32,
    pub(crate) inner_count: u64,
    pub(crate) leaf_count: u64,
}

/// Mutable build-phase quadtree.
///
/// Accepts insertions within a fixed bounding region, then converts into an
/// immutable [`QuadTree`] through [`finalise`](Self::finalise). The builder
/// is single-threaded; share the finalised tree instead.
///
/// # Example
///
/// ```rust
/// use quadpack::{BoundingBox, IndexedPoint, QuadTreeBuilder};
///
/// let mut builder = QuadTreeBuilder::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 8)?;
/// builder.insert(IndexedPoint::new(1, 0.25, 0.75))?;
/// let tree = builder.finalise();
/// assert_eq!(tree.len(), 1);
/// # Ok::<(), quadpack::QuadError>(())
/// ```
pub struct QuadTreeBuilder {
    pub(crate) root: TransNode,
    pub(crate) region: BoundingBox,
    pub(crate) maxfill: u32,
    pub(crate) len: u64,
    pub(crate) counts: NodeCounts,
}

impl QuadTreeBuilder {
    /// Create a builder for points inside `region` with buckets of at most
    /// `maxfill` points.
    ///
    /// # Errors
    ///
    /// [`QuadError::InvalidRegion`] if the region has zero width or height,
    /// or `maxfill` is zero.
    pub fn new(region: BoundingBox, maxfill: u32) -> Result<Self> {
        if region.width() <= 0.0 || region.height() <= 0.0 || maxfill == 0 {
            return Err(QuadError::InvalidRegion);
        }

        Ok(Self {
            root: TransNode::empty_inner(),
            region,
            maxfill,
            len: 0,
            counts: NodeCounts {
                max_depth: 0,
                inner_count: 1,
                leaf_count: 0,
            },
        })
    }

    /// Insert a point, copying it into the tree.
    ///
    /// # Errors
    ///
    /// [`QuadError::OutOfRegion`] if the point lies outside the bounding
    /// region supplied at construction.
    pub fn insert(&mut self, point: IndexedPoint) -> Result<()> {
        if !self.region.contains_xy(point.x, point.y) {
            return Err(QuadError::OutOfRegion {
                x: point.x,
                y: point.y,
            });
        }

        self.len += 1;
        insert_into(
            &mut self.root,
            point,
            self.region,
            0,
            self.maxfill,
            &mut self.counts,
        );
        Ok(())
    }

    /// The bounding region supplied at construction.
    pub fn region(&self) -> BoundingBox {
        self.region
    }

    /// Number of points inserted so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check whether no points have been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Structural statistics of the tree built so far.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            len: self.len,
            max_depth: self.counts.max_depth,
            inner_count: self.counts.inner_count,
            leaf_count: self.counts.leaf_count,
        }
    }

    /// Convert into the immutable packed form, consuming the builder.
    pub fn finalise(self) -> QuadTree {
        QuadTree::from_bytes(finalise::pack(self))
    }

    /// Convert into the immutable packed form and write it to `path`.
    ///
    /// # Errors
    ///
    /// [`QuadError::Io`] if the blob cannot be written.
    pub fn finalise_to<P: AsRef<Path>>(self, path: P) -> Result<QuadTree> {
        let tree = self.finalise();
        tree.save(path)?;
        Ok(tree)
    }
}

/// Descend from `node` and place `point`, splitting or growing buckets as
/// needed. `quadrant` is the rectangle covered by `node`; `depth` is the
/// node count above it on this descent path.
fn insert_into(
    node: &mut TransNode,
    point: IndexedPoint,
    quadrant: BoundingBox,
    depth: u32,
    maxfill: u32,
    counts: &mut NodeCounts,
) {
    let depth = depth + 1;
    if depth > counts.max_depth {
        counts.max_depth = depth;
    }

    loop {
        match &mut *node {
            TransNode::Inner { children } => {
                let (div_x, div_y) = quadrant.midpoint();
                let quad = child_index(div_x, div_y, point.x, point.y);
                let child_region = quadrant.split_quadrants()[quad];

                let child = children[quad].get_or_insert_with(|| {
                    counts.leaf_count += 1;
                    Box::new(TransNode::empty_leaf(maxfill as usize))
                });

                return insert_into(child, point, child_region, depth, maxfill, counts);
            }
            TransNode::Leaf { items, cap } => {
                if items.len() < *cap {
                    items.push(point);
                    return;
                }
                if !distinct_coords_exist(items) {
                    // Coincident points cannot be divided into quadrants;
                    // grow the bucket instead.
                    *cap *= 2;
                    items.reserve_exact(*cap - items.len());
                    items.push(point);
                    return;
                }
            }
        }

        // Full bucket with at least two distinct coordinate pairs: convert
        // it to an inner node in place and retry this point against it.
        split_leaf(node, quadrant, depth, maxfill, counts);
    }
}

/// Replace a full leaf with an inner node and redistribute its points.
///
/// Redistribution reuses the same rectangle and depth the leaf occupied, so
/// the new children partition exactly the region the points were headed
/// into during a normal descent.
fn split_leaf(
    node: &mut TransNode,
    quadrant: BoundingBox,
    depth: u32,
    maxfill: u32,
    counts: &mut NodeCounts,
) {
    let TransNode::Leaf { items, .. } = std::mem::replace(node, TransNode::empty_inner()) else {
        unreachable!("split target must be a leaf");
    };

    counts.inner_count += 1;
    counts.leaf_count -= 1;

    for item in items {
        insert_into(node, item, quadrant, depth - 1, maxfill, counts);
    }
}

/// True iff any two points in the bucket differ in coordinates.
///
/// Adjacent comparison suffices: a bucket is coincident exactly when every
/// consecutive pair matches.
fn distinct_coords_exist(items: &[IndexedPoint]) -> bool {
    items.windows(2).any(|pair| !pair[0].same_coords(&pair[1]))
}
