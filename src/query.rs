//! Range queries over a finalised tree.
//!
//! The iterator runs a depth-first descent with a hand-managed stack sized
//! from the tree's recorded maximum depth. Each frame carries the four
//! child rectangles of its node, precomputed on entry so they are derived
//! once per level, and a `within_parent` flag: once a child rectangle is
//! fully enclosed by the query region, every point below it matches and
//! per-point filtering is skipped for the whole subtree.

use crate::finalise::{NO_CHILD, POINT_SIZE};
use crate::tree::QuadTree;
use crate::types::{BoundingBox, IndexedPoint, QUAD_COUNT};
use serde::{Deserialize, Serialize};

/// Starting capacity of the point-by-point collector.
const ARRAY_INITIAL_CAPACITY: usize = 32;
/// Starting capacity of the leaf-granular collector, one page worth of
/// points.
const FAST_INITIAL_CAPACITY: usize = 4096 / POINT_SIZE;

/// Per-query instrumentation counters.
///
/// `within_leaves` counts leaves reached with `within_parent` set, whose
/// points were accepted without per-point tests; `filtered_leaves` counts
/// the rest; `points_tested` counts individual containment tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    /// Leaves whose whole subtree rectangle lay inside the query region
    pub within_leaves: u64,
    /// Leaves whose points went through per-point filtering
    pub filtered_leaves: u64,
    /// Individual point-in-rectangle tests performed
    pub points_tested: u64,
}

/// One level of the descent.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Displacement of the node from the inner-region base
    node: u64,
    /// Child rectangles of this node, derived once on entry
    quadrants: [BoundingBox; QUAD_COUNT],
    /// Next child slot to visit
    quadrant: usize,
    /// Whole subtree already known to lie inside the query region
    within_parent: bool,
}

/// Cursor over the leaf currently being yielded from.
#[derive(Debug, Clone, Copy)]
struct LeafCursor {
    node: u64,
    len: u64,
    within: bool,
}

/// Cursor over the points of a finalised tree inside a query region.
///
/// Created by [`QuadTree::query`]. Yields each matching point exactly
/// once: leaves in depth-first order, points in insertion order within a
/// leaf. The iterator owns its descent stack and borrows the tree.
pub struct QueryIter<'a> {
    tree: &'a QuadTree,
    region: BoundingBox,
    stack: Vec<Frame>,
    leaf: Option<LeafCursor>,
    cur_item: u64,
    stats: QueryStats,
}

impl<'a> QueryIter<'a> {
    pub(crate) fn new(tree: &'a QuadTree, region: BoundingBox) -> Self {
        let mut stack = Vec::with_capacity(tree.max_depth() as usize + 1);
        stack.push(Frame {
            node: 0,
            quadrants: tree.region().split_quadrants(),
            quadrant: 0,
            within_parent: false,
        });

        let mut iter = Self {
            tree,
            region,
            stack,
            leaf: None,
            cur_item: 0,
            stats: QueryStats::default(),
        };
        iter.advance_to_next_leaf();
        iter
    }

    /// Instrumentation counters accumulated so far.
    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    /// Descend until the top of the stack is a leaf overlapping the query
    /// region, or the stack is exhausted.
    fn advance_to_next_leaf(&mut self) {
        while let Some(&Frame {
            node,
            quadrants,
            quadrant,
            within_parent,
        }) = self.stack.last()
        {
            if self.tree.is_leaf_node(node) {
                if within_parent {
                    self.stats.within_leaves += 1;
                } else {
                    self.stats.filtered_leaves += 1;
                }
                self.leaf = Some(LeafCursor {
                    node,
                    len: self.tree.leaf_len(node),
                    within: within_parent,
                });
                self.cur_item = 0;
                return;
            }

            let mut quad = quadrant;
            while quad < QUAD_COUNT {
                if self.tree.child_of(node, quad) != NO_CHILD
                    && self.region.intersects(&quadrants[quad])
                {
                    break;
                }
                quad += 1;
            }

            if quad < QUAD_COUNT {
                let child = self.tree.child_of(node, quad);
                let child_rect = quadrants[quad];
                let within = within_parent || self.region.contains_box(&child_rect);
                if let Some(top) = self.stack.last_mut() {
                    top.quadrant = quad;
                }
                self.stack.push(Frame {
                    node: child,
                    quadrants: child_rect.split_quadrants(),
                    quadrant: 0,
                    within_parent: within,
                });
            } else {
                // Every child slot visited: backtrack one level.
                self.stack.pop();
                if let Some(parent) = self.stack.last_mut() {
                    parent.quadrant += 1;
                }
            }
        }

        self.leaf = None;
    }

    /// Leave the current leaf and move to the next one.
    fn pop_leaf(&mut self) {
        self.stack.pop();
        if let Some(parent) = self.stack.last_mut() {
            parent.quadrant += 1;
        }
        self.advance_to_next_leaf();
    }

    /// Append the current leaf's matching points to `out` in one go.
    fn append_leaf(&mut self, leaf: LeafCursor, out: &mut Vec<IndexedPoint>) {
        let required = out.len() + leaf.len as usize;
        if required > out.capacity() {
            out.reserve(required * 2 - out.len());
        }

        if leaf.within {
            for index in 0..leaf.len {
                out.push(self.tree.leaf_point(leaf.node, index));
            }
        } else {
            for index in 0..leaf.len {
                let point = self.tree.leaf_point(leaf.node, index);
                self.stats.points_tested += 1;
                if self.region.contains_xy(point.x, point.y) {
                    out.push(point);
                }
            }
        }
    }
}

impl Iterator for QueryIter<'_> {
    type Item = IndexedPoint;

    fn next(&mut self) -> Option<IndexedPoint> {
        loop {
            let leaf = self.leaf?;

            while self.cur_item < leaf.len {
                let point = self.tree.leaf_point(leaf.node, self.cur_item);
                self.cur_item += 1;

                if leaf.within {
                    return Some(point);
                }
                self.stats.points_tested += 1;
                if self.region.contains_xy(point.x, point.y) {
                    return Some(point);
                }
            }

            self.pop_leaf();
        }
    }
}

/// Drain a per-point cursor into a vector.
pub(crate) fn collect(tree: &QuadTree, region: &BoundingBox, maxn: u64) -> Vec<IndexedPoint> {
    let mut out = Vec::with_capacity(ARRAY_INITIAL_CAPACITY);
    for point in tree.query(region) {
        if maxn != 0 && out.len() as u64 >= maxn {
            break;
        }
        out.push(point);
    }
    out
}

/// Collect leaf by leaf, appending whole point arrays for enclosed leaves.
pub(crate) fn collect_fast(tree: &QuadTree, region: &BoundingBox, maxn: u64) -> Vec<IndexedPoint> {
    let mut out = Vec::with_capacity(FAST_INITIAL_CAPACITY);
    let mut iter = tree.query(region);

    while let Some(leaf) = iter.leaf {
        if maxn != 0 && out.len() as u64 >= maxn {
            break;
        }
        iter.append_leaf(leaf, &mut out);
        iter.pop_leaf();
    }

    if maxn != 0 && out.len() as u64 > maxn {
        out.truncate(maxn as usize);
    }
    out
}
