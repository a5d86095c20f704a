//! Immutable finalised quadtree backed by one contiguous buffer.
//!
//! A [`QuadTree`] is nothing but a [`Bytes`] buffer in the layout the
//! finaliser emits; every accessor is a fixed-offset read. Loading a saved
//! tree is a raw copy of the file, no parsing. Cloning a tree is cheap and
//! concurrent readers of one buffer are safe: queries never mutate shared
//! state.

use crate::error::{QuadError, Result};
use crate::finalise::{
    H_INNER_COUNT, H_LEAF_COUNT, H_LEN, H_MAX_DEPTH, H_NE_X, H_NE_Y, H_SW_X, H_SW_Y, HEADER_SIZE,
    INNER_SIZE, LEAF_HEADER_SIZE, POINT_SIZE, mem_size,
};
use crate::persist;
use crate::query::{self, QueryIter};
use crate::types::{BoundingBox, IndexedPoint, TreeStats};
use bytes::Bytes;
use std::path::Path;

/// An immutable, packed point quadtree.
///
/// Produced by [`QuadTreeBuilder::finalise`](crate::QuadTreeBuilder::finalise)
/// or [`QuadTree::load`]. Supports range queries over axis-aligned
/// rectangles; results come through a cursor ([`query`](Self::query)) or
/// collected vectors ([`query_array`](Self::query_array),
/// [`query_array_fast`](Self::query_array_fast)).
#[derive(Debug, Clone)]
pub struct QuadTree {
    buf: Bytes,
}

impl QuadTree {
    pub(crate) fn from_bytes(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Load a finalised tree previously written by
    /// [`save`](Self::save) or
    /// [`finalise_to`](crate::QuadTreeBuilder::finalise_to).
    ///
    /// The file is read back verbatim; internal offsets are trusted. Only
    /// the byte length is checked against the header counts.
    ///
    /// # Errors
    ///
    /// [`QuadError::Io`] when the file cannot be read,
    /// [`QuadError::InvalidFormat`] when its length cannot be a finalised
    /// tree.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let buf = persist::read_blob(path)?;
        if buf.len() < HEADER_SIZE {
            log::warn!(
                "Rejecting {}: {} bytes is shorter than a header",
                path.display(),
                buf.len()
            );
            return Err(QuadError::InvalidFormat);
        }

        let tree = Self { buf };
        let expected = mem_size(tree.len(), tree.inner_count(), tree.leaf_count());
        if tree.buf.len() != expected {
            log::warn!(
                "Rejecting {}: {} bytes where the header counts require {}",
                path.display(),
                tree.buf.len(),
                expected
            );
            return Err(QuadError::InvalidFormat);
        }

        log::debug!(
            "loaded quadtree from {}: {} points, {} bytes",
            path.display(),
            tree.len(),
            tree.mem_size()
        );
        Ok(tree)
    }

    /// Write the tree to `path` as one blob.
    ///
    /// # Errors
    ///
    /// [`QuadError::Io`] when the file cannot be created or written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persist::write_blob(path.as_ref(), &self.buf)
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[offset..offset + 4]);
        u32::from_ne_bytes(bytes)
    }

    fn read_u64(&self, offset: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buf[offset..offset + 8]);
        u64::from_ne_bytes(bytes)
    }

    fn read_f64(&self, offset: usize) -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buf[offset..offset + 8]);
        f64::from_ne_bytes(bytes)
    }

    /// The bounding region all indexed points lie in.
    pub fn region(&self) -> BoundingBox {
        BoundingBox::new(
            self.read_f64(H_SW_X),
            self.read_f64(H_SW_Y),
            self.read_f64(H_NE_X),
            self.read_f64(H_NE_Y),
        )
    }

    /// Number of indexed points.
    pub fn len(&self) -> u64 {
        self.read_u64(H_LEN)
    }

    /// Check whether the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest node count observed on any insertion descent; queries size
    /// their stack from this.
    pub fn max_depth(&self) -> u32 {
        self.read_u32(H_MAX_DEPTH)
    }

    /// Number of inner records.
    pub fn inner_count(&self) -> u64 {
        self.read_u64(H_INNER_COUNT)
    }

    /// Number of leaf records.
    pub fn leaf_count(&self) -> u64 {
        self.read_u64(H_LEAF_COUNT)
    }

    /// Total buffer size in bytes.
    pub fn mem_size(&self) -> usize {
        self.buf.len()
    }

    /// The raw finalised buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Structural statistics.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            len: self.len(),
            max_depth: self.max_depth(),
            inner_count: self.inner_count(),
            leaf_count: self.leaf_count(),
        }
    }

    /// First displacement past the inner region; displacements at or past
    /// it are leaves.
    pub(crate) fn leafs_base(&self) -> u64 {
        self.inner_count() * INNER_SIZE as u64
    }

    /// Classify a child displacement as leaf or inner.
    pub(crate) fn is_leaf_node(&self, node: u64) -> bool {
        node >= self.leafs_base()
    }

    /// Child displacement stored in slot `quad` of the inner record at
    /// `inner`, or [`NO_CHILD`](crate::finalise::NO_CHILD).
    pub(crate) fn child_of(&self, inner: u64, quad: usize) -> u64 {
        self.read_u64(HEADER_SIZE + inner as usize + quad * 8)
    }

    /// Point count of the leaf record at `leaf`.
    pub(crate) fn leaf_len(&self, leaf: u64) -> u64 {
        self.read_u64(HEADER_SIZE + leaf as usize)
    }

    /// Read point `index` of the leaf record at `leaf`.
    pub(crate) fn leaf_point(&self, leaf: u64, index: u64) -> IndexedPoint {
        let offset = HEADER_SIZE + leaf as usize + LEAF_HEADER_SIZE + index as usize * POINT_SIZE;
        IndexedPoint::new(
            self.read_u64(offset),
            self.read_f64(offset + 8),
            self.read_f64(offset + 16),
        )
    }

    /// Iterate over the points inside `region`.
    ///
    /// Points are yielded once each, in depth-first order of their leaves
    /// and insertion order within a leaf.
    pub fn query(&self, region: &BoundingBox) -> QueryIter<'_> {
        QueryIter::new(self, *region)
    }

    /// Collect the points inside `region` by draining the cursor point by
    /// point. `maxn == 0` means unlimited; otherwise at most `maxn` points
    /// are returned.
    pub fn query_array(&self, region: &BoundingBox, maxn: u64) -> Vec<IndexedPoint> {
        query::collect(self, region, maxn)
    }

    /// Collect the points inside `region` working a leaf at a time: a leaf
    /// whose rectangle is fully enclosed by `region` is appended wholesale,
    /// without per-point tests. Same results as
    /// [`query_array`](Self::query_array).
    pub fn query_array_fast(&self, region: &BoundingBox, maxn: u64) -> Vec<IndexedPoint> {
        query::collect_fast(self, region, maxn)
    }
}
