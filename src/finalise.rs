//! Packing of a built tree into its contiguous finalised form.
//!
//! The finalised buffer is header, then all inner records, then all leaf
//! records, emitted in one depth-first pre-order pass. Child slots store
//! byte displacements from the inner-region base; a displacement resolves
//! to a leaf exactly when it reaches past the last inner record, which is
//! how the query layer tells node kinds apart without a tag.
//!
//! All integers and floats are written in host byte order. The buffer is a
//! memory dump, not an interchange format; it only loads on hosts with the
//! same integer, float, and byte-order representation.

use crate::build::{QuadTreeBuilder, TransNode};
use crate::types::{IndexedPoint, QUAD_COUNT};
use bytes::Bytes;

/// Packed header size in bytes.
pub const HEADER_SIZE: usize = 64;
/// Packed inner record size: four u64 child displacements (NW, NE, SW, SE).
pub const INNER_SIZE: usize = 32;
/// Leaf record header size: the u64 point count.
pub const LEAF_HEADER_SIZE: usize = 8;
/// Packed point record size: u64 payload plus two f64 coordinates.
pub const POINT_SIZE: usize = 24;

/// Child displacement sentinel meaning "no child". Unambiguous because the
/// root inner record sits at displacement 0 and is never anyone's child.
pub const NO_CHILD: u64 = 0;

// Header field offsets.
pub(crate) const H_SW_X: usize = 0;
pub(crate) const H_SW_Y: usize = 8;
pub(crate) const H_NE_X: usize = 16;
pub(crate) const H_NE_Y: usize = 24;
pub(crate) const H_LEN: usize = 32;
pub(crate) const H_MAX_DEPTH: usize = 40;
// 4 bytes of zero padding at 44
pub(crate) const H_INNER_COUNT: usize = 48;
pub(crate) const H_LEAF_COUNT: usize = 56;

/// Exact byte size of the finalised buffer for the given counts.
pub fn mem_size(len: u64, inner_count: u64, leaf_count: u64) -> usize {
    HEADER_SIZE
        + inner_count as usize * INNER_SIZE
        + leaf_count as usize * LEAF_HEADER_SIZE
        + len as usize * POINT_SIZE
}

pub(crate) fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

pub(crate) fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
}

pub(crate) fn put_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
}

/// Write cursors for the single packing pass. Both only ever move forward:
/// `next_inner` one record at a time, `next_leaf` by each leaf's full
/// length, so no fix-up pass is needed.
struct PackState {
    buf: Vec<u8>,
    next_inner: usize,
    next_leaf: usize,
}

/// Pack a built tree into its finalised buffer, consuming the builder and
/// every transient node.
pub(crate) fn pack(builder: QuadTreeBuilder) -> Bytes {
    let counts = builder.counts;
    let total = mem_size(builder.len, counts.inner_count, counts.leaf_count);
    let mut buf = vec![0u8; total];

    let region = builder.region;
    put_f64(&mut buf, H_SW_X, region.min_x());
    put_f64(&mut buf, H_SW_Y, region.min_y());
    put_f64(&mut buf, H_NE_X, region.max_x());
    put_f64(&mut buf, H_NE_Y, region.max_y());
    put_u64(&mut buf, H_LEN, builder.len);
    put_u32(&mut buf, H_MAX_DEPTH, counts.max_depth);
    put_u64(&mut buf, H_INNER_COUNT, counts.inner_count);
    put_u64(&mut buf, H_LEAF_COUNT, counts.leaf_count);

    let leafs_base = HEADER_SIZE + counts.inner_count as usize * INNER_SIZE;
    let mut state = PackState {
        buf,
        next_inner: HEADER_SIZE,
        next_leaf: leafs_base,
    };
    pack_node(&mut state, builder.root);

    debug_assert_eq!(state.next_inner, leafs_base);
    debug_assert_eq!(state.next_leaf, total);

    log::debug!(
        "finalised quadtree: {} points, {} inner, {} leaf, {} bytes",
        builder.len,
        counts.inner_count,
        counts.leaf_count,
        total
    );

    Bytes::from(state.buf)
}

fn pack_node(state: &mut PackState, node: TransNode) {
    match node {
        TransNode::Inner { children } => pack_inner(state, children),
        TransNode::Leaf { items, .. } => pack_leaf(state, &items),
    }
}

fn pack_inner(state: &mut PackState, children: [Option<Box<TransNode>>; QUAD_COUNT]) {
    let record = state.next_inner;
    state.next_inner += INNER_SIZE;

    for (slot, child) in children.into_iter().enumerate() {
        let Some(child) = child else {
            put_u64(&mut state.buf, record + slot * 8, NO_CHILD);
            continue;
        };

        // The child's destination is known before descending into it: the
        // next free inner slot, or the next free leaf slot.
        let dest = if child.is_inner() {
            state.next_inner
        } else {
            state.next_leaf
        };
        put_u64(&mut state.buf, record + slot * 8, (dest - HEADER_SIZE) as u64);

        pack_node(state, *child);
    }
}

fn pack_leaf(state: &mut PackState, items: &[IndexedPoint]) {
    let record = state.next_leaf;
    state.next_leaf += LEAF_HEADER_SIZE + items.len() * POINT_SIZE;

    put_u64(&mut state.buf, record, items.len() as u64);
    let mut offset = record + LEAF_HEADER_SIZE;
    for item in items {
        put_u64(&mut state.buf, offset, item.payload);
        put_f64(&mut state.buf, offset + 8, item.x);
        put_f64(&mut state.buf, offset + 16, item.y);
        offset += POINT_SIZE;
    }
}
