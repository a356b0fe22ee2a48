// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pairwise overlap enumeration shared by the backends.
//!
//! Within a small candidate set (a quadtree node or a grid cell), candidates are sorted by
//! their left edge and swept: for each reference box we walk forward only while the next
//! candidate starts at or before the reference's right edge. Every survivor then gets the exact
//! AABB test from [`crate::bounds::intersects`].

use alloc::vec::Vec;

use kurbo::Rect;

use crate::bounds::intersects;

/// Sweep `items` for overlapping pairs, calling `emit` once per overlapping pair.
///
/// `items` is reordered (stably sorted by left edge). Pairs are emitted as
/// `(earlier, later)` in that order, so a pair appears exactly once per call.
pub fn sweep_pairs<K: Copy>(items: &mut [(K, Rect)], mut emit: impl FnMut(K, K)) {
    if items.len() < 2 {
        return;
    }
    items.sort_by(|a, b| a.1.x0.total_cmp(&b.1.x0));
    for (i, &(ka, ra)) in items.iter().enumerate() {
        for &(kb, rb) in &items[i + 1..] {
            if rb.x0 > ra.x1 {
                break;
            }
            if intersects(&ra, &rb) {
                emit(ka, kb);
            }
        }
    }
}

/// Order a pair so the lower key comes first.
#[inline]
pub fn canonical_pair<K: Ord>(a: K, b: K) -> (K, K) {
    if b < a { (b, a) } else { (a, b) }
}

/// Canonicalize every pair, then sort and remove duplicates.
///
/// Backends only agree on the *set* of colliding pairs, not on order or orientation; this
/// puts any backend's output into a comparable normal form.
pub fn normalize_pairs<K: Ord + Copy>(pairs: &mut Vec<(K, K)>) {
    for p in pairs.iter_mut() {
        *p = canonical_pair(p.0, p.1);
    }
    pairs.sort_unstable();
    pairs.dedup();
}
