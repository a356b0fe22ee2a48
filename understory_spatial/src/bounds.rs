// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! AABB predicates over [`kurbo::Rect`] and [`kurbo::Point`].
//!
//! All predicates treat rectangles as closed intervals: two boxes that share only an edge
//! intersect, and a point lying on an edge is contained. Both backends and the collision sweep
//! use these helpers so their answers agree exactly.

use kurbo::{Point, Rect};

/// Whether two AABBs overlap (closed intervals; touching edges count).
#[inline]
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    !(a.x0 > b.x1 || a.x1 < b.x0 || a.y0 > b.y1 || a.y1 < b.y0)
}

/// Whether `point` lies inside `rect`, edges included.
#[inline]
pub fn contains_point(rect: &Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Whether `inner` lies entirely inside `outer`, edges included.
#[inline]
pub fn contains_rect(outer: &Rect, inner: &Rect) -> bool {
    inner.x0 >= outer.x0 && inner.x1 <= outer.x1 && inner.y0 >= outer.y0 && inner.y1 <= outer.y1
}

/// Whether `rect` can be stored in an index: finite and not inverted.
///
/// Zero-area boxes are allowed; they behave like points or segments.
#[inline]
pub fn is_valid_bounds(rect: &Rect) -> bool {
    is_finite(rect) && rect.x1 >= rect.x0 && rect.y1 >= rect.y0
}

/// Whether `rect` is usable as a query region: finite with positive width and height.
///
/// Queries with an empty region return no results.
#[inline]
pub fn is_queryable(rect: &Rect) -> bool {
    is_finite(rect) && rect.x1 > rect.x0 && rect.y1 > rect.y0
}

#[inline]
fn is_finite(rect: &Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}
