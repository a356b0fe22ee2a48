// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The capability set shared by every spatial index backend.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use kurbo::{Point, Rect};

/// Identity of an indexed object.
///
/// Indexes store keys as weak handles to externally owned objects (an entity id, a node
/// handle, a generational key, ...). Keys are only compared and hashed; the index never
/// dereferences them or controls the lifetime of what they name. `Ord` is used to report each
/// colliding pair in a canonical order.
pub trait ObjectKey: Copy + Eq + Ord + Hash + Debug + 'static {}

impl<K> ObjectKey for K where K: Copy + Eq + Ord + Hash + Debug + 'static {}

/// Spatial backend abstraction used by [`SpatialManager`](crate::SpatialManager).
///
/// Every operation is infallible: invalid input and misses (removing or updating an object
/// the index does not track) are silent no-ops. An index holds at most one bounds record per key.
pub trait SpatialIndex<K: ObjectKey>: Debug {
    /// Start tracking `key` with `bounds`, replacing any record it already has.
    fn insert(&mut self, key: K, bounds: Rect);

    /// Stop tracking `key`.
    fn remove(&mut self, key: K);

    /// Move a tracked `key` to `bounds`. Untracked keys are ignored.
    fn update(&mut self, key: K, bounds: Rect);

    /// Keys whose bounds intersect `area`.
    fn query_rect<'a>(&'a self, area: Rect) -> Box<dyn Iterator<Item = K> + 'a>;

    /// Keys whose bounds contain `point`.
    fn query_point<'a>(&'a self, point: Point) -> Box<dyn Iterator<Item = K> + 'a>;

    /// Every unordered pair of keys whose bounds intersect, each reported once.
    fn query_collisions(&self) -> Vec<(K, K)>;

    /// Remove every key.
    fn clear(&mut self);

    /// Rebuild internal structures from the tracked records, compacting after churn.
    fn rebuild(&mut self);

    /// Number of tracked keys.
    fn len(&self) -> usize;

    /// Whether no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bounds most recently registered for `key`.
    fn bounds_of(&self, key: K) -> Option<Rect>;

    /// Whether `key` is tracked.
    fn contains(&self, key: K) -> bool {
        self.bounds_of(key).is_some()
    }

    /// Every tracked `(key, bounds)` record, in no particular order.
    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (K, Rect)> + 'a>;
}
