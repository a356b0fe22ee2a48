// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadtree backend: recursive subdivision of a fixed world extent.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::backend::{ObjectKey, SpatialIndex};
use crate::bounds::{contains_point, contains_rect, intersects, is_queryable, is_valid_bounds};
use crate::collisions::sweep_pairs;

/// Default number of objects a node holds before it splits.
pub const MAX_OBJECTS: usize = 10;

/// Default depth limit; every node has `level < MAX_LEVELS`.
pub const MAX_LEVELS: usize = 5;

/// Quadtree over a fixed world extent.
///
/// Nodes split lazily once they hold more than `max_objects` entries. An object is pushed down
/// into the single quadrant that fully contains it; objects straddling a midline stay at the
/// node where they straddle (touching a midline counts) and are never duplicated.
///
/// Objects not fully inside the world extent are kept in a root-level overflow list that is
/// checked on every query, since node bounds cannot prune them. Objects entirely outside the
/// world are ignored unless [`keep_outside`](Self::keep_outside) is set.
///
/// Removal never merges nodes; use [`SpatialIndex::rebuild`] to compact after heavy churn.
pub struct QuadTree<K: ObjectKey> {
    world_bounds: Rect,
    max_objects: usize,
    max_levels: usize,
    keep_outside: bool,
    root: QuadNode<K>,
    outside: Vec<(K, Rect)>,
    tracked: HashMap<K, Rect>,
}

struct QuadNode<K> {
    bounds: Rect,
    level: usize,
    objects: Vec<(K, Rect)>,
    children: Option<Box<[QuadNode<K>; 4]>>,
}

/// Index of the child quadrant of `node` that fully contains `bounds`, if any.
///
/// Quadrants are ordered top-left, top-right, bottom-left, bottom-right. The midline tests are
/// strict: a box touching a midline stays at the parent, so objects in sibling subtrees can
/// never touch each other.
fn quadrant_for(node: &Rect, bounds: &Rect) -> Option<usize> {
    let mid = node.center();
    let top = bounds.y1 < mid.y;
    let bottom = bounds.y0 > mid.y;
    let left = bounds.x1 < mid.x;
    let right = bounds.x0 > mid.x;
    match (top, bottom, left, right) {
        (true, _, true, _) => Some(0),
        (true, _, _, true) => Some(1),
        (_, true, true, _) => Some(2),
        (_, true, _, true) => Some(3),
        _ => None,
    }
}

impl<K: Copy + PartialEq> QuadNode<K> {
    fn new(bounds: Rect, level: usize) -> Self {
        Self {
            bounds,
            level,
            objects: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, key: K, bounds: Rect, max_objects: usize, max_levels: usize) {
        if let Some(children) = self.children.as_mut()
            && let Some(q) = quadrant_for(&self.bounds, &bounds)
        {
            children[q].insert(key, bounds, max_objects, max_levels);
            return;
        }
        self.objects.push((key, bounds));
        if self.objects.len() > max_objects
            && self.level + 1 < max_levels
            && self.children.is_none()
        {
            self.split(max_objects, max_levels);
        }
    }

    fn split(&mut self, max_objects: usize, max_levels: usize) {
        let Rect { x0, y0, x1, y1 } = self.bounds;
        let mid = self.bounds.center();
        let level = self.level + 1;
        log::trace!("quadtree split at level {} over {:?}", self.level, self.bounds);
        self.children = Some(Box::new([
            Self::new(Rect::new(x0, y0, mid.x, mid.y), level),
            Self::new(Rect::new(mid.x, y0, x1, mid.y), level),
            Self::new(Rect::new(x0, mid.y, mid.x, y1), level),
            Self::new(Rect::new(mid.x, mid.y, x1, y1), level),
        ]));
        let objects = core::mem::take(&mut self.objects);
        for (key, bounds) in objects {
            self.insert(key, bounds, max_objects, max_levels);
        }
    }

    /// Depth-first removal of the first entry for `key`.
    fn remove(&mut self, key: K) -> bool {
        if let Some(pos) = self.objects.iter().position(|(k, _)| *k == key) {
            self.objects.remove(pos);
            return true;
        }
        match self.children.as_mut() {
            Some(children) => children.iter_mut().any(|child| child.remove(key)),
            None => false,
        }
    }

    fn query_rect(&self, area: &Rect, out: &mut Vec<K>) {
        if !intersects(&self.bounds, area) {
            return;
        }
        out.extend(
            self.objects
                .iter()
                .filter(|(_, b)| intersects(b, area))
                .map(|(k, _)| *k),
        );
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_rect(area, out);
            }
        }
    }

    fn query_point(&self, point: Point, out: &mut Vec<K>) {
        if !contains_point(&self.bounds, point) {
            return;
        }
        out.extend(
            self.objects
                .iter()
                .filter(|(_, b)| contains_point(b, point))
                .map(|(k, _)| *k),
        );
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_point(point, out);
            }
        }
    }

    /// Report overlaps against ancestors and within this node, then descend.
    ///
    /// `ancestors` holds the objects of every node on the path from the root; it is restored
    /// before returning so sibling subtrees never see each other's objects.
    fn collect_collisions(
        &self,
        ancestors: &mut Vec<(K, Rect)>,
        scratch: &mut Vec<(K, Rect)>,
        out: &mut Vec<(K, K)>,
    ) {
        for (key, bounds) in &self.objects {
            for (ancestor, ancestor_bounds) in ancestors.iter() {
                if intersects(bounds, ancestor_bounds) {
                    out.push((*ancestor, *key));
                }
            }
        }

        scratch.clear();
        scratch.extend_from_slice(&self.objects);
        sweep_pairs(scratch, |a, b| out.push((a, b)));

        if let Some(children) = self.children.as_ref() {
            let restore = ancestors.len();
            ancestors.extend_from_slice(&self.objects);
            for child in children.iter() {
                child.collect_collisions(ancestors, scratch, out);
            }
            ancestors.truncate(restore);
        }
    }

    fn collect_entries(&self, out: &mut Vec<(K, Rect)>) {
        out.extend_from_slice(&self.objects);
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_entries(out);
            }
        }
    }

    fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(Self::node_count).sum())
    }

    fn depth(&self) -> usize {
        self.children
            .as_ref()
            .map_or(self.level, |c| c.iter().map(Self::depth).max().unwrap_or(self.level))
    }
}

impl<K: ObjectKey> QuadTree<K> {
    /// Create an empty quadtree over `world_bounds` with the default limits
    /// ([`MAX_OBJECTS`], [`MAX_LEVELS`]).
    pub fn new(world_bounds: Rect) -> Self {
        Self::with_limits(world_bounds, MAX_OBJECTS, MAX_LEVELS)
    }

    /// Create an empty quadtree with explicit split limits.
    ///
    /// `max_levels` is clamped to at least 1 (a root-only tree).
    pub fn with_limits(world_bounds: Rect, max_objects: usize, max_levels: usize) -> Self {
        Self {
            world_bounds,
            max_objects,
            max_levels: max_levels.max(1),
            keep_outside: false,
            root: QuadNode::new(world_bounds, 0),
            outside: Vec::new(),
            tracked: HashMap::new(),
        }
    }

    /// Also track objects that lie entirely outside the world extent.
    ///
    /// They go to the overflow list with the other objects that stick out of the world, so
    /// the tree holds the same contents as an unbounded index.
    pub fn keep_outside(mut self, keep: bool) -> Self {
        self.keep_outside = keep;
        self
    }

    /// Whether objects entirely outside the world extent are tracked.
    pub fn keeps_outside(&self) -> bool {
        self.keep_outside
    }

    /// Number of objects held in the overflow list because they are not inside the world.
    pub fn outside_len(&self) -> usize {
        self.outside.len()
    }

    /// The root extent.
    pub fn world_bounds(&self) -> Rect {
        self.world_bounds
    }

    /// Objects a node holds before splitting.
    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    /// Depth limit for nodes.
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Number of allocated nodes, root included.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Level of the deepest node (0 for a root-only tree).
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

impl<K: ObjectKey> SpatialIndex<K> for QuadTree<K> {
    fn insert(&mut self, key: K, bounds: Rect) {
        if self.tracked.contains_key(&key) {
            self.remove(key);
        }
        if !is_valid_bounds(&bounds) {
            return;
        }
        if contains_rect(&self.world_bounds, &bounds) {
            self.root.insert(key, bounds, self.max_objects, self.max_levels);
        } else if self.keep_outside || intersects(&self.world_bounds, &bounds) {
            self.outside.push((key, bounds));
        } else {
            return;
        }
        self.tracked.insert(key, bounds);
    }

    fn remove(&mut self, key: K) {
        if self.tracked.remove(&key).is_some() {
            if let Some(pos) = self.outside.iter().position(|(k, _)| *k == key) {
                self.outside.swap_remove(pos);
                return;
            }
            let removed = self.root.remove(key);
            debug_assert!(removed, "tracked key missing from quadtree nodes");
        }
    }

    fn update(&mut self, key: K, bounds: Rect) {
        if self.tracked.contains_key(&key) {
            self.remove(key);
            self.insert(key, bounds);
        }
    }

    fn query_rect<'a>(&'a self, area: Rect) -> Box<dyn Iterator<Item = K> + 'a> {
        let mut out = Vec::new();
        if is_queryable(&area) {
            out.extend(
                self.outside
                    .iter()
                    .filter(|(_, b)| intersects(b, &area))
                    .map(|(k, _)| *k),
            );
            self.root.query_rect(&area, &mut out);
        }
        Box::new(out.into_iter())
    }

    fn query_point<'a>(&'a self, point: Point) -> Box<dyn Iterator<Item = K> + 'a> {
        let mut out: Vec<K> = self
            .outside
            .iter()
            .filter(|(_, b)| contains_point(b, point))
            .map(|(k, _)| *k)
            .collect();
        self.root.query_point(point, &mut out);
        Box::new(out.into_iter())
    }

    fn query_collisions(&self) -> Vec<(K, K)> {
        let mut out = Vec::new();
        // Overflow objects act as ancestors of the whole tree.
        let mut scratch = self.outside.clone();
        sweep_pairs(&mut scratch, |a, b| out.push((a, b)));
        let mut ancestors = Vec::with_capacity(self.tracked.len());
        ancestors.extend_from_slice(&self.outside);
        self.root.collect_collisions(&mut ancestors, &mut scratch, &mut out);
        out
    }

    fn clear(&mut self) {
        self.root = QuadNode::new(self.world_bounds, 0);
        self.outside.clear();
        self.tracked.clear();
    }

    fn rebuild(&mut self) {
        let mut all = Vec::with_capacity(self.tracked.len());
        all.extend_from_slice(&self.outside);
        self.root.collect_entries(&mut all);
        log::trace!("quadtree rebuild of {} objects", all.len());
        self.clear();
        for (key, bounds) in all {
            self.insert(key, bounds);
        }
    }

    fn len(&self) -> usize {
        self.tracked.len()
    }

    fn bounds_of(&self, key: K) -> Option<Rect> {
        self.tracked.get(&key).copied()
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (K, Rect)> + 'a> {
        Box::new(self.tracked.iter().map(|(k, b)| (*k, *b)))
    }
}

impl<K: ObjectKey> Debug for QuadTree<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QuadTree")
            .field("world_bounds", &self.world_bounds)
            .field("max_objects", &self.max_objects)
            .field("max_levels", &self.max_levels)
            .field("keep_outside", &self.keep_outside)
            .field("len", &self.tracked.len())
            .field("outside", &self.outside.len())
            .field("nodes", &self.node_count())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collisions::normalize_pairs;
    use alloc::vec;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::from_origin_size((x, y), (w, h))
    }

    fn world() -> Rect {
        rect(0.0, 0.0, 1000.0, 1000.0)
    }

    #[derive(Clone)]
    struct Rng(u64);

    impl Rng {
        fn next_u64(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }
        fn next_f64(&mut self) -> f64 {
            let v = self.next_u64() >> 11;
            (v as f64) / ((1_u64 << 53) as f64)
        }
    }

    fn sorted(it: impl Iterator<Item = u32>) -> Vec<u32> {
        let mut v: Vec<_> = it.collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn overlapping_pair_is_reported_once() {
        let mut qt = QuadTree::new(world());
        qt.insert(1_u32, rect(0.0, 0.0, 10.0, 10.0));
        qt.insert(2, rect(5.0, 5.0, 10.0, 10.0));
        let mut pairs = qt.query_collisions();
        normalize_pairs(&mut pairs);
        assert_eq!(pairs, vec![(1, 2)]);
    }

    #[test]
    fn disjoint_objects_do_not_collide() {
        let mut qt = QuadTree::new(world());
        qt.insert(1_u32, rect(0.0, 0.0, 10.0, 10.0));
        qt.insert(2, rect(100.0, 100.0, 10.0, 10.0));
        assert!(qt.query_collisions().is_empty());
        assert_eq!(sorted(qt.query_rect(rect(0.0, 0.0, 20.0, 20.0))), vec![1]);
    }

    #[test]
    fn insert_outside_world_is_ignored() {
        let mut qt = QuadTree::new(world());
        qt.insert(1_u32, rect(2000.0, 2000.0, 10.0, 10.0));
        assert!(qt.is_empty());
        assert!(!qt.contains(1));
    }

    #[test]
    fn objects_sticking_out_of_world_are_found_from_outside() {
        let mut qt = QuadTree::with_limits(world(), 1, 5);
        qt.insert(1_u32, Rect::new(-50.0, 100.0, 10.0, 110.0));
        qt.insert(2, Rect::new(900.0, 900.0, 910.0, 910.0));
        qt.insert(3, Rect::new(20.0, 20.0, 30.0, 30.0));
        assert_eq!(qt.outside_len(), 1);
        assert_eq!(sorted(qt.query_rect(Rect::new(-40.0, 100.0, -30.0, 110.0))), vec![1]);
        assert_eq!(sorted(qt.query_point(Point::new(-35.0, 105.0))), vec![1]);
        assert_eq!(sorted(qt.query_point(Point::new(5.0, 105.0))), vec![1]);

        // Overflow objects collide with objects anywhere in the tree.
        qt.insert(4, Rect::new(-5.0, 105.0, 25.0, 108.0));
        let mut pairs = qt.query_collisions();
        normalize_pairs(&mut pairs);
        assert_eq!(pairs, vec![(1, 4)]);

        qt.remove(1);
        assert_eq!(qt.outside_len(), 1);
        assert!(qt.query_point(Point::new(-35.0, 105.0)).next().is_none());
        qt.rebuild();
        assert_eq!(qt.len(), 3);
        assert_eq!(qt.outside_len(), 1);
    }

    #[test]
    fn keep_outside_tracks_disjoint_objects() {
        let mut qt = QuadTree::new(world()).keep_outside(true);
        assert!(qt.keeps_outside());
        qt.insert(1_u32, rect(-500.0, -500.0, 10.0, 10.0));
        qt.insert(2, rect(-495.0, -495.0, 10.0, 10.0));
        qt.insert(3, rect(10.0, 10.0, 10.0, 10.0));
        assert_eq!(qt.len(), 3);
        assert_eq!(sorted(qt.query_point(Point::new(-492.0, -492.0))), vec![1, 2]);
        let mut pairs = qt.query_collisions();
        normalize_pairs(&mut pairs);
        assert_eq!(pairs, vec![(1, 2)]);
        qt.update(1, rect(12.0, 12.0, 2.0, 2.0));
        assert_eq!(qt.outside_len(), 1);
        let mut pairs = qt.query_collisions();
        normalize_pairs(&mut pairs);
        assert_eq!(pairs, vec![(1, 3)]);
    }

    #[test]
    fn random_objects_survive_rebuild() {
        let mut qt = QuadTree::with_limits(world(), 4, 5);
        let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
        for i in 0..50_u32 {
            let x = rng.next_f64() * 980.0;
            let y = rng.next_f64() * 980.0;
            let w = 1.0 + rng.next_f64() * 19.0;
            let h = 1.0 + rng.next_f64() * 19.0;
            qt.insert(i, rect(x, y, w, h));
        }
        assert_eq!(qt.len(), 50);
        let area = rect(250.0, 250.0, 500.0, 500.0);
        let before = sorted(qt.query_rect(area));
        let mut pairs_before = qt.query_collisions();
        normalize_pairs(&mut pairs_before);

        qt.rebuild();
        assert_eq!(qt.len(), 50);
        assert_eq!(sorted(qt.query_rect(area)), before);
        let mut pairs_after = qt.query_collisions();
        normalize_pairs(&mut pairs_after);
        assert_eq!(pairs_after, pairs_before);
        assert!(qt.depth() < 5);
    }

    #[test]
    fn splits_push_contained_objects_into_quadrants() {
        let mut qt = QuadTree::with_limits(world(), 2, 5);
        qt.insert(1_u32, rect(10.0, 10.0, 5.0, 5.0));
        qt.insert(2, rect(600.0, 10.0, 5.0, 5.0));
        assert_eq!(qt.node_count(), 1);
        // Third object straddles both midlines and stays at the root.
        qt.insert(3, rect(495.0, 495.0, 10.0, 10.0));
        assert_eq!(qt.node_count(), 5);
        assert_eq!(qt.root.objects.len(), 1);
        assert_eq!(qt.root.objects[0].0, 3);
        assert_eq!(sorted(qt.query_point(Point::new(12.0, 12.0))), vec![1]);
        assert_eq!(sorted(qt.query_point(Point::new(500.0, 500.0))), vec![3]);
    }

    #[test]
    fn depth_never_reaches_limit() {
        let mut qt = QuadTree::with_limits(world(), 1, 3);
        for i in 0..20_u32 {
            let x = f64::from(i);
            qt.insert(i, rect(x, x, 0.5, 0.5));
        }
        assert_eq!(qt.len(), 20);
        assert_eq!(qt.depth(), 2);
        assert_eq!(qt.query_rect(rect(0.0, 0.0, 30.0, 30.0)).count(), 20);
    }

    #[test]
    fn ancestor_and_descendant_overlaps_are_found() {
        let mut qt = QuadTree::with_limits(world(), 1, 5);
        // Straddler at the root overlapping objects in two different quadrants.
        qt.insert(1_u32, rect(400.0, 400.0, 200.0, 200.0));
        qt.insert(2, rect(450.0, 450.0, 10.0, 10.0));
        qt.insert(3, rect(550.0, 550.0, 10.0, 10.0));
        qt.insert(4, rect(10.0, 10.0, 10.0, 10.0));
        let mut pairs = qt.query_collisions();
        let raw = pairs.len();
        normalize_pairs(&mut pairs);
        assert_eq!(pairs, vec![(1, 2), (1, 3)]);
        assert_eq!(raw, pairs.len(), "no duplicates before normalization");
    }

    #[test]
    fn remove_is_idempotent_and_update_moves() {
        let mut qt = QuadTree::new(world());
        qt.insert(1_u32, rect(0.0, 0.0, 10.0, 10.0));
        qt.insert(2, rect(20.0, 20.0, 10.0, 10.0));
        qt.remove(1);
        qt.remove(1);
        assert_eq!(qt.len(), 1);

        qt.update(2, rect(700.0, 700.0, 10.0, 10.0));
        assert_eq!(qt.len(), 1);
        assert_eq!(qt.query_point(Point::new(25.0, 25.0)).count(), 0);
        assert_eq!(sorted(qt.query_point(Point::new(705.0, 705.0))), vec![2]);

        // Updating an untracked key does nothing.
        qt.update(9, rect(0.0, 0.0, 1.0, 1.0));
        assert_eq!(qt.len(), 1);
    }

    #[test]
    fn reinsert_replaces_record() {
        let mut qt = QuadTree::new(world());
        qt.insert(1_u32, rect(0.0, 0.0, 10.0, 10.0));
        qt.insert(1, rect(500.0, 500.0, 10.0, 10.0));
        assert_eq!(qt.len(), 1);
        assert_eq!(qt.bounds_of(1), Some(rect(500.0, 500.0, 10.0, 10.0)));
        assert_eq!(qt.query_rect(world()).count(), 1);
    }

    #[test]
    fn empty_query_rect_returns_nothing() {
        let mut qt = QuadTree::new(world());
        qt.insert(1_u32, rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(qt.query_rect(rect(5.0, 5.0, 0.0, 0.0)).count(), 0);
    }

    #[test]
    fn clear_resets_structure() {
        let mut qt = QuadTree::with_limits(world(), 1, 5);
        for i in 0..8_u32 {
            qt.insert(i, rect(f64::from(i) * 100.0, 10.0, 5.0, 5.0));
        }
        assert!(qt.node_count() > 1);
        qt.clear();
        assert!(qt.is_empty());
        assert_eq!(qt.node_count(), 1);
        assert!(qt.query_collisions().is_empty());
    }
}
