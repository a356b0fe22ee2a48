// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adaptive front end that owns one active backend and forwards every operation to it.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cell::Cell;
use core::hash::{BuildHasher, Hash};
use core::ops::ControlFlow;
use core::time::Duration;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::backend::{ObjectKey, SpatialIndex};
use crate::backends::{QuadTree, SpatialHash};
use crate::bounds::is_queryable;
use crate::config::{BackendKind, ConfigError, SpatialConfig, SpatialStrategy};

/// Live bounds lookup used when re-registering objects.
///
/// This is the scene graph's view of "where is this object now". Returning `None` means the
/// object is gone and should not be re-registered.
pub trait BoundsSource<K> {
    /// Current bounds of `key`, if it still exists.
    fn bounds(&self, key: K) -> Option<Rect>;
}

impl<K, F> BoundsSource<K> for F
where
    F: Fn(K) -> Option<Rect>,
{
    fn bounds(&self, key: K) -> Option<Rect> {
        self(key)
    }
}

impl<K: Ord> BoundsSource<K> for BTreeMap<K, Rect> {
    fn bounds(&self, key: K) -> Option<Rect> {
        self.get(&key).copied()
    }
}

impl<K: Hash + Eq, S: BuildHasher> BoundsSource<K> for HashMap<K, Rect, S> {
    fn bounds(&self, key: K) -> Option<Rect> {
        self.get(&key).copied()
    }
}

/// Accumulated rectangle-query profiling.
///
/// Every [`SpatialManager::query_rect`] call bumps `query_count`. With the `std` feature the
/// elapsed wall-clock time is also added to `total_query_time`; without it that stays zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Number of rectangle queries served.
    pub query_count: u64,
    /// Total time spent inside those queries.
    pub total_query_time: Duration,
}

impl QueryStats {
    /// Mean time per query, or `None` before the first query.
    pub fn average_query_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.query_count).ok()?;
        self.total_query_time.checked_div(count)
    }
}

/// Owns the active spatial index and decides which backend it is.
///
/// With [`SpatialStrategy::Auto`] the backend is re-resolved from the object count when the
/// manager is created, when thresholds or the policy change, and on [`optimize`](Self::optimize):
/// below `quad_tree_threshold` the quadtree is used, above `hash_threshold` the spatial hash,
/// and in between the current backend is kept so counts near a threshold do not thrash.
///
/// Switching backends drains every record from the old index into a freshly built one; nothing
/// tracked is lost. The manager's quadtree keeps objects outside the world extent in its
/// overflow list, so both backends track the same set of objects.
///
/// The manager is single-threaded: queries take `&self` but record profiling through interior
/// mutability.
pub struct SpatialManager<K: ObjectKey> {
    world_bounds: Rect,
    cell_size: f64,
    strategy: SpatialStrategy,
    active: BackendKind,
    quad_tree_threshold: usize,
    hash_threshold: usize,
    index: Option<Box<dyn SpatialIndex<K>>>,
    stats: Cell<QueryStats>,
}

impl<K: ObjectKey> Default for SpatialManager<K> {
    fn default() -> Self {
        Self::from_parts(SpatialConfig::default())
    }
}

impl<K: ObjectKey> SpatialManager<K> {
    /// Create an `Auto` manager over `world_bounds` with default thresholds and cell size.
    ///
    /// Unusable world bounds fall back to the default extent.
    pub fn new(world_bounds: Rect) -> Self {
        let mut config = SpatialConfig::default();
        if is_queryable(&world_bounds) {
            config.world_bounds = world_bounds;
        }
        Self::from_parts(config)
    }

    /// Create a manager from a validated configuration.
    pub fn from_config(config: SpatialConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: SpatialConfig) -> Self {
        let mut manager = Self {
            world_bounds: config.world_bounds,
            cell_size: config.cell_size,
            strategy: config.strategy,
            active: BackendKind::QuadTree,
            quad_tree_threshold: config.quad_tree_threshold,
            hash_threshold: config.hash_threshold,
            index: None,
            stats: Cell::new(QueryStats::default()),
        };
        manager.active = manager.resolve(0);
        log::debug!(
            "spatial manager created: strategy {:?}, backend {}",
            manager.strategy,
            manager.active.name()
        );
        manager
    }

    /// Build an empty backend of `kind`.
    pub fn create_index(
        kind: BackendKind,
        world_bounds: Rect,
        cell_size: f64,
    ) -> Box<dyn SpatialIndex<K>> {
        log::debug!("creating {} index", kind.name());
        match kind {
            BackendKind::QuadTree => Box::new(QuadTree::new(world_bounds).keep_outside(true)),
            BackendKind::SpatialHash => Box::new(SpatialHash::new(cell_size)),
        }
    }

    /// The backend the current policy selects for `count` objects.
    fn resolve(&self, count: usize) -> BackendKind {
        match self.strategy {
            SpatialStrategy::QuadTree => BackendKind::QuadTree,
            SpatialStrategy::SpatialHash => BackendKind::SpatialHash,
            SpatialStrategy::Auto => {
                if count < self.quad_tree_threshold {
                    BackendKind::QuadTree
                } else if count > self.hash_threshold {
                    BackendKind::SpatialHash
                } else {
                    log::trace!(
                        "{count} objects inside [{}, {}], keeping {}",
                        self.quad_tree_threshold,
                        self.hash_threshold,
                        self.active.name()
                    );
                    self.active
                }
            }
        }
    }

    fn index_mut(&mut self) -> &mut Box<dyn SpatialIndex<K>> {
        let (kind, world_bounds, cell_size) = (self.active, self.world_bounds, self.cell_size);
        self.index.get_or_insert_with(|| Self::create_index(kind, world_bounds, cell_size))
    }

    /// Replace the index with a fresh `kind` backend holding every current record.
    fn reconstruct(&mut self, kind: BackendKind) {
        let old = self.index.take();
        let mut index = Self::create_index(kind, self.world_bounds, self.cell_size);
        if let Some(old) = old {
            log::debug!(
                "migrating {} objects from {} to {}",
                old.len(),
                self.active.name(),
                kind.name()
            );
            for (key, bounds) in old.entries() {
                index.insert(key, bounds);
            }
        }
        self.active = kind;
        self.index = Some(index);
    }

    /// Switch to `kind` if it differs from the active backend. Returns whether anything moved.
    fn migrate(&mut self, kind: BackendKind) -> bool {
        if kind == self.active {
            return false;
        }
        if self.index.is_some() {
            self.reconstruct(kind);
        } else {
            log::debug!("switching to {} before first use", kind.name());
            self.active = kind;
        }
        true
    }

    /// Set the backend selection policy, migrating if the resolved backend changes.
    pub fn set_strategy(&mut self, strategy: SpatialStrategy) {
        if self.strategy == strategy {
            return;
        }
        log::debug!("strategy {:?} -> {:?}", self.strategy, strategy);
        self.strategy = strategy;
        let target = self.resolve(self.len());
        self.migrate(target);
    }

    /// Set the `Auto` thresholds and re-resolve the backend.
    ///
    /// Inverted thresholds (`quad_tree > hash`) are ignored.
    pub fn set_auto_thresholds(&mut self, quad_tree: usize, hash: usize) {
        if quad_tree > hash {
            return;
        }
        self.quad_tree_threshold = quad_tree;
        self.hash_threshold = hash;
        if self.strategy == SpatialStrategy::Auto {
            let target = self.resolve(self.len());
            self.migrate(target);
        }
    }

    /// Change the quadtree root extent.
    ///
    /// An active quadtree is rebuilt over the new extent; records that fall outside it move to
    /// the overflow list. Non-finite or empty bounds are ignored.
    pub fn set_world_bounds(&mut self, world_bounds: Rect) {
        if !is_queryable(&world_bounds) || world_bounds == self.world_bounds {
            return;
        }
        log::debug!("world bounds {:?} -> {:?}", self.world_bounds, world_bounds);
        self.world_bounds = world_bounds;
        if self.active == BackendKind::QuadTree && self.index.is_some() {
            self.reconstruct(BackendKind::QuadTree);
        }
    }

    /// Change the spatial hash cell size, rebuilding an active hash.
    ///
    /// Non-finite or non-positive sizes are ignored.
    pub fn set_cell_size(&mut self, cell_size: f64) {
        if !cell_size.is_finite() || cell_size <= 0.0 || cell_size == self.cell_size {
            return;
        }
        log::debug!("cell size {} -> {}", self.cell_size, cell_size);
        self.cell_size = cell_size;
        if self.active == BackendKind::SpatialHash && self.index.is_some() {
            self.reconstruct(BackendKind::SpatialHash);
        }
    }

    /// The backend selection policy.
    pub fn strategy(&self) -> SpatialStrategy {
        self.strategy
    }

    /// The backend currently in use.
    pub fn active_backend(&self) -> BackendKind {
        self.active
    }

    /// Name of the backend currently in use.
    pub fn strategy_name(&self) -> &'static str {
        self.active.name()
    }

    /// The quadtree root extent.
    pub fn world_bounds(&self) -> Rect {
        self.world_bounds
    }

    /// The spatial hash cell size.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// The `Auto` thresholds as `(quad_tree, hash)`.
    pub fn auto_thresholds(&self) -> (usize, usize) {
        (self.quad_tree_threshold, self.hash_threshold)
    }

    /// Snapshot of the current settings.
    pub fn config(&self) -> SpatialConfig {
        SpatialConfig {
            strategy: self.strategy,
            quad_tree_threshold: self.quad_tree_threshold,
            hash_threshold: self.hash_threshold,
            world_bounds: self.world_bounds,
            cell_size: self.cell_size,
        }
    }

    /// Start tracking `key` with `bounds`, replacing any existing record.
    pub fn insert(&mut self, key: K, bounds: Rect) {
        self.index_mut().insert(key, bounds);
    }

    /// Stop tracking `key`.
    pub fn remove(&mut self, key: K) {
        if let Some(index) = self.index.as_mut() {
            index.remove(key);
        }
    }

    /// Move a tracked `key` to `bounds`.
    pub fn update(&mut self, key: K, bounds: Rect) {
        if let Some(index) = self.index.as_mut() {
            index.update(key, bounds);
        }
    }

    /// Keys whose bounds intersect `area`. Recorded in [`query_stats`](Self::query_stats).
    pub fn query_rect(&self, area: Rect) -> Vec<K> {
        #[cfg(feature = "std")]
        let start = std::time::Instant::now();

        let hits: Vec<K> = self
            .index
            .as_ref()
            .map(|index| index.query_rect(area).collect())
            .unwrap_or_default();

        let mut stats = self.stats.get();
        stats.query_count += 1;
        #[cfg(feature = "std")]
        {
            stats.total_query_time += start.elapsed();
        }
        self.stats.set(stats);
        hits
    }

    /// Keys whose bounds contain `point`.
    pub fn query_point(&self, point: Point) -> Vec<K> {
        self.index
            .as_ref()
            .map(|index| index.query_point(point).collect())
            .unwrap_or_default()
    }

    /// Every overlapping pair, each unordered pair reported once.
    pub fn query_collisions(&self) -> Vec<(K, K)> {
        self.index
            .as_ref()
            .map(|index| index.query_collisions())
            .unwrap_or_default()
    }

    /// Call `f` for every key intersecting `area` until it breaks.
    pub fn visit_rect(
        &self,
        area: Rect,
        mut f: impl FnMut(K) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        for key in self.query_rect(area) {
            f(key)?;
        }
        ControlFlow::Continue(())
    }

    /// Call `f` for every key containing `point` until it breaks.
    pub fn visit_point(
        &self,
        point: Point,
        mut f: impl FnMut(K) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if let Some(index) = self.index.as_ref() {
            for key in index.query_point(point) {
                f(key)?;
            }
        }
        ControlFlow::Continue(())
    }

    /// The bounds recorded for `key`.
    pub fn bounds_of(&self, key: K) -> Option<Rect> {
        self.index.as_ref().and_then(|index| index.bounds_of(key))
    }

    /// Whether `key` is tracked.
    pub fn contains(&self, key: K) -> bool {
        self.bounds_of(key).is_some()
    }

    /// Remove every key, keeping the active backend.
    pub fn clear(&mut self) {
        if let Some(index) = self.index.as_mut() {
            index.clear();
        }
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, |index| index.len())
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-resolve the backend and rebuild it from the recorded bounds.
    pub fn rebuild(&mut self) {
        let target = self.resolve(self.len());
        self.reconstruct(target);
    }

    /// Re-resolve the backend and rebuild it from live bounds.
    ///
    /// Every tracked key is looked up in `source`; keys it no longer knows are dropped.
    pub fn rebuild_with(&mut self, source: &impl BoundsSource<K>) {
        let live: Vec<(K, Rect)> = self
            .index
            .as_ref()
            .map(|index| {
                index
                    .entries()
                    .filter_map(|(key, _)| source.bounds(key).map(|b| (key, b)))
                    .collect()
            })
            .unwrap_or_default();
        let target = self.resolve(live.len());
        log::debug!("rebuilding {} from {} live objects", target.name(), live.len());
        let mut index = Self::create_index(target, self.world_bounds, self.cell_size);
        for (key, bounds) in live {
            index.insert(key, bounds);
        }
        self.active = target;
        self.index = Some(index);
    }

    /// Re-resolve an `Auto` backend, then compact the active index.
    pub fn optimize(&mut self) {
        if self.strategy == SpatialStrategy::Auto {
            let target = self.resolve(self.len());
            if self.migrate(target) {
                return;
            }
        }
        if let Some(index) = self.index.as_mut() {
            index.rebuild();
        }
    }

    /// Profiling accumulated by [`query_rect`](Self::query_rect).
    pub fn query_stats(&self) -> QueryStats {
        self.stats.get()
    }

    /// Zero the profiling counters.
    pub fn reset_query_stats(&self) {
        self.stats.set(QueryStats::default());
    }
}

impl<K: ObjectKey> core::fmt::Debug for SpatialManager<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpatialManager")
            .field("strategy", &self.strategy)
            .field("active", &self.active)
            .field("world_bounds", &self.world_bounds)
            .field("cell_size", &self.cell_size)
            .field("quad_tree_threshold", &self.quad_tree_threshold)
            .field("hash_threshold", &self.hash_threshold)
            .field("index", &self.index)
            .field("stats", &self.stats.get())
            .finish()
    }
}
