// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial hash backend: a sparse uniform grid of buckets keyed by integer cell coordinates.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::backend::{ObjectKey, SpatialIndex};
use crate::bounds::{contains_point, intersects, is_queryable, is_valid_bounds};
use crate::collisions::{canonical_pair, sweep_pairs};

/// Cell size used when none (or an invalid one) is given.
pub const DEFAULT_CELL_SIZE: f64 = 64.0;

/// Integer grid coordinate of a bucket: `(floor(x / cell_size), floor(y / cell_size))`.
pub type CellKey = (i64, i64);

type Bucket<K> = SmallVec<[K; 4]>;

/// Spatial hash backend.
///
/// Every object is registered in each cell its AABB overlaps. A companion map from key to
/// bounds is the authoritative record; cell lookups are coarse and every query re-checks
/// candidates against it. Empty cells are pruned.
pub struct SpatialHash<K: ObjectKey> {
    cell_size: f64,
    grid: HashMap<CellKey, Bucket<K>>,
    bounds: HashMap<K, Rect>,
}

impl<K: ObjectKey> Default for SpatialHash<K> {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

#[inline]
fn floor_to_i64(v: f64) -> i64 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Cell coordinates saturate at the i64 range; NaN maps to cell 0."
    )]
    let i = v as i64;
    #[allow(
        clippy::cast_precision_loss,
        reason = "Only used to detect truncation toward zero for negative inputs."
    )]
    let back = i as f64;
    if back > v { i - 1 } else { i }
}

/// Inclusive range of cells covered by a rectangle.
#[derive(Copy, Clone, Debug)]
struct CellRange {
    min: CellKey,
    max: CellKey,
}

impl CellRange {
    fn contains(&self, key: CellKey) -> bool {
        key.0 >= self.min.0 && key.0 <= self.max.0 && key.1 >= self.min.1 && key.1 <= self.max.1
    }

    /// Number of cells in the range, saturating.
    fn span(&self) -> u128 {
        let w = (i128::from(self.max.0) - i128::from(self.min.0) + 1).max(0);
        let h = (i128::from(self.max.1) - i128::from(self.min.1) + 1).max(0);
        w.unsigned_abs().saturating_mul(h.unsigned_abs())
    }

    fn keys(self) -> impl Iterator<Item = CellKey> {
        (self.min.1..=self.max.1).flat_map(move |y| (self.min.0..=self.max.0).map(move |x| (x, y)))
    }
}

impl<K: ObjectKey> SpatialHash<K> {
    /// Create an empty spatial hash with the given cell size.
    ///
    /// A non-finite or non-positive `cell_size` falls back to [`DEFAULT_CELL_SIZE`].
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            grid: HashMap::new(),
            bounds: HashMap::new(),
        }
    }

    /// Edge length of a grid cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Change the cell size and re-bucket every tracked object.
    ///
    /// Non-finite or non-positive sizes are ignored, as is setting the current size.
    pub fn set_cell_size(&mut self, cell_size: f64) {
        if !cell_size.is_finite() || cell_size <= 0.0 || cell_size == self.cell_size {
            return;
        }
        log::debug!(
            "spatial hash cell size {} -> {} ({} objects)",
            self.cell_size,
            cell_size,
            self.bounds.len()
        );
        self.cell_size = cell_size;
        self.rebuild();
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Cells currently holding `key`, sorted.
    pub fn cells_of(&self, key: K) -> Vec<CellKey> {
        let mut out: Vec<CellKey> = self
            .grid
            .iter()
            .filter(|(_, bucket)| bucket.contains(&key))
            .map(|(cell, _)| *cell)
            .collect();
        out.sort_unstable();
        out
    }

    /// The cell containing a point.
    pub fn cell_key(&self, x: f64, y: f64) -> CellKey {
        (
            floor_to_i64(x / self.cell_size),
            floor_to_i64(y / self.cell_size),
        )
    }

    fn cell_range(&self, rect: &Rect) -> CellRange {
        CellRange {
            min: self.cell_key(rect.x0, rect.y0),
            max: self.cell_key(rect.x1, rect.y1),
        }
    }

    fn insert_into_cells(&mut self, key: K, bounds: &Rect) {
        for cell in self.cell_range(bounds).keys() {
            let bucket = self.grid.entry(cell).or_default();
            if !bucket.contains(&key) {
                bucket.push(key);
            }
        }
    }

    fn remove_from_cells(&mut self, key: K, bounds: &Rect) {
        for cell in self.cell_range(bounds).keys() {
            if let Some(bucket) = self.grid.get_mut(&cell) {
                if let Some(pos) = bucket.iter().position(|k| *k == key) {
                    bucket.swap_remove(pos);
                }
                if bucket.is_empty() {
                    self.grid.remove(&cell);
                }
            }
        }
    }

    /// Visit every bucket overlapping `range`.
    ///
    /// Walks the cell range directly when it is smaller than the populated grid, otherwise
    /// scans populated cells and filters by range. Both visit the same buckets.
    fn for_each_bucket_in(&self, range: CellRange, mut f: impl FnMut(&Bucket<K>)) {
        if range.span() <= self.grid.len() as u128 {
            for cell in range.keys() {
                if let Some(bucket) = self.grid.get(&cell) {
                    f(bucket);
                }
            }
        } else {
            for (cell, bucket) in &self.grid {
                if range.contains(*cell) {
                    f(bucket);
                }
            }
        }
    }
}

impl<K: ObjectKey> SpatialIndex<K> for SpatialHash<K> {
    fn insert(&mut self, key: K, bounds: Rect) {
        if !is_valid_bounds(&bounds) {
            self.remove(key);
            return;
        }
        if let Some(previous) = self.bounds.insert(key, bounds) {
            self.remove_from_cells(key, &previous);
        }
        self.insert_into_cells(key, &bounds);
    }

    fn remove(&mut self, key: K) {
        if let Some(previous) = self.bounds.remove(&key) {
            self.remove_from_cells(key, &previous);
        }
    }

    fn update(&mut self, key: K, bounds: Rect) {
        if self.bounds.contains_key(&key) {
            self.insert(key, bounds);
        }
    }

    fn query_rect<'a>(&'a self, area: Rect) -> Box<dyn Iterator<Item = K> + 'a> {
        let mut found = BTreeSet::new();
        if is_queryable(&area) {
            self.for_each_bucket_in(self.cell_range(&area), |bucket| {
                found.extend(bucket.iter().copied());
            });
        }
        Box::new(found.into_iter().filter(move |key| {
            self.bounds
                .get(key)
                .is_some_and(|bounds| intersects(bounds, &area))
        }))
    }

    fn query_point<'a>(&'a self, point: Point) -> Box<dyn Iterator<Item = K> + 'a> {
        let mut out = Vec::new();
        if let Some(bucket) = self.grid.get(&self.cell_key(point.x, point.y)) {
            for key in bucket {
                if self
                    .bounds
                    .get(key)
                    .is_some_and(|bounds| contains_point(bounds, point))
                {
                    out.push(*key);
                }
            }
        }
        Box::new(out.into_iter())
    }

    fn query_collisions(&self) -> Vec<(K, K)> {
        let mut seen = BTreeSet::new();
        let mut scratch: Vec<(K, Rect)> = Vec::new();
        for bucket in self.grid.values() {
            if bucket.len() < 2 {
                continue;
            }
            scratch.clear();
            scratch.extend(
                bucket
                    .iter()
                    .filter_map(|key| self.bounds.get(key).map(|b| (*key, *b))),
            );
            sweep_pairs(&mut scratch, |a, b| {
                seen.insert(canonical_pair(a, b));
            });
        }
        seen.into_iter().collect()
    }

    fn clear(&mut self) {
        self.grid.clear();
        self.bounds.clear();
    }

    fn rebuild(&mut self) {
        let records: Vec<(K, Rect)> = self.bounds.iter().map(|(k, b)| (*k, *b)).collect();
        log::trace!("spatial hash rebuild of {} objects", records.len());
        self.clear();
        for (key, bounds) in records {
            self.insert(key, bounds);
        }
    }

    fn len(&self) -> usize {
        self.bounds.len()
    }

    fn bounds_of(&self, key: K) -> Option<Rect> {
        self.bounds.get(&key).copied()
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (K, Rect)> + 'a> {
        Box::new(self.bounds.iter().map(|(k, b)| (*k, *b)))
    }
}

impl<K: ObjectKey> Debug for SpatialHash<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpatialHash")
            .field("cell_size", &self.cell_size)
            .field("len", &self.bounds.len())
            .field("cells", &self.grid.len())
            .finish_non_exhaustive()
    }
}
