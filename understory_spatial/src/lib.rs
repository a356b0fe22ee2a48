// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Spatial: broad-phase 2D spatial indexing.
//!
//! Understory Spatial tracks axis-aligned bounds for externally owned objects and answers the
//! questions a scene asks every frame:
//!
//! - Which objects intersect this rectangle, or contain this point?
//! - Which pairs of objects overlap?
//!
//! Objects are identified by small copyable keys ([`ObjectKey`]); the index never owns or
//! dereferences what they name. Bounds are [`kurbo::Rect`] and are treated as closed
//! intervals, so touching edges count as overlapping.
//!
//! Two backends implement the shared [`SpatialIndex`] capability set:
//!
//! - [`QuadTree`]: recursive subdivision of a fixed world extent.
//! - [`SpatialHash`]: a sparse uniform grid with unbounded extent.
//!
//! [`SpatialManager`] owns one of them, forwards every operation, and with
//! [`SpatialStrategy::Auto`] picks the backend from the object count, keeping the current one
//! while the count sits between the two thresholds.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_spatial::SpatialManager;
//!
//! let world = Rect::new(0.0, 0.0, 1000.0, 1000.0);
//! let mut spatial: SpatialManager<u32> = SpatialManager::new(world);
//! spatial.insert(1, Rect::new(0.0, 0.0, 10.0, 10.0));
//! spatial.insert(2, Rect::new(5.0, 5.0, 15.0, 15.0));
//! spatial.insert(3, Rect::new(100.0, 100.0, 110.0, 110.0));
//!
//! // Region query.
//! let mut hits = spatial.query_rect(Rect::new(0.0, 0.0, 20.0, 20.0));
//! hits.sort();
//! assert_eq!(hits, vec![1, 2]);
//!
//! // Point query.
//! assert_eq!(spatial.query_point(Point::new(105.0, 105.0)), vec![3]);
//!
//! // Overlapping pairs.
//! assert_eq!(spatial.query_collisions().len(), 1);
//! assert_eq!(spatial.strategy_name(), "QuadTree");
//! ```
//!
//! Backends can also be used directly:
//!
//! ```rust
//! use kurbo::Rect;
//! use understory_spatial::{SpatialHash, SpatialIndex};
//!
//! let mut hash: SpatialHash<u32> = SpatialHash::new(64.0);
//! hash.insert(7, Rect::new(60.0, 60.0, 70.0, 70.0));
//! assert_eq!(hash.cells_of(7), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
//! ```
//!
//! ## Choosing a backend
//!
//! - `QuadTree`: good for moderate counts and clustered scenes inside a known extent. Objects
//!   that straddle a quadrant midline stay at the parent node, so large objects near the
//!   center of the world are compared against everything below them. Objects sticking out of
//!   the extent sit in an overflow list that every query scans.
//! - `SpatialHash`: good for many similarly sized objects and frequent moves. Choose a cell
//!   size around the typical object extent so most objects cover a handful of cells.
//!
//! ### Float semantics
//!
//! Bounds with non-finite or inverted coordinates are ignored on insert, and query rectangles
//! with no area return nothing. Zero-area object bounds are accepted.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod backend;
pub mod backends;
pub mod bounds;
pub mod collisions;
pub mod config;
pub mod manager;

pub use backend::{ObjectKey, SpatialIndex};
pub use backends::quadtree::{MAX_LEVELS, MAX_OBJECTS};
pub use backends::spatial_hash::DEFAULT_CELL_SIZE;
pub use backends::{CellKey, QuadTree, SpatialHash};
pub use config::{BackendKind, ConfigError, SpatialConfig, SpatialStrategy};
pub use manager::{BoundsSource, QueryStats, SpatialManager};
