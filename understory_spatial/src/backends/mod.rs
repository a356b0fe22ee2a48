// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `quadtree`: recursive subdivision of a fixed world extent. Suits moderate object counts,
//!   including spatially clustered ones.
//! - `spatial_hash`: sparse uniform grid keyed by integer cell coordinates. Suits large,
//!   evenly spread object counts and frequent updates; unbounded extent.
//!
//! Both report the same *sets* for identical contents; result order and pair orientation
//! are backend-specific.

pub mod quadtree;
pub mod spatial_hash;

pub use quadtree::QuadTree;
pub use spatial_hash::{CellKey, SpatialHash};
