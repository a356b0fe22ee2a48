// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Understory Spatial: insert, move, query, and list overlapping pairs.

use kurbo::{Point, Rect};
use understory_spatial::{SpatialManager, SpatialStrategy};

fn main() {
    let mut spatial: SpatialManager<u32> = SpatialManager::new(Rect::new(0.0, 0.0, 1000.0, 1000.0));
    spatial.insert(1, Rect::new(0.0, 0.0, 10.0, 10.0));
    spatial.insert(2, Rect::new(5.0, 5.0, 15.0, 15.0));
    spatial.insert(3, Rect::new(40.0, 0.0, 50.0, 10.0));
    println!("pairs: {:?}", spatial.query_collisions());

    // Move box 1 onto box 3
    spatial.update(1, Rect::new(35.0, 0.0, 45.0, 10.0));
    println!("pairs after move: {:?}", spatial.query_collisions());

    // Query a point
    println!("hits at (6,6): {:?}", spatial.query_point(Point::new(6.0, 6.0)));

    // Same contents, other backend
    spatial.set_strategy(SpatialStrategy::SpatialHash);
    println!("{} pairs: {:?}", spatial.strategy_name(), spatial.query_collisions());
}
