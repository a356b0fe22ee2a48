// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bouncing boxes.
//!
//! Headless frame loop: boxes move and bounce off the world edges, the manager is updated
//! once per frame, and colliding pairs are counted. Boxes are spawned and despawned in waves
//! so the `Auto` policy crosses both thresholds.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_spatial_demos --example bouncing_boxes`

use std::collections::BTreeMap;

use kurbo::{Point, Rect, Vec2};
use understory_spatial::{SpatialConfig, SpatialManager, SpatialStrategy};

const WORLD: Rect = Rect::new(0.0, 0.0, 1600.0, 1200.0);
const FRAMES: u32 = 240;

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
        (v as f64) / ((1u64 << 53) as f64)
    }
}

struct Body {
    bounds: Rect,
    velocity: Vec2,
}

impl Body {
    fn spawn(rng: &mut Rng) -> Self {
        let size = 8.0 + rng.next_f64() * 24.0;
        let origin = Point::new(
            rng.next_f64() * (WORLD.width() - size),
            rng.next_f64() * (WORLD.height() - size),
        );
        let velocity = Vec2::new(rng.next_f64() - 0.5, rng.next_f64() - 0.5) * 12.0;
        Self {
            bounds: Rect::from_origin_size(origin, (size, size)),
            velocity,
        }
    }

    fn step(&mut self) {
        let mut next = self.bounds + self.velocity;
        if next.x0 < WORLD.x0 || next.x1 > WORLD.x1 {
            self.velocity.x = -self.velocity.x;
            next = self.bounds + Vec2::new(self.velocity.x, 0.0);
        }
        if next.y0 < WORLD.y0 || next.y1 > WORLD.y1 {
            self.velocity.y = -self.velocity.y;
            next = Rect::from_origin_size((next.x0, self.bounds.y0), next.size());
        }
        self.bounds = next;
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SpatialConfig::default()
        .with_world_bounds(WORLD)
        .with_strategy(SpatialStrategy::Auto)
        .with_auto_thresholds(150, 400)
        .with_cell_size(48.0);
    let mut spatial = match SpatialManager::from_config(config) {
        Ok(spatial) => spatial,
        Err(err) => {
            log::error!("invalid spatial config: {err}");
            return;
        }
    };

    let mut rng = Rng(0x5EED_B0C5_1234_ABCD);
    let mut bodies: BTreeMap<u32, Body> = BTreeMap::new();
    let mut next_id = 0_u32;
    let mut last_backend = spatial.active_backend();

    for frame in 0..FRAMES {
        // Grow for the first half, shrink for the second.
        if frame < FRAMES / 2 {
            for _ in 0..5 {
                let body = Body::spawn(&mut rng);
                spatial.insert(next_id, body.bounds);
                bodies.insert(next_id, body);
                next_id += 1;
            }
        } else if let Some((&id, _)) = bodies.first_key_value() {
            for id in id..id + 6 {
                if bodies.remove(&id).is_some() {
                    spatial.remove(id);
                }
            }
        }

        for (&id, body) in bodies.iter_mut() {
            body.step();
            spatial.update(id, body.bounds);
        }

        if frame % 30 == 29 {
            // Resync from the simulation's own records; this also re-resolves `Auto`.
            let live: BTreeMap<u32, Rect> = bodies.iter().map(|(&id, b)| (id, b.bounds)).collect();
            spatial.rebuild_with(&live);
        }

        let pairs = spatial.query_collisions();
        let visible = spatial.query_rect(Rect::new(400.0, 300.0, 1200.0, 900.0)).len();
        if spatial.active_backend() != last_backend {
            log::info!(
                "frame {frame}: {} -> {} at {} boxes",
                last_backend.name(),
                spatial.strategy_name(),
                spatial.len()
            );
            last_backend = spatial.active_backend();
        }
        if frame % 20 == 0 {
            println!(
                "frame {frame:>3}: {:>4} boxes, {:>4} visible, {:>4} colliding pairs ({})",
                spatial.len(),
                visible,
                pairs.len(),
                spatial.strategy_name()
            );
        }
    }

    let stats = spatial.query_stats();
    println!(
        "{} region queries, average {:?}",
        stats.query_count,
        stats.average_query_time().unwrap_or_default()
    );
}
