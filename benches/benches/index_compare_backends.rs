// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Vec2};
use understory_spatial::{QuadTree, SpatialHash, SpatialIndex, SpatialManager, SpatialStrategy};

const WORLD: Rect = Rect::new(0.0, 0.0, 2048.0, 2048.0);

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Rect> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Rect::from_origin_size((x0, y0), (cell, cell)));
        }
    }
    out
}

fn gen_overlap_grid_rects(n: usize, cell: f64, scale: f64) -> Vec<Rect> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Rect::from_origin_size((x0, y0), (cell * scale, cell * scale)));
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
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

fn gen_random_rects(count: usize, max_w: f64, max_h: f64, rect_w: f64, rect_h: f64) -> Vec<Rect> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..count {
        let x0 = rng.next_f64() * (max_w - rect_w).max(1.0);
        let y0 = rng.next_f64() * (max_h - rect_h).max(1.0);
        out.push(Rect::from_origin_size((x0, y0), (rect_w, rect_h)));
    }
    out
}

fn gen_clustered_rects(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Rect> {
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut centers = Vec::with_capacity(n_clusters);
    for _ in 0..n_clusters {
        centers.push((
            200.0 + rng.next_f64() * 1600.0,
            200.0 + rng.next_f64() * 1600.0,
        ));
    }
    for (cx, cy) in centers {
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push(Rect::from_origin_size((cx + dx, cy + dy), (12.0, 12.0)));
        }
    }
    out
}

type Factory = fn() -> Box<dyn SpatialIndex<u32>>;

fn make_quadtree() -> Box<dyn SpatialIndex<u32>> {
    Box::new(QuadTree::new(WORLD))
}

fn make_spatial_hash() -> Box<dyn SpatialIndex<u32>> {
    Box::new(SpatialHash::new(32.0))
}

fn backends() -> [(&'static str, Factory); 2] {
    [
        ("quadtree", make_quadtree as Factory),
        ("spatial_hash", make_spatial_hash as Factory),
    ]
}

fn filled(make: Factory, rects: &[Rect]) -> Box<dyn SpatialIndex<u32>> {
    let mut idx = make();
    for (i, r) in rects.iter().copied().enumerate() {
        idx.insert(i as u32, r);
    }
    idx
}

fn bench_insert(c: &mut Criterion) {
    for (name, make) in backends() {
        let mut group = c.benchmark_group(format!("{name}_insert"));
        for &n in &[32usize, 64] {
            let rects = gen_grid_rects(n, 10.0);
            group.throughput(Throughput::Elements((n * n) as u64));
            group.bench_function(format!("insert_query_rect_n{}", n), |b| {
                b.iter_batched(
                    make,
                    |mut idx| {
                        for (i, r) in rects.iter().copied().enumerate() {
                            idx.insert(i as u32, r);
                        }
                        let hits = idx
                            .query_rect(Rect::from_origin_size((100.0, 100.0), (400.0, 400.0)))
                            .count();
                        black_box(hits);
                    },
                    BatchSize::SmallInput,
                );
            });
        }
        let rects = gen_random_rects(4096, 2000.0, 2000.0, 12.0, 12.0);
        group.bench_function("insert_query_rect_random", |b| {
            b.iter_batched(
                make,
                |mut idx| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        idx.insert(i as u32, r);
                    }
                    let hits = idx
                        .query_rect(Rect::from_origin_size((800.0, 800.0), (400.0, 400.0)))
                        .count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            );
        });
        group.finish();
    }
}

fn bench_query_heavy(c: &mut Criterion) {
    for (name, make) in backends() {
        let mut group = c.benchmark_group(format!("{name}_query_heavy"));
        let rects = gen_grid_rects(128, 8.0);
        let idx = filled(make, &rects);
        group.bench_function("many_rect_queries", |b| {
            b.iter(|| {
                let mut total = 0usize;
                for q in 0..256 {
                    let x = (q % 64) as f64 * 8.0;
                    let y = (q / 64) as f64 * 64.0;
                    total += idx
                        .query_rect(Rect::from_origin_size((x, y), (96.0, 96.0)))
                        .count();
                }
                black_box(total);
            });
        });
        group.bench_function("many_point_queries", |b| {
            b.iter(|| {
                let mut total = 0usize;
                for q in 0..1024 {
                    let x = (q % 128) as f64 * 8.0 + 3.0;
                    let y = (q / 128) as f64 * 8.0 + 3.0;
                    total += idx.query_point((x, y).into()).count();
                }
                black_box(total);
            });
        });
        group.finish();
    }
}

fn bench_collisions(c: &mut Criterion) {
    for (name, make) in backends() {
        let mut group = c.benchmark_group(format!("{name}_collisions"));
        let overlap = filled(make, &gen_overlap_grid_rects(48, 10.0, 1.5));
        group.bench_function("overlap_grid", |b| {
            b.iter(|| black_box(overlap.query_collisions().len()));
        });
        let random = filled(make, &gen_random_rects(4096, 2000.0, 2000.0, 12.0, 12.0));
        group.bench_function("random", |b| {
            b.iter(|| black_box(random.query_collisions().len()));
        });
        let clustered = filled(make, &gen_clustered_rects(16, 128, 200.0));
        group.bench_function("clustered", |b| {
            b.iter(|| black_box(clustered.query_collisions().len()));
        });
        group.finish();
    }
}

fn bench_update_heavy(c: &mut Criterion) {
    for (name, make) in backends() {
        let mut group = c.benchmark_group(format!("{name}_update_heavy"));
        let rects = gen_grid_rects(64, 10.0);
        group.bench_function("update_move_all", |b| {
            b.iter_batched(
                || filled(make, &rects),
                |mut idx| {
                    for (j, r) in rects.iter().enumerate() {
                        let dx = (j % 5) as f64 - 2.0;
                        let dy = ((j * 7) % 5) as f64 - 2.0;
                        idx.update(j as u32, *r + Vec2::new(dx, dy));
                    }
                    black_box(idx.len());
                },
                BatchSize::SmallInput,
            );
        });
        group.finish();
    }
}

fn bench_manager_auto(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_auto");
    let rects = gen_random_rects(6000, 2000.0, 2000.0, 12.0, 12.0);
    group.bench_function("fill_optimize_collide", |b| {
        b.iter_batched(
            || SpatialManager::<u32>::new(WORLD),
            |mut spatial| {
                for (i, r) in rects.iter().copied().enumerate() {
                    spatial.insert(i as u32, r);
                }
                spatial.optimize();
                black_box(spatial.query_collisions().len());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("migrate_quadtree_to_hash", |b| {
        b.iter_batched(
            || {
                let mut spatial = SpatialManager::<u32>::new(WORLD);
                for (i, r) in rects.iter().copied().enumerate() {
                    spatial.insert(i as u32, r);
                }
                spatial
            },
            |mut spatial| {
                spatial.set_strategy(SpatialStrategy::SpatialHash);
                black_box(spatial.len());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_query_heavy,
    bench_collisions,
    bench_update_heavy,
    bench_manager_auto,
);
criterion_main!(benches);
