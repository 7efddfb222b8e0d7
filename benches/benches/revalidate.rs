// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Vec2};
use scenery_graph::{
    Canvas, Color4f, ColorMaterial, Draw, Group, IdAllocator, InvalidationRecorder, Mat3,
    OpacityEffect, RectGeometry, RenderContext,
};

struct Grid {
    root: Group,
    geometries: Vec<RectGeometry>,
    materials: Vec<ColorMaterial>,
}

fn gen_grid(ids: &IdAllocator, n: usize, cell: f64) -> Grid {
    let root = Group::new(ids);
    let mut geometries = Vec::with_capacity(n * n);
    let mut materials = Vec::with_capacity(n * n);
    for y in 0..n {
        let row = Group::new(ids);
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            let geometry = RectGeometry::from_rect(ids, Rect::new(x0, y0, x0 + cell, y0 + cell));
            let material = ColorMaterial::with_color(ids, Color4f::BLACK);
            row.add_child(Draw::new(ids, geometry.clone(), material.clone()));
            geometries.push(geometry);
            materials.push(material);
        }
        root.add_child(OpacityEffect::new(ids, row, 0.9));
    }
    Grid {
        root,
        geometries,
        materials,
    }
}

// Simple xorshift for picking leaves without pulling in `rand`.
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
    fn index(&mut self, len: usize) -> usize {
        (self.next_u64() % len as u64) as usize
    }
}

fn bench_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("revalidate_full");
    for &n in &[10_usize, 32, 64] {
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter_batched(
                || {
                    let ids = IdAllocator::new();
                    gen_grid(&ids, n, 10.0)
                },
                |grid| {
                    let mut recorder = InvalidationRecorder::new();
                    let bounds = grid
                        .root
                        .revalidate(Some(&mut recorder), &Mat3::IDENTITY)
                        .unwrap();
                    black_box((bounds, recorder.len()));
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("revalidate_incremental");
    for &n in &[32_usize, 64] {
        let ids = IdAllocator::new();
        let grid = gen_grid(&ids, n, 10.0);
        grid.root.revalidate(None, &Mat3::IDENTITY).unwrap();

        let mut rng = Rng::new(0x5eed_0001);
        group.bench_function(format!("move_one_leaf_n{n}"), |b| {
            b.iter(|| {
                let geometry = &grid.geometries[rng.index(grid.geometries.len())];
                let r = geometry.rect();
                geometry.set_rect(r + Vec2::new(1.0, 0.0));
                let mut recorder = InvalidationRecorder::new();
                grid.root
                    .revalidate(Some(&mut recorder), &Mat3::IDENTITY)
                    .unwrap();
                black_box(recorder.union_rect());
            });
        });

        let mut rng = Rng::new(0x5eed_0002);
        group.bench_function(format!("recolor_one_leaf_n{n}"), |b| {
            b.iter(|| {
                let material = &grid.materials[rng.index(grid.materials.len())];
                let shade = (rng.next_u64() % 256) as f32 / 255.0;
                material.set_color(Color4f::new(shade, shade, shade, 1.0));
                let mut recorder = InvalidationRecorder::new();
                grid.root
                    .revalidate(Some(&mut recorder), &Mat3::IDENTITY)
                    .unwrap();
                black_box(recorder.len());
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for &n in &[32_usize, 64] {
        let ids = IdAllocator::new();
        let grid = gen_grid(&ids, n, 10.0);
        grid.root.revalidate(None, &Mat3::IDENTITY).unwrap();
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter(|| {
                let mut canvas = Canvas::new();
                grid.root.render(&mut canvas, &RenderContext::new());
                black_box(canvas.ops().len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full, bench_incremental, bench_render);
criterion_main!(benches);
