// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Size, Vec2};
use scenery_compose::{CacheContext, CompositeNode, PaintNode, Recorder, RenderTreeNode};
use scenery_graph::{IdAllocator, Paint};

const VIEWPORT: Size = Size::new(1920.0, 1080.0);

/// `rows` composites, each offset and holding a run of `per_row` painted leaves.
fn gen_tree(ids: &IdAllocator, rows: usize, per_row: usize) -> (RenderTreeNode, Vec<PaintNode>) {
    let root = CompositeNode::new(ids);
    let mut leaves = Vec::with_capacity(rows * per_row);
    for y in 0..rows {
        let row = CompositeNode::new(ids);
        row.attributes_mut()
            .set_offset(Vec2::new(0.0, y as f64 * 12.0));
        for x in 0..per_row {
            let leaf = PaintNode::new(ids);
            let x0 = x as f64 * 12.0;
            leaf.update(Rect::new(x0, 0.0, x0 + 10.0, 10.0), |canvas| {
                canvas.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
            });
            row.append_child(leaf.clone());
            leaves.push(leaf);
        }
        root.append_child(row);
    }
    (root.into(), leaves)
}

fn frame(tree: &RenderTreeNode, cache: &mut CacheContext) -> usize {
    let mut recorder = Recorder::new();
    tree.compose(&mut recorder);
    recorder.finish(VIEWPORT, cache, None).layer_count()
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    for &(rows, per_row) in &[(8_usize, 8_usize), (32, 32)] {
        let ids = IdAllocator::new();
        let (tree, _) = gen_tree(&ids, rows, per_row);
        group.throughput(Throughput::Elements((rows * per_row) as u64));
        group.bench_function(format!("rows{rows}_x{per_row}"), |b| {
            b.iter(|| {
                let mut recorder = Recorder::new();
                tree.compose(&mut recorder);
                black_box(recorder.instructions().len());
            });
        });
    }
    group.finish();
}

fn bench_finish(c: &mut Criterion) {
    let mut group = c.benchmark_group("finish");
    for &(rows, per_row) in &[(8_usize, 8_usize), (32, 32)] {
        group.throughput(Throughput::Elements((rows * per_row) as u64));

        group.bench_function(format!("cold_rows{rows}_x{per_row}"), |b| {
            b.iter_batched(
                || {
                    let ids = IdAllocator::new();
                    gen_tree(&ids, rows, per_row).0
                },
                |tree| {
                    let mut cache = CacheContext::new();
                    black_box(frame(&tree, &mut cache));
                },
                BatchSize::SmallInput,
            );
        });

        let ids = IdAllocator::new();
        let (tree, leaves) = gen_tree(&ids, rows, per_row);
        let mut cache = CacheContext::new();
        frame(&tree, &mut cache);
        group.bench_function(format!("warm_rows{rows}_x{per_row}"), |b| {
            b.iter(|| black_box(frame(&tree, &mut cache)));
        });

        // One dirty leaf per frame invalidates only its own row.
        let mut next = 0;
        group.bench_function(format!("one_dirty_rows{rows}_x{per_row}"), |b| {
            b.iter(|| {
                leaves[next % leaves.len()].mark_dirty();
                next += per_row + 1;
                black_box(frame(&tree, &mut cache))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compose, bench_finish);
criterion_main!(benches);
