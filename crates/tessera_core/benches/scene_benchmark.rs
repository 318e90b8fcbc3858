//! # Scene Benchmark
//!
//! Measures the structural paths of a scene:
//! 1. Create + activate + refresh
//! 2. Component iteration over a fragmented store
//! 3. Cascading destruction of hierarchies
//!
//! Run with: `cargo bench --package tessera_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{Component, EntityHandle, Scene};

#[derive(Clone, Debug)]
struct Position {
    x: f32,
    y: f32,
}

impl Component for Position {}

#[derive(Clone, Debug)]
struct Velocity {
    x: f32,
    y: f32,
}

impl Component for Velocity {}

fn populated_scene(count: usize) -> (Scene, Vec<EntityHandle>) {
    let mut scene = Scene::new();
    let handles: Vec<_> = (0..count)
        .map(|i| {
            let e = scene.create_entity();
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32;
            scene.add_component(e, Position { x, y: 0.0 }).unwrap();
            scene.add_component(e, Velocity { x: 1.0, y: 0.5 }).unwrap();
            scene.activate(e).unwrap();
            e
        })
        .collect();
    scene.refresh();
    (scene, handles)
}

/// Benchmark: create, activate and refresh entities with two components.
fn bench_create_activate_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_activate_refresh");

    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let (scene, _) = populated_scene(count);
                black_box(scene.entity_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: integrate positions with half the entities destroyed.
fn bench_fragmented_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragmented_iteration");

    for count in [10_000, 100_000] {
        let (mut scene, handles) = populated_scene(count);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for e in handles {
            if rng.gen_bool(0.5) {
                scene.destroy(e).unwrap();
            }
        }
        scene.refresh();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let velocities: Vec<(f32, f32)> = scene
                    .components::<Velocity>()
                    .unwrap()
                    .iter()
                    .map(|(_, v)| (v.x, v.y))
                    .collect();
                for ((_, p), (vx, vy)) in scene
                    .components_mut::<Position>()
                    .unwrap()
                    .iter_mut()
                    .zip(velocities)
                {
                    p.x += vx * 0.016;
                    p.y += vy * 0.016;
                }
                black_box(scene.entity_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: destroy a forest of small trees in one refresh.
fn bench_cascading_destroy(c: &mut Criterion) {
    const TREES: usize = 1_000;
    const FANOUT: usize = 8;

    c.bench_function("cascading_destroy_1k_trees", |b| {
        b.iter_batched(
            || {
                let mut scene = Scene::new();
                let roots: Vec<_> = (0..TREES)
                    .map(|_| {
                        let root = scene.create_entity();
                        for _ in 0..FANOUT {
                            let child = scene.create_entity();
                            scene.add_child(root, child).unwrap();
                            scene.add_component(child, Position { x: 0.0, y: 0.0 }).unwrap();
                        }
                        scene.activate(root).unwrap();
                        root
                    })
                    .collect();
                scene.refresh();
                (scene, roots)
            },
            |(mut scene, roots)| {
                for root in roots {
                    scene.destroy(root).unwrap();
                }
                scene.refresh();
                black_box(scene.entity_count())
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_create_activate_refresh,
    bench_fragmented_iteration,
    bench_cascading_destroy,
);
criterion_main!(benches);
