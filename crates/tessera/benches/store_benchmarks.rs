//! Store throughput benchmarks: entity creation, archetype migration, bulk
//! iteration, and snapshot hashing.
//!
//! Run with: `cargo bench --bench store_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use tessera::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Setup {
    store: Store,
    x: Component,
    y: Component,
    tag: Component,
}

fn setup_store() -> Setup {
    let mut store = Store::new();
    let x = store
        .create_component("x", Schema::new(json!({ "type": "number" })))
        .expect("fresh store");
    let y = store
        .create_component("y", Schema::new(json!({ "type": "number" })))
        .expect("fresh store");
    let tag = store
        .create_component("tag", Schema::new(json!({ "type": "string" })))
        .expect("fresh store");
    Setup { store, x, y, tag }
}

/// A store holding `count` entities with both `x` and `y`.
fn populated(count: usize) -> (Setup, Archetype, Vec<Entity>) {
    let mut setup = setup_store();
    let xy = setup
        .store
        .archetype(vec![setup.x.clone(), setup.y.clone()])
        .expect("sorted");
    let entities = (0..count)
        .map(|i| {
            let mut values = Values::new();
            values.insert("x".to_owned(), Value::Number(i as f64));
            values.insert("y".to_owned(), Value::Number(0.0));
            setup.store.create_entity_with(&xy, values).expect("valid row")
        })
        .collect();
    (setup, xy, entities)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_create_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");
    for &count in &[100usize, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let (setup, _, entities) = populated(count);
                black_box((setup.store.entity_count(), entities.len()));
            });
        });
    }
    group.finish();
}

fn bench_migrate_add_remove(c: &mut Criterion) {
    let (mut setup, _, entities) = populated(1000);
    c.bench_function("migrate_add_remove_1k", |b| {
        b.iter(|| {
            for &e in &entities {
                setup
                    .store
                    .set_value(e, &setup.tag, Some(Value::from("t")))
                    .expect("live entity");
            }
            for &e in &entities {
                setup.store.set_value(e, &setup.tag, None).expect("live entity");
            }
        });
    });
}

fn bench_iterate(c: &mut Criterion) {
    let (mut setup, xy, _) = populated(10_000);
    c.bench_function("for_each_entity_mut_10k", |b| {
        b.iter(|| {
            setup
                .store
                .for_each_entity_mut(&xy, |size, mut rows, _| {
                    let xs: Vec<f64> = rows
                        .column("x")
                        .and_then(Column::as_numbers)
                        .map_or_else(Vec::new, |xs| xs[..size].to_vec());
                    if let Some(ys) = rows.column_mut("y").and_then(Column::as_numbers_mut) {
                        for (y, x) in ys[..size].iter_mut().zip(&xs) {
                            *y += x * 0.5;
                        }
                    }
                })
                .expect("registered archetype");
        });
    });

    let only_x = setup.store.archetype(vec![setup.x.clone()]).expect("sorted");
    c.bench_function("for_each_entity_sum_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            setup
                .store
                .for_each_entity(&only_x, |size, rows, _| {
                    if let Some(xs) = rows.column("x").and_then(Column::as_numbers) {
                        sum += xs[..size].iter().sum::<f64>();
                    }
                })
                .expect("registered archetype");
            black_box(sum);
        });
    });
}

fn bench_snapshot_hash(c: &mut Criterion) {
    let (setup, _, _) = populated(1000);
    c.bench_function("snapshot_hash_1k", |b| {
        b.iter(|| black_box(setup.store.state_hash()));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_create_entities,
    bench_migrate_add_remove,
    bench_iterate,
    bench_snapshot_hash,
);
criterion_main!(benches);
