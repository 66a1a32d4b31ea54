//! Propagation Benchmarks
//!
//! Measures full turn latency (inject, propagate, notify) over three
//! graph shapes: a deep map chain, a wide fan-out under one source, and
//! a fold-heavy accumulator layer.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cascade_core::{lift, Domain, Signal};

fn deep_chain(c: &mut Criterion) {
    let domain = Domain::sequential();
    let source = domain.event_source::<i64>().unwrap();
    let mut tip = source.events().fold(0, |v, acc| acc + v).unwrap();
    for _ in 0..64 {
        tip = tip.map(|v| v.wrapping_add(1)).unwrap();
    }

    c.bench_function("deep_chain_64", |b| {
        b.iter(|| {
            source.inject(black_box(1)).unwrap();
            black_box(tip.value())
        })
    });
}

fn wide_fan_out(c: &mut Criterion) {
    let domain = Domain::sequential();
    let source = domain.event_source::<i64>().unwrap();
    let root = source.events().fold(0, |v, acc| acc + v).unwrap();
    let leaves: Vec<Signal<i64>> = (0..256)
        .map(|k| root.map(move |v| v.wrapping_mul(k + 1)).unwrap())
        .collect();

    c.bench_function("wide_fan_out_256", |b| {
        b.iter(|| {
            source.inject(black_box(1)).unwrap();
            black_box(leaves[0].value())
        })
    });
}

fn fold_layer(c: &mut Criterion) {
    let domain = Domain::sequential();
    let source = domain.event_source::<i64>().unwrap();
    let total = source.events().fold(0, |v, acc| acc + v).unwrap();
    let count = source.events().fold(0, |_, acc: i64| acc + 1).unwrap();
    let mean = lift((total, count), |(t, c)| if c == 0 { 0 } else { t / c }).unwrap();

    c.bench_function("fold_layer_batch_32", |b| {
        b.iter(|| {
            source.inject_all(black_box(0..32)).unwrap();
            black_box(mean.value())
        })
    });
}

criterion_group!(benches, deep_chain, wide_fan_out, fold_layer);
criterion_main!(benches);
