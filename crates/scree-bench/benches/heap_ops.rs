//! Criterion micro-benchmarks for heap allocate, release, and scan paths.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use scree::{Heap, HeapConfig, SharedHeap};
use scree_bench::{churn_script, ramp_script, run_script};

/// Build a heap config with release-poisoning disabled.
fn bench_config(initial: u32, max: u32) -> HeapConfig {
    HeapConfig {
        debug_fill: false,
        ..HeapConfig::growable(initial, max)
    }
}

/// Benchmark: allocate and release a single 64-byte block, steady state.
fn bench_alloc_release_pair(c: &mut Criterion) {
    let mut heap = Heap::new(bench_config(64 * 1024, 64 * 1024)).unwrap();

    c.bench_function("alloc_release_64b", |b| {
        b.iter(|| {
            let handle = heap.allocate(black_box(64)).unwrap();
            heap.release(handle).unwrap();
        });
    });
}

/// Benchmark: first-fit scan past 128 too-small gaps into the tail.
fn bench_first_fit_scan(c: &mut Criterion) {
    let mut heap = Heap::new(bench_config(32 * 1024, 32 * 1024)).unwrap();

    // 256 small blocks, then release every other one. The survivors pin
    // 128 isolated 64-byte gaps ahead of the free tail.
    let mut pins = Vec::new();
    for _ in 0..256 {
        pins.push(heap.allocate(64).unwrap());
    }
    for handle in pins.iter().step_by(2) {
        heap.release(*handle).unwrap();
    }

    c.bench_function("first_fit_scan_128_gaps", |b| {
        b.iter(|| {
            let handle = heap.allocate(black_box(128)).unwrap();
            heap.release(handle).unwrap();
        });
    });
}

/// Benchmark: replay a 512-op churn script on a fresh heap each iteration.
fn bench_churn_replay(c: &mut Criterion) {
    let script = churn_script(42, 512);

    c.bench_function("churn_replay_512", |b| {
        b.iter(|| {
            let mut heap = Heap::new(bench_config(64 * 1024, 1024 * 1024)).unwrap();
            black_box(run_script(&mut heap, &script));
        });
    });
}

/// Benchmark: replay an allocate-then-drain script that grows the arena.
fn bench_ramp_replay(c: &mut Criterion) {
    let script = ramp_script(7, 384);

    c.bench_function("ramp_replay_384", |b| {
        b.iter(|| {
            let mut heap = Heap::new(bench_config(8 * 1024, 1024 * 1024)).unwrap();
            black_box(run_script(&mut heap, &script));
        });
    });
}

/// Benchmark: full shared-heap box cycle, allocate through drop.
fn bench_shared_box_cycle(c: &mut Criterion) {
    let heap = SharedHeap::new(bench_config(64 * 1024, 64 * 1024)).unwrap();

    c.bench_function("shared_box_round_trip", |b| {
        b.iter(|| {
            let mut block = heap.allocate(black_box(64)).unwrap();
            block.bytes_mut().fill(0xA5);
            drop(block);
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_release_pair,
    bench_first_fit_scan,
    bench_churn_replay,
    bench_ramp_replay,
    bench_shared_box_cycle
);
criterion_main!(benches);
