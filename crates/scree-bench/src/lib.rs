//! Benchmark workloads and utilities for the scree allocator.
//!
//! Provides deterministic allocate/release scripts for benchmarks and
//! stress runs:
//!
//! - [`churn_script`]: steady-state mix of allocations and releases
//! - [`ramp_script`]: allocate-heavy prefix followed by a drain
//! - [`run_script`]: replay a script against a [`Heap`] and report totals

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use scree::{BlockHandle, Heap, HeapStats};

/// One step of an allocator workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate this many bytes and keep the handle in the live set.
    Allocate(u32),
    /// Release the live handle at this index, modulo the live count.
    Release(usize),
}

/// Outcome of replaying a script with [`run_script`].
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Allocations the heap rejected with out-of-memory.
    pub failed_allocations: u64,
    /// Heap statistics after the final drain.
    pub stats: HeapStats,
}

/// Build a steady-state churn script: after a short allocate-only
/// warm-up, each step is a coin flip between allocating and releasing.
///
/// Sizes are skewed small (8..=64 bytes) with one request in eight
/// drawn from 256..=1024 bytes. The same seed always yields the same
/// script.
pub fn churn_script(seed: u64, len: usize) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let warmup = len / 8;
    let mut script = Vec::with_capacity(len);

    for i in 0..len {
        if i > warmup && rng.random_bool(0.5) {
            script.push(Op::Release(rng.random_range(0..usize::MAX)));
        } else {
            let size = if rng.random_range(0..8u32) == 0 {
                rng.random_range(256..=1024)
            } else {
                rng.random_range(8..=64)
            };
            script.push(Op::Allocate(size));
        }
    }

    script
}

/// Build an allocate-then-drain script: the first two thirds allocate,
/// the rest release in random order.
///
/// Exercises peak footprint, arena growth, and full coalescing on the
/// way back down.
pub fn ramp_script(seed: u64, len: usize) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let cut = len * 2 / 3;
    let mut script = Vec::with_capacity(len);

    for _ in 0..cut {
        script.push(Op::Allocate(rng.random_range(8..=256)));
    }
    for _ in cut..len {
        script.push(Op::Release(rng.random_range(0..usize::MAX)));
    }

    script
}

/// Replay `script` against `heap`, then release every still-live block.
///
/// Failed allocations are counted rather than retried. A release with
/// nothing live is skipped; otherwise the index wraps around the
/// current live set.
pub fn run_script(heap: &mut Heap, script: &[Op]) -> RunSummary {
    let mut live: Vec<BlockHandle> = Vec::new();
    let mut failed_allocations = 0u64;

    for op in script {
        match *op {
            Op::Allocate(size) => match heap.allocate(size) {
                Ok(handle) => live.push(handle),
                Err(_) => failed_allocations += 1,
            },
            Op::Release(pick) => {
                if !live.is_empty() {
                    let handle = live.swap_remove(pick % live.len());
                    heap.release(handle).expect("handle came from this heap");
                }
            }
        }
    }

    for handle in live.drain(..) {
        heap.release(handle).expect("handle came from this heap");
    }

    RunSummary {
        failed_allocations,
        stats: heap.stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scree::HeapConfig;

    #[test]
    fn scripts_are_deterministic() {
        assert_eq!(churn_script(42, 256), churn_script(42, 256));
        assert_eq!(ramp_script(42, 256), ramp_script(42, 256));
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(churn_script(1, 256), churn_script(2, 256));
    }

    #[test]
    fn churn_warmup_prefix_only_allocates() {
        // Releases start after the warmup, whatever the seed draws.
        let script = churn_script(3, 200);
        assert!(script[..=25].iter().all(|op| matches!(op, Op::Allocate(_))));
    }

    #[test]
    fn ramp_allocates_then_releases() {
        let script = ramp_script(7, 96);
        assert!(matches!(script[0], Op::Allocate(_)));
        assert!(matches!(script[95], Op::Release(_)));
    }

    #[test]
    fn churn_run_leaves_a_balanced_heap() {
        let mut heap = Heap::new(HeapConfig::growable(64 * 1024, 1024 * 1024)).unwrap();
        let summary = run_script(&mut heap, &churn_script(42, 500));

        assert_eq!(summary.stats.live_blocks, 0);
        assert_eq!(summary.stats.live_bytes, 0);
        assert_eq!(summary.stats.free_bytes, summary.stats.arena_bytes);
        assert_eq!(summary.stats.allocations, summary.stats.releases);
        assert!(heap.leaks().is_empty());
    }

    #[test]
    fn ramp_run_fully_coalesces() {
        let mut heap = Heap::new(HeapConfig::growable(8 * 1024, 1024 * 1024)).unwrap();
        let summary = run_script(&mut heap, &ramp_script(7, 300));

        assert_eq!(summary.failed_allocations, 0);
        assert_eq!(summary.stats.live_blocks, 0);
        assert_eq!(summary.stats.free_blocks, 1);
    }
}
