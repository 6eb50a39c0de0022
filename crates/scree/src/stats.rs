//! Allocator statistics snapshots.
//!
//! [`HeapStats`] captures the state of a heap at a point in time, for
//! telemetry, capacity planning, and test assertions. The allocator never
//! prints or logs; consumers read these numbers and decide for themselves.

/// Point-in-time statistics for a [`Heap`](crate::Heap).
///
/// Byte figures describe the arena as it is now; `allocations`,
/// `releases`, and `grow_events` are cumulative over the heap's lifetime.
/// `live_bytes` counts whole blocks, including alignment padding and
/// absorbed split remainders, so `live_bytes + free_bytes == arena_bytes`
/// always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Current arena size in bytes.
    pub arena_bytes: usize,
    /// Bytes in free blocks.
    pub free_bytes: usize,
    /// Bytes in allocated blocks.
    pub live_bytes: usize,
    /// Number of allocated blocks.
    pub live_blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Cumulative successful allocations (zero-size requests excluded).
    pub allocations: u64,
    /// Cumulative successful releases (empty-handle no-ops excluded).
    pub releases: u64,
    /// Cumulative arena growth events.
    pub grow_events: u64,
    /// High-water mark of `live_bytes`.
    pub peak_live_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = HeapStats::default();
        assert_eq!(s.arena_bytes, 0);
        assert_eq!(s.free_bytes, 0);
        assert_eq!(s.live_bytes, 0);
        assert_eq!(s.live_blocks, 0);
        assert_eq!(s.free_blocks, 0);
        assert_eq!(s.allocations, 0);
        assert_eq!(s.releases, 0);
        assert_eq!(s.grow_events, 0);
        assert_eq!(s.peak_live_bytes, 0);
    }
}
