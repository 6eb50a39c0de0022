//! The heap orchestrator: allocation, release, growth, and accounting.
//!
//! [`Heap`] owns the arena bytes and the block metadata and keeps them in
//! lockstep. Every allocate or release edits the block list, updates the
//! ledger and counters, and (with `debug_fill` on) maintains the poison
//! invariant over free bytes.

use crate::audit::{self, AllocLedger, LeakRecord, POISON_BYTE};
use crate::block::{align_up, BlockList, BlockState, BLOCK_ALIGN};
use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::handle::{AllocTag, BlockHandle};
use crate::stats::HeapStats;

/// A first-fit heap allocator over a single byte arena.
///
/// `Heap` is a synchronous, single-owner structure: operations take
/// `&mut self`, never block, and complete in time bounded by the block
/// count. Wrap it in [`SharedHeap`](crate::SharedHeap) when several
/// threads share one arena, or give each context its own `Heap`.
///
/// # Policy
///
/// Address-ordered first-fit. Requests are rounded up to
/// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN) bytes and the lowest-offset free
/// block that fits is taken. A tail of at least `min_split_bytes` is split
/// off as a new free block; a smaller tail is handed out with the
/// allocation. Release merges adjacent free blocks immediately, so free
/// space is always maximally coalesced.
#[derive(Debug)]
pub struct Heap {
    /// Backing storage. Handles hold offsets into this vec, so growth
    /// (which may move the storage) never invalidates them.
    arena: Vec<u8>,
    /// Offset-ordered metadata covering every arena byte.
    blocks: BlockList,
    /// Live allocations in allocation order.
    ledger: AllocLedger,
    /// Bytes currently inside allocated blocks.
    live_bytes: u32,
    /// Next tag to issue. Starts at 1; tag 0 belongs to the empty handle.
    tag_counter: u32,
    /// Cumulative successful allocations.
    allocations: u64,
    /// Cumulative successful releases.
    releases: u64,
    /// Cumulative arena growth events.
    grow_events: u64,
    /// High-water mark of `live_bytes`.
    peak_live_bytes: u32,
    config: HeapConfig,
}

// Compile-time assertion: Heap must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Heap>();
};

impl Heap {
    /// Create a heap from `config`.
    ///
    /// The arena starts as one free block of `initial_bytes` (no block at
    /// all when `initial_bytes` is zero).
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when an arena bound is not a multiple of
    /// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN), `max_bytes` is below
    /// `initial_bytes`, or `min_split_bytes` is zero or unaligned.
    pub fn new(config: HeapConfig) -> Result<Self, HeapError> {
        if config.initial_bytes % BLOCK_ALIGN != 0 {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "initial_bytes must be a multiple of {BLOCK_ALIGN} (got {})",
                    config.initial_bytes,
                ),
            });
        }
        if config.max_bytes % BLOCK_ALIGN != 0 {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "max_bytes must be a multiple of {BLOCK_ALIGN} (got {})",
                    config.max_bytes,
                ),
            });
        }
        if config.max_bytes < config.initial_bytes {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "max_bytes must be at least initial_bytes (got {} < {})",
                    config.max_bytes, config.initial_bytes,
                ),
            });
        }
        if config.min_split_bytes == 0 || config.min_split_bytes % BLOCK_ALIGN != 0 {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "min_split_bytes must be a nonzero multiple of {BLOCK_ALIGN} (got {})",
                    config.min_split_bytes,
                ),
            });
        }

        let mut arena = vec![0u8; config.initial_bytes as usize];
        if config.debug_fill {
            audit::poison(&mut arena, 0, config.initial_bytes);
        }
        Ok(Self {
            arena,
            blocks: BlockList::new(config.initial_bytes),
            ledger: AllocLedger::new(),
            live_bytes: 0,
            tag_counter: 1,
            allocations: 0,
            releases: 0,
            grow_events: 0,
            peak_live_bytes: 0,
            config,
        })
    }

    /// Allocate `size` bytes and return a handle to a block with at least
    /// that many usable bytes.
    ///
    /// The content of the returned region is unspecified: stale bytes
    /// from earlier use, or poison bytes under `debug_fill`. Use
    /// [`allocate_zeroed`](Self::allocate_zeroed) for a cleared region.
    /// `size == 0` returns the distinguished empty handle without
    /// touching the arena.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` when no free block fits and the arena cannot grow
    /// far enough. `InvalidConfig` once the tag counter is exhausted.
    /// Either way the heap is left unchanged.
    pub fn allocate(&mut self, size: u32) -> Result<BlockHandle, HeapError> {
        if size == 0 {
            return Ok(BlockHandle::EMPTY);
        }
        if size > self.config.max_bytes {
            return Err(self.out_of_memory(size));
        }
        let want = align_up(size);
        // Tag check precedes the search: a request that cannot complete
        // must not grow the arena.
        let tag = self.next_tag()?;
        let index = match self.blocks.first_fit(want).or_else(|| self.grow_for(want)) {
            Some(index) => index,
            None => return Err(self.out_of_memory(size)),
        };
        if self.config.debug_fill {
            let candidate = *self.blocks.get(index);
            self.verify_free_region(candidate.offset, candidate.size);
        }
        let block = self
            .blocks
            .allocate_at(index, want, self.config.min_split_bytes, tag);
        self.tag_counter += 1;
        self.ledger.record(block.offset, tag, size, block.size);
        self.live_bytes += block.size;
        self.peak_live_bytes = self.peak_live_bytes.max(self.live_bytes);
        self.allocations += 1;
        debug_assert_eq!(self.blocks.check(self.arena_len()), Ok(()));
        Ok(BlockHandle::new(block.offset, size, tag))
    }

    /// [`allocate`](Self::allocate), then zero the usable region.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate).
    pub fn allocate_zeroed(&mut self, size: u32) -> Result<BlockHandle, HeapError> {
        let handle = self.allocate(size)?;
        let start = handle.offset as usize;
        self.arena[start..start + handle.len as usize].fill(0);
        Ok(handle)
    }

    /// Release the allocation named by `handle`, returning its bytes to
    /// the free pool and merging them with free neighbours.
    ///
    /// Releasing the empty handle is a no-op. Afterwards the handle, and
    /// every copy of it, is invalid: its tag will never match again.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` when `handle` does not name a live allocation of
    /// this heap (already released, recycled, or never issued here). The
    /// heap is left unchanged.
    pub fn release(&mut self, handle: BlockHandle) -> Result<(), HeapError> {
        if handle.tag == AllocTag::EMPTY {
            return Ok(());
        }
        let index = self.checked_index(&handle)?;
        let (offset, size) = self.blocks.release_at(index);
        if self.config.debug_fill {
            audit::poison(&mut self.arena, offset, size);
        }
        self.ledger.forget(offset);
        self.live_bytes -= size;
        self.releases += 1;
        debug_assert_eq!(self.blocks.check(self.arena_len()), Ok(()));
        Ok(())
    }

    /// Read the usable bytes of a live allocation: exactly
    /// `handle.len()` bytes. The empty handle yields an empty slice.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` when the handle does not name a live allocation,
    /// making use-after-release a diagnosable error.
    pub fn data(&self, handle: &BlockHandle) -> Result<&[u8], HeapError> {
        if handle.tag == AllocTag::EMPTY {
            return Ok(&[]);
        }
        self.checked_index(handle)?;
        let start = handle.offset as usize;
        Ok(&self.arena[start..start + handle.len as usize])
    }

    /// Write access to the usable bytes of a live allocation.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` when the handle does not name a live allocation.
    pub fn data_mut(&mut self, handle: &BlockHandle) -> Result<&mut [u8], HeapError> {
        if handle.tag == AllocTag::EMPTY {
            return Ok(&mut []);
        }
        self.checked_index(handle)?;
        let start = handle.offset as usize;
        Ok(&mut self.arena[start..start + handle.len as usize])
    }

    /// Snapshot of allocator statistics.
    pub fn stats(&self) -> HeapStats {
        // The byte counter and the block metadata track free space
        // independently; they must never drift apart.
        debug_assert_eq!(self.blocks.free_bytes() as usize, self.free_bytes());
        HeapStats {
            arena_bytes: self.arena.len(),
            free_bytes: self.free_bytes(),
            live_bytes: self.live_bytes as usize,
            live_blocks: self.ledger.len(),
            free_blocks: self.blocks.len() - self.ledger.len(),
            allocations: self.allocations,
            releases: self.releases,
            grow_events: self.grow_events,
            peak_live_bytes: self.peak_live_bytes as usize,
        }
    }

    /// Current arena size in bytes.
    pub fn arena_bytes(&self) -> usize {
        self.arena.len()
    }

    /// Bytes in free blocks.
    pub fn free_bytes(&self) -> usize {
        self.arena.len() - self.live_bytes as usize
    }

    /// Bytes in allocated blocks, alignment padding included.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes as usize
    }

    /// Number of blocks, free and allocated.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of live allocations.
    pub fn live_block_count(&self) -> usize {
        self.ledger.len()
    }

    /// Live allocations, oldest first. Non-empty at teardown time means
    /// something forgot to release.
    pub fn leaks(&self) -> Vec<LeakRecord> {
        self.ledger.records()
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    fn arena_len(&self) -> u32 {
        self.arena.len() as u32
    }

    fn out_of_memory(&self, requested: u32) -> HeapError {
        HeapError::OutOfMemory {
            requested: requested as usize,
            free_bytes: self.free_bytes(),
            arena_bytes: self.arena.len(),
        }
    }

    /// Resolve `handle` to its block index, rejecting anything that does
    /// not name a live allocation carrying the handle's tag.
    fn checked_index(&self, handle: &BlockHandle) -> Result<usize, HeapError> {
        let invalid = || HeapError::InvalidHandle {
            offset: handle.offset,
            tag: handle.tag,
        };
        let index = self.blocks.find(handle.offset).ok_or_else(invalid)?;
        match self.blocks.get(index).state {
            BlockState::Allocated { tag } if tag == handle.tag => Ok(index),
            _ => Err(invalid()),
        }
    }

    /// Next allocation tag, erroring instead of wrapping once the tag
    /// space is exhausted. The counter advances only when an allocation
    /// commits; a failed `allocate` never consumes a tag.
    fn next_tag(&self) -> Result<AllocTag, HeapError> {
        if self.tag_counter == u32::MAX {
            return Err(HeapError::InvalidConfig {
                reason: "allocation tag counter exhausted".to_string(),
            });
        }
        Ok(AllocTag(self.tag_counter))
    }

    /// Grow the arena far enough that the trailing free block satisfies a
    /// `want`-byte request, at-least-doubling up to `max_bytes`. Returns
    /// the index of the block to allocate from, or `None` when the
    /// ceiling is too low.
    fn grow_for(&mut self, want: u32) -> Option<usize> {
        let arena_len = self.arena_len();
        if arena_len >= self.config.max_bytes {
            return None;
        }
        // Free bytes already at the arena's end count toward the request.
        let shortfall = want - self.blocks.trailing_free();
        let needed = arena_len.checked_add(shortfall)?;
        let new_len = arena_len
            .saturating_mul(2)
            .max(needed)
            .min(self.config.max_bytes);
        if new_len < needed {
            return None;
        }
        let added = new_len - arena_len;
        self.arena.resize(new_len as usize, 0);
        if self.config.debug_fill {
            audit::poison(&mut self.arena, arena_len, added);
        }
        self.blocks.extend(added);
        self.grow_events += 1;
        let index = self
            .blocks
            .first_fit(want)
            .expect("extended trailing free block fits the request");
        Some(index)
    }

    /// Panic if a free region was modified while on the free list.
    ///
    /// Only called with `debug_fill` on. The arena is fully owned, so
    /// damage here means the allocator handed the same bytes out twice.
    fn verify_free_region(&self, offset: u32, size: u32) {
        if let Err(at) = audit::verify_poison(&self.arena, offset, size) {
            panic!(
                "freed memory modified at arena offset {at} (expected poison byte {POISON_BYTE:#04x})"
            );
        }
    }
}
