//! Block metadata for the heap arena.
//!
//! The arena itself is a plain `Vec<u8>`; this module tracks how its bytes
//! are carved up. A [`BlockList`] holds [`Block`] entries sorted by offset,
//! together covering every arena byte exactly once, with no two free blocks
//! adjacent. Allocation policy (first-fit search, splitting, coalescing) is
//! expressed as edits to this list; arena bytes are only touched for poison
//! fills and caller I/O.

use smallvec::SmallVec;

use crate::handle::AllocTag;

/// Alignment of every block offset and size, in bytes.
pub const BLOCK_ALIGN: u32 = 8;

/// Round `bytes` up to the next multiple of [`BLOCK_ALIGN`].
///
/// Callers bound `bytes` by the arena ceiling first, so the rounding
/// cannot overflow.
pub(crate) fn align_up(bytes: u32) -> u32 {
    bytes.div_ceil(BLOCK_ALIGN) * BLOCK_ALIGN
}

/// Lifecycle state of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockState {
    /// Available for allocation.
    Free,
    /// Owned by a live allocation.
    Allocated {
        /// Tag of the owning allocation.
        tag: AllocTag,
    },
}

/// One contiguous span of arena bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    /// Byte offset within the arena.
    pub(crate) offset: u32,
    /// Size in bytes. Always a nonzero multiple of [`BLOCK_ALIGN`].
    pub(crate) size: u32,
    /// Free or allocated.
    pub(crate) state: BlockState,
}

impl Block {
    pub(crate) fn is_free(&self) -> bool {
        matches!(self.state, BlockState::Free)
    }

    /// One past the last byte of this block.
    pub(crate) fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// Offset-ordered block metadata covering the whole arena.
///
/// Small heaps dominate in practice; eight inline entries hold a handful
/// of live allocations plus interleaved free blocks before the list
/// spills.
#[derive(Debug)]
pub(crate) struct BlockList {
    blocks: SmallVec<[Block; 8]>,
}

impl BlockList {
    /// List for an arena of `arena_bytes`: one free block spanning it all,
    /// or no blocks at all for a zero-byte arena.
    pub(crate) fn new(arena_bytes: u32) -> Self {
        let mut blocks = SmallVec::new();
        if arena_bytes > 0 {
            blocks.push(Block {
                offset: 0,
                size: arena_bytes,
                state: BlockState::Free,
            });
        }
        Self { blocks }
    }

    /// Number of blocks, free and allocated.
    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn get(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    /// Index of the block starting at `offset`, if any.
    pub(crate) fn find(&self, offset: u32) -> Option<usize> {
        self.blocks.binary_search_by_key(&offset, |b| b.offset).ok()
    }

    /// Index of the lowest-offset free block with `size >= want`.
    pub(crate) fn first_fit(&self, want: u32) -> Option<usize> {
        self.blocks.iter().position(|b| b.is_free() && b.size >= want)
    }

    /// Mark the block at `index` allocated for `tag`, splitting the tail
    /// off as a new free block when it is at least `min_split` bytes.
    /// Smaller tails stay inside the allocated block.
    ///
    /// The caller has already checked that the block is free and at least
    /// `want` bytes. All three sizes are multiples of [`BLOCK_ALIGN`].
    pub(crate) fn allocate_at(
        &mut self,
        index: usize,
        want: u32,
        min_split: u32,
        tag: AllocTag,
    ) -> Block {
        let block = self.blocks[index];
        debug_assert!(block.is_free() && block.size >= want);
        let remainder = block.size - want;
        if remainder >= min_split {
            self.blocks[index].size = want;
            self.blocks.insert(
                index + 1,
                Block {
                    offset: block.offset + want,
                    size: remainder,
                    state: BlockState::Free,
                },
            );
        }
        self.blocks[index].state = BlockState::Allocated { tag };
        self.blocks[index]
    }

    /// Free the block at `index` and merge it with free neighbours.
    ///
    /// Returns the extent of the block as it was before merging; that is
    /// the region a poison fill must cover.
    pub(crate) fn release_at(&mut self, index: usize) -> (u32, u32) {
        let released = self.blocks[index];
        self.blocks[index].state = BlockState::Free;
        if index + 1 < self.blocks.len() && self.blocks[index + 1].is_free() {
            self.blocks[index].size += self.blocks[index + 1].size;
            self.blocks.remove(index + 1);
        }
        if index > 0 && self.blocks[index - 1].is_free() {
            self.blocks[index - 1].size += self.blocks[index].size;
            self.blocks.remove(index);
        }
        (released.offset, released.size)
    }

    /// Extend the cover by `added` bytes of new free space at the end,
    /// merging into a trailing free block when there is one.
    pub(crate) fn extend(&mut self, added: u32) {
        if added == 0 {
            return;
        }
        let offset = self.cover_end();
        match self.blocks.last_mut() {
            Some(last) if last.is_free() => last.size += added,
            _ => self.blocks.push(Block {
                offset,
                size: added,
                state: BlockState::Free,
            }),
        }
    }

    /// Total free bytes across all free blocks.
    pub(crate) fn free_bytes(&self) -> u32 {
        self.blocks.iter().filter(|b| b.is_free()).map(|b| b.size).sum()
    }

    /// Size of the trailing free block, or 0 if the cover ends allocated.
    pub(crate) fn trailing_free(&self) -> u32 {
        self.blocks.last().filter(|b| b.is_free()).map_or(0, |b| b.size)
    }

    /// One past the last covered byte.
    fn cover_end(&self) -> u32 {
        self.blocks.last().map_or(0, Block::end)
    }

    /// Verify the structural invariants: sorted by offset, gap-free,
    /// exactly covering `arena_bytes`, sizes nonzero multiples of
    /// [`BLOCK_ALIGN`], and no two adjacent blocks both free.
    pub(crate) fn check(&self, arena_bytes: u32) -> Result<(), String> {
        let mut cursor = 0u32;
        let mut prev_free = false;
        for block in &self.blocks {
            if block.offset != cursor {
                return Err(format!(
                    "block at offset {} leaves a gap from {cursor}",
                    block.offset
                ));
            }
            if block.size == 0 || block.size % BLOCK_ALIGN != 0 {
                return Err(format!(
                    "block at offset {} has bad size {}",
                    block.offset, block.size
                ));
            }
            if prev_free && block.is_free() {
                return Err(format!("adjacent free blocks at offset {}", block.offset));
            }
            prev_free = block.is_free();
            cursor += block.size;
        }
        if cursor != arena_bytes {
            return Err(format!("blocks cover {cursor} bytes, arena has {arena_bytes}"));
        }
        Ok(())
    }
}
