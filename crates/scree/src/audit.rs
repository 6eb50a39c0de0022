//! Debug instrumentation: poison fills and the allocation ledger.
//!
//! With `debug_fill` on, every arena byte not owned by a live allocation
//! holds [`POISON_BYTE`]. Release fills the freed block, growth fills the
//! new tail, and allocation verifies the chosen block is still intact
//! before handing it out. Writes through a slice that outlived its
//! allocation surface as a verification panic near the damage instead of
//! silent cross-allocation corruption.
//!
//! The [`AllocLedger`] records every live allocation in allocation order
//! and powers [`Heap::leaks`](crate::Heap::leaks) and stats cross-checks.

use crate::handle::AllocTag;

/// Fill byte for released memory.
pub const POISON_BYTE: u8 = 0xF2;

/// Fill `len` bytes of `arena` at `offset` with [`POISON_BYTE`].
pub(crate) fn poison(arena: &mut [u8], offset: u32, len: u32) {
    let start = offset as usize;
    arena[start..start + len as usize].fill(POISON_BYTE);
}

/// Check that `len` bytes of `arena` at `offset` still hold
/// [`POISON_BYTE`]. Reports the arena offset of the first byte that does
/// not.
pub(crate) fn verify_poison(arena: &[u8], offset: u32, len: u32) -> Result<(), u32> {
    let start = offset as usize;
    let end = start + len as usize;
    match arena[start..end].iter().position(|&b| b != POISON_BYTE) {
        Some(at) => Err(offset + at as u32),
        None => Ok(()),
    }
}

/// One live allocation, as recorded when it was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeakRecord {
    /// Byte offset of the block within the arena.
    pub offset: u32,
    /// Tag of the allocation.
    pub tag: AllocTag,
    /// Bytes the caller asked for.
    pub requested: u32,
    /// Bytes the block actually occupies.
    pub block_bytes: u32,
}

/// Live-allocation ledger, insertion-ordered.
///
/// Keys are block offsets, unique among live allocations. Entries are
/// inserted on allocate and removed on release; iteration order is
/// allocation order, which is the order a leak report wants.
#[derive(Debug, Default)]
pub(crate) struct AllocLedger {
    entries: indexmap::IndexMap<u32, LedgerEntry>,
}

#[derive(Clone, Copy, Debug)]
struct LedgerEntry {
    tag: AllocTag,
    requested: u32,
    block_bytes: u32,
}

impl AllocLedger {
    pub(crate) fn new() -> Self {
        Self {
            entries: indexmap::IndexMap::new(),
        }
    }

    /// Record a new allocation at `offset`.
    pub(crate) fn record(&mut self, offset: u32, tag: AllocTag, requested: u32, block_bytes: u32) {
        let replaced = self.entries.insert(
            offset,
            LedgerEntry {
                tag,
                requested,
                block_bytes,
            },
        );
        debug_assert!(replaced.is_none(), "two live allocations at offset {offset}");
    }

    /// Drop the entry at `offset`.
    pub(crate) fn forget(&mut self, offset: u32) {
        // shift_remove keeps the remaining entries in allocation order.
        let removed = self.entries.shift_remove(&offset);
        debug_assert!(removed.is_some(), "no live allocation at offset {offset}");
    }

    /// Number of live allocations.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Live allocations, oldest first.
    pub(crate) fn records(&self) -> Vec<LeakRecord> {
        self.entries
            .iter()
            .map(|(&offset, entry)| LeakRecord {
                offset,
                tag: entry.tag,
                requested: entry.requested,
                block_bytes: entry.block_bytes,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poison_then_verify_round_trip() {
        let mut arena = vec![0u8; 32];
        poison(&mut arena, 16, 8);
        assert!(arena[..16].iter().all(|&b| b == 0));
        assert!(arena[16..24].iter().all(|&b| b == POISON_BYTE));
        assert_eq!(verify_poison(&arena, 16, 8), Ok(()));
    }

    #[test]
    fn verify_reports_first_modified_offset() {
        let mut arena = vec![POISON_BYTE; 32];
        arena[20] = 0x00;
        arena[22] = 0x01;
        assert_eq!(verify_poison(&arena, 16, 16), Err(20));
        assert_eq!(verify_poison(&arena, 16, 4), Ok(()));
    }

    #[test]
    fn ledger_reports_in_allocation_order() {
        let mut ledger = AllocLedger::new();
        ledger.record(64, AllocTag(1), 10, 16);
        ledger.record(0, AllocTag(2), 5, 8);
        ledger.record(32, AllocTag(3), 30, 32);
        let offsets: Vec<u32> = ledger.records().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![64, 0, 32]);
    }

    #[test]
    fn forget_preserves_order_of_the_rest() {
        let mut ledger = AllocLedger::new();
        ledger.record(64, AllocTag(1), 10, 16);
        ledger.record(0, AllocTag(2), 5, 8);
        ledger.record(32, AllocTag(3), 30, 32);
        ledger.forget(0);
        let offsets: Vec<u32> = ledger.records().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![64, 32]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn records_carry_requested_and_block_bytes() {
        let mut ledger = AllocLedger::new();
        ledger.record(8, AllocTag(9), 13, 16);
        let records = ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tag, AllocTag(9));
        assert_eq!(records[0].requested, 13);
        assert_eq!(records[0].block_bytes, 16);
    }
}
