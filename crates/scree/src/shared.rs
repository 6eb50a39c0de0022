//! Mutex-wrapped shared heap and RAII block ownership.
//!
//! [`SharedHeap`] is the documented concurrent form of [`Heap`]: one
//! mutex around the whole allocator, so every metadata mutation happens
//! inside a single critical section. Its allocations come back as
//! [`HeapBox`]es, owning handles that release on drop; the double-release
//! mistake the raw handle API permits is unrepresentable here.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::audit::LeakRecord;
use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::handle::BlockHandle;
use crate::heap::Heap;
use crate::stats::HeapStats;

/// A [`Heap`] shared between threads behind an `Arc<Mutex<..>>`.
///
/// Clones are cheap and refer to the same arena. Every method locks for
/// its full duration; operations from different threads never interleave
/// mid-mutation.
#[derive(Clone, Debug)]
pub struct SharedHeap {
    inner: Arc<Mutex<Heap>>,
}

// Compile-time assertion: SharedHeap must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SharedHeap>();
};

impl SharedHeap {
    /// Create a shared heap from `config`.
    ///
    /// # Errors
    ///
    /// Same as [`Heap::new`].
    pub fn new(config: HeapConfig) -> Result<Self, HeapError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Heap::new(config)?)),
        })
    }

    /// Allocate `size` bytes, returning an owning [`HeapBox`].
    ///
    /// # Errors
    ///
    /// Same as [`Heap::allocate`].
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn allocate(&self, size: u32) -> Result<HeapBox, HeapError> {
        let handle = self.lock().allocate(size)?;
        Ok(HeapBox {
            heap: self.clone(),
            handle: Some(handle),
        })
    }

    /// Allocate `size` zero-filled bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Heap::allocate`].
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn allocate_zeroed(&self, size: u32) -> Result<HeapBox, HeapError> {
        let handle = self.lock().allocate_zeroed(size)?;
        Ok(HeapBox {
            heap: self.clone(),
            handle: Some(handle),
        })
    }

    /// Snapshot of allocator statistics.
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn stats(&self) -> HeapStats {
        self.lock().stats()
    }

    /// Live allocations, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn leaks(&self) -> Vec<LeakRecord> {
        self.lock().leaks()
    }

    fn lock(&self) -> MutexGuard<'_, Heap> {
        self.inner
            .lock()
            .expect("heap mutex poisoned: a holder panicked mid-operation")
    }
}

/// Uniquely-owned allocation in a [`SharedHeap`].
///
/// Not `Clone`: there is exactly one owner, and dropping it releases the
/// block. [`release`](Self::release) does the same a call earlier for
/// code that wants the explicit form.
#[derive(Debug)]
pub struct HeapBox {
    heap: SharedHeap,
    /// `Some` until released or dropped; taken exactly once.
    handle: Option<BlockHandle>,
}

impl HeapBox {
    /// Requested length in bytes.
    pub fn len(&self) -> u32 {
        self.live_handle().len()
    }

    /// Whether this is a zero-size allocation.
    pub fn is_empty(&self) -> bool {
        self.live_handle().is_empty()
    }

    /// Read access to the block's bytes.
    ///
    /// The returned guard holds the heap lock; keep it short-lived.
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn bytes(&self) -> BytesRef<'_> {
        BytesRef {
            guard: self.heap.lock(),
            handle: self.live_handle(),
        }
    }

    /// Write access to the block's bytes.
    ///
    /// The returned guard holds the heap lock; keep it short-lived.
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn bytes_mut(&mut self) -> BytesMut<'_> {
        BytesMut {
            guard: self.heap.lock(),
            handle: self.live_handle(),
        }
    }

    /// Release the block now instead of at drop time.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` only if the underlying heap no longer knows the
    /// block, which a `HeapBox` rules out by construction.
    ///
    /// # Panics
    ///
    /// Panics if the heap mutex is poisoned.
    pub fn release(mut self) -> Result<(), HeapError> {
        match self.handle.take() {
            Some(handle) => self.heap.lock().release(handle),
            None => Ok(()),
        }
    }

    fn live_handle(&self) -> BlockHandle {
        self.handle.expect("handle present until the box is consumed")
    }
}

impl Drop for HeapBox {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // A poisoned mutex means another thread panicked mid-operation;
            // skip the release rather than panicking inside drop.
            if let Ok(mut heap) = self.heap.inner.lock() {
                let _ = heap.release(handle);
            }
        }
    }
}

/// Shared view of a [`HeapBox`]'s bytes. Holds the heap lock while alive.
pub struct BytesRef<'a> {
    guard: MutexGuard<'a, Heap>,
    handle: BlockHandle,
}

impl std::ops::Deref for BytesRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard
            .data(&self.handle)
            .expect("box owns a live handle")
    }
}

/// Mutable view of a [`HeapBox`]'s bytes. Holds the heap lock while alive.
pub struct BytesMut<'a> {
    guard: MutexGuard<'a, Heap>,
    handle: BlockHandle,
}

impl std::ops::Deref for BytesMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard
            .data(&self.handle)
            .expect("box owns a live handle")
    }
}

impl std::ops::DerefMut for BytesMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.guard
            .data_mut(&self.handle)
            .expect("box owns a live handle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_round_trips_bytes() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let mut block = heap.allocate(8).unwrap();
        block.bytes_mut().copy_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]);
        assert_eq!(&block.bytes()[..], &[9, 8, 7, 6, 5, 4, 3, 2]);
        assert_eq!(block.len(), 8);
        assert!(!block.is_empty());
    }

    #[test]
    fn dropping_a_box_releases_its_block() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        {
            let _block = heap.allocate(16).unwrap();
            assert_eq!(heap.stats().live_blocks, 1);
        }
        let stats = heap.stats();
        assert_eq!(stats.live_blocks, 0);
        assert_eq!(stats.free_bytes, stats.arena_bytes);
        assert_eq!(stats.releases, 1);
    }

    #[test]
    fn explicit_release_counts_once() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let block = heap.allocate(16).unwrap();
        block.release().unwrap();
        // The drop that follows release() must not release again.
        let stats = heap.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.live_blocks, 0);
    }

    #[test]
    fn clones_share_one_arena() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let other = heap.clone();
        let _block = other.allocate(32).unwrap();
        assert_eq!(heap.stats().live_blocks, 1);
        assert_eq!(heap.stats().live_bytes, 32);
    }

    #[test]
    fn zeroed_box_reads_back_zero() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let block = heap.allocate_zeroed(10).unwrap();
        assert!(block.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_size_box_is_empty() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let block = heap.allocate(0).unwrap();
        assert!(block.is_empty());
        assert_eq!(block.bytes().len(), 0);
        block.release().unwrap();
        assert_eq!(heap.stats().releases, 0);
    }

    #[test]
    fn exhausted_shared_heap_reports_out_of_memory() {
        let heap = SharedHeap::new(HeapConfig::fixed(32)).unwrap();
        let _a = heap.allocate(32).unwrap();
        let err = heap.allocate(8).unwrap_err();
        assert!(matches!(err, HeapError::OutOfMemory { .. }));
    }

    #[test]
    fn shared_types_format_for_debug() {
        // unwrap_err on allocate results needs these Debug impls.
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let block = heap.allocate(8).unwrap();
        assert!(format!("{heap:?}").starts_with("SharedHeap"));
        assert!(format!("{block:?}").starts_with("HeapBox"));
    }

    #[test]
    fn leaks_visible_through_shared_view() {
        let heap = SharedHeap::new(HeapConfig::fixed(64)).unwrap();
        let block = heap.allocate(16).unwrap();
        let leaks = heap.leaks();
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].requested, 16);
        drop(block);
        assert!(heap.leaks().is_empty());
    }
}
