//! First-fit heap allocation over a growable byte arena, with tag-checked
//! handles.
//!
//! A [`Heap`] owns a single arena of bytes, hands out uniquely-owned
//! blocks on request, reclaims them on release, and never hands out
//! overlapping live blocks. Handles are validated on every use, so double
//! release and stale copies of recycled blocks come back as
//! [`HeapError::InvalidHandle`] instead of silently corrupting memory.
//!
//! # Architecture
//!
//! ```text
//! Heap (orchestrator)
//! ├── Vec<u8> arena (grows toward max_bytes; handles hold offsets,
//! │   so reallocation of the backing vec never invalidates them)
//! ├── BlockList (offset-ordered Free/Allocated metadata; sorted,
//! │   gap-free, exactly covering the arena, free neighbours merged)
//! ├── AllocLedger (live allocations in allocation order)
//! └── counters (allocations, releases, growth, peak live bytes)
//!
//! SharedHeap = Arc<Mutex<Heap>>
//! └── HeapBox (RAII owner) → BytesRef / BytesMut (lock-holding views)
//! ```
//!
//! # Allocation policy
//!
//! Address-ordered first-fit. Requests round up to [`BLOCK_ALIGN`]; the
//! lowest-offset free block that fits is taken, splitting off tails of at
//! least `min_split_bytes` and absorbing smaller ones. Release merges
//! adjacent free blocks immediately.
//!
//! # Quick start
//!
//! ```rust
//! use scree::{Heap, HeapConfig};
//!
//! let mut heap = Heap::new(HeapConfig::fixed(64)).unwrap();
//! let block = heap.allocate(8).unwrap();
//! heap.data_mut(&block)
//!     .unwrap()
//!     .copy_from_slice(&42u64.to_le_bytes());
//! assert_eq!(heap.data(&block).unwrap(), &42u64.to_le_bytes());
//! heap.release(block).unwrap();
//! assert_eq!(heap.free_bytes(), 64);
//! ```
//!
//! # Safety
//!
//! The whole allocator is safe Rust: block metadata lives beside the
//! arena rather than inside it, handles are offsets rather than pointers,
//! and `unsafe` is denied crate-wide.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod audit;
pub mod block;
pub mod config;
pub mod error;
pub mod handle;
pub mod heap;
pub mod shared;
pub mod stats;

// Public re-exports for the primary API surface.
pub use audit::{LeakRecord, POISON_BYTE};
pub use block::BLOCK_ALIGN;
pub use config::HeapConfig;
pub use error::HeapError;
pub use handle::{AllocTag, BlockHandle};
pub use heap::Heap;
pub use shared::{BytesMut, BytesRef, HeapBox, SharedHeap};
pub use stats::HeapStats;
