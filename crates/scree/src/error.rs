//! Heap-specific error types.

use std::error::Error;
use std::fmt;

use crate::handle::AllocTag;

/// Errors that can occur during heap operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// No free block can satisfy the request, and the arena is already at
    /// its ceiling (or cannot grow far enough to create one).
    OutOfMemory {
        /// Number of bytes requested, before alignment rounding.
        requested: usize,
        /// Free bytes across all free blocks at the time of the request.
        free_bytes: usize,
        /// Arena size in bytes at the time of the request.
        arena_bytes: usize,
    },
    /// A handle that does not name a live allocation: already released,
    /// recycled by a newer allocation, or never issued by this heap.
    InvalidHandle {
        /// Byte offset carried by the handle.
        offset: u32,
        /// Allocation tag carried by the handle.
        tag: AllocTag,
    },
    /// Configuration rejected at construction time.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                free_bytes,
                arena_bytes,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, {free_bytes} free of {arena_bytes} arena bytes"
                )
            }
            Self::InvalidHandle { offset, tag } => {
                write!(f, "invalid handle: offset {offset}, tag {tag}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid heap config: {reason}")
            }
        }
    }
}

impl Error for HeapError {}
