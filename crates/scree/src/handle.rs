//! Allocation handles and tags.
//!
//! A [`BlockHandle`] names one live allocation within a heap. It is
//! tag-scoped: the [`AllocTag`] lets the heap reject handles whose
//! allocation has already been released, even when the same byte range has
//! since been recycled for a newer allocation.

use std::fmt;

/// Identity of a single allocation, unique for the lifetime of a heap.
///
/// Tags are drawn from a counter that starts at 1 and never repeats.
/// Tag 0 is reserved for the empty handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocTag(pub(crate) u32);

impl AllocTag {
    /// Tag carried by empty handles (zero-size allocations).
    pub(crate) const EMPTY: Self = Self(0);

    /// Raw tag value, mostly useful in log lines.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AllocTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location and identity of one allocation within a [`Heap`](crate::Heap).
///
/// Handles are plain `Copy` values and carry no permission by themselves:
/// every heap accessor checks the tag against the block table before
/// touching memory, so a released or recycled handle is rejected with
/// [`HeapError::InvalidHandle`](crate::HeapError::InvalidHandle) rather
/// than resolving to another allocation's bytes.
///
/// The check is scoped to the issuing heap. Tags are not unique across
/// heaps, so a handle presented to some other heap is caught only when
/// its offset and tag fail to line up with a live allocation there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct BlockHandle {
    /// Byte offset of the block within the arena.
    pub(crate) offset: u32,
    /// Requested length in bytes. The underlying block may be larger.
    pub(crate) len: u32,
    /// Identity of this allocation.
    pub(crate) tag: AllocTag,
}

impl BlockHandle {
    /// Handle for a zero-size allocation. Owns no bytes, resolves to an
    /// empty slice, and releasing it is a no-op.
    pub(crate) const EMPTY: Self = Self {
        offset: 0,
        len: 0,
        tag: AllocTag::EMPTY,
    };

    /// Create a new handle.
    pub(crate) fn new(offset: u32, len: u32, tag: AllocTag) -> Self {
        Self { offset, len, tag }
    }

    /// Requested length of the allocation in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this is a zero-size allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The allocation tag.
    pub fn tag(&self) -> AllocTag {
        self.tag
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle(off={}, len={}, tag={})",
            self.offset, self.len, self.tag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trip() {
        let h = BlockHandle::new(1024, 256, AllocTag(42));
        assert_eq!(h.len(), 256);
        assert_eq!(h.tag(), AllocTag(42));
        assert_eq!(h.tag().value(), 42);
        assert!(!h.is_empty());
    }

    #[test]
    fn empty_handle_owns_nothing() {
        let h = BlockHandle::EMPTY;
        assert!(h.is_empty());
        assert_eq!(h.tag(), AllocTag::EMPTY);
    }

    #[test]
    fn display_names_all_fields() {
        let h = BlockHandle::new(64, 8, AllocTag(3));
        assert_eq!(h.to_string(), "BlockHandle(off=64, len=8, tag=3)");
    }
}
