//! Heap configuration parameters.

/// Configuration for a [`Heap`](crate::Heap).
///
/// Controls arena sizing, the growth ceiling, and split behaviour.
/// Validated by [`Heap::new`](crate::Heap::new); all values are immutable
/// after construction.
#[derive(Clone, Debug)]
pub struct HeapConfig {
    /// Arena size in bytes at construction.
    ///
    /// Default: 65_536 (64KiB). Must be a multiple of
    /// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN). Zero is allowed; the arena
    /// then starts empty and grows on first use if `max_bytes` permits.
    pub initial_bytes: u32,

    /// Ceiling the arena may grow to, in bytes.
    ///
    /// Default: 16_777_216 (16MiB). Must be a multiple of
    /// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN) and at least `initial_bytes`.
    /// Equal to `initial_bytes` means the arena never grows.
    pub max_bytes: u32,

    /// Smallest remainder worth keeping as its own free block.
    ///
    /// When a free block is larger than a request, the tail is split off
    /// only if it is at least this many bytes; otherwise the whole block is
    /// handed out. Default: 32. Must be a nonzero multiple of
    /// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN).
    pub min_split_bytes: u32,

    /// Fill released memory with a poison pattern, and verify the pattern
    /// is still intact when the bytes are handed out again.
    ///
    /// Defaults to `true` in debug builds and `false` in release builds.
    pub debug_fill: bool,
}

impl HeapConfig {
    /// Default initial arena size: 64KiB.
    pub const DEFAULT_INITIAL_BYTES: u32 = 64 * 1024;

    /// Default growth ceiling: 16MiB.
    pub const DEFAULT_MAX_BYTES: u32 = 16 * 1024 * 1024;

    /// Default split threshold in bytes.
    pub const DEFAULT_MIN_SPLIT_BYTES: u32 = 32;

    /// Config for a fixed-size arena: `bytes` up front, no growth.
    pub fn fixed(bytes: u32) -> Self {
        Self {
            initial_bytes: bytes,
            max_bytes: bytes,
            min_split_bytes: Self::DEFAULT_MIN_SPLIT_BYTES,
            debug_fill: cfg!(debug_assertions),
        }
    }

    /// Config for an arena that starts at `initial_bytes` and may grow up
    /// to `max_bytes`.
    pub fn growable(initial_bytes: u32, max_bytes: u32) -> Self {
        Self {
            initial_bytes,
            max_bytes,
            min_split_bytes: Self::DEFAULT_MIN_SPLIT_BYTES,
            debug_fill: cfg!(debug_assertions),
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::growable(Self::DEFAULT_INITIAL_BYTES, Self::DEFAULT_MAX_BYTES)
    }
}
