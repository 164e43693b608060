//! Locally unique identifier allocation

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

/// Process-local handle for a logical element
///
/// Serialized as a bare integer so snapshots and wire messages stay plain JSON.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocallyUniqueId(u64);

impl LocallyUniqueId {
    /// Wrap a raw value (used when decoding snapshots produced elsewhere)
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for LocallyUniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl fmt::Display for LocallyUniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LocallyUniqueId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

/// Monotonic ID allocator
///
/// Never hands out the same value twice. One allocator per realm.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator starting at zero
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create an allocator whose first ID is `first`
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocate the next unique ID
    pub fn next_id(&self) -> LocallyUniqueId {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        LocallyUniqueId(raw)
    }

    /// The value the next call to [`next_id`](Self::next_id) will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocator_never_repeats() {
        let alloc = IdAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(alloc.next_id()));
        }
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let alloc = IdAllocator::starting_at(40);
        let a = alloc.next_id();
        let b = alloc.next_id();
        assert_eq!(a.raw(), 40);
        assert!(b > a);
        assert_eq!(alloc.peek(), 42);
    }

    #[test]
    fn test_id_serializes_as_integer() {
        let id = LocallyUniqueId::from_raw(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: LocallyUniqueId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
        assert_eq!(id.to_string(), "7");
    }
}
