//! Transient resource bindings for component source.
//!
//! Every load works from a [`ResourceHandle`]: an addressable, write-once
//! binding of normalized source text, the in-process analogue of a blob URL.
//! Each `acquire` must be matched by exactly one effective `release`,
//! whatever happens to the load in between; the counters in
//! [`ResourceStats`] make that auditable.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use uuid::Uuid;

/// Address scheme for source bindings.
const ADDRESS_SCHEME: &str = "vibe-blob";

/// Unique identifier of a binding within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    /// The raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Opaque handle to one transient source binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: ResourceId,
    key: Uuid,
}

impl ResourceHandle {
    /// Registry-local identifier.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Globally unique address of the binding (`vibe-blob:<uuid>`).
    pub fn address(&self) -> String {
        format!("{ADDRESS_SCHEME}:{}", self.key)
    }

    /// Filesystem-safe form of the address, used to name scratch
    /// directories.
    pub fn slug(&self) -> String {
        self.key.simple().to_string()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ADDRESS_SCHEME}:{}", self.key)
    }
}

/// Acquire/release counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Total bindings created.
    pub acquired: u64,
    /// Total bindings freed (repeat releases are not counted).
    pub released: u64,
}

impl ResourceStats {
    /// Bindings currently alive.
    pub fn live(&self) -> u64 {
        self.acquired - self.released
    }
}

/// Registry of live source bindings.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    /// Live bindings
    live: FxHashMap<ResourceId, Arc<str>>,
    /// Next identifier to mint
    next_id: u64,
    stats: ResourceStats,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `text` to a fresh handle. Never blocks.
    pub fn acquire(&mut self, text: impl Into<Arc<str>>) -> ResourceHandle {
        let id = ResourceId(self.next_id);
        self.next_id += 1;

        let handle = ResourceHandle {
            id,
            key: Uuid::new_v4(),
        };
        self.live.insert(id, text.into());
        self.stats.acquired += 1;

        tracing::trace!(resource = %handle, "acquired resource");
        handle
    }

    /// Free a binding.
    ///
    /// Returns `true` if this call freed it and `false` if it was already
    /// released. Releasing twice is a no-op.
    pub fn release(&mut self, handle: &ResourceHandle) -> bool {
        if handle.id.0 >= self.next_id {
            tracing::warn!(resource = %handle, "release of a handle this registry never issued");
            return false;
        }

        if self.live.remove(&handle.id).is_some() {
            self.stats.released += 1;
            tracing::trace!(resource = %handle, "released resource");
            true
        } else {
            false
        }
    }

    /// Read back the text bound to a live handle.
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<str>> {
        self.live.get(&handle.id).cloned()
    }

    /// Whether the handle is still bound.
    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.live.contains_key(&handle.id)
    }

    /// Number of live bindings.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Counters since creation.
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    /// Free every live binding, returning how many were freed.
    pub fn release_all(&mut self) -> usize {
        let freed = self.live.len();
        self.live.clear();
        self.stats.released += freed as u64;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_binds_text() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.acquire("pub fn component() {}");

        assert!(registry.is_live(&handle));
        assert_eq!(registry.resolve(&handle).as_deref(), Some("pub fn component() {}"));
        assert!(handle.address().starts_with("vibe-blob:"));
        assert_eq!(registry.stats().live(), 1);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut registry = ResourceRegistry::new();
        let a = registry.acquire("same");
        let b = registry.acquire("same");

        assert_ne!(a, b);
        assert_ne!(a.address(), b.address());
        assert_ne!(a.slug(), b.slug());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.acquire("text");

        assert!(registry.release(&handle));
        assert!(!registry.release(&handle));
        assert!(registry.resolve(&handle).is_none());

        let stats = registry.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn test_release_of_foreign_handle_is_ignored() {
        let mut other = ResourceRegistry::new();
        other.acquire("a");
        let foreign = other.acquire("b");

        let mut registry = ResourceRegistry::new();
        assert!(!registry.release(&foreign));
        assert_eq!(registry.stats(), ResourceStats::default());
    }

    #[test]
    fn test_release_all() {
        let mut registry = ResourceRegistry::new();
        let first = registry.acquire("1");
        registry.acquire("2");
        registry.release(&first);

        assert_eq!(registry.release_all(), 1);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.stats().acquired, registry.stats().released);
    }
}
