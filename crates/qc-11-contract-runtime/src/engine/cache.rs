//! # Module Cache
//!
//! LRU of parsed modules keyed by code hash, so stored code is parsed once
//! and not on every call. Bytecode is immutable once deployed, so entries
//! never go stale.

use crate::domain::value_objects::Hash;
use crate::module::Module;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Shared parsed-module cache.
pub struct ModuleCache {
    inner: Mutex<LruCache<Hash, Arc<Module>>>,
}

impl ModuleCache {
    /// Creates a cache holding at most `capacity` modules (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Returns the module for `code_hash`, marking it recently used.
    #[must_use]
    pub fn get(&self, code_hash: &Hash) -> Option<Arc<Module>> {
        self.inner.lock().get(code_hash).cloned()
    }

    /// Caches a parsed module.
    pub fn insert(&self, code_hash: Hash, module: Arc<Module>) {
        self.inner.lock().put(code_hash, module);
    }

    /// Number of cached modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl std::fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ModuleCache")
            .field("len", &inner.len())
            .field("cap", &inner.cap())
            .finish()
    }
}
