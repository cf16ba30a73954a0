//! # In-Memory State Backend
//!
//! Committed contract storage held in memory. Used by tests, gas estimation
//! and single-node setups; a production node plugs in the State Management
//! subsystem instead.

use crate::domain::value_objects::{Address, StorageKey, StorageValue};
use crate::errors::StateError;
use crate::ports::outbound::{StateBackend, StorageChange};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory committed storage.
#[derive(Debug, Default)]
pub struct InMemoryStateBackend {
    /// Ordered so that `entries` needs no sort.
    storage: RwLock<BTreeMap<(Address, StorageKey), StorageValue>>,
}

impl InMemoryStateBackend {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }

    /// Deep copy of the current contents, for throw-away execution.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            storage: RwLock::new(self.storage.read().clone()),
        }
    }
}

impl StateBackend for InMemoryStateBackend {
    fn get(&self, address: &Address, key: &StorageKey) -> Result<Option<StorageValue>, StateError> {
        Ok(self.storage.read().get(&(*address, key.clone())).cloned())
    }

    fn apply(&self, changes: Vec<StorageChange>) -> Result<(), StateError> {
        // One write lock for the whole batch keeps it atomic for readers.
        let mut storage = self.storage.write();
        for (slot, value) in changes {
            match value {
                Some(value) if !value.is_empty() => {
                    storage.insert(slot, value);
                }
                _ => {
                    storage.remove(&slot);
                }
            }
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(Address, StorageKey, StorageValue)>, StateError> {
        Ok(self
            .storage
            .read()
            .iter()
            .map(|((address, key), value)| (*address, key.clone(), value.clone()))
            .collect())
    }
}
