//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the contract runtime depends on. Adapters implement them.
//!
//! - Chain-committed contract storage (the State Management subsystem)

use crate::domain::value_objects::{Address, StorageKey, StorageValue};
use crate::errors::StateError;

// =============================================================================
// STATE BACKEND (Subsystem 4 Dependency)
// =============================================================================

/// One committed write. `None` deletes the key.
pub type StorageChange = ((Address, StorageKey), Option<StorageValue>);

/// Chain-committed contract storage.
///
/// From the point of view of an in-flight invocation the backend is
/// read-only: all writes are buffered in snapshots and reach the backend in
/// one [`apply`](StateBackend::apply) when the outermost snapshot commits.
///
/// The interface is synchronous because execution never suspends mid-call.
///
/// ## Implementation Notes
///
/// An adapter must make `apply` atomic: either every change lands or none
/// does. Readers on other threads must never observe half a batch.
pub trait StateBackend: Send + Sync {
    /// Reads one committed value.
    ///
    /// # Returns
    ///
    /// * `Some(value)` - key is present
    /// * `None` - key was never written or was deleted
    fn get(&self, address: &Address, key: &StorageKey) -> Result<Option<StorageValue>, StateError>;

    /// Atomically applies a batch of writes.
    fn apply(&self, changes: Vec<StorageChange>) -> Result<(), StateError>;

    /// Every committed entry, in ascending `(address, key)` order.
    ///
    /// Used to compute the state root.
    fn entries(&self) -> Result<Vec<(Address, StorageKey, StorageValue)>, StateError>;
}
