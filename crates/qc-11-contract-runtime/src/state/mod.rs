//! # State Repository
//!
//! Per-invocation-tree view of contract storage with nested snapshots.
//!
//! ```text
//!   get ──► innermost snapshot ──► ... ──► outermost snapshot ──► backend
//!   set ──► innermost snapshot only
//!   commit(inner)  folds its writes into the next snapshot out
//!   commit(outer)  applies its writes to the backend in one batch
//!   rollback(any)  discards its writes
//! ```
//!
//! Snapshots close in strict LIFO order, mirroring the call stack. Dropping
//! the repository discards every open snapshot, which is how an abandoned
//! invocation tree is cancelled.

pub mod root;

pub use root::{compute_root, leaf_hash};

use crate::domain::services::code_key;
use crate::domain::value_objects::{Address, ByteCode, Hash, StorageKey, StorageValue};
use crate::errors::StateError;
use crate::ports::outbound::StateBackend;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Buffered writes of one snapshot. `None` marks a deletion.
type WriteSet = BTreeMap<(Address, StorageKey), Option<StorageValue>>;

/// Handle to an open snapshot. Consumed by commit or rollback, so a
/// snapshot can be closed only once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an open snapshot must be committed or rolled back"]
pub struct Snapshot {
    id: usize,
}

impl Snapshot {
    /// Repository-unique id.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

struct Layer {
    id: usize,
    writes: WriteSet,
}

/// Snapshot stack over a shared committed backend.
pub struct StateRepository {
    backend: Arc<dyn StateBackend>,
    layers: Vec<Layer>,
    next_id: usize,
}

impl StateRepository {
    /// Creates a repository with no open snapshot.
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            layers: Vec::new(),
            next_id: 1,
        }
    }

    /// Number of open snapshots.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Reads a value through every open snapshot, innermost first.
    pub fn get(
        &self,
        address: &Address,
        key: &StorageKey,
    ) -> Result<Option<StorageValue>, StateError> {
        let lookup = (*address, key.clone());
        for layer in self.layers.iter().rev() {
            if let Some(buffered) = layer.writes.get(&lookup) {
                return Ok(buffered.clone());
            }
        }
        self.backend.get(address, key)
    }

    /// Buffers a write in the innermost snapshot. An empty value deletes.
    pub fn set(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        let layer = self.layers.last_mut().ok_or(StateError::NoOpenSnapshot)?;
        let value = if value.is_empty() { None } else { Some(value) };
        layer.writes.insert((address, key), value);
        Ok(())
    }

    /// Opens a snapshot on top of the current innermost one.
    pub fn open_snapshot(&mut self) -> Snapshot {
        let id = self.next_id;
        self.next_id += 1;
        self.layers.push(Layer {
            id,
            writes: WriteSet::new(),
        });
        debug!(snapshot = id, depth = self.layers.len(), "snapshot opened");
        Snapshot { id }
    }

    /// Folds the snapshot into its parent, or into the backend if it is the
    /// outermost one.
    pub fn commit(&mut self, snapshot: Snapshot) -> Result<(), StateError> {
        let layer = self.pop(&snapshot)?;
        let writes = layer.writes.len();
        match self.layers.last_mut() {
            Some(parent) => parent.writes.extend(layer.writes),
            // A failed batch leaves the backend untouched; the snapshot is gone either way.
            None => self.backend.apply(layer.writes.into_iter().collect())?,
        }
        debug!(snapshot = snapshot.id, writes, depth = self.layers.len(), "snapshot committed");
        Ok(())
    }

    /// Discards the snapshot and everything it buffered.
    pub fn rollback(&mut self, snapshot: Snapshot) -> Result<(), StateError> {
        let layer = self.pop(&snapshot)?;
        debug!(
            snapshot = snapshot.id,
            discarded = layer.writes.len(),
            depth = self.layers.len(),
            "snapshot rolled back"
        );
        Ok(())
    }

    fn pop(&mut self, snapshot: &Snapshot) -> Result<Layer, StateError> {
        match self.layers.last() {
            Some(top) if top.id == snapshot.id => {}
            Some(top) if self.layers.iter().any(|l| l.id == snapshot.id) => {
                return Err(StateError::SnapshotOrder {
                    expected: top.id,
                    got: snapshot.id,
                })
            }
            _ => return Err(StateError::UnknownSnapshot(snapshot.id)),
        }
        self.layers.pop().ok_or(StateError::UnknownSnapshot(snapshot.id))
    }

    /// Root of the state as seen through every open snapshot.
    pub fn root_hash(&self) -> Result<Hash, StateError> {
        let mut view: BTreeMap<(Address, StorageKey), StorageValue> = self
            .backend
            .entries()?
            .into_iter()
            .map(|(address, key, value)| ((address, key), value))
            .collect();
        for layer in &self.layers {
            for (slot, value) in &layer.writes {
                match value {
                    Some(value) => {
                        view.insert(slot.clone(), value.clone());
                    }
                    None => {
                        view.remove(slot);
                    }
                }
            }
        }
        Ok(compute_root(view.iter().map(|((a, k), v)| (a, k, v))))
    }

    /// Deployed code at `address`.
    pub fn code(&self, address: &Address) -> Result<Option<ByteCode>, StateError> {
        Ok(self
            .get(address, &code_key())?
            .map(|value| ByteCode::new(value.0)))
    }

    /// Stores deployed code at `address`.
    pub fn set_code(&mut self, address: Address, code: &ByteCode) -> Result<(), StateError> {
        self.set(address, code_key(), StorageValue::new(code.as_slice()))
    }
}

impl std::fmt::Debug for StateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRepository")
            .field("depth", &self.layers.len())
            .finish_non_exhaustive()
    }
}
