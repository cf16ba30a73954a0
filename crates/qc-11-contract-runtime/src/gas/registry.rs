//! # Observer Registry
//!
//! Id-keyed map of live invocations. Entries are inserted when an invocation
//! starts and removed when it ends, whatever the outcome. Lookups never scan.
//!
//! The registry hands out [`ObserverHandle`]s: read-only views of a meter's
//! progress. The meter itself stays exclusively owned by its invocation, so
//! concurrent unrelated invocations never share mutable gas state.

use crate::domain::value_objects::{Address, InvocationId};
use crate::errors::RegistryError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Read-only view of one live invocation.
#[derive(Clone, Debug)]
pub struct ObserverHandle {
    id: InvocationId,
    parent: Option<InvocationId>,
    contract: Address,
    depth: usize,
    limit: u64,
    gauge: Arc<AtomicU64>,
}

impl ObserverHandle {
    /// Invocation id.
    #[must_use]
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Calling invocation, if nested.
    #[must_use]
    pub fn parent(&self) -> Option<InvocationId> {
        self.parent
    }

    /// Contract being executed.
    #[must_use]
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Depth in the call stack (0 for the outermost invocation).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Meter limit.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas spent as last published by the meter.
    #[must_use]
    pub fn spent(&self) -> u64 {
        self.gauge.load(Ordering::Acquire)
    }

    /// The shared gauge the owning meter publishes into.
    #[must_use]
    pub fn gauge(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.gauge)
    }
}

/// Registration details of a new invocation.
#[derive(Clone, Copy, Debug)]
pub struct Registration {
    /// Calling invocation, if nested.
    pub parent: Option<InvocationId>,
    /// Contract being executed.
    pub contract: Address,
    /// Call stack depth.
    pub depth: usize,
    /// Meter limit.
    pub limit: u64,
}

/// Concurrent map of live invocations.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    entries: RwLock<HashMap<InvocationId, ObserverHandle>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` and returns its handle.
    pub fn register(
        &self,
        id: InvocationId,
        reg: Registration,
    ) -> Result<ObserverHandle, RegistryError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        let handle = ObserverHandle {
            id,
            parent: reg.parent,
            contract: reg.contract,
            depth: reg.depth,
            limit: reg.limit,
            gauge: Arc::new(AtomicU64::new(0)),
        };
        entries.insert(id, handle.clone());
        Ok(handle)
    }

    /// Registers `id` for the lifetime of the returned guard.
    pub fn register_scoped(
        &self,
        id: InvocationId,
        reg: Registration,
    ) -> Result<(ObserverHandle, RegistrationGuard<'_>), RegistryError> {
        let handle = self.register(id, reg)?;
        Ok((handle, RegistrationGuard { registry: self, id }))
    }

    /// Looks up a live invocation.
    pub fn lookup(&self, id: InvocationId) -> Result<ObserverHandle, RegistryError> {
        self.entries
            .read()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Removes a finished invocation.
    pub fn unregister(&self, id: InvocationId) -> Result<ObserverHandle, RegistryError> {
        self.entries
            .write()
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Number of live invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no invocation is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Unregisters its invocation when dropped, on every exit path.
#[derive(Debug)]
pub struct RegistrationGuard<'a> {
    registry: &'a ObserverRegistry,
    id: InvocationId,
}

impl RegistrationGuard<'_> {
    /// Id held by this guard.
    #[must_use]
    pub fn id(&self) -> InvocationId {
        self.id
    }
}

impl Drop for RegistrationGuard<'_> {
    fn drop(&mut self) {
        let _ = self.registry.unregister(self.id);
    }
}
