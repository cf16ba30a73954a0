//! # Invocation Context
//!
//! Everything one in-flight invocation owns: its frame, its gas meter, its
//! state snapshot, the logs it has emitted so far and its observer
//! registration. Contexts live on the engine's explicit call stack and are
//! closed in LIFO order.

use crate::domain::entities::LogEntry;
use crate::domain::value_objects::{Address, InvocationId, StorageKey, StorageValue};
use crate::errors::ExecutionFault;
use crate::gas::{GasMeter, GasSchedule, RegistrationGuard};
use crate::state::{Snapshot, StateRepository};
use crate::vm::{self, Exit, Frame, Host};

/// One entry of the call stack.
#[derive(Debug)]
pub struct InvocationContext<'e> {
    pub(crate) id: InvocationId,
    pub(crate) depth: usize,
    pub(crate) meter: GasMeter,
    pub(crate) snapshot: Snapshot,
    pub(crate) frame: Frame,
    /// Logs of this invocation and its committed children, in order.
    pub(crate) logs: Vec<LogEntry>,
    pub(crate) registration: RegistrationGuard<'e>,
}

impl InvocationContext<'_> {
    /// Invocation id.
    #[must_use]
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Call stack depth (0 for the outermost invocation).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Contract being executed.
    #[must_use]
    pub fn address(&self) -> Address {
        self.frame.address()
    }

    /// Runs the frame until it returns, faults or suspends.
    pub(crate) fn run(
        &mut self,
        state: &mut StateRepository,
        schedule: &GasSchedule,
    ) -> Result<Exit, ExecutionFault> {
        let mut host = StateHost {
            state,
            logs: &mut self.logs,
        };
        vm::run(&mut self.frame, &mut self.meter, &mut host, schedule)
    }
}

/// [`Host`] over the repository's innermost snapshot.
struct StateHost<'a> {
    state: &'a mut StateRepository,
    logs: &'a mut Vec<LogEntry>,
}

impl Host for StateHost<'_> {
    fn storage_get(
        &mut self,
        address: &Address,
        key: &StorageKey,
    ) -> Result<Option<StorageValue>, ExecutionFault> {
        Ok(self.state.get(address, key)?)
    }

    fn storage_set(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), ExecutionFault> {
        Ok(self.state.set(address, key, value)?)
    }

    fn emit(&mut self, log: LogEntry) {
        self.logs.push(log);
    }
}
