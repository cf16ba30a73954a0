//! # Execution Engine
//!
//! Drives deployments and calls through
//! `Loaded -> Validated -> Running -> {Committed | RolledBack}`.
//!
//! ## Call stack
//!
//! Nested calls are not host recursion. The engine keeps an explicit stack
//! of [`InvocationContext`]s; a frame suspended on `Call`/`TryCall` waits on
//! the stack while its callee runs on top of it. Each context owns a
//! sub-meter reserved from its caller and a snapshot layered on its
//! caller's, so contexts close in the same LIFO order as snapshots.
//!
//! ```text
//!  caller frame ── Exit::Call ──► depth check ─► resolve ─► sub-meter + snapshot
//!       ▲                                                         │
//!       └──── resume(outcome) ◄── commit/settle or rollback/settle ◄┘
//! ```
//!
//! ## Faults
//!
//! A fault rolls back the faulting invocation's snapshot, which discards its
//! writes, its logs and those of every child it committed. Gas spent up to the
//! fault stays charged. Out-of-gas forfeits the whole limit of the meter
//! that ran out; a caller re-raising it through `Call` pays its own spend
//! plus the callee's limit.
//! Faults are always converted into receipts, never propagated as panics.

pub mod cache;
pub mod context;

pub use cache::ModuleCache;
pub use context::InvocationContext;

use crate::config::RuntimeConfig;
use crate::domain::entities::{
    CallTransaction, ContractTransaction, DeployTransaction, LogEntry, Receipt,
};
use crate::domain::invariants::check_call_depth_invariant;
use crate::domain::services::derive_contract_address;
use crate::domain::value_objects::{Address, InvocationId, Value};
use crate::errors::{ExecutionFault, TransactionRejected};
use crate::gas::{GasMeter, ObserverRegistry, Registration};
use crate::module::{load, load_with_limit, MethodDef, Module};
use crate::state::{Snapshot, StateRepository};
use crate::validator::Validator;
use crate::vm::{CallRequest, Exit, Frame};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one invocation tree.
struct TreeOutcome {
    result: Result<Option<Value>, ExecutionFault>,
    gas_used: u64,
    logs: Vec<LogEntry>,
}

impl TreeOutcome {
    fn into_receipt(self) -> Receipt {
        match self.result {
            Ok(value) => Receipt::success(self.gas_used, value, self.logs),
            Err(fault) => Receipt::failure(fault, self.gas_used),
        }
    }
}

/// The contract execution engine.
///
/// Shareable across threads: unrelated invocation trees can run
/// concurrently, each against its own [`StateRepository`]. Nothing mutable
/// is shared between them except the module cache and the observer
/// registry, both internally synchronized.
pub struct ExecutionEngine {
    config: RuntimeConfig,
    validator: Validator,
    cache: ModuleCache,
    observers: ObserverRegistry,
}

impl ExecutionEngine {
    /// Creates an engine with the validator of the configured rule set.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        let validator = Validator::for_version(config.rule_set_version);
        let cache = ModuleCache::new(config.module_cache_size);
        Self {
            config,
            validator,
            cache,
            observers: ObserverRegistry::new(),
        }
    }

    /// Replaces the validator, e.g. with additional registered rules.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Active validator.
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Live invocations.
    #[must_use]
    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Parsed-module cache.
    #[must_use]
    pub fn module_cache(&self) -> &ModuleCache {
        &self.cache
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Executes one transaction against `state`.
    ///
    /// Deployments that fail to load or validate are returned as
    /// [`TransactionRejected`]: nothing was executed, stored or charged
    /// beyond the fixed rejection fee. Everything else produces a receipt.
    pub fn execute(
        &self,
        state: &mut StateRepository,
        tx: &ContractTransaction,
    ) -> Result<Receipt, TransactionRejected> {
        match tx {
            ContractTransaction::Deploy(deploy) => self.deploy(state, deploy),
            ContractTransaction::Call(call) => Ok(self.call(state, call)),
        }
    }

    /// Deploys a contract.
    ///
    /// The code is stored and the deposit charged before the constructor
    /// runs; a constructor fault rolls both back and allocates no address.
    pub fn deploy(
        &self,
        state: &mut StateRepository,
        tx: &DeployTransaction,
    ) -> Result<Receipt, TransactionRejected> {
        // Loaded
        let module = match load_with_limit(&tx.bytecode, self.config.max_code_size) {
            Ok(module) => module,
            Err(err) => {
                warn!(creator = %tx.creator, error = %err, "deployment rejected at load");
                return Err(err.into());
            }
        };

        // Validated
        let report = self.validator.validate(&module);
        if !report.is_accepted() {
            warn!(creator = %tx.creator, %report, "deployment rejected by validator");
            return Err(TransactionRejected::Validation(report));
        }

        let address = derive_contract_address(tx.creator, tx.nonce);
        match state.code(&address) {
            Ok(None) => {}
            Ok(Some(_)) => {
                let fault = ExecutionFault::ContractAlreadyExists(address);
                return Ok(Receipt::failure(fault, 0));
            }
            Err(err) => return Ok(Receipt::failure(err.into(), 0)),
        }

        let module = Arc::new(module);
        let constructor = module
            .entry_type()
            .methods
            .iter()
            .position(MethodDef::is_constructor);
        let frame = match Frame::new(
            Arc::clone(&module),
            constructor,
            tx.args.clone(),
            address,
            tx.creator,
            self.config.max_stack_size,
        ) {
            Ok(frame) => frame,
            Err(fault) => return Ok(Receipt::failure(fault, 0)),
        };
        let mut root = match self.open_context(state, None, frame, tx.gas_limit) {
            Ok(root) => root,
            Err(fault) => return Ok(Receipt::failure(fault, 0)),
        };

        // Running
        let deposit = self.config.gas_schedule.code_deposit_cost(tx.bytecode.len());
        let prelude = root
            .meter
            .spend(deposit)
            .and_then(|()| Ok(state.set_code(address, &tx.bytecode)?));
        let outcome = match prelude {
            Ok(()) => self.run_tree(state, root),
            Err(fault) => self.close_root(state, root, Err(fault)),
        };

        if outcome.result.is_ok() {
            self.cache.insert(tx.bytecode.hash(), module);
        }
        let receipt = outcome.into_receipt();
        Ok(if receipt.success {
            receipt.with_contract_address(address)
        } else {
            receipt
        })
    }

    /// Calls a public method of a deployed contract.
    ///
    /// A missing contract, unloadable code, an unknown method or mismatched
    /// arguments fail before anything runs and cost no gas.
    pub fn call(&self, state: &mut StateRepository, tx: &CallTransaction) -> Receipt {
        let prepared = self.resolve(state, &tx.target).and_then(|module| {
            let index = callable_method(&module, &tx.method)?;
            Frame::new(
                module,
                Some(index),
                tx.args.clone(),
                tx.target,
                tx.caller,
                self.config.max_stack_size,
            )
        });
        let frame = match prepared {
            Ok(frame) => frame,
            Err(fault) => {
                debug!(
                    target_contract = %tx.target,
                    method = %tx.method,
                    %fault,
                    "call failed before execution"
                );
                return Receipt::failure(fault, 0);
            }
        };
        match self.open_context(state, None, frame, tx.gas_limit) {
            Ok(root) => self.run_tree(state, root).into_receipt(),
            Err(fault) => Receipt::failure(fault, 0),
        }
    }

    // =========================================================================
    // CALL STACK
    // =========================================================================

    fn run_tree<'e>(
        &'e self,
        state: &mut StateRepository,
        root: InvocationContext<'e>,
    ) -> TreeOutcome {
        let schedule = &self.config.gas_schedule;
        let mut callers: Vec<InvocationContext<'e>> = Vec::new();
        let mut current = root;
        let mut delivery: Option<Result<Option<Value>, ExecutionFault>> = None;

        loop {
            let step = match delivery.take() {
                Some(outcome) => current
                    .frame
                    .resume(outcome)
                    .and_then(|()| current.run(state, schedule)),
                None => current.run(state, schedule),
            };

            let result = match step {
                Ok(Exit::Call(request)) => {
                    match self.enter_child(state, &mut current, request) {
                        Ok(child) => callers.push(std::mem::replace(&mut current, child)),
                        // The callee never started: the caller sees the fault directly.
                        Err(fault) => delivery = Some(Err(fault)),
                    }
                    continue;
                }
                Ok(Exit::Return(value)) => Ok(value),
                Err(fault) => Err(fault),
            };

            match callers.pop() {
                None => return self.close_root(state, current, result),
                Some(parent) => {
                    let child = std::mem::replace(&mut current, parent);
                    delivery = Some(self.close_child(state, &mut current, child, result));
                }
            }
        }
    }

    fn enter_child<'e>(
        &'e self,
        state: &mut StateRepository,
        parent: &mut InvocationContext<'e>,
        request: CallRequest,
    ) -> Result<InvocationContext<'e>, ExecutionFault> {
        let depth = parent.depth + 1;
        if !check_call_depth_invariant(depth, self.config.max_call_depth) {
            return Err(ExecutionFault::CallDepthExceeded {
                depth,
                max: self.config.max_call_depth,
            });
        }
        let module = self.resolve(state, &request.target)?;
        let index = callable_method(&module, &request.method)?;
        let frame = Frame::new(
            module,
            Some(index),
            request.args,
            request.target,
            parent.address(),
            self.config.max_stack_size,
        )?;
        let child = self.open_context(state, Some(&mut *parent), frame, request.gas)?;
        debug!(
            id = %child.id,
            parent = %parent.id,
            depth,
            contract = %request.target,
            method = %request.method,
            gas = child.meter.limit(),
            "nested call"
        );
        Ok(child)
    }

    fn close_child(
        &self,
        state: &mut StateRepository,
        parent: &mut InvocationContext<'_>,
        child: InvocationContext<'_>,
        result: Result<Option<Value>, ExecutionFault>,
    ) -> Result<Option<Value>, ExecutionFault> {
        let InvocationContext {
            id,
            depth,
            mut meter,
            snapshot,
            logs,
            ..
        } = child;
        let result = close_snapshot(state, &mut meter, snapshot, result);
        debug!(
            %id,
            depth,
            gas_used = meter.spent(),
            success = result.is_ok(),
            "nested call finished"
        );
        if result.is_ok() {
            parent.logs.extend(logs);
        }
        parent.meter.settle(meter);
        result
    }

    fn close_root(
        &self,
        state: &mut StateRepository,
        root: InvocationContext<'_>,
        result: Result<Option<Value>, ExecutionFault>,
    ) -> TreeOutcome {
        let InvocationContext {
            id,
            mut meter,
            snapshot,
            logs,
            ..
        } = root;
        let result = close_snapshot(state, &mut meter, snapshot, result);
        debug!(%id, gas_used = meter.spent(), success = result.is_ok(), "invocation finished");
        TreeOutcome {
            logs: if result.is_ok() { logs } else { Vec::new() },
            gas_used: meter.spent(),
            result,
        }
    }

    /// Registers a new invocation, reserves its meter and opens its snapshot.
    ///
    /// With a parent the meter is a sub-meter of `min(gas, parent remaining)`;
    /// without one it is a fresh meter of `gas`.
    fn open_context<'e>(
        &'e self,
        state: &mut StateRepository,
        parent: Option<&mut InvocationContext<'e>>,
        frame: Frame,
        gas: u64,
    ) -> Result<InvocationContext<'e>, ExecutionFault> {
        let (parent_id, depth, limit) = match &parent {
            Some(p) => (Some(p.id), p.depth + 1, gas.min(p.meter.remaining())),
            None => (None, 0, gas),
        };
        let id = InvocationId::new();
        let (handle, registration) = self
            .observers
            .register_scoped(
                id,
                Registration {
                    parent: parent_id,
                    contract: frame.address(),
                    depth,
                    limit,
                },
            )
            .map_err(|e| ExecutionFault::runtime(e.to_string()))?;
        let meter = match parent {
            Some(p) => p.meter.sub_meter(gas),
            None => GasMeter::new(gas),
        }
        .with_gauge(handle.gauge());
        let snapshot = state.open_snapshot();

        Ok(InvocationContext {
            id,
            depth,
            meter,
            snapshot,
            frame,
            logs: Vec::new(),
            registration,
        })
    }

    /// Parsed module deployed at `address`.
    fn resolve(
        &self,
        state: &StateRepository,
        address: &Address,
    ) -> Result<Arc<Module>, ExecutionFault> {
        let code = state
            .code(address)?
            .ok_or(ExecutionFault::AddressNotFound(*address))?;
        let hash = code.hash();
        if let Some(module) = self.cache.get(&hash) {
            return Ok(module);
        }
        let module = Arc::new(load(&code)?);
        self.cache.insert(hash, Arc::clone(&module));
        Ok(module)
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("config", &self.config)
            .field("validator", &self.validator)
            .field("cache", &self.cache)
            .field("live_invocations", &self.observers.len())
            .finish()
    }
}

/// Index of an externally callable method of the entry type.
fn callable_method(module: &Module, name: &str) -> Result<usize, ExecutionFault> {
    module
        .entry_type()
        .methods
        .iter()
        .position(|m| m.name == name && m.is_public() && !m.is_constructor())
        .ok_or_else(|| ExecutionFault::MethodNotFound(name.to_string()))
}

/// Commits on success, rolls back on fault. A meter that refused a spend
/// forfeits its rest before the rollback; an out-of-gas re-raised from a
/// callee leaves the caller's meter as it is.
fn close_snapshot(
    state: &mut StateRepository,
    meter: &mut GasMeter,
    snapshot: Snapshot,
    result: Result<Option<Value>, ExecutionFault>,
) -> Result<Option<Value>, ExecutionFault> {
    match result {
        Ok(value) => {
            state.commit(snapshot)?;
            Ok(value)
        }
        Err(fault) => {
            if fault.consumes_all_gas() && meter.is_exhausted() {
                meter.forfeit_remaining();
            }
            state.rollback(snapshot)?;
            Err(fault)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
