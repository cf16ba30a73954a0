//! # Contract Runtime Service
//!
//! Async facade over the [`ExecutionEngine`] and a committed
//! [`StateBackend`]. Implements [`ContractRuntimeApi`].
//!
//! ## Commit discipline
//!
//! Writers are serialized: one transaction or block at a time builds a
//! [`StateRepository`] over the backend, executes, and commits its outermost
//! snapshot in one atomic batch. Estimation reads without the writer lock
//! and always rolls back.
//!
//! ## Cancellation
//!
//! Blocks yield to the scheduler between transactions. Dropping the future
//! of an unfinished block drops its repository and with it every open
//! snapshot: nothing of the block reaches the backend.

use crate::adapters::InMemoryStateBackend;
use crate::config::RuntimeConfig;
use crate::domain::entities::{BlockExecutionResult, ContractTransaction, Receipt};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::domain::value_objects::Hash;
use crate::engine::ExecutionEngine;
use crate::errors::ServiceError;
use crate::ports::inbound::ContractRuntimeApi;
use crate::ports::outbound::StateBackend;
use crate::state::StateRepository;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Statistics for the contract runtime service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Total transactions executed, rejected deployments included.
    pub transactions_executed: u64,
    /// Successful executions.
    pub successful_executions: u64,
    /// Failed executions (reverts, out of gas, faults).
    pub failed_executions: u64,
    /// Deployments rejected at load or validation.
    pub rejected_deployments: u64,
    /// Blocks executed to completion.
    pub blocks_executed: u64,
    /// Total gas charged.
    pub total_gas_used: u64,
    /// Average execution time in microseconds.
    pub avg_execution_time_us: u64,
}

impl ServiceStats {
    fn record(&mut self, receipt: &Receipt, rejected: bool, elapsed_us: u64) {
        self.transactions_executed += 1;
        if receipt.success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }
        if rejected {
            self.rejected_deployments += 1;
        }
        self.total_gas_used = self.total_gas_used.saturating_add(receipt.gas_used);
        let total = self.transactions_executed;
        self.avg_execution_time_us =
            (self.avg_execution_time_us * (total - 1) + elapsed_us) / total;
    }
}

/// The contract runtime service.
///
/// This service:
/// 1. Executes transactions and blocks against the committed state
/// 2. Converts rejected deployments into fee-charging receipts
/// 3. Checks every receipt against the domain invariants
/// 4. Maintains execution statistics
pub struct ContractRuntimeService {
    engine: Arc<ExecutionEngine>,
    backend: Arc<dyn StateBackend>,
    /// Serializes writers against the committed layer.
    writer: Mutex<()>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl ContractRuntimeService {
    /// Creates a service with a fresh engine for `config`.
    pub fn new(
        config: RuntimeConfig,
        backend: Arc<dyn StateBackend>,
    ) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        Ok(Self::with_engine(Arc::new(ExecutionEngine::new(config)), backend))
    }

    /// Creates a service around an existing engine.
    #[must_use]
    pub fn with_engine(engine: Arc<ExecutionEngine>, backend: Arc<dyn StateBackend>) -> Self {
        Self {
            engine,
            backend,
            writer: Mutex::new(()),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// The engine executing transactions.
    #[must_use]
    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Executes `tx` inside `state`'s innermost snapshot, turning a
    /// rejection into its receipt.
    async fn execute_in(&self, state: &mut StateRepository, tx: &ContractTransaction) -> Receipt {
        let start = Instant::now();
        let (receipt, rejected) = match self.engine.execute(state, tx) {
            Ok(receipt) => (receipt, false),
            Err(rejection) => {
                warn!(sender = %tx.sender(), error = %rejection, "deployment rejected");
                let schedule = &self.engine.config().gas_schedule;
                (rejection.into_receipt(schedule, tx.gas_limit()), true)
            }
        };
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        if let InvariantCheckResult::Invalid(violations) = check_all_invariants(tx, &receipt) {
            for violation in &violations {
                error!(%violation, "receipt invariant violated");
            }
        }

        self.stats.write().await.record(&receipt, rejected, elapsed_us);
        debug!(
            success = receipt.success,
            gas_used = receipt.gas_used,
            logs = receipt.logs.len(),
            "transaction executed"
        );
        receipt
    }
}

// =============================================================================
// CONTRACT RUNTIME API IMPLEMENTATION
// =============================================================================

#[async_trait]
impl ContractRuntimeApi for ContractRuntimeService {
    #[instrument(skip(self, tx), fields(sender = %tx.sender(), deploy = tx.is_deployment()))]
    async fn execute_transaction(&self, tx: &ContractTransaction) -> Result<Receipt, ServiceError> {
        let _writer = self.writer.lock().await;
        let mut state = StateRepository::new(Arc::clone(&self.backend));
        let receipt = self.execute_in(&mut state, tx).await;
        info!(success = receipt.success, gas_used = receipt.gas_used, "transaction processed");
        Ok(receipt)
    }

    #[instrument(skip(self, transactions), fields(count = transactions.len()))]
    async fn execute_block(
        &self,
        transactions: &[ContractTransaction],
    ) -> Result<BlockExecutionResult, ServiceError> {
        let _writer = self.writer.lock().await;
        let mut state = StateRepository::new(Arc::clone(&self.backend));
        let block = state.open_snapshot();

        let mut receipts = Vec::with_capacity(transactions.len());
        let mut cumulative_gas_used = 0u64;
        for tx in transactions {
            let receipt = self.execute_in(&mut state, tx).await;
            cumulative_gas_used = cumulative_gas_used.saturating_add(receipt.gas_used);
            receipts.push(receipt);
            tokio::task::yield_now().await;
        }

        let state_root = state.root_hash()?;
        state.commit(block)?;
        self.stats.write().await.blocks_executed += 1;
        info!(
            receipts = receipts.len(),
            cumulative_gas_used,
            state_root = %state_root,
            "block executed"
        );

        Ok(BlockExecutionResult {
            receipts,
            cumulative_gas_used,
            state_root,
        })
    }

    #[instrument(skip(self, tx), fields(sender = %tx.sender()))]
    async fn estimate_gas(&self, tx: &ContractTransaction) -> Result<u64, ServiceError> {
        let mut state = StateRepository::new(Arc::clone(&self.backend));
        let scratch = state.open_snapshot();
        let result = self.engine.execute(&mut state, tx);
        state.rollback(scratch)?;
        let gas = result?.gas_used;
        debug!(gas, "gas estimated");
        Ok(gas)
    }

    async fn state_root(&self) -> Result<Hash, ServiceError> {
        Ok(StateRepository::new(Arc::clone(&self.backend)).root_hash()?)
    }
}

impl std::fmt::Debug for ContractRuntimeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractRuntimeService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Creates a service with default configuration over an empty in-memory store.
#[must_use]
pub fn create_test_service() -> ContractRuntimeService {
    ContractRuntimeService::with_engine(
        Arc::new(ExecutionEngine::new(RuntimeConfig::default())),
        Arc::new(InMemoryStateBackend::new()),
    )
}

// =============================================================================
// TESTS
// =============================================================================
