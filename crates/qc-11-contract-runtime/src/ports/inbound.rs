//! # Driving Ports (API - Inbound)
//!
//! The interface exposed by the contract runtime. Block producers and
//! validators use it to execute transactions and whole blocks.

use crate::domain::entities::{BlockExecutionResult, ContractTransaction, Receipt};
use crate::domain::value_objects::Hash;
use crate::errors::ServiceError;
use async_trait::async_trait;

// =============================================================================
// CONTRACT RUNTIME API (Primary Driving Port)
// =============================================================================

/// Primary API for contract execution.
///
/// ## Usage
///
/// ```ignore
/// let receipt = api.execute_transaction(&tx).await?;
/// let block = api.execute_block(&txs).await?;
/// ```
#[async_trait]
pub trait ContractRuntimeApi: Send + Sync {
    /// Executes one transaction and commits its effects.
    ///
    /// A deployment rejected at load or validation yields a failure receipt
    /// charged the rejection fee; nothing is stored.
    ///
    /// # Returns
    ///
    /// * `Receipt` - success or failure, gas used, logs, new contract address
    async fn execute_transaction(&self, tx: &ContractTransaction) -> Result<Receipt, ServiceError>;

    /// Executes transactions in order as one block.
    ///
    /// A failing transaction never aborts the block. Either every effect of
    /// the block is committed or, if the request is abandoned, none is.
    ///
    /// # Returns
    ///
    /// * `BlockExecutionResult` - receipts, cumulative gas, post-block root
    async fn execute_block(
        &self,
        transactions: &[ContractTransaction],
    ) -> Result<BlockExecutionResult, ServiceError>;

    /// Gas the transaction would use against the current state.
    ///
    /// Runs the transaction and discards every effect.
    async fn estimate_gas(&self, tx: &ContractTransaction) -> Result<u64, ServiceError>;

    /// Root hash of the committed state.
    async fn state_root(&self) -> Result<Hash, ServiceError>;
}
