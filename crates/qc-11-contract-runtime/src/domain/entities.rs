//! # Core Domain Entities
//!
//! Consensus-visible records (logs, receipts) and the transaction payloads the
//! runtime consumes.

use crate::domain::value_objects::{Address, ByteCode, Hash, Value};
use crate::errors::ExecutionFault;
use serde::{Deserialize, Serialize};

// =============================================================================
// LOG ENTRY
// =============================================================================

/// Event emitted by a contract.
///
/// `topics[0]` is the event type name; the remaining topics are the indexed
/// fields in declared order, each canonically encoded by
/// [`crate::receipt::encode_topic`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Contract that emitted the event.
    pub contract_address: Address,
    /// Event type name.
    pub event_name: String,
    /// Encoded topics.
    pub topics: Vec<Vec<u8>>,
}

impl LogEntry {
    /// Creates a log entry.
    #[must_use]
    pub fn new(
        contract_address: Address,
        event_name: impl Into<String>,
        topics: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            contract_address,
            event_name: event_name.into(),
            topics,
        }
    }

    /// Total topic payload in bytes (used for gas accounting).
    #[must_use]
    pub fn topic_bytes(&self) -> usize {
        self.topics.iter().map(Vec::len).sum()
    }
}

// =============================================================================
// RECEIPT
// =============================================================================

/// Canonical record of one invocation's outcome.
///
/// Immutable once produced; consumed by the consensus layer to build the
/// receipt root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Whether the invocation committed.
    pub success: bool,
    /// Gas charged, including gas burnt by a fault.
    pub gas_used: u64,
    /// Method return value (success only).
    pub return_value: Option<Value>,
    /// Address of the deployed contract (successful deployment only).
    pub new_contract_address: Option<Address>,
    /// Logs of the committed invocation tree, in emission order.
    pub logs: Vec<LogEntry>,
    /// Fault description (failure only).
    pub error: Option<ExecutionFault>,
}

impl Receipt {
    /// Creates a successful receipt.
    #[must_use]
    pub fn success(gas_used: u64, return_value: Option<Value>, logs: Vec<LogEntry>) -> Self {
        Self {
            success: true,
            gas_used,
            return_value,
            new_contract_address: None,
            logs,
            error: None,
        }
    }

    /// Creates a failure receipt. Failed invocations never carry logs.
    #[must_use]
    pub fn failure(error: ExecutionFault, gas_used: u64) -> Self {
        Self {
            success: false,
            gas_used,
            return_value: None,
            new_contract_address: None,
            logs: Vec::new(),
            error: Some(error),
        }
    }

    /// Attaches the deployed contract address.
    #[must_use]
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.new_contract_address = Some(address);
        self
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Contract deployment payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployTransaction {
    /// Deploying account.
    pub creator: Address,
    /// Creator nonce; with `creator` it fixes the new contract's address.
    pub nonce: u64,
    /// Compiled module.
    pub bytecode: ByteCode,
    /// Constructor arguments.
    pub args: Vec<Value>,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas price (fee layer only; the runtime ignores it).
    pub gas_price: u64,
}

/// Contract call payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTransaction {
    /// Calling account.
    pub caller: Address,
    /// Target contract.
    pub target: Address,
    /// Public method to invoke.
    pub method: String,
    /// Decoded arguments.
    pub args: Vec<Value>,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas price (fee layer only; the runtime ignores it).
    pub gas_price: u64,
}

/// A transaction carrying either a deployment or a call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractTransaction {
    /// Deploy new code.
    Deploy(DeployTransaction),
    /// Call deployed code.
    Call(CallTransaction),
}

impl ContractTransaction {
    /// Returns true for deployments.
    #[must_use]
    pub fn is_deployment(&self) -> bool {
        matches!(self, Self::Deploy(_))
    }

    /// Gas limit of the transaction.
    #[must_use]
    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Deploy(tx) => tx.gas_limit,
            Self::Call(tx) => tx.gas_limit,
        }
    }

    /// Account that signed the transaction.
    #[must_use]
    pub fn sender(&self) -> Address {
        match self {
            Self::Deploy(tx) => tx.creator,
            Self::Call(tx) => tx.caller,
        }
    }
}

// =============================================================================
// BLOCK EXECUTION RESULT
// =============================================================================

/// Outcome of executing an ordered batch of transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockExecutionResult {
    /// One receipt per transaction, in order.
    pub receipts: Vec<Receipt>,
    /// Gas charged across the block.
    pub cumulative_gas_used: u64,
    /// State root after the last transaction.
    pub state_root: Hash,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_success() {
        let receipt = Receipt::success(21, Some(Value::U64(1)), Vec::new());
        assert!(receipt.success);
        assert!(receipt.error.is_none());
        assert!(receipt.new_contract_address.is_none());
    }

    #[test]
    fn test_receipt_failure_has_no_logs() {
        let receipt = Receipt::failure(ExecutionFault::OutOfGas, 100);
        assert!(!receipt.success);
        assert!(receipt.logs.is_empty());
        assert_eq!(receipt.error, Some(ExecutionFault::OutOfGas));
    }

    #[test]
    fn test_receipt_with_contract_address() {
        let addr = Address::new([3u8; 20]);
        let receipt = Receipt::success(0, None, Vec::new()).with_contract_address(addr);
        assert_eq!(receipt.new_contract_address, Some(addr));
    }

    #[test]
    fn test_log_topic_bytes() {
        let topics = vec![b"Transfer".to_vec(), vec![], vec![1, 2]];
        let log = LogEntry::new(Address::ZERO, "Transfer", topics);
        assert_eq!(log.topic_bytes(), 10);
    }

    #[test]
    fn test_transaction_accessors() {
        let tx = ContractTransaction::Call(CallTransaction {
            caller: Address::new([1u8; 20]),
            target: Address::new([2u8; 20]),
            method: "get".into(),
            args: Vec::new(),
            gas_limit: 500,
            gas_price: 1,
        });
        assert!(!tx.is_deployment());
        assert_eq!(tx.gas_limit(), 500);
        assert_eq!(tx.sender(), Address::new([1u8; 20]));
    }
}
