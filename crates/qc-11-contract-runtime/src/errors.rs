//! # Error Types
//!
//! All error types for contract loading, validation, execution and signing.
//!
//! | Family | Type | Outcome |
//! |--------|------|---------|
//! | Load | [`LoadError`] | deployment rejected / call fails before any gas is spent |
//! | Validation | [`TransactionRejected::Validation`] | deployment rejected, nothing stored |
//! | Execution | [`ExecutionFault`] | snapshot rolled back, failure receipt |
//! | Signing | [`SigningError`] | `sign` fails fast, `verify` returns `false` |

use crate::domain::value_objects::{Address, InvocationId};
use crate::gas::GasSchedule;
use crate::receipt::Receipt;
use crate::validator::ValidationReport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// LOAD ERRORS
// =============================================================================

/// Errors raised before any resource accounting takes place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Bytes are not a well-formed module.
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(String),

    /// No contract code is stored at the target address.
    #[error("no contract at address: {0:?}")]
    AddressNotFound(Address),

    /// Module exceeds the configured size limit.
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeSizeExceeded { size: usize, max: usize },
}

impl LoadError {
    /// Shorthand for a malformed-bytecode error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBytecode(reason.into())
    }
}

// =============================================================================
// EXECUTION FAULTS
// =============================================================================

/// Faults terminating one invocation.
///
/// Faults never escape as host-process failures: the engine converts each of
/// them into a failure [`Receipt`]. They are serializable because they are
/// embedded in the receipt itself.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionFault {
    /// An attempted spend would have exceeded the meter's limit.
    #[error("out of gas")]
    OutOfGas,

    /// Unhandled runtime exception (type mismatch, overflow, stack misuse...).
    #[error("runtime fault: {0}")]
    RuntimeFault(String),

    /// The contract reverted on purpose.
    #[error("revert: {0}")]
    ExplicitRevert(String),

    /// The requested method does not exist or is not callable.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The call stack would exceed the configured depth.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded { depth: usize, max: usize },

    /// Call target holds no contract.
    #[error("no contract at address: {0:?}")]
    AddressNotFound(Address),

    /// Stored code at the target could not be loaded.
    #[error("stored code is malformed: {0}")]
    MalformedCode(String),

    /// Deployment target already holds code.
    #[error("contract already exists at address: {0:?}")]
    ContractAlreadyExists(Address),

    /// Deployment was rejected before execution (load or validation).
    #[error("deployment rejected: {}", .0.join("; "))]
    DeploymentRejected(Vec<String>),

    /// Storage layer failure surfaced inside an invocation.
    #[error("state failure: {0}")]
    StateFailure(String),
}

impl ExecutionFault {
    /// Returns true if the contract asked for the rollback itself.
    #[must_use]
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::ExplicitRevert(_))
    }

    /// Returns true if the fault forfeits the whole gas limit of the meter
    /// that raised it.
    #[must_use]
    pub fn consumes_all_gas(&self) -> bool {
        matches!(self, Self::OutOfGas)
    }

    /// Shorthand for a runtime fault.
    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::RuntimeFault(reason.into())
    }
}

impl From<StateError> for ExecutionFault {
    fn from(err: StateError) -> Self {
        Self::StateFailure(err.to_string())
    }
}

impl From<LoadError> for ExecutionFault {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::AddressNotFound(address) => Self::AddressNotFound(address),
            other => Self::MalformedCode(other.to_string()),
        }
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from the state repository and its backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Snapshots must be closed in LIFO order.
    #[error("snapshot {got} is not the innermost open snapshot ({expected})")]
    SnapshotOrder { expected: usize, got: usize },

    /// The snapshot was already committed or rolled back.
    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(usize),

    /// Writes need an open snapshot to buffer them.
    #[error("no open snapshot")]
    NoOpenSnapshot,

    /// Backend storage failure.
    #[error("state backend error: {0}")]
    Backend(String),
}

// =============================================================================
// SIGNING ERRORS
// =============================================================================

/// Errors from the contract signer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// Private key bytes are not a valid key.
    #[error("invalid private key: expected {expected} bytes, got {actual}")]
    InvalidPrivateKey { expected: usize, actual: usize },

    /// Public key bytes are not a valid curve point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Signature bytes are malformed.
    #[error("invalid signature")]
    InvalidSignature,
}

// =============================================================================
// CODEC ERRORS
// =============================================================================

/// Errors from the receipt codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Bytes are not a canonical receipt.
    #[error("decode error: {0}")]
    Decode(String),
}

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors from the observer registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No live invocation with this id.
    #[error("invocation not registered: {0}")]
    NotFound(InvocationId),

    /// The id is already registered.
    #[error("invocation already registered: {0}")]
    AlreadyRegistered(InvocationId),
}

// =============================================================================
// TRANSACTION REJECTION
// =============================================================================

/// A deployment that never reached execution.
///
/// Returned directly to the caller of `execute`: the input is structurally or
/// semantically invalid and will not become valid on retry.
#[derive(Debug, Error, Clone)]
pub enum TransactionRejected {
    /// The bytecode could not be loaded.
    #[error("load failed: {0}")]
    Load(#[from] LoadError),

    /// The module violated the determinism rule set.
    #[error("validation failed: {0}")]
    Validation(ValidationReport),
}

impl TransactionRejected {
    /// Gas charged for a rejected deployment: the fixed fee, capped by the limit.
    #[must_use]
    pub fn charged_gas(schedule: &GasSchedule, gas_limit: u64) -> u64 {
        schedule.rejection_fee.min(gas_limit)
    }

    /// Converts the rejection into the failure receipt recorded on chain.
    #[must_use]
    pub fn into_receipt(self, schedule: &GasSchedule, gas_limit: u64) -> Receipt {
        let reasons = match &self {
            Self::Load(err) => vec![err.to_string()],
            Self::Validation(report) => report
                .violations()
                .iter()
                .map(ToString::to_string)
                .collect(),
        };
        Receipt::failure(
            ExecutionFault::DeploymentRejected(reasons),
            Self::charged_gas(schedule, gas_limit),
        )
    }
}

// =============================================================================
// SERVICE ERRORS
// =============================================================================

/// Errors surfaced by the runtime service API.
///
/// Contract-level failures are receipts, not errors; these are failures of
/// the request itself.
#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    /// The deployment never reached execution (estimation only).
    #[error(transparent)]
    Rejected(#[from] TransactionRejected),

    /// The committed state could not be read or written.
    #[error(transparent)]
    State(#[from] StateError),

    /// The runtime configuration has values the engine cannot run with.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
}

// =============================================================================
// TESTS
// =============================================================================
