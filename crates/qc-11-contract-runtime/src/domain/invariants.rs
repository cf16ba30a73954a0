//! # Domain Invariants
//!
//! Invariants every receipt must satisfy, checkable by the service after
//! each transaction and by tests.
//!
//! - Gas limit: `gas_used <= gas_limit`
//! - Failure shape: a failed invocation carries an error and nothing else
//! - Address derivation: only a successful deployment reports an address,
//!   and it is `derive_contract_address(creator, nonce)`
//! - Call depth: no invocation deeper than the configured maximum

use crate::domain::entities::{ContractTransaction, Receipt};
use crate::domain::services::derive_contract_address;
use crate::domain::value_objects::Address;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Gas limit enforcement: a receipt never charges more than the limit.
#[must_use]
pub fn check_gas_limit_invariant(receipt: &Receipt, gas_limit: u64) -> bool {
    receipt.gas_used <= gas_limit
}

/// No effects on failure: a failed receipt has an error, no logs, no return
/// value and no contract address; a successful one has no error.
#[must_use]
pub fn check_failure_shape_invariant(receipt: &Receipt) -> bool {
    if receipt.success {
        receipt.error.is_none()
    } else {
        receipt.error.is_some()
            && receipt.logs.is_empty()
            && receipt.return_value.is_none()
            && receipt.new_contract_address.is_none()
    }
}

/// Address derivation: the reported contract address is the derived one.
#[must_use]
pub fn check_address_invariant(receipt: &Receipt, tx: &ContractTransaction) -> bool {
    match (tx, receipt.new_contract_address) {
        (ContractTransaction::Deploy(deploy), Some(address)) => {
            receipt.success && address == derive_contract_address(deploy.creator, deploy.nonce)
        }
        (ContractTransaction::Deploy(_), None) => !receipt.success,
        (ContractTransaction::Call(_), address) => address.is_none(),
    }
}

/// Call depth limit.
#[must_use]
pub fn check_call_depth_invariant(depth: usize, max_call_depth: usize) -> bool {
    depth <= max_call_depth
}

/// Checks every receipt invariant for `tx`.
#[must_use]
pub fn check_all_invariants(tx: &ContractTransaction, receipt: &Receipt) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_gas_limit_invariant(receipt, tx.gas_limit()) {
        violations.push(InvariantViolation::GasLimitExceeded {
            used: receipt.gas_used,
            limit: tx.gas_limit(),
        });
    }

    if !check_failure_shape_invariant(receipt) {
        violations.push(InvariantViolation::EffectsOnFailure {
            logs: receipt.logs.len(),
        });
    }

    if !check_address_invariant(receipt, tx) {
        violations.push(InvariantViolation::UnexpectedAddress(receipt.new_contract_address));
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Gas charged above the limit.
    GasLimitExceeded { used: u64, limit: u64 },
    /// A failed receipt carries effects, or a successful one an error.
    EffectsOnFailure { logs: usize },
    /// Contract address missing, spurious or not the derived one.
    UnexpectedAddress(Option<Address>),
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GasLimitExceeded { used, limit } => {
                write!(f, "gas limit exceeded: used {used} > limit {limit}")
            }
            Self::EffectsOnFailure { logs } => {
                write!(f, "inconsistent failure receipt ({logs} logs)")
            }
            Self::UnexpectedAddress(address) => {
                write!(f, "unexpected contract address: {address:?}")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
