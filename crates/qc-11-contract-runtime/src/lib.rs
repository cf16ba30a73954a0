//! # QC-11 Contract Runtime - Deterministic Execution Subsystem
//!
//! **Subsystem ID:** 11
//!
//! ## Purpose
//!
//! Loads contract modules, rejects any that use non-deterministic
//! constructs, and executes deployments and calls under a gas budget with
//! snapshot-isolated state. Every node executing the same transactions
//! against the same state produces byte-identical receipts and state roots.
//!
//! ## Lifecycle
//!
//! ```text
//! bytecode ─► load ─► validate ─► run (metered, snapshotted)
//!                                      ─► commit | rollback ─► receipt
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Gas Limit Enforcement | `gas/meter.rs` - `GasMeter::spend()` |
//! | No Effects on Failure | `engine/mod.rs` - `close_snapshot()` |
//! | Address Derivation | `domain/services.rs` - `derive_contract_address()` |
//! | Call Depth Limit | `engine/mod.rs` - `enter_child()` |
//! | Deterministic Code Only | `validator/` - rule set applied before any deployment runs |
//!
//! `domain/invariants.rs` re-checks the first three on every receipt.
//!
//! ### Execution Safety Limits
//!
//! | Limit | Default | Purpose |
//! |-------|---------|---------|
//! | `max_call_depth` | 64 | Bound the explicit call stack |
//! | `max_code_size` | 24 KB | Limit contract size |
//! | `max_stack_size` | 1024 | Operand stack limit per frame |
//! | `module_cache_size` | 256 | Parsed modules kept in memory |
//!
//! ## Outbound Dependencies
//!
//! | Subsystem | Trait | Purpose |
//! |-----------|-------|---------|
//! | 4 (State Mgmt) | `StateBackend` | Committed contract storage |
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Module format | `module/` | Binary format, loader, builder, disassembler |
//! | Validator | `validator/` | Determinism rule set |
//! | Gas | `gas/` | Cost schedule, meters, live observer registry |
//! | State | `state/` | Nested snapshots, state root |
//! | Interpreter | `vm/` | Stack machine behind the `Host` seam |
//! | Engine | `engine/` | Explicit call stack, module cache |
//! | Receipts | `receipt/` | Topic and receipt codecs |
//! | Signer | `signer.rs` | Ed25519 authorship signatures |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_contract_runtime::prelude::*;
//!
//! let service = create_test_service();
//! let receipt = service.execute_transaction(&tx).await?;
//!
//! if receipt.success {
//!     println!("Gas used: {}", receipt.gas_used);
//!     println!("Deployed at: {:?}", receipt.new_contract_address);
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod gas;
pub mod module;
pub mod ports;
pub mod receipt;
pub mod service;
pub mod signer;
pub mod state;
pub mod validator;
pub mod vm;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        BlockExecutionResult, CallTransaction, ContractTransaction, DeployTransaction, LogEntry,
        Receipt,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, ByteCode, Hash, InvocationId, StorageKey, StorageValue, Value, ValueType,
    };

    // Domain services
    pub use crate::domain::services::{derive_contract_address, empty_hash, hash256};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Configuration
    pub use crate::config::RuntimeConfig;

    // Module format
    pub use crate::module::{
        disassemble, encode_module, load, Instruction, ModuleBuilder, TypeBuilder,
        METHOD_CONSTRUCTOR, METHOD_NATIVE, METHOD_PUBLIC,
    };

    // Validation
    pub use crate::validator::{
        RuleKind, RuleSetVersion, ValidationReport, ValidationRule, ValidationViolation, Validator,
    };

    // Gas
    pub use crate::gas::{GasMeter, GasSchedule, ObserverRegistry};

    // State
    pub use crate::state::{Snapshot, StateRepository};

    // Engine
    pub use crate::engine::ExecutionEngine;

    // Receipts
    pub use crate::receipt::{decode_receipt, decode_topic, encode_receipt, encode_topic};

    // Signer
    pub use crate::signer::{sign, verify, ContractSignature};

    // Ports
    pub use crate::ports::inbound::ContractRuntimeApi;
    pub use crate::ports::outbound::StateBackend;

    // Errors
    pub use crate::errors::{
        CodecError, ExecutionFault, LoadError, ServiceError, SigningError, StateError,
        TransactionRejected,
    };

    // Adapters
    pub use crate::adapters::InMemoryStateBackend;

    // Service
    pub use crate::service::{create_test_service, ContractRuntimeService, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID for IPC.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Contract Runtime";

// =============================================================================
// TESTS
// =============================================================================
