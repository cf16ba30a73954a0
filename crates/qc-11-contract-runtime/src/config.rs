//! # Runtime Configuration
//!
//! Limits and the cost model of the contract runtime.
//!
//! Every field except `module_cache_size` is consensus-critical: nodes that
//! disagree on call depth, code size, stack size, rule set or gas schedule
//! disagree on receipts.

use crate::gas::GasSchedule;
use crate::validator::RuleSetVersion;
use crate::vm::MAX_STACK_SIZE;
use serde::{Deserialize, Serialize};
use std::env;

/// Default maximum nesting of contract-to-contract calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Default maximum size of deployed bytecode (24 KiB).
pub const DEFAULT_MAX_CODE_SIZE: usize = 24 * 1024;

/// Default number of parsed modules kept in memory.
pub const DEFAULT_MODULE_CACHE_SIZE: usize = 256;

/// Contract runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum call depth; the outermost invocation has depth 0.
    pub max_call_depth: usize,
    /// Maximum deployed bytecode size in bytes.
    pub max_code_size: usize,
    /// Maximum operand stack size per frame.
    pub max_stack_size: usize,
    /// Parsed-module LRU capacity.
    pub module_cache_size: usize,
    /// Active determinism rule set.
    pub rule_set_version: RuleSetVersion,
    /// Cost model.
    pub gas_schedule: GasSchedule,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_code_size: DEFAULT_MAX_CODE_SIZE,
            max_stack_size: MAX_STACK_SIZE,
            module_cache_size: DEFAULT_MODULE_CACHE_SIZE,
            rule_set_version: RuleSetVersion::default(),
            gas_schedule: GasSchedule::default(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden from environment variables.
    ///
    /// - `QC_CONTRACTS_MAX_CALL_DEPTH`
    /// - `QC_CONTRACTS_MAX_CODE_SIZE`
    /// - `QC_CONTRACTS_MAX_STACK_SIZE`
    /// - `QC_CONTRACTS_MODULE_CACHE_SIZE`
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_call_depth: env_usize("QC_CONTRACTS_MAX_CALL_DEPTH")
                .unwrap_or(defaults.max_call_depth),
            max_code_size: env_usize("QC_CONTRACTS_MAX_CODE_SIZE")
                .unwrap_or(defaults.max_code_size),
            max_stack_size: env_usize("QC_CONTRACTS_MAX_STACK_SIZE")
                .unwrap_or(defaults.max_stack_size),
            module_cache_size: env_usize("QC_CONTRACTS_MODULE_CACHE_SIZE")
                .unwrap_or(defaults.module_cache_size),
            ..defaults
        }
    }

    /// Parses a JSON document. Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks the limits for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.max_stack_size == 0 {
            errors.push("max_stack_size must be at least 1".to_string());
        }
        if self.max_code_size == 0 {
            errors.push("max_code_size must be at least 1".to_string());
        }
        if self.module_cache_size == 0 {
            errors.push("module_cache_size must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
