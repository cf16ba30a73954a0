//! # Gas Schedule
//!
//! The explicit cost model. Every resource-significant operation is charged
//! before it executes; the static part comes from [`GasSchedule::instruction_cost`],
//! the size-dependent parts from the helper methods.
//!
//! The schedule is consensus-critical: two nodes with different schedules
//! disagree on every receipt.

use crate::module::Instruction;
use serde::{Deserialize, Serialize};

/// Default costs.
pub mod costs {
    /// Stack manipulation (`Push`, `Pop`, `Dup`, `Swap`, returns).
    pub const STACK: u64 = 1;
    /// Copying or comparing a byte or string value, per payload byte.
    pub const VALUE_BYTE: u64 = 1;
    /// Arithmetic and comparison.
    pub const ARITHMETIC: u64 = 3;
    /// Jumps.
    pub const JUMP: u64 = 8;
    /// Argument and context loads (`LoadArg`, `Caller`, `SelfAddress`).
    pub const CONTEXT_LOAD: u64 = 2;
    /// Storage read.
    pub const STORAGE_READ: u64 = 200;
    /// Storage write, base.
    pub const STORAGE_WRITE: u64 = 1_000;
    /// Storage write, per value byte.
    pub const STORAGE_WRITE_BYTE: u64 = 10;
    /// Event emission, base.
    pub const EMIT: u64 = 375;
    /// Event emission, per topic.
    pub const EMIT_TOPIC: u64 = 100;
    /// Event emission, per topic byte.
    pub const EMIT_TOPIC_BYTE: u64 = 8;
    /// Contract-to-contract call, excluding forwarded gas.
    pub const CALL: u64 = 700;
    /// Entering any invocation.
    pub const INVOCATION: u64 = 20;
    /// Code deposit at deployment, per bytecode byte.
    pub const CODE_DEPOSIT_BYTE: u64 = 20;
    /// Fixed fee for a deployment rejected before execution.
    pub const REJECTION_FEE: u64 = 1_000;
}

/// Versioned cost table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// Stack manipulation.
    pub stack: u64,
    /// Copying or comparing a byte or string value, per payload byte.
    pub value_byte: u64,
    /// Arithmetic and comparison.
    pub arithmetic: u64,
    /// Jumps.
    pub jump: u64,
    /// Argument and context loads.
    pub context_load: u64,
    /// Storage read.
    pub storage_read: u64,
    /// Storage write, base.
    pub storage_write: u64,
    /// Storage write, per value byte.
    pub storage_write_byte: u64,
    /// Emission, base.
    pub emit: u64,
    /// Emission, per topic.
    pub emit_topic: u64,
    /// Emission, per topic byte.
    pub emit_topic_byte: u64,
    /// Call, excluding forwarded gas.
    pub call: u64,
    /// Invocation entry.
    pub invocation: u64,
    /// Code deposit, per byte.
    pub code_deposit_byte: u64,
    /// Fixed fee for rejected deployments.
    pub rejection_fee: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            stack: costs::STACK,
            value_byte: costs::VALUE_BYTE,
            arithmetic: costs::ARITHMETIC,
            jump: costs::JUMP,
            context_load: costs::CONTEXT_LOAD,
            storage_read: costs::STORAGE_READ,
            storage_write: costs::STORAGE_WRITE,
            storage_write_byte: costs::STORAGE_WRITE_BYTE,
            emit: costs::EMIT,
            emit_topic: costs::EMIT_TOPIC,
            emit_topic_byte: costs::EMIT_TOPIC_BYTE,
            call: costs::CALL,
            invocation: costs::INVOCATION,
            code_deposit_byte: costs::CODE_DEPOSIT_BYTE,
            rejection_fee: costs::REJECTION_FEE,
        }
    }
}

impl GasSchedule {
    /// Static cost of an instruction, charged before it executes.
    ///
    /// Value copies and comparisons, storage writes and emissions have an
    /// additional size-dependent part ([`Self::value_byte_cost`],
    /// [`Self::storage_write_cost`], [`Self::emit_byte_cost`]) charged once
    /// the operand sizes are known. Constructs the validator rejects cost
    /// nothing because they fault on execution.
    #[must_use]
    pub fn instruction_cost(&self, instr: &Instruction) -> u64 {
        use Instruction as I;
        match instr {
            I::Push(_) | I::Pop | I::Dup | I::Swap | I::Return | I::ReturnVoid | I::Revert => {
                self.stack
            }
            I::Add | I::Sub | I::Mul | I::Div | I::Mod | I::Eq | I::Lt | I::Gt | I::Not => {
                self.arithmetic
            }
            I::Jump(_) | I::JumpIf(_) => self.jump,
            I::LoadArg(_) | I::Caller | I::SelfAddress => self.context_load,
            I::LoadField(_) | I::LoadEntry(_) => self.storage_read,
            I::StoreField(_) | I::StoreEntry(_) => self.storage_write,
            I::Emit { topics, .. } => self
                .emit
                .saturating_add(self.emit_topic.saturating_mul(u64::from(*topics) + 1)),
            I::Call { .. } | I::TryCall { .. } => self.call,
            I::NativeCall(_)
            | I::PushFloat(_)
            | I::FloatOp(_)
            | I::Now
            | I::Random
            | I::Reflect(_)
            | I::Spawn
            | I::IterUnordered => 0,
        }
    }

    /// Size-dependent part of `Push`, `Dup` and `Eq` on byte and string
    /// values.
    #[must_use]
    pub fn value_byte_cost(&self, payload_len: usize) -> u64 {
        self.value_byte.saturating_mul(payload_len as u64)
    }

    /// Size-dependent part of a storage write.
    #[must_use]
    pub fn storage_write_cost(&self, value_len: usize) -> u64 {
        self.storage_write_byte.saturating_mul(value_len as u64)
    }

    /// Size-dependent part of an emission.
    #[must_use]
    pub fn emit_byte_cost(&self, topic_bytes: usize) -> u64 {
        self.emit_topic_byte.saturating_mul(topic_bytes as u64)
    }

    /// Cost of depositing deployed code.
    #[must_use]
    pub fn code_deposit_cost(&self, code_len: usize) -> u64 {
        self.code_deposit_byte.saturating_mul(code_len as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Value;

    #[test]
    fn test_instruction_costs() {
        let s = GasSchedule::default();
        assert_eq!(s.instruction_cost(&Instruction::Push(Value::Null)), 1);
        assert_eq!(s.instruction_cost(&Instruction::Add), 3);
        assert_eq!(s.instruction_cost(&Instruction::JumpIf(0)), 8);
        assert_eq!(s.instruction_cost(&Instruction::Caller), 2);
        assert_eq!(s.instruction_cost(&Instruction::LoadField(0)), 200);
        assert_eq!(s.instruction_cost(&Instruction::StoreEntry(0)), 1_000);
        let call = Instruction::Call { method: "f".into(), argc: 0 };
        assert_eq!(s.instruction_cost(&call), 700);
        assert_eq!(s.instruction_cost(&Instruction::Now), 0);
    }

    #[test]
    fn test_emit_cost_counts_name_topic() {
        let s = GasSchedule::default();
        // Two indexed fields plus the event-name topic.
        let emit = Instruction::Emit { event: "Transfer".into(), topics: 2 };
        let cost = s.instruction_cost(&emit);
        assert_eq!(cost, 375 + 3 * 100);
        assert_eq!(s.emit_byte_cost(10), 80);
    }

    #[test]
    fn test_dynamic_costs() {
        let s = GasSchedule::default();
        assert_eq!(s.storage_write_cost(8), 80);
        assert_eq!(s.value_byte_cost(0), 0);
        assert_eq!(s.value_byte_cost(20_000), 20_000);
        assert_eq!(s.code_deposit_cost(100), 2_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s: GasSchedule = serde_json::from_str(r#"{"storage_read": 50}"#).unwrap();
        assert_eq!(s.storage_read, 50);
        assert_eq!(s.call, costs::CALL);
    }
}
