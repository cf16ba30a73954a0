//! # Instructions
//!
//! Instruction set of the module format (version 1).
//!
//! The executable subset is a small stack machine over [`Value`]. The
//! "non-deterministic" subset (`NativeCall`, floats, clock, randomness,
//! reflection, threads, unordered iteration) exists only so that compiled
//! modules can express those constructs; the determinism validator rejects
//! every one of them before deployment.

use crate::domain::value_objects::Value;
use serde::{Deserialize, Serialize};

/// Opcode bytes of the module format.
#[allow(missing_docs)]
pub mod opcodes {
    pub const PUSH: u8 = 0x01;
    pub const POP: u8 = 0x02;
    pub const DUP: u8 = 0x03;
    pub const SWAP: u8 = 0x04;

    pub const ADD: u8 = 0x10;
    pub const SUB: u8 = 0x11;
    pub const MUL: u8 = 0x12;
    pub const DIV: u8 = 0x13;
    pub const MOD: u8 = 0x14;
    pub const EQ: u8 = 0x15;
    pub const LT: u8 = 0x16;
    pub const GT: u8 = 0x17;
    pub const NOT: u8 = 0x18;

    pub const JUMP: u8 = 0x20;
    pub const JUMP_IF: u8 = 0x21;

    pub const LOAD_ARG: u8 = 0x30;
    pub const LOAD_FIELD: u8 = 0x31;
    pub const STORE_FIELD: u8 = 0x32;
    pub const LOAD_ENTRY: u8 = 0x33;
    pub const STORE_ENTRY: u8 = 0x34;
    pub const CALLER: u8 = 0x35;
    pub const SELF_ADDRESS: u8 = 0x36;

    pub const EMIT: u8 = 0x40;
    pub const CALL: u8 = 0x41;
    pub const TRY_CALL: u8 = 0x42;
    pub const RETURN: u8 = 0x43;
    pub const RETURN_VOID: u8 = 0x44;
    pub const REVERT: u8 = 0x45;

    pub const NATIVE_CALL: u8 = 0xE0;
    pub const PUSH_FLOAT: u8 = 0xE1;
    pub const FLOAT_OP: u8 = 0xE2;
    pub const NOW: u8 = 0xE3;
    pub const RANDOM: u8 = 0xE4;
    pub const REFLECT: u8 = 0xE5;
    pub const SPAWN: u8 = 0xE6;
    pub const ITER_UNORDERED: u8 = 0xE7;
}

/// Floating-point operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

impl FloatOp {
    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Add => 0,
            Self::Sub => 1,
            Self::Mul => 2,
            Self::Div => 3,
        }
    }

    /// Parses a wire tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Add),
            1 => Some(Self::Sub),
            2 => Some(Self::Mul),
            3 => Some(Self::Div),
            _ => None,
        }
    }
}

/// One instruction of a method body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Push a constant.
    Push(Value),
    /// Discard the top of the stack.
    Pop,
    /// Duplicate the top of the stack.
    Dup,
    /// Swap the two topmost values.
    Swap,

    /// Checked u64 addition.
    Add,
    /// Checked u64 subtraction.
    Sub,
    /// Checked u64 multiplication.
    Mul,
    /// u64 division (faults on zero).
    Div,
    /// u64 remainder (faults on zero).
    Mod,
    /// Structural equality of any two values.
    Eq,
    /// u64 less-than.
    Lt,
    /// u64 greater-than.
    Gt,
    /// Boolean negation.
    Not,

    /// Unconditional jump to an instruction index.
    Jump(u32),
    /// Pop a bool, jump if true.
    JumpIf(u32),

    /// Push the n-th argument.
    LoadArg(u8),
    /// Push a scalar field of the contract.
    LoadField(u16),
    /// Pop a value into a scalar field.
    StoreField(u16),
    /// Pop an entry key, push that entry of a map field.
    LoadEntry(u16),
    /// Pop a value then an entry key, store into a map field.
    StoreEntry(u16),
    /// Push the immediate caller's address.
    Caller,
    /// Push the executing contract's address.
    SelfAddress,

    /// Pop `topics` indexed fields (last declared on top) and emit an event.
    Emit {
        /// Event type name.
        event: String,
        /// Number of indexed fields.
        topics: u8,
    },
    /// Pop `argc` args, requested gas and target address; call and push the result.
    /// A callee fault is re-raised in the caller.
    Call {
        /// Method on the callee.
        method: String,
        /// Argument count.
        argc: u8,
    },
    /// Like `Call`, but a callee fault pushes `false` instead of propagating;
    /// success pushes the result then `true`.
    TryCall {
        /// Method on the callee.
        method: String,
        /// Argument count.
        argc: u8,
    },
    /// Pop the return value and finish.
    Return,
    /// Finish without a value.
    ReturnVoid,
    /// Pop a message and revert.
    Revert,

    /// Invoke host-native code by symbol.
    NativeCall(String),
    /// Push an IEEE-754 double given by its bit pattern.
    PushFloat(u64),
    /// Floating-point arithmetic.
    FloatOp(FloatOp),
    /// Read the wall clock.
    Now,
    /// Read a random number.
    Random,
    /// Reflective member lookup by name.
    Reflect(String),
    /// Start a thread.
    Spawn,
    /// Iterate a hash-ordered collection.
    IterUnordered,
}

impl Instruction {
    /// Opcode byte of this instruction.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        use opcodes as op;
        match self {
            Self::Push(_) => op::PUSH,
            Self::Pop => op::POP,
            Self::Dup => op::DUP,
            Self::Swap => op::SWAP,
            Self::Add => op::ADD,
            Self::Sub => op::SUB,
            Self::Mul => op::MUL,
            Self::Div => op::DIV,
            Self::Mod => op::MOD,
            Self::Eq => op::EQ,
            Self::Lt => op::LT,
            Self::Gt => op::GT,
            Self::Not => op::NOT,
            Self::Jump(_) => op::JUMP,
            Self::JumpIf(_) => op::JUMP_IF,
            Self::LoadArg(_) => op::LOAD_ARG,
            Self::LoadField(_) => op::LOAD_FIELD,
            Self::StoreField(_) => op::STORE_FIELD,
            Self::LoadEntry(_) => op::LOAD_ENTRY,
            Self::StoreEntry(_) => op::STORE_ENTRY,
            Self::Caller => op::CALLER,
            Self::SelfAddress => op::SELF_ADDRESS,
            Self::Emit { .. } => op::EMIT,
            Self::Call { .. } => op::CALL,
            Self::TryCall { .. } => op::TRY_CALL,
            Self::Return => op::RETURN,
            Self::ReturnVoid => op::RETURN_VOID,
            Self::Revert => op::REVERT,
            Self::NativeCall(_) => op::NATIVE_CALL,
            Self::PushFloat(_) => op::PUSH_FLOAT,
            Self::FloatOp(_) => op::FLOAT_OP,
            Self::Now => op::NOW,
            Self::Random => op::RANDOM,
            Self::Reflect(_) => op::REFLECT,
            Self::Spawn => op::SPAWN,
            Self::IterUnordered => op::ITER_UNORDERED,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Pop => "pop",
            Self::Dup => "dup",
            Self::Swap => "swap",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Not => "not",
            Self::Jump(_) => "jump",
            Self::JumpIf(_) => "jump_if",
            Self::LoadArg(_) => "load_arg",
            Self::LoadField(_) => "load_field",
            Self::StoreField(_) => "store_field",
            Self::LoadEntry(_) => "load_entry",
            Self::StoreEntry(_) => "store_entry",
            Self::Caller => "caller",
            Self::SelfAddress => "self_address",
            Self::Emit { .. } => "emit",
            Self::Call { .. } => "call",
            Self::TryCall { .. } => "try_call",
            Self::Return => "return",
            Self::ReturnVoid => "return_void",
            Self::Revert => "revert",
            Self::NativeCall(_) => "native_call",
            Self::PushFloat(_) => "push_float",
            Self::FloatOp(_) => "float_op",
            Self::Now => "now",
            Self::Random => "random",
            Self::Reflect(_) => "reflect",
            Self::Spawn => "spawn",
            Self::IterUnordered => "iter_unordered",
        }
    }

    /// Jump target, if this is a jump.
    #[must_use]
    pub fn jump_target(&self) -> Option<u32> {
        match self {
            Self::Jump(target) | Self::JumpIf(target) => Some(*target),
            _ => None,
        }
    }

    /// Returns true if control never falls through to the next instruction.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Jump(_) | Self::Return | Self::ReturnVoid | Self::Revert
        )
    }
}
