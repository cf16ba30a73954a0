//! # Virtual Machine
//!
//! Stack-machine executor for module method bodies.
//!
//! ## Components
//!
//! - `stack.rs` - bounded operand stack
//! - `interpreter.rs` - instruction dispatch, gas charging, [`Host`] seam
//!
//! The VM knows nothing about snapshots, meters of other invocations or the
//! call stack: nested calls surface as [`Exit::Call`] and are driven by the
//! execution engine.

pub mod interpreter;
pub mod stack;

pub use interpreter::{decode_stored, encode_stored, run, CallRequest, Exit, Frame, Host};
pub use stack::{ValueStack, MAX_STACK_SIZE};
