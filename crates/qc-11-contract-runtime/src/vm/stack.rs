//! # Value Stack
//!
//! Operand stack of one frame, bounded by the configured maximum size.

use crate::domain::value_objects::{Address, Value};
use crate::errors::ExecutionFault;

/// Default maximum stack size.
pub const MAX_STACK_SIZE: usize = 1024;

/// LIFO stack of [`Value`]s.
#[derive(Clone, Debug)]
pub struct ValueStack {
    data: Vec<Value>,
    max: usize,
}

impl Default for ValueStack {
    fn default() -> Self {
        Self::new(MAX_STACK_SIZE)
    }
}

impl ValueStack {
    /// Creates an empty stack holding at most `max` values.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            data: Vec::with_capacity(max.min(16)),
            max,
        }
    }

    /// Returns the number of elements on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Push a value onto the stack.
    pub fn push(&mut self, value: Value) -> Result<(), ExecutionFault> {
        if self.data.len() >= self.max {
            return Err(ExecutionFault::runtime("stack overflow"));
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    pub fn pop(&mut self) -> Result<Value, ExecutionFault> {
        self.data
            .pop()
            .ok_or_else(|| ExecutionFault::runtime("stack underflow"))
    }

    /// Pops `n` values and returns them bottom-first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, ExecutionFault> {
        if n > self.data.len() {
            return Err(ExecutionFault::runtime("stack underflow"));
        }
        Ok(self.data.split_off(self.data.len() - n))
    }

    /// Pops a u64.
    pub fn pop_u64(&mut self) -> Result<u64, ExecutionFault> {
        match self.pop()? {
            Value::U64(n) => Ok(n),
            other => Err(type_mismatch("u64", &other)),
        }
    }

    /// Pops a bool.
    pub fn pop_bool(&mut self) -> Result<bool, ExecutionFault> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(type_mismatch("bool", &other)),
        }
    }

    /// Pops an address.
    pub fn pop_address(&mut self) -> Result<Address, ExecutionFault> {
        match self.pop()? {
            Value::Address(a) => Ok(a),
            other => Err(type_mismatch("address", &other)),
        }
    }

    /// Element `depth` places below the top, without removing it.
    #[must_use]
    pub fn peek(&self, depth: usize) -> Option<&Value> {
        self.data.len().checked_sub(depth + 1).and_then(|i| self.data.get(i))
    }

    /// Duplicate the top element.
    pub fn dup(&mut self) -> Result<(), ExecutionFault> {
        let top = self
            .data
            .last()
            .cloned()
            .ok_or_else(|| ExecutionFault::runtime("stack underflow"))?;
        self.push(top)
    }

    /// Swap the two topmost elements.
    pub fn swap(&mut self) -> Result<(), ExecutionFault> {
        let len = self.data.len();
        if len < 2 {
            return Err(ExecutionFault::runtime("stack underflow"));
        }
        self.data.swap(len - 1, len - 2);
        Ok(())
    }
}

fn type_mismatch(expected: &str, got: &Value) -> ExecutionFault {
    ExecutionFault::runtime(format!("type mismatch: expected {expected}, got {}", got.type_name()))
}

// =============================================================================
// TESTS
// =============================================================================
