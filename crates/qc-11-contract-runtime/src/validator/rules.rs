//! # Determinism Rules
//!
//! The rule catalog. Each rule is a pure function from a type or method to
//! zero or more violations.

use super::{RuleKind, ValidationRule, ValidationViolation};
use crate::module::{Instruction, MethodDef, TypeDef};

/// Reports every instruction matched by `describe`, tagged with its position.
fn scan(
    kind: RuleKind,
    ty: &TypeDef,
    method: &MethodDef,
    describe: impl Fn(&Instruction) -> Option<String>,
) -> Vec<ValidationViolation> {
    method
        .body
        .iter()
        .enumerate()
        .filter_map(|(pc, instr)| {
            describe(instr).map(|what| {
                ValidationViolation::in_method(kind, ty, method, format!("{what} at {pc}"))
            })
        })
        .collect()
}

/// Rejects host-native code: methods flagged native and explicit native calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeCallRule;

impl ValidationRule for NativeCallRule {
    fn kind(&self) -> RuleKind {
        RuleKind::NativeCall
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        let mut out = Vec::new();
        if method.is_native() {
            out.push(ValidationViolation::in_method(
                self.kind(),
                ty,
                method,
                "method is implemented by host-native code",
            ));
        }
        out.extend(scan(self.kind(), ty, method, |instr| match instr {
            Instruction::NativeCall(symbol) => Some(format!("native call to {symbol}")),
            _ => None,
        }));
        out
    }
}

/// Rejects floating-point types and arithmetic.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatingPointRule;

impl ValidationRule for FloatingPointRule {
    fn kind(&self) -> RuleKind {
        RuleKind::FloatingPoint
    }

    fn inspect_type(&self, ty: &TypeDef) -> Vec<ValidationViolation> {
        ty.fields
            .iter()
            .filter(|f| f.ty.is_float())
            .map(|f| {
                let message = format!("field has float type {:?}", f.ty);
                ValidationViolation::in_type(self.kind(), ty, &f.name, message)
            })
            .collect()
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        let mut out: Vec<ValidationViolation> = method
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_float())
            .map(|(i, p)| {
                let message = format!("parameter {i} has float type {p:?}");
                ValidationViolation::in_method(self.kind(), ty, method, message)
            })
            .collect();
        out.extend(scan(self.kind(), ty, method, |instr| match instr {
            Instruction::PushFloat(_) => Some("float constant".to_string()),
            Instruction::FloatOp(op) => Some(format!("float arithmetic {op:?}")),
            _ => None,
        }));
        out
    }
}

/// Rejects iteration whose order depends on hashing.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnorderedIterationRule;

impl ValidationRule for UnorderedIterationRule {
    fn kind(&self) -> RuleKind {
        RuleKind::UnorderedIteration
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        scan(self.kind(), ty, method, |instr| {
            matches!(instr, Instruction::IterUnordered)
                .then(|| "iteration over unordered collection".to_string())
        })
    }
}

/// Rejects reads of the wall clock and of randomness.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvironmentAccessRule;

impl ValidationRule for EnvironmentAccessRule {
    fn kind(&self) -> RuleKind {
        RuleKind::EnvironmentAccess
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        scan(self.kind(), ty, method, |instr| match instr {
            Instruction::Now => Some("wall clock read".to_string()),
            Instruction::Random => Some("random number read".to_string()),
            _ => None,
        })
    }
}

/// Rejects reflective member lookup.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReflectionRule;

impl ValidationRule for ReflectionRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Reflection
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        scan(self.kind(), ty, method, |instr| match instr {
            Instruction::Reflect(name) => Some(format!("reflective lookup of {name:?}")),
            _ => None,
        })
    }
}

/// Rejects thread creation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadingRule;

impl ValidationRule for ThreadingRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Threading
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        scan(self.kind(), ty, method, |instr| {
            matches!(instr, Instruction::Spawn).then(|| "thread spawn".to_string())
        })
    }
}
