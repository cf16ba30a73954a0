//! # Determinism Validator
//!
//! Static analysis pass that rejects every construct whose result could
//! differ between two hosts.
//!
//! The validator is an explicitly ordered list of [`ValidationRule`] objects.
//! Running it visits, for each rule in registration order, every type of the
//! module in declaration order: first the type-level hook, then every method.
//! The report order is therefore stable across nodes. Acceptance depends only
//! on the report being empty.
//!
//! The active rule set is consensus-critical, so it is selected by a
//! [`RuleSetVersion`] rather than assembled ad hoc.

pub mod rules;

pub use rules::{
    EnvironmentAccessRule, FloatingPointRule, NativeCallRule, ReflectionRule, ThreadingRule,
    UnorderedIterationRule,
};

use crate::module::{MethodDef, Module, TypeDef};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// RULE KINDS & VIOLATIONS
// =============================================================================

/// Identifies the rule that produced a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// Host-native code invocation.
    NativeCall,
    /// Floating-point types or arithmetic.
    FloatingPoint,
    /// Iteration over hash-ordered collections.
    UnorderedIteration,
    /// Wall clock or randomness.
    EnvironmentAccess,
    /// Reflective member access.
    Reflection,
    /// Thread creation.
    Threading,
    /// Rule registered on top of a versioned rule set, by numeric id.
    Extension(u16),
}

impl RuleKind {
    /// Short identifier used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NativeCall => "native-call",
            Self::FloatingPoint => "floating-point",
            Self::UnorderedIteration => "unordered-iteration",
            Self::EnvironmentAccess => "environment-access",
            Self::Reflection => "reflection",
            Self::Threading => "threading",
            Self::Extension(_) => "extension",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(id) => write!(f, "extension-{id}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One construct rejected by one rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// Rule that fired.
    pub rule: RuleKind,
    /// Offending member, as `Type.member`.
    pub member: String,
    /// What was found.
    pub message: String,
}

impl ValidationViolation {
    /// Violation attributed to a method.
    #[must_use]
    pub fn in_method(
        rule: RuleKind,
        ty: &TypeDef,
        method: &MethodDef,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            member: format!("{}.{}", ty.name, method.name),
            message: message.into(),
        }
    }

    /// Violation attributed to a type member other than a method.
    #[must_use]
    pub fn in_type(rule: RuleKind, ty: &TypeDef, member: &str, message: impl Into<String>) -> Self {
        Self {
            rule,
            member: format!("{}.{member}", ty.name),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule, self.member, self.message)
    }
}

/// Result of one validation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    version: RuleSetVersion,
    violations: Vec<ValidationViolation>,
}

impl ValidationReport {
    /// The module is accepted iff no rule fired.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in rule-registration, then declaration order.
    #[must_use]
    pub fn violations(&self) -> &[ValidationViolation] {
        &self.violations
    }

    /// Rule set that produced this report.
    #[must_use]
    pub fn version(&self) -> RuleSetVersion {
        self.version
    }

    /// Returns true if any violation names the given member.
    #[must_use]
    pub fn names_member(&self, member: &str) -> bool {
        self.violations.iter().any(|v| v.member == member)
    }

    /// Consumes the report.
    #[must_use]
    pub fn into_violations(self) -> Vec<ValidationViolation> {
        self.violations
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for (i, v) in self.violations.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

// =============================================================================
// RULE TRAIT
// =============================================================================

/// A stateless determinism check.
///
/// Rules are independent: each sees the module on its own and never observes
/// another rule's findings.
pub trait ValidationRule: Send + Sync {
    /// Identity reported on every violation.
    fn kind(&self) -> RuleKind;

    /// Inspects one method and returns its violations.
    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation>;

    /// Inspects type-level layout (fields). Most rules have nothing to check.
    fn inspect_type(&self, _ty: &TypeDef) -> Vec<ValidationViolation> {
        Vec::new()
    }
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Versioned identifier of an active rule set.
///
/// Changing the active rules changes which blocks are valid, so every
/// change gets a new version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleSetVersion {
    /// Native calls, floats, unordered iteration, environment access,
    /// reflection, threading.
    #[default]
    V1,
}

/// Ordered collection of rules.
pub struct Validator {
    version: RuleSetVersion,
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Creates a validator with no rules registered.
    #[must_use]
    pub fn empty(version: RuleSetVersion) -> Self {
        Self {
            version,
            rules: Vec::new(),
        }
    }

    /// Creates the validator for a consensus rule set version.
    #[must_use]
    pub fn for_version(version: RuleSetVersion) -> Self {
        match version {
            RuleSetVersion::V1 => Self::empty(version)
                .with_rule(NativeCallRule)
                .with_rule(FloatingPointRule)
                .with_rule(UnorderedIterationRule)
                .with_rule(EnvironmentAccessRule)
                .with_rule(ReflectionRule)
                .with_rule(ThreadingRule),
        }
    }

    /// Registers a rule after all previously registered ones.
    #[must_use]
    pub fn with_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Active version.
    #[must_use]
    pub fn version(&self) -> RuleSetVersion {
        self.version
    }

    /// Kinds of the registered rules, in order.
    #[must_use]
    pub fn rule_kinds(&self) -> Vec<RuleKind> {
        self.rules.iter().map(|r| r.kind()).collect()
    }

    /// Runs every rule over every type and method. Never fails.
    #[must_use]
    pub fn validate(&self, module: &Module) -> ValidationReport {
        let mut violations = Vec::new();
        for rule in &self.rules {
            for ty in module.types() {
                violations.extend(rule.inspect_type(ty));
                for method in &ty.methods {
                    violations.extend(rule.inspect_method(ty, method));
                }
            }
        }
        ValidationReport {
            version: self.version,
            violations,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::for_version(RuleSetVersion::default())
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("version", &self.version)
            .field("rules", &self.rule_kinds())
            .finish()
    }
}
