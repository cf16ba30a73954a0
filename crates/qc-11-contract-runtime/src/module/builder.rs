//! # Module Builder
//!
//! Programmatic construction of module bytecode. This is the output stage of
//! a compiler targeting the runtime, and what tests use to produce contracts.
//!
//! ```ignore
//! let code = ModuleBuilder::new()
//!     .with_type(
//!         TypeBuilder::contract("Counter")
//!             .field("count", ValueType::U64)
//!             .with_method(
//!                 MethodBuilder::new("get").public()
//!                     .op(Instruction::LoadField(0))
//!                     .op(Instruction::Return),
//!             ),
//!     )
//!     .build();
//! ```

use super::instruction::Instruction;
use super::wire::encode_module;
use super::{
    FieldDef, MethodDef, TypeDef, CONTRACT_BASE, METHOD_CONSTRUCTOR, METHOD_NATIVE, METHOD_PUBLIC,
    TYPE_ABSTRACT, TYPE_PUBLIC,
};
use crate::domain::value_objects::{ByteCode, ValueType};

/// Builds one method.
#[derive(Clone, Debug)]
pub struct MethodBuilder {
    def: MethodDef,
}

impl MethodBuilder {
    /// Starts a private method with no parameters and an empty body.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: MethodDef {
                name: name.into(),
                flags: 0,
                params: Vec::new(),
                body: Vec::new(),
            },
        }
    }

    /// Marks the method externally callable.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.def.flags |= METHOD_PUBLIC;
        self
    }

    /// Marks the method as the deployment constructor.
    #[must_use]
    pub fn constructor(mut self) -> Self {
        self.def.flags |= METHOD_CONSTRUCTOR;
        self
    }

    /// Marks the method as host-native.
    #[must_use]
    pub fn native(mut self) -> Self {
        self.def.flags |= METHOD_NATIVE;
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, ty: ValueType) -> Self {
        self.def.params.push(ty);
        self
    }

    /// Appends one instruction.
    #[must_use]
    pub fn op(mut self, instr: Instruction) -> Self {
        self.def.body.push(instr);
        self
    }

    /// Appends several instructions.
    #[must_use]
    pub fn ops(mut self, instrs: impl IntoIterator<Item = Instruction>) -> Self {
        self.def.body.extend(instrs);
        self
    }

    /// Index the next appended instruction will get (for jump targets).
    #[must_use]
    pub fn next_index(&self) -> u32 {
        u32::try_from(self.def.body.len()).unwrap_or(u32::MAX)
    }

    /// Finishes the method.
    #[must_use]
    pub fn build(self) -> MethodDef {
        self.def
    }
}

/// Builds one type.
#[derive(Clone, Debug)]
pub struct TypeBuilder {
    def: TypeDef,
}

impl TypeBuilder {
    /// Starts a type with explicit base and flags.
    #[must_use]
    pub fn new(name: impl Into<String>, base: impl Into<String>, flags: u8) -> Self {
        Self {
            def: TypeDef {
                name: name.into(),
                base: base.into(),
                flags,
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    /// Starts a public, concrete contract type.
    #[must_use]
    pub fn contract(name: impl Into<String>) -> Self {
        Self::new(name, CONTRACT_BASE, TYPE_PUBLIC)
    }

    /// Marks the type abstract.
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.def.flags |= TYPE_ABSTRACT;
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.def.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Appends a method given by flags, parameter types and body.
    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        flags: u8,
        params: &[ValueType],
        body: Vec<Instruction>,
    ) -> Self {
        self.def.methods.push(MethodDef {
            name: name.into(),
            flags,
            params: params.to_vec(),
            body,
        });
        self
    }

    /// Appends a method built with [`MethodBuilder`].
    #[must_use]
    pub fn with_method(mut self, method: MethodBuilder) -> Self {
        self.def.methods.push(method.build());
        self
    }

    /// Finishes the type.
    #[must_use]
    pub fn build(self) -> TypeDef {
        self.def
    }
}

/// Builds a whole module.
#[derive(Clone, Debug, Default)]
pub struct ModuleBuilder {
    types: Vec<TypeDef>,
}

impl ModuleBuilder {
    /// Starts an empty module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a type.
    #[must_use]
    pub fn with_type(mut self, ty: TypeBuilder) -> Self {
        self.types.push(ty.build());
        self
    }

    /// The types declared so far.
    #[must_use]
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Encodes the module.
    #[must_use]
    pub fn build(self) -> ByteCode {
        encode_module(&self.types)
    }
}
