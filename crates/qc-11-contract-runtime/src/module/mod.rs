//! # Contract Modules
//!
//! The structured view of a [`ByteCode`](crate::domain::ByteCode) artifact.
//!
//! ## Binary format (version 1)
//!
//! All integers are big-endian; strings are `u16 length | utf-8`.
//!
//! ```text
//! module  := "QCVM" version:u8 type_count:u16 type*
//! type    := name:str base:str flags:u8 field_count:u16 field* method_count:u16 method*
//! field   := name:str type:u8
//! method  := name:str flags:u8 param_count:u8 type:u8* instr_count:u32 instr*
//! ```
//!
//! The entry type is the single public, non-abstract type whose base is
//! [`CONTRACT_BASE`].
//!
//! ## Components
//!
//! - `instruction.rs` - instruction set and opcodes
//! - `wire.rs` - byte-level reader/writer shared by encoder and loader
//! - `loader.rs` - bytes to [`Module`], structural checks only
//! - `builder.rs` - programmatic module construction (compiler output side)
//! - `disasm.rs` - human-readable listing (display side)

pub mod builder;
pub mod disasm;
pub mod instruction;
pub mod loader;
pub mod wire;

pub use builder::{MethodBuilder, ModuleBuilder, TypeBuilder};
pub use disasm::disassemble;
pub use instruction::{FloatOp, Instruction};
pub use loader::{load, load_with_limit};
pub use wire::encode_module;

use crate::domain::value_objects::ValueType;

/// Magic bytes opening every module.
pub const MAGIC: [u8; 4] = *b"QCVM";

/// Supported format version.
pub const FORMAT_VERSION: u8 = 1;

/// Base type every contract entry type derives from.
pub const CONTRACT_BASE: &str = "SmartContract";

/// Type flag: visible outside the module.
pub const TYPE_PUBLIC: u8 = 0x01;
/// Type flag: cannot be instantiated.
pub const TYPE_ABSTRACT: u8 = 0x02;

/// Method flag: externally callable.
pub const METHOD_PUBLIC: u8 = 0x01;
/// Method flag: runs once at deployment.
pub const METHOD_CONSTRUCTOR: u8 = 0x02;
/// Method flag: implemented by host-native code.
pub const METHOD_NATIVE: u8 = 0x04;

/// A field of a contract type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name (also its storage key).
    pub name: String,
    /// Declared type.
    pub ty: ValueType,
}

/// A method of a contract type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    /// Method name.
    pub name: String,
    /// Raw flag byte.
    pub flags: u8,
    /// Parameter types.
    pub params: Vec<ValueType>,
    /// Instructions.
    pub body: Vec<Instruction>,
}

impl MethodDef {
    /// Externally callable.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags & METHOD_PUBLIC != 0
    }

    /// Deployment constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags & METHOD_CONSTRUCTOR != 0
    }

    /// Marked as implemented by host-native code.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.flags & METHOD_NATIVE != 0
    }
}

/// A type declared by a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    /// Type name.
    pub name: String,
    /// Base type name (empty for none).
    pub base: String,
    /// Raw flag byte.
    pub flags: u8,
    /// Field layout, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Methods, in declaration order.
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    /// Visible outside the module.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags & TYPE_PUBLIC != 0
    }

    /// Cannot be instantiated.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags & TYPE_ABSTRACT != 0
    }

    /// Returns true if this type qualifies as a contract entry type.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        self.is_public() && !self.is_abstract() && self.base == CONTRACT_BASE
    }

    /// Finds a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// The constructor, if declared.
    #[must_use]
    pub fn constructor(&self) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.is_constructor())
    }
}

/// A loaded module: every declared type plus the resolved entry type.
///
/// Modules are transient: built per load, discarded after validation or
/// execution, never persisted (only the bytecode is).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    types: Vec<TypeDef>,
    entry: usize,
}

impl Module {
    /// Assembles a module. `entry` must index into `types`.
    pub(crate) fn new(types: Vec<TypeDef>, entry: usize) -> Self {
        debug_assert!(entry < types.len());
        Self { types, entry }
    }

    /// All declared types, in declaration order.
    #[must_use]
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// The exported contract type.
    #[must_use]
    pub fn entry_type(&self) -> &TypeDef {
        &self.types[self.entry]
    }

    /// Finds a method on the entry type.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.entry_type().method(name)
    }
}
