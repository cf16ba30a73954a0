//! # Contract Loader
//!
//! Turns raw bytecode into a [`Module`]. Loading is structural only: it
//! checks that the bytes are a well-formed module and that every reference
//! inside it resolves, then locates the entry type. Semantic policy is the
//! validator's job and nothing is executed here.

use super::wire::Reader;
use super::{Module, TypeDef, CONTRACT_BASE, FORMAT_VERSION, MAGIC};
use crate::domain::value_objects::ByteCode;
use crate::errors::LoadError;
use std::collections::HashSet;

/// Parses `bytecode` into a module.
pub fn load(bytecode: &ByteCode) -> Result<Module, LoadError> {
    let bytes = bytecode.as_slice();
    let mut reader = Reader::new(bytes);

    let magic = reader.raw(MAGIC.len())?;
    if magic != MAGIC {
        return Err(LoadError::malformed("bad magic"));
    }
    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(LoadError::malformed(format!(
            "unsupported format version {version}"
        )));
    }

    let type_count = reader.u16()?;
    let mut types = Vec::with_capacity(type_count as usize);
    for _ in 0..type_count {
        types.push(reader.type_def()?);
    }
    if reader.remaining() != 0 {
        return Err(LoadError::malformed(format!(
            "{} trailing bytes after offset {}",
            reader.remaining(),
            reader.position()
        )));
    }

    check_references(&types)?;
    let entry = find_entry(&types)?;
    Ok(Module::new(types, entry))
}

/// Like [`load`], but first enforces a code size limit.
pub fn load_with_limit(bytecode: &ByteCode, max_code_size: usize) -> Result<Module, LoadError> {
    if bytecode.len() > max_code_size {
        return Err(LoadError::CodeSizeExceeded {
            size: bytecode.len(),
            max: max_code_size,
        });
    }
    load(bytecode)
}

fn check_references(types: &[TypeDef]) -> Result<(), LoadError> {
    let mut type_names = HashSet::with_capacity(types.len());
    for ty in types {
        if ty.name.is_empty() {
            return Err(LoadError::malformed("type with empty name"));
        }
        if !type_names.insert(ty.name.as_str()) {
            return Err(LoadError::malformed(format!("duplicate type {}", ty.name)));
        }
    }

    for ty in types {
        if !ty.base.is_empty()
            && ty.base != CONTRACT_BASE
            && !type_names.contains(ty.base.as_str())
        {
            return Err(LoadError::malformed(format!(
                "type {} derives from unresolved type {}",
                ty.name, ty.base
            )));
        }
        check_type(ty)?;
    }
    Ok(())
}

fn check_type(ty: &TypeDef) -> Result<(), LoadError> {
    let mut field_names = HashSet::with_capacity(ty.fields.len());
    for field in &ty.fields {
        // NUL separates field names from entry keys in storage.
        if field.name.is_empty() || field.name.contains('\0') {
            return Err(LoadError::malformed(format!(
                "invalid field name {:?} in type {}",
                field.name, ty.name
            )));
        }
        if !field_names.insert(field.name.as_str()) {
            return Err(LoadError::malformed(format!(
                "duplicate field {}.{}",
                ty.name, field.name
            )));
        }
    }

    let mut method_names = HashSet::with_capacity(ty.methods.len());
    for method in &ty.methods {
        if !method_names.insert(method.name.as_str()) {
            return Err(LoadError::malformed(format!(
                "duplicate method {}.{}",
                ty.name, method.name
            )));
        }
        let len = method.body.len();
        for (pc, instr) in method.body.iter().enumerate() {
            use super::Instruction as I;
            let bad = match instr {
                I::Jump(t) | I::JumpIf(t) => (*t as usize) >= len,
                I::LoadArg(i) => (*i as usize) >= method.params.len(),
                I::LoadField(i) | I::StoreField(i) | I::LoadEntry(i) | I::StoreEntry(i) => {
                    (*i as usize) >= ty.fields.len()
                }
                _ => false,
            };
            if bad {
                return Err(LoadError::malformed(format!(
                    "{}.{}@{pc}: {} operand out of range",
                    ty.name,
                    method.name,
                    instr.mnemonic()
                )));
            }
        }
    }
    Ok(())
}

fn find_entry(types: &[TypeDef]) -> Result<usize, LoadError> {
    let mut candidates = types.iter().enumerate().filter(|(_, ty)| ty.is_contract());
    match (candidates.next(), candidates.next()) {
        (Some((index, _)), None) => Ok(index),
        (None, _) => Err(LoadError::malformed("no exported contract type")),
        (Some(_), Some(_)) => Err(LoadError::malformed("several exported contract types")),
    }
}
