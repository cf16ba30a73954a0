//! # Disassembler
//!
//! Human-readable listing of a loaded module, for display and diagnostics.
//! Never on the execution path.

use super::instruction::Instruction;
use super::{MethodDef, Module, TypeDef};
use crate::domain::value_objects::ValueType;
use std::fmt::Write;

/// Renders the whole module as text.
#[must_use]
pub fn disassemble(module: &Module) -> String {
    let mut out = String::new();
    let entry = &module.entry_type().name;
    for ty in module.types() {
        write_type(&mut out, ty, &ty.name == entry);
    }
    out
}

fn write_type(out: &mut String, ty: &TypeDef, is_entry: bool) {
    let mut modifiers = Vec::new();
    if ty.is_public() {
        modifiers.push("public");
    }
    if ty.is_abstract() {
        modifiers.push("abstract");
    }
    let _ = write!(out, "{} type {}", modifiers.join(" "), ty.name);
    if !ty.base.is_empty() {
        let _ = write!(out, " : {}", ty.base);
    }
    if is_entry {
        out.push_str("  ; entry");
    }
    out.push('\n');

    for (index, field) in ty.fields.iter().enumerate() {
        let _ = writeln!(out, "  field #{index} {}: {}", field.name, type_name(field.ty));
    }
    for method in &ty.methods {
        write_method(out, ty, method);
    }
    out.push('\n');
}

fn write_method(out: &mut String, ty: &TypeDef, method: &MethodDef) {
    let mut modifiers = Vec::new();
    if method.is_public() {
        modifiers.push("public");
    }
    if method.is_constructor() {
        modifiers.push("constructor");
    }
    if method.is_native() {
        modifiers.push("native");
    }
    let params: Vec<&str> = method.params.iter().map(|p| type_name(*p)).collect();
    let _ = writeln!(
        out,
        "  {}{}method {}({})",
        modifiers.join(" "),
        if modifiers.is_empty() { "" } else { " " },
        method.name,
        params.join(", ")
    );
    for (pc, instr) in method.body.iter().enumerate() {
        let _ = writeln!(out, "    {pc:04}  {}", render(ty, instr));
    }
}

fn render(ty: &TypeDef, instr: &Instruction) -> String {
    let field = |i: &u16| {
        ty.fields
            .get(*i as usize)
            .map_or_else(|| format!("#{i}"), |f| f.name.clone())
    };
    let mnemonic = instr.mnemonic();
    match instr {
        Instruction::Push(v) => format!("{mnemonic} {v:?}"),
        Instruction::Jump(t) | Instruction::JumpIf(t) => format!("{mnemonic} {t:04}"),
        Instruction::LoadArg(i) => format!("{mnemonic} {i}"),
        Instruction::LoadField(i)
        | Instruction::StoreField(i)
        | Instruction::LoadEntry(i)
        | Instruction::StoreEntry(i) => format!("{mnemonic} {}", field(i)),
        Instruction::Emit { event, topics } => format!("{mnemonic} {event}/{topics}"),
        Instruction::Call { method, argc } | Instruction::TryCall { method, argc } => {
            format!("{mnemonic} {method}/{argc}")
        }
        Instruction::NativeCall(symbol) | Instruction::Reflect(symbol) => {
            format!("{mnemonic} {symbol}")
        }
        Instruction::PushFloat(bits) => format!("{mnemonic} {}", f64::from_bits(*bits)),
        Instruction::FloatOp(op) => format!("{mnemonic} {op:?}"),
        _ => mnemonic.to_string(),
    }
}

fn type_name(ty: ValueType) -> &'static str {
    match ty {
        ValueType::Bool => "bool",
        ValueType::U64 => "u64",
        ValueType::Bytes => "bytes",
        ValueType::Str => "str",
        ValueType::Address => "address",
        ValueType::F32 => "f32",
        ValueType::F64 => "f64",
        ValueType::Any => "any",
    }
}
