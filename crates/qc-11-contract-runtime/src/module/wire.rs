//! # Module Wire Format
//!
//! Byte-level reader and writer for the module format. The writer is the
//! output stage of any compiler targeting the runtime; the reader is used by
//! the loader and never panics on hostile input.

use super::instruction::{opcodes as op, FloatOp, Instruction};
use super::{FieldDef, MethodDef, TypeDef, FORMAT_VERSION, MAGIC};
use crate::domain::value_objects::{Address, ByteCode, Value, ValueType};
use crate::errors::LoadError;

/// Tags of [`Value`] constants.
mod value_tags {
    pub const NULL: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const U64: u8 = 2;
    pub const BYTES: u8 = 3;
    pub const STR: u8 = 4;
    pub const ADDRESS: u8 = 5;
}

// =============================================================================
// WRITER
// =============================================================================

/// Append-only big-endian writer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one byte.
    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Writes a big-endian u16.
    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a big-endian u32.
    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a big-endian u64.
    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes raw bytes.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a `u16`-length-prefixed string. Longer strings are truncated
    /// at the length limit by the builder before they get here.
    pub fn str(&mut self, s: &str) {
        let len = u16::try_from(s.len()).unwrap_or(u16::MAX);
        self.u16(len);
        self.raw(&s.as_bytes()[..len as usize]);
    }

    /// Writes a `u32`-length-prefixed byte string.
    pub fn bytes(&mut self, b: &[u8]) {
        let len = u32::try_from(b.len()).unwrap_or(u32::MAX);
        self.u32(len);
        self.raw(&b[..len as usize]);
    }

    /// Writes a tagged value constant.
    pub fn value(&mut self, value: &Value) {
        match value {
            Value::Null => self.u8(value_tags::NULL),
            Value::Bool(b) => {
                self.u8(value_tags::BOOL);
                self.u8(u8::from(*b));
            }
            Value::U64(n) => {
                self.u8(value_tags::U64);
                self.u64(*n);
            }
            Value::Bytes(b) => {
                self.u8(value_tags::BYTES);
                self.bytes(b);
            }
            Value::Str(s) => {
                self.u8(value_tags::STR);
                self.bytes(s.as_bytes());
            }
            Value::Address(a) => {
                self.u8(value_tags::ADDRESS);
                self.raw(a.as_bytes());
            }
        }
    }

    /// Writes one instruction.
    pub fn instruction(&mut self, instr: &Instruction) {
        self.u8(instr.opcode());
        match instr {
            Instruction::Push(v) => self.value(v),
            Instruction::Jump(t) | Instruction::JumpIf(t) => self.u32(*t),
            Instruction::LoadArg(i) => self.u8(*i),
            Instruction::LoadField(i)
            | Instruction::StoreField(i)
            | Instruction::LoadEntry(i)
            | Instruction::StoreEntry(i) => self.u16(*i),
            Instruction::Emit { event, topics } => {
                self.str(event);
                self.u8(*topics);
            }
            Instruction::Call { method, argc } | Instruction::TryCall { method, argc } => {
                self.str(method);
                self.u8(*argc);
            }
            Instruction::NativeCall(symbol) | Instruction::Reflect(symbol) => self.str(symbol),
            Instruction::PushFloat(bits) => self.u64(*bits),
            Instruction::FloatOp(fop) => self.u8(fop.tag()),
            _ => {}
        }
    }

    /// Consumes the writer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Serializes a list of types into module bytecode.
///
/// This is the producer side of the format: no semantic checks are made,
/// so it can (and in tests does) produce modules the validator rejects.
#[must_use]
pub fn encode_module(types: &[TypeDef]) -> ByteCode {
    let mut w = Writer::new();
    w.raw(&MAGIC);
    w.u8(FORMAT_VERSION);
    w.u16(u16::try_from(types.len()).unwrap_or(u16::MAX));
    for ty in types.iter().take(u16::MAX as usize) {
        w.str(&ty.name);
        w.str(&ty.base);
        w.u8(ty.flags);
        w.u16(u16::try_from(ty.fields.len()).unwrap_or(u16::MAX));
        for field in ty.fields.iter().take(u16::MAX as usize) {
            w.str(&field.name);
            w.u8(field.ty.tag());
        }
        w.u16(u16::try_from(ty.methods.len()).unwrap_or(u16::MAX));
        for method in ty.methods.iter().take(u16::MAX as usize) {
            w.str(&method.name);
            w.u8(method.flags);
            w.u8(u8::try_from(method.params.len()).unwrap_or(u8::MAX));
            for param in method.params.iter().take(u8::MAX as usize) {
                w.u8(param.tag());
            }
            w.u32(u32::try_from(method.body.len()).unwrap_or(u32::MAX));
            for instr in &method.body {
                w.instruction(instr);
            }
        }
    }
    ByteCode::new(w.finish())
}

// =============================================================================
// READER
// =============================================================================

/// Bounds-checked big-endian reader over untrusted bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Starts reading at offset 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        if self.remaining() < n {
            return Err(LoadError::malformed(format!(
                "unexpected end of module at offset {} (need {n} bytes)",
                self.pos
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian u16.
    pub fn u16(&mut self) -> Result<u16, LoadError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Reads a big-endian u32.
    pub fn u32(&mut self) -> Result<u32, LoadError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Reads a big-endian u64.
    pub fn u64(&mut self) -> Result<u64, LoadError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Reads exactly `n` raw bytes.
    pub fn raw(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        self.take(n)
    }

    /// Reads a `u16`-length-prefixed UTF-8 string.
    pub fn str(&mut self) -> Result<String, LoadError> {
        let len = self.u16()? as usize;
        let at = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| LoadError::malformed(format!("invalid utf-8 string at offset {at}")))
    }

    /// Reads a `u32`-length-prefixed byte string.
    pub fn bytes(&mut self) -> Result<Vec<u8>, LoadError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads a value type tag.
    pub fn value_type(&mut self) -> Result<ValueType, LoadError> {
        let at = self.pos;
        let tag = self.u8()?;
        ValueType::from_tag(tag).ok_or_else(|| {
            LoadError::malformed(format!("unknown type tag {tag:#04x} at offset {at}"))
        })
    }

    /// Reads a tagged value constant.
    pub fn value(&mut self) -> Result<Value, LoadError> {
        let at = self.pos;
        match self.u8()? {
            value_tags::NULL => Ok(Value::Null),
            value_tags::BOOL => match self.u8()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(LoadError::malformed(format!(
                    "invalid bool byte {other:#04x} at offset {}",
                    at + 1
                ))),
            },
            value_tags::U64 => Ok(Value::U64(self.u64()?)),
            value_tags::BYTES => Ok(Value::Bytes(self.bytes()?)),
            value_tags::STR => {
                let bytes = self.bytes()?;
                String::from_utf8(bytes).map(Value::Str).map_err(|_| {
                    LoadError::malformed(format!("invalid utf-8 constant at offset {at}"))
                })
            }
            value_tags::ADDRESS => Ok(Value::Address(Address::new(self.array()?))),
            tag => Err(LoadError::malformed(format!(
                "unknown value tag {tag:#04x} at offset {at}"
            ))),
        }
    }

    /// Reads one instruction.
    pub fn instruction(&mut self) -> Result<Instruction, LoadError> {
        let at = self.pos;
        let instr = match self.u8()? {
            op::PUSH => Instruction::Push(self.value()?),
            op::POP => Instruction::Pop,
            op::DUP => Instruction::Dup,
            op::SWAP => Instruction::Swap,
            op::ADD => Instruction::Add,
            op::SUB => Instruction::Sub,
            op::MUL => Instruction::Mul,
            op::DIV => Instruction::Div,
            op::MOD => Instruction::Mod,
            op::EQ => Instruction::Eq,
            op::LT => Instruction::Lt,
            op::GT => Instruction::Gt,
            op::NOT => Instruction::Not,
            op::JUMP => Instruction::Jump(self.u32()?),
            op::JUMP_IF => Instruction::JumpIf(self.u32()?),
            op::LOAD_ARG => Instruction::LoadArg(self.u8()?),
            op::LOAD_FIELD => Instruction::LoadField(self.u16()?),
            op::STORE_FIELD => Instruction::StoreField(self.u16()?),
            op::LOAD_ENTRY => Instruction::LoadEntry(self.u16()?),
            op::STORE_ENTRY => Instruction::StoreEntry(self.u16()?),
            op::CALLER => Instruction::Caller,
            op::SELF_ADDRESS => Instruction::SelfAddress,
            op::EMIT => Instruction::Emit {
                event: self.str()?,
                topics: self.u8()?,
            },
            op::CALL => Instruction::Call {
                method: self.str()?,
                argc: self.u8()?,
            },
            op::TRY_CALL => Instruction::TryCall {
                method: self.str()?,
                argc: self.u8()?,
            },
            op::RETURN => Instruction::Return,
            op::RETURN_VOID => Instruction::ReturnVoid,
            op::REVERT => Instruction::Revert,
            op::NATIVE_CALL => Instruction::NativeCall(self.str()?),
            op::PUSH_FLOAT => Instruction::PushFloat(self.u64()?),
            op::FLOAT_OP => {
                let tag = self.u8()?;
                Instruction::FloatOp(FloatOp::from_tag(tag).ok_or_else(|| {
                    let at = at + 1;
                    LoadError::malformed(format!("unknown float op {tag:#04x} at offset {at}"))
                })?)
            }
            op::NOW => Instruction::Now,
            op::RANDOM => Instruction::Random,
            op::REFLECT => Instruction::Reflect(self.str()?),
            op::SPAWN => Instruction::Spawn,
            op::ITER_UNORDERED => Instruction::IterUnordered,
            other => {
                return Err(LoadError::malformed(format!(
                    "unknown opcode {other:#04x} at offset {at}"
                )))
            }
        };
        Ok(instr)
    }

    /// Reads a field declaration.
    pub fn field(&mut self) -> Result<FieldDef, LoadError> {
        Ok(FieldDef {
            name: self.str()?,
            ty: self.value_type()?,
        })
    }

    /// Reads a method declaration including its body.
    pub fn method(&mut self) -> Result<MethodDef, LoadError> {
        let name = self.str()?;
        let flags = self.u8()?;
        let param_count = self.u8()?;
        let params = (0..param_count)
            .map(|_| self.value_type())
            .collect::<Result<Vec<_>, _>>()?;
        let instr_count = self.u32()? as usize;
        // Every instruction occupies at least one byte.
        if instr_count > self.remaining() {
            return Err(LoadError::malformed(format!(
                "method {name} declares {instr_count} instructions but only {} bytes remain",
                self.remaining()
            )));
        }
        let mut body = Vec::with_capacity(instr_count);
        for _ in 0..instr_count {
            body.push(self.instruction()?);
        }
        Ok(MethodDef {
            name,
            flags,
            params,
            body,
        })
    }

    /// Reads a type declaration.
    pub fn type_def(&mut self) -> Result<TypeDef, LoadError> {
        let name = self.str()?;
        let base = self.str()?;
        let flags = self.u8()?;
        let field_count = self.u16()?;
        let fields = (0..field_count)
            .map(|_| self.field())
            .collect::<Result<Vec<_>, _>>()?;
        let method_count = self.u16()?;
        let methods = (0..method_count)
            .map(|_| self.method())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeDef {
            name,
            base,
            flags,
            fields,
            methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_rejects_truncation() {
        let mut r = Reader::new(&[0x00]);
        assert!(matches!(r.u16(), Err(LoadError::MalformedBytecode(_))));
    }

    #[test]
    fn test_value_constants() {
        let values = [
            Value::Null,
            Value::Bool(true),
            Value::U64(u64::MAX),
            Value::Bytes(vec![0, 1, 2]),
            Value::Str("héllo".into()),
            Value::Address(Address::new([5u8; 20])),
        ];
        let mut w = Writer::new();
        for v in &values {
            w.value(v);
        }
        let bytes = w.finish();
        let mut r = Reader::new(&bytes);
        for v in &values {
            assert_eq!(&r.value().unwrap(), v);
        }
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_invalid_bool_byte() {
        let mut r = Reader::new(&[value_tags::BOOL, 2]);
        assert!(r.value().is_err());
    }

    #[test]
    fn test_unknown_opcode() {
        let mut r = Reader::new(&[0xFF]);
        let err = r.instruction().unwrap_err();
        assert!(err.to_string().contains("unknown opcode 0xff"));
    }

    #[test]
    fn test_method_instruction_count_bound() {
        let mut w = Writer::new();
        w.str("m");
        w.u8(0);
        w.u8(0);
        w.u32(1_000_000);
        let bytes = w.finish();
        let mut r = Reader::new(&bytes);
        assert!(r.method().is_err());
    }
}
