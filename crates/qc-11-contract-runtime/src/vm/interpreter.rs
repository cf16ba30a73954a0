//! # Interpreter
//!
//! Executes one method body of a loaded [`Module`] against a [`Host`].
//!
//! The interpreter never recurses. A `Call`/`TryCall` suspends the frame and
//! returns [`Exit::Call`] to the engine, which runs the callee on its own
//! explicit call stack and later hands the outcome back through
//! [`Frame::resume`]. The host process stack therefore stays flat whatever
//! the contract call depth.
//!
//! Every instruction is charged before it executes. The first step of a
//! frame also charges the invocation entry cost.

use crate::domain::entities::LogEntry;
use crate::domain::services::{entry_key, field_key};
use crate::domain::value_objects::{Address, StorageKey, StorageValue, Value};
use crate::errors::ExecutionFault;
use crate::gas::{GasMeter, GasSchedule};
use crate::module::wire::{Reader, Writer};
use crate::module::{FieldDef, Instruction, Module};
use crate::receipt::{encode_topic, event_topics};
use crate::vm::stack::ValueStack;
use std::sync::Arc;

// =============================================================================
// HOST SEAM
// =============================================================================

/// Storage and log sink seen by a running frame.
///
/// Addresses passed in are always the frame's own contract: a contract can
/// only touch its own keyspace.
pub trait Host {
    /// Reads a storage slot.
    fn storage_get(
        &mut self,
        address: &Address,
        key: &StorageKey,
    ) -> Result<Option<StorageValue>, ExecutionFault>;

    /// Writes a storage slot. An empty value deletes.
    fn storage_set(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), ExecutionFault>;

    /// Records an emitted event.
    fn emit(&mut self, log: LogEntry);
}

// =============================================================================
// FRAME
// =============================================================================

/// Nested call requested by a suspended frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    /// Callee contract.
    pub target: Address,
    /// Public method on the callee.
    pub method: String,
    /// Arguments, in declared order.
    pub args: Vec<Value>,
    /// Gas the caller asks to forward.
    pub gas: u64,
    /// `TryCall`: a callee fault is reported as `false` instead of re-raised.
    pub catching: bool,
}

/// Why [`run`] stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The method finished.
    Return(Option<Value>),
    /// The frame is suspended on a nested call.
    Call(CallRequest),
}

/// Execution state of one method invocation.
#[derive(Debug)]
pub struct Frame {
    module: Arc<Module>,
    /// Index into the entry type's methods; `None` runs an empty body.
    method: Option<usize>,
    pc: usize,
    stack: ValueStack,
    args: Vec<Value>,
    address: Address,
    caller: Address,
    started: bool,
    /// Set while suspended on a call; holds the `catching` flag.
    pending: Option<bool>,
}

impl Frame {
    /// Creates a frame for a method of the module's entry type.
    ///
    /// `method == None` stands for an implicit constructor with an empty
    /// body. Arguments must match the declared parameter list.
    pub fn new(
        module: Arc<Module>,
        method: Option<usize>,
        args: Vec<Value>,
        address: Address,
        caller: Address,
        max_stack: usize,
    ) -> Result<Self, ExecutionFault> {
        let params = match method {
            Some(index) => {
                let def = module
                    .entry_type()
                    .methods
                    .get(index)
                    .ok_or_else(|| ExecutionFault::runtime(format!("no method #{index}")))?;
                def.params.as_slice()
            }
            None => &[],
        };
        if params.len() != args.len() {
            return Err(ExecutionFault::runtime(format!(
                "expected {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        if let Some((i, (ty, arg))) = params
            .iter()
            .zip(&args)
            .enumerate()
            .find(|(_, (ty, arg))| !arg.fits(**ty))
        {
            return Err(ExecutionFault::runtime(format!(
                "argument {i}: expected {ty:?}, got {}",
                arg.type_name()
            )));
        }

        Ok(Self {
            module,
            method,
            pc: 0,
            stack: ValueStack::new(max_stack),
            args,
            address,
            caller,
            started: false,
            pending: None,
        })
    }

    /// Contract being executed.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Immediate caller.
    #[must_use]
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Next instruction index.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Name of the executing method, `"<init>"` for an implicit constructor.
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method
            .and_then(|i| self.module.entry_type().methods.get(i))
            .map_or("<init>", |m| m.name.as_str())
    }

    /// Returns true while suspended on a nested call.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.pending.is_some()
    }

    /// Delivers the outcome of the nested call this frame is suspended on.
    ///
    /// | Instruction | Callee outcome | Effect |
    /// |-------------|----------------|--------|
    /// | `Call` | success | push return value (`Null` if none) |
    /// | `Call` | fault | fault re-raised in this frame |
    /// | `TryCall` | success | push return value, then `true` |
    /// | `TryCall` | fault | push `false` |
    pub fn resume(
        &mut self,
        outcome: Result<Option<Value>, ExecutionFault>,
    ) -> Result<(), ExecutionFault> {
        let catching = self
            .pending
            .take()
            .ok_or_else(|| ExecutionFault::runtime("resume without a pending call"))?;
        match (outcome, catching) {
            (Ok(value), false) => self.stack.push(value.unwrap_or_default()),
            (Ok(value), true) => {
                self.stack.push(value.unwrap_or_default())?;
                self.stack.push(Value::Bool(true))
            }
            (Err(_), true) => self.stack.push(Value::Bool(false)),
            (Err(fault), false) => Err(fault),
        }
    }
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Runs `frame` until it returns, faults or suspends on a nested call.
pub fn run(
    frame: &mut Frame,
    meter: &mut GasMeter,
    host: &mut dyn Host,
    schedule: &GasSchedule,
) -> Result<Exit, ExecutionFault> {
    if frame.pending.is_some() {
        return Err(ExecutionFault::runtime("frame is suspended on a call"));
    }
    if !frame.started {
        frame.started = true;
        meter.spend(schedule.invocation)?;
    }

    let module = Arc::clone(&frame.module);
    let body: &[Instruction] = match frame.method {
        Some(index) => module
            .entry_type()
            .methods
            .get(index)
            .map(|m| m.body.as_slice())
            .unwrap_or_default(),
        None => &[],
    };
    let fields = module.entry_type().fields.as_slice();

    loop {
        // Falling off the end of the body returns nothing.
        let Some(instr) = body.get(frame.pc) else {
            return Ok(Exit::Return(None));
        };
        meter.spend(schedule.instruction_cost(instr))?;
        frame.pc += 1;

        if let Some(exit) = step(frame, instr, fields, meter, host, schedule)? {
            return Ok(exit);
        }
    }
}

fn step(
    frame: &mut Frame,
    instr: &Instruction,
    fields: &[FieldDef],
    meter: &mut GasMeter,
    host: &mut dyn Host,
    schedule: &GasSchedule,
) -> Result<Option<Exit>, ExecutionFault> {
    let stack = &mut frame.stack;
    match instr {
        // Stack
        Instruction::Push(value) => {
            meter.spend(schedule.value_byte_cost(value.payload_len()))?;
            stack.push(value.clone())?;
        }
        Instruction::Pop => {
            stack.pop()?;
        }
        Instruction::Dup => {
            let len = stack.peek(0).map_or(0, Value::payload_len);
            meter.spend(schedule.value_byte_cost(len))?;
            stack.dup()?;
        }
        Instruction::Swap => stack.swap()?,

        // Arithmetic & comparison
        Instruction::Add => binary(stack, |a, b| a.checked_add(b).ok_or_else(overflow))?,
        Instruction::Sub => binary(stack, |a, b| a.checked_sub(b).ok_or_else(overflow))?,
        Instruction::Mul => binary(stack, |a, b| a.checked_mul(b).ok_or_else(overflow))?,
        Instruction::Div => binary(stack, |a, b| a.checked_div(b).ok_or_else(division_by_zero))?,
        Instruction::Mod => binary(stack, |a, b| a.checked_rem(b).ok_or_else(division_by_zero))?,
        Instruction::Eq => {
            let b = stack.pop()?;
            let a = stack.pop()?;
            meter.spend(schedule.value_byte_cost(a.payload_len() + b.payload_len()))?;
            stack.push(Value::Bool(a == b))?;
        }
        Instruction::Lt => compare(stack, |a, b| a < b)?,
        Instruction::Gt => compare(stack, |a, b| a > b)?,
        Instruction::Not => {
            let b = stack.pop_bool()?;
            stack.push(Value::Bool(!b))?;
        }

        // Control flow
        Instruction::Jump(target) => frame.pc = *target as usize,
        Instruction::JumpIf(target) => {
            if stack.pop_bool()? {
                frame.pc = *target as usize;
            }
        }

        // Context
        Instruction::LoadArg(index) => {
            let arg = frame
                .args
                .get(usize::from(*index))
                .cloned()
                .ok_or_else(|| ExecutionFault::runtime(format!("no argument #{index}")))?;
            stack.push(arg)?;
        }
        Instruction::Caller => stack.push(Value::Address(frame.caller))?,
        Instruction::SelfAddress => stack.push(Value::Address(frame.address))?,

        // Storage
        Instruction::LoadField(index) => {
            let field = field_at(fields, *index)?;
            let stored = host.storage_get(&frame.address, &field_key(&field.name))?;
            stack.push(decode_stored(stored.as_ref())?)?;
        }
        Instruction::StoreField(index) => {
            let field = field_at(fields, *index)?;
            let value = stack.pop()?;
            check_fits(field, &value)?;
            let encoded = encode_stored(&value);
            meter.spend(schedule.storage_write_cost(encoded.as_slice().len()))?;
            host.storage_set(frame.address, field_key(&field.name), encoded)?;
        }
        Instruction::LoadEntry(index) => {
            let field = field_at(fields, *index)?;
            let key = stack.pop()?;
            let slot = entry_key(&field.name, &encode_topic(&key));
            let stored = host.storage_get(&frame.address, &slot)?;
            stack.push(decode_stored(stored.as_ref())?)?;
        }
        Instruction::StoreEntry(index) => {
            let field = field_at(fields, *index)?;
            let value = stack.pop()?;
            let key = stack.pop()?;
            check_fits(field, &value)?;
            let encoded = encode_stored(&value);
            meter.spend(schedule.storage_write_cost(encoded.as_slice().len()))?;
            let slot = entry_key(&field.name, &encode_topic(&key));
            host.storage_set(frame.address, slot, encoded)?;
        }

        // Events
        Instruction::Emit { event, topics } => {
            let values = stack.pop_n(usize::from(*topics))?;
            let log = LogEntry::new(frame.address, event.clone(), event_topics(event, &values));
            meter.spend(schedule.emit_byte_cost(log.topic_bytes()))?;
            host.emit(log);
        }

        // Calls
        Instruction::Call { method, argc } | Instruction::TryCall { method, argc } => {
            let args = stack.pop_n(usize::from(*argc))?;
            let gas = stack.pop_u64()?;
            let target = stack.pop_address()?;
            let catching = matches!(instr, Instruction::TryCall { .. });
            frame.pending = Some(catching);
            return Ok(Some(Exit::Call(CallRequest {
                target,
                method: method.clone(),
                args,
                gas,
                catching,
            })));
        }
        Instruction::Return => return Ok(Some(Exit::Return(Some(stack.pop()?)))),
        Instruction::ReturnVoid => return Ok(Some(Exit::Return(None))),
        Instruction::Revert => {
            let reason = match stack.pop()? {
                Value::Str(message) => message,
                other => format!("{other:?}"),
            };
            return Err(ExecutionFault::ExplicitRevert(reason));
        }

        Instruction::NativeCall(_)
        | Instruction::PushFloat(_)
        | Instruction::FloatOp(_)
        | Instruction::Now
        | Instruction::Random
        | Instruction::Reflect(_)
        | Instruction::Spawn
        | Instruction::IterUnordered => {
            return Err(ExecutionFault::runtime(format!(
                "non-deterministic instruction {}",
                instr.mnemonic()
            )))
        }
    }
    Ok(None)
}

fn binary(
    stack: &mut ValueStack,
    op: impl FnOnce(u64, u64) -> Result<u64, ExecutionFault>,
) -> Result<(), ExecutionFault> {
    let b = stack.pop_u64()?;
    let a = stack.pop_u64()?;
    stack.push(Value::U64(op(a, b)?))
}

fn compare(
    stack: &mut ValueStack,
    op: impl FnOnce(u64, u64) -> bool,
) -> Result<(), ExecutionFault> {
    let b = stack.pop_u64()?;
    let a = stack.pop_u64()?;
    stack.push(Value::Bool(op(a, b)))
}

fn overflow() -> ExecutionFault {
    ExecutionFault::runtime("arithmetic overflow")
}

fn division_by_zero() -> ExecutionFault {
    ExecutionFault::runtime("division by zero")
}

fn field_at(fields: &[FieldDef], index: u16) -> Result<&FieldDef, ExecutionFault> {
    fields
        .get(usize::from(index))
        .ok_or_else(|| ExecutionFault::runtime(format!("no field #{index}")))
}

fn check_fits(field: &FieldDef, value: &Value) -> Result<(), ExecutionFault> {
    if value.fits(field.ty) {
        Ok(())
    } else {
        Err(ExecutionFault::runtime(format!(
            "type mismatch: field {} is {:?}, got {}",
            field.name,
            field.ty,
            value.type_name()
        )))
    }
}

// =============================================================================
// STORED VALUES
// =============================================================================

/// Storage encoding of a field value: the module's tagged constant encoding.
/// `Null` encodes to the empty value, so storing it deletes the slot.
#[must_use]
pub fn encode_stored(value: &Value) -> StorageValue {
    if value.is_null() {
        return StorageValue::default();
    }
    let mut writer = Writer::new();
    writer.value(value);
    StorageValue::new(writer.finish())
}

/// Inverse of [`encode_stored`]. A missing slot reads as `Null`.
pub fn decode_stored(stored: Option<&StorageValue>) -> Result<Value, ExecutionFault> {
    let Some(stored) = stored.filter(|v| !v.is_empty()) else {
        return Ok(Value::Null);
    };
    let mut reader = Reader::new(stored.as_slice());
    let value = reader
        .value()
        .map_err(|e| ExecutionFault::runtime(format!("corrupt storage value: {e}")))?;
    if reader.remaining() != 0 {
        return Err(ExecutionFault::runtime("corrupt storage value: trailing bytes"));
    }
    Ok(value)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ValueType;
    use crate::module::{load, ModuleBuilder, TypeBuilder, METHOD_PUBLIC};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapHost {
        storage: HashMap<(Address, StorageKey), StorageValue>,
        logs: Vec<LogEntry>,
    }

    impl Host for MapHost {
        fn storage_get(
            &mut self,
            address: &Address,
            key: &StorageKey,
        ) -> Result<Option<StorageValue>, ExecutionFault> {
            Ok(self.storage.get(&(*address, key.clone())).cloned())
        }

        fn storage_set(
            &mut self,
            address: Address,
            key: StorageKey,
            value: StorageValue,
        ) -> Result<(), ExecutionFault> {
            if value.is_empty() {
                self.storage.remove(&(address, key));
            } else {
                self.storage.insert((address, key), value);
            }
            Ok(())
        }

        fn emit(&mut self, log: LogEntry) {
            self.logs.push(log);
        }
    }

    const SELF: Address = Address::new([0xaa; 20]);
    const CALLER: Address = Address::new([0xbb; 20]);

    fn module(params: &[ValueType], body: Vec<Instruction>) -> Arc<Module> {
        let bytecode = ModuleBuilder::new()
            .with_type(
                TypeBuilder::contract("Scratch")
                    .field("count", ValueType::U64)
                    .field("balances", ValueType::U64)
                    .method("run", METHOD_PUBLIC, params, body),
            )
            .build();
        Arc::new(load(&bytecode).unwrap())
    }

    fn exec(
        body: Vec<Instruction>,
        args: Vec<Value>,
        host: &mut MapHost,
    ) -> (Result<Exit, ExecutionFault>, GasMeter) {
        let params: Vec<ValueType> = args
            .iter()
            .map(|a| a.value_type().unwrap_or(ValueType::Any))
            .collect();
        let mut frame = new_frame(module(&params, body), args, 1024);
        let mut meter = GasMeter::new(1_000_000);
        let exit = run(&mut frame, &mut meter, host, &GasSchedule::default());
        (exit, meter)
    }

    fn new_frame(module: Arc<Module>, args: Vec<Value>, max_stack: usize) -> Frame {
        Frame::new(module, Some(0), args, SELF, CALLER, max_stack).unwrap()
    }

    fn returned(body: Vec<Instruction>) -> Result<Option<Value>, ExecutionFault> {
        match exec(body, Vec::new(), &mut MapHost::default()).0? {
            Exit::Return(value) => Ok(value),
            Exit::Call(_) => panic!("unexpected call"),
        }
    }

    #[test]
    fn test_arithmetic() {
        use Instruction::*;
        let body = vec![Push(7u64.into()), Push(5u64.into()), Sub, Push(3u64.into()), Mul, Return];
        assert_eq!(returned(body).unwrap(), Some(Value::U64(6)));
    }

    #[test]
    fn test_overflow_and_division_faults() {
        use Instruction::*;
        let overflow = vec![Push(u64::MAX.into()), Push(1u64.into()), Add, Return];
        assert_eq!(returned(overflow), Err(ExecutionFault::runtime("arithmetic overflow")));
        let underflow = vec![Push(0u64.into()), Push(1u64.into()), Sub, Return];
        assert_eq!(returned(underflow), Err(ExecutionFault::runtime("arithmetic overflow")));
        let div = vec![Push(1u64.into()), Push(0u64.into()), Div, Return];
        assert_eq!(returned(div), Err(ExecutionFault::runtime("division by zero")));
    }

    #[test]
    fn test_loop_with_jumps() {
        use Instruction::*;
        // count = n + (n-1) + ... + 1
        let body = vec![
            Push(0u64.into()),
            StoreField(0),
            LoadArg(0),
            Dup, // 3: loop head
            Push(0u64.into()),
            Eq,
            JumpIf(15),
            Dup,
            LoadField(0),
            Add,
            StoreField(0),
            Push(1u64.into()),
            Sub,
            Jump(3),
            ReturnVoid,
            Pop, // 15: done
            LoadField(0),
            Return,
        ];
        let (exit, _) = exec(body, vec![Value::U64(4)], &mut MapHost::default());
        assert_eq!(exit.unwrap(), Exit::Return(Some(Value::U64(10))));
    }

    #[test]
    fn test_fields_round_trip_through_host() {
        use Instruction::*;
        let mut host = MapHost::default();
        let body = vec![LoadArg(0), StoreField(0), LoadField(0), Return];
        let (exit, _) = exec(body, vec![Value::U64(41)], &mut host);
        assert_eq!(exit.unwrap(), Exit::Return(Some(Value::U64(41))));
        let stored = host.storage.get(&(SELF, field_key("count"))).unwrap();
        assert_eq!(decode_stored(Some(stored)).unwrap(), Value::U64(41));
    }

    #[test]
    fn test_missing_field_reads_null_and_null_deletes() {
        use Instruction::*;
        let mut host = MapHost::default();
        let (exit, _) = exec(vec![LoadField(0), Return], Vec::new(), &mut host);
        assert_eq!(exit.unwrap(), Exit::Return(Some(Value::Null)));

        let (exit, _) = exec(
            vec![Push(5u64.into()), StoreField(0), Push(Value::Null), StoreField(0), ReturnVoid],
            Vec::new(),
            &mut host,
        );
        assert_eq!(exit.unwrap(), Exit::Return(None));
        assert!(host.storage.is_empty());
    }

    #[test]
    fn test_store_field_type_mismatch() {
        use Instruction::*;
        let err = returned(vec![Push("x".into()), StoreField(0), ReturnVoid]).unwrap_err();
        assert!(matches!(err, ExecutionFault::RuntimeFault(ref m) if m.contains("field count")));
    }

    #[test]
    fn test_entries_are_keyed_by_topic_bytes() {
        use Instruction::*;
        let mut host = MapHost::default();
        let (exit, _) = exec(
            vec![Caller, Push(9u64.into()), StoreEntry(1), Caller, LoadEntry(1), Return],
            Vec::new(),
            &mut host,
        );
        assert_eq!(exit.unwrap(), Exit::Return(Some(Value::U64(9))));
        assert!(host
            .storage
            .contains_key(&(SELF, entry_key("balances", CALLER.as_bytes()))));
    }

    #[test]
    fn test_entry_keys_compare_by_content() {
        use Instruction::*;
        let mut host = MapHost::default();
        let body = vec![
            Push("a".into()),
            Push(1u64.into()),
            StoreEntry(1),
            Push(Value::Null),
            Push(2u64.into()),
            StoreEntry(1),
            Push(Value::Bytes(b"a".to_vec())),
            LoadEntry(1),
            Push(Value::Str(String::new())),
            LoadEntry(1),
            Add,
            Return,
        ];
        let (exit, _) = exec(body, Vec::new(), &mut host);
        assert_eq!(exit.unwrap(), Exit::Return(Some(Value::U64(3))));
        assert_eq!(host.storage.len(), 2);
    }

    #[test]
    fn test_emit_topics_in_declared_order() {
        use Instruction::*;
        let mut host = MapHost::default();
        let (exit, _) = exec(
            vec![
                Caller,
                Push(Value::Null),
                Push(3u64.into()),
                Emit { event: "Moved".into(), topics: 3 },
                ReturnVoid,
            ],
            Vec::new(),
            &mut host,
        );
        exit.unwrap();
        let log = &host.logs[0];
        assert_eq!(log.contract_address, SELF);
        assert_eq!(log.topics[0], b"Moved".to_vec());
        assert_eq!(log.topics[1], CALLER.as_bytes().to_vec());
        assert!(log.topics[2].is_empty());
        assert_eq!(log.topics[3], 3u64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_revert_message() {
        use Instruction::*;
        assert_eq!(
            returned(vec![Push("nope".into()), Revert]),
            Err(ExecutionFault::ExplicitRevert("nope".into()))
        );
        assert_eq!(
            returned(vec![Push(4u64.into()), Revert]),
            Err(ExecutionFault::ExplicitRevert("4".into()))
        );
    }

    #[test]
    fn test_rejected_construct_faults() {
        let err = returned(vec![Instruction::Now, Instruction::Return]).unwrap_err();
        assert_eq!(err, ExecutionFault::runtime("non-deterministic instruction now"));
    }

    #[test]
    fn test_call_suspends_and_resumes() {
        use Instruction::*;
        let target = Address::new([0xcc; 20]);
        let body = vec![
            Push(target.into()),
            Push(500u64.into()),
            Push(1u64.into()),
            Call { method: "get".into(), argc: 1 },
            Push(1u64.into()),
            Add,
            Return,
        ];
        let mut frame = new_frame(module(&[], body), Vec::new(), 64);
        let mut meter = GasMeter::new(10_000);
        let mut host = MapHost::default();
        let schedule = GasSchedule::default();

        let exit = run(&mut frame, &mut meter, &mut host, &schedule).unwrap();
        assert_eq!(
            exit,
            Exit::Call(CallRequest {
                target,
                method: "get".into(),
                args: vec![Value::U64(1)],
                gas: 500,
                catching: false,
            })
        );
        assert!(frame.is_suspended());
        assert!(run(&mut frame, &mut meter, &mut host, &schedule).is_err());

        frame.resume(Ok(Some(Value::U64(41)))).unwrap();
        let exit = run(&mut frame, &mut meter, &mut host, &schedule).unwrap();
        assert_eq!(exit, Exit::Return(Some(Value::U64(42))));
    }

    #[test]
    fn test_resume_semantics() {
        use Instruction::*;
        let body = vec![
            Push(Address::ZERO.into()),
            Push(0u64.into()),
            TryCall { method: "f".into(), argc: 0 },
            Return,
        ];
        let m = module(&[], body);
        let schedule = GasSchedule::default();
        let mut host = MapHost::default();

        // TryCall failure pushes false.
        let mut frame = Frame::new(Arc::clone(&m), Some(0), Vec::new(), SELF, CALLER, 64).unwrap();
        let mut meter = GasMeter::new(10_000);
        run(&mut frame, &mut meter, &mut host, &schedule).unwrap();
        frame.resume(Err(ExecutionFault::OutOfGas)).unwrap();
        assert_eq!(
            run(&mut frame, &mut meter, &mut host, &schedule).unwrap(),
            Exit::Return(Some(Value::Bool(false)))
        );

        // TryCall success pushes the value, then true.
        let mut frame = Frame::new(m, Some(0), Vec::new(), SELF, CALLER, 64).unwrap();
        run(&mut frame, &mut meter, &mut host, &schedule).unwrap();
        frame.resume(Ok(Some(Value::U64(7)))).unwrap();
        assert_eq!(
            run(&mut frame, &mut meter, &mut host, &schedule).unwrap(),
            Exit::Return(Some(Value::Bool(true)))
        );
        assert_eq!(frame.stack.pop().unwrap(), Value::U64(7));
    }

    #[test]
    fn test_plain_call_reraises_fault() {
        use Instruction::*;
        let body = vec![
            Push(Address::ZERO.into()),
            Push(0u64.into()),
            Call { method: "f".into(), argc: 0 },
        ];
        let mut frame = new_frame(module(&[], body), Vec::new(), 64);
        let mut meter = GasMeter::new(10_000);
        run(&mut frame, &mut meter, &mut MapHost::default(), &GasSchedule::default()).unwrap();
        let fault = ExecutionFault::ExplicitRevert("inner".into());
        assert_eq!(frame.resume(Err(fault.clone())), Err(fault));
        assert!(frame.resume(Ok(None)).is_err());
    }

    #[test]
    fn test_gas_is_charged_before_execution() {
        use Instruction::*;
        let schedule = GasSchedule::default();
        let body = vec![Push(1u64.into()), Push(2u64.into()), Add, Return];
        let (exit, meter) = exec(body, Vec::new(), &mut MapHost::default());
        exit.unwrap();
        assert_eq!(meter.spent(), schedule.invocation + 3 * schedule.stack + schedule.arithmetic);

        let mut frame = new_frame(module(&[], vec![Push(1u64.into()), Return]), Vec::new(), 64);
        let mut meter = GasMeter::new(schedule.invocation);
        let result = run(&mut frame, &mut meter, &mut MapHost::default(), &schedule);
        assert_eq!(result, Err(ExecutionFault::OutOfGas));
        assert_eq!(meter.spent(), schedule.invocation);
        assert_eq!(frame.pc(), 0);
    }

    #[test]
    fn test_value_copies_are_charged_per_byte() {
        use Instruction::*;
        let schedule = GasSchedule::default();
        let copies = |value: Value| {
            let mut body = vec![Push(value)];
            body.resize(101, Dup);
            body.push(Eq);
            body.push(ReturnVoid);
            let (exit, meter) = exec(body, Vec::new(), &mut MapHost::default());
            exit.unwrap();
            meter.spent()
        };

        let small = copies(Value::U64(1));
        let big = copies(Value::Bytes(vec![0xab; 2_000]));
        let s = copies(Value::Str("x".repeat(2_000)));
        // One push, a hundred dups, and one comparison reading two copies.
        assert_eq!(big - small, schedule.value_byte_cost(2_000) * (1 + 100 + 2));
        assert_eq!(s, big);
    }

    #[test]
    fn test_argument_checks() {
        let m = module(&[ValueType::U64], vec![Instruction::ReturnVoid]);
        let err = Frame::new(Arc::clone(&m), Some(0), Vec::new(), SELF, CALLER, 64).unwrap_err();
        assert_eq!(err, ExecutionFault::runtime("expected 1 arguments, got 0"));
        let err = Frame::new(m, Some(0), vec!["x".into()], SELF, CALLER, 64).unwrap_err();
        assert_eq!(err, ExecutionFault::runtime("argument 0: expected U64, got str"));
    }

    #[test]
    fn test_implicit_constructor_returns_nothing() {
        let m = module(&[], vec![Instruction::ReturnVoid]);
        let mut frame = Frame::new(m, None, Vec::new(), SELF, CALLER, 64).unwrap();
        assert_eq!(frame.method_name(), "<init>");
        let mut meter = GasMeter::new(100);
        let schedule = GasSchedule::default();
        let exit = run(&mut frame, &mut meter, &mut MapHost::default(), &schedule).unwrap();
        assert_eq!(exit, Exit::Return(None));
    }

    #[test]
    fn test_stored_value_codec() {
        assert!(encode_stored(&Value::Null).is_empty());
        assert_eq!(decode_stored(None).unwrap(), Value::Null);
        let values = [
            Value::Bool(true),
            Value::U64(9),
            Value::Str("s".into()),
            Value::Address(SELF),
        ];
        for value in values {
            assert_eq!(decode_stored(Some(&encode_stored(&value))).unwrap(), value);
        }
        assert!(decode_stored(Some(&StorageValue::new(vec![0x09]))).is_err());
        assert!(decode_stored(Some(&StorageValue::new(vec![1, 1, 0]))).is_err());
    }
}
