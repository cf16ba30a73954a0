//! # End-to-End Scenarios for the Contract Runtime (qc-11)
//!
//! ## Test Categories
//!
//! 1. **Lifecycle** - deployment, out-of-gas, rejected deployments
//! 2. **Nested Calls** - gas forwarding, bubbling, `TryCall`, depth limit
//! 3. **Atomicity** - rollback of writes and logs across the call tree
//! 4. **Determinism** - identical receipts and roots on independent engines
//!    and across threads sharing one engine and backend
//! 5. **Artifacts** - receipt codec, authorship signatures
//! 6. **Properties** - address uniqueness, root order independence, gas bounds

use proptest::prelude::*;
use qc_11_contract_runtime::domain::invariants::check_all_invariants;
use qc_11_contract_runtime::module::{MethodDef, TypeDef};
use qc_11_contract_runtime::prelude::*;
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

const CREATOR: Address = Address::new([0xC0; 20]);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fresh_state() -> StateRepository {
    StateRepository::new(Arc::new(InMemoryStateBackend::new()))
}

type I = Instruction;

/// `set(v)` stores and emits; `set_and_fail(v)` does the same then reverts.
fn vault() -> ByteCode {
    ModuleBuilder::new()
        .with_type(
            TypeBuilder::contract("Vault")
                .field("value", ValueType::U64)
                .method(
                    "set",
                    METHOD_PUBLIC,
                    &[ValueType::U64],
                    vec![
                        I::LoadArg(0),
                        I::StoreField(0),
                        I::LoadArg(0),
                        I::Emit { event: "Set".into(), topics: 1 },
                        I::ReturnVoid,
                    ],
                )
                .method(
                    "set_and_fail",
                    METHOD_PUBLIC,
                    &[ValueType::U64],
                    vec![
                        I::LoadArg(0),
                        I::StoreField(0),
                        I::LoadArg(0),
                        I::Emit { event: "Set".into(), topics: 1 },
                        I::Push("boom".into()),
                        I::Revert,
                    ],
                )
                .method("get", METHOD_PUBLIC, &[], vec![I::LoadField(0), I::Return])
                .method("spin", METHOD_PUBLIC, &[], vec![I::Jump(0)]),
        )
        .build()
}

/// Calls into a vault. The own field `calls` records that the proxy ran.
fn proxy() -> ByteCode {
    let target = [ValueType::Address, ValueType::U64];
    ModuleBuilder::new()
        .with_type(
            TypeBuilder::contract("Proxy")
                .field("calls", ValueType::U64)
                .method(
                    "forward",
                    METHOD_PUBLIC,
                    &target,
                    vec![
                        I::LoadArg(0),
                        I::Push(u64::MAX.into()),
                        I::LoadArg(1),
                        I::Call { method: "set".into(), argc: 1 },
                        I::Pop,
                        I::Push(1u64.into()),
                        I::StoreField(0),
                        I::ReturnVoid,
                    ],
                )
                .method(
                    "forward_failing",
                    METHOD_PUBLIC,
                    &target,
                    vec![
                        I::Push(1u64.into()),
                        I::StoreField(0),
                        I::LoadArg(0),
                        I::Push(u64::MAX.into()),
                        I::LoadArg(1),
                        I::Call { method: "set_and_fail".into(), argc: 1 },
                        I::Return,
                    ],
                )
                .method(
                    "try_forward_failing",
                    METHOD_PUBLIC,
                    &target,
                    vec![
                        I::Push(7u64.into()),
                        I::StoreField(0),
                        I::LoadArg(0),
                        I::Push(u64::MAX.into()),
                        I::LoadArg(1),
                        I::TryCall { method: "set_and_fail".into(), argc: 1 },
                        I::Return,
                    ],
                )
                .method(
                    "try_spin",
                    METHOD_PUBLIC,
                    &target,
                    vec![
                        I::LoadArg(0),
                        I::LoadArg(1),
                        I::TryCall { method: "spin".into(), argc: 0 },
                        I::Return,
                    ],
                )
                .method(
                    "spin_through",
                    METHOD_PUBLIC,
                    &target,
                    vec![
                        I::LoadArg(0),
                        I::LoadArg(1),
                        I::Call { method: "spin".into(), argc: 0 },
                        I::Return,
                    ],
                )
                .method("calls", METHOD_PUBLIC, &[], vec![I::LoadField(0), I::Return]),
        )
        .build()
}

/// `dive()` recurses without bound; `try_dive()` catches whatever it raises.
fn diver() -> ByteCode {
    ModuleBuilder::new()
        .with_type(
            TypeBuilder::contract("Diver")
                .method(
                    "dive",
                    METHOD_PUBLIC,
                    &[],
                    vec![
                        I::SelfAddress,
                        I::Push(u64::MAX.into()),
                        I::Call { method: "dive".into(), argc: 0 },
                        I::Return,
                    ],
                )
                .method(
                    "try_dive",
                    METHOD_PUBLIC,
                    &[],
                    vec![
                        I::SelfAddress,
                        I::Push(u64::MAX.into()),
                        I::TryCall { method: "dive".into(), argc: 0 },
                        I::Return,
                    ],
                ),
        )
        .build()
}

fn deploy_tx(code: ByteCode, nonce: u64) -> ContractTransaction {
    ContractTransaction::Deploy(DeployTransaction {
        creator: CREATOR,
        nonce,
        bytecode: code,
        args: Vec::new(),
        gas_limit: 10_000_000,
        gas_price: 1,
    })
}

fn call_tx(
    target: Address,
    method: &str,
    args: Vec<Value>,
    gas_limit: u64,
) -> ContractTransaction {
    ContractTransaction::Call(CallTransaction {
        caller: CREATOR,
        target,
        method: method.into(),
        args,
        gas_limit,
        gas_price: 1,
    })
}

fn execute(
    engine: &ExecutionEngine,
    state: &mut StateRepository,
    tx: &ContractTransaction,
) -> Receipt {
    let receipt = engine.execute(state, tx).expect("transaction not rejected");
    assert!(check_all_invariants(tx, &receipt).is_valid(), "{receipt:?}");
    assert_eq!(state.depth(), 0);
    assert!(engine.observers().is_empty());
    receipt
}

/// Deploys a vault at nonce 0 and a proxy at nonce 1.
fn vault_and_proxy() -> (ExecutionEngine, StateRepository, Address, Address) {
    init_tracing();
    let engine = ExecutionEngine::new(RuntimeConfig::default());
    let mut state = fresh_state();
    let vault = execute(&engine, &mut state, &deploy_tx(vault(), 0))
        .new_contract_address
        .expect("vault deployed");
    let proxy = execute(&engine, &mut state, &deploy_tx(proxy(), 1))
        .new_contract_address
        .expect("proxy deployed");
    (engine, state, vault, proxy)
}

fn read(
    engine: &ExecutionEngine,
    state: &mut StateRepository,
    target: Address,
    method: &str,
) -> Value {
    execute(engine, state, &call_tx(target, method, Vec::new(), 100_000))
        .return_value
        .unwrap_or_default()
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn test_successful_deployment() {
    init_tracing();
    let engine = ExecutionEngine::new(RuntimeConfig::default());
    let mut state = fresh_state();
    let code = vault();

    let receipt = execute(&engine, &mut state, &deploy_tx(code.clone(), 0));
    assert!(receipt.success);
    assert_eq!(receipt.new_contract_address, Some(derive_contract_address(CREATOR, 0)));
    assert!(receipt.logs.is_empty());
    assert_eq!(state.code(&derive_contract_address(CREATOR, 0)).unwrap(), Some(code));
}

#[test]
fn test_out_of_gas_with_limit_one() {
    let (engine, mut state, vault, _) = vault_and_proxy();
    let root = state.root_hash().unwrap();

    let receipt = execute(
        &engine,
        &mut state,
        &call_tx(vault, "set", vec![Value::U64(9)], 1),
    );
    assert!(!receipt.success);
    assert_eq!(receipt.error, Some(ExecutionFault::OutOfGas));
    assert_eq!(receipt.gas_used, 1);
    assert_eq!(state.root_hash().unwrap(), root);
    assert_eq!(read(&engine, &mut state, vault, "get"), Value::Null);
}

#[test]
fn test_rejected_native_call_deployment() {
    init_tracing();
    let engine = ExecutionEngine::new(RuntimeConfig::default());
    let mut state = fresh_state();
    let code = ModuleBuilder::new()
        .with_type(TypeBuilder::contract("Oracle").method(
            "fetch",
            METHOD_PUBLIC,
            &[],
            vec![I::NativeCall("host_fetch".into()), I::Return],
        ))
        .build();

    match engine.execute(&mut state, &deploy_tx(code, 0)) {
        Err(TransactionRejected::Validation(report)) => {
            assert!(!report.violations().is_empty());
            assert!(report.names_member("Oracle.fetch"), "{report}");
        }
        other => panic!("expected a validation rejection, got {other:?}"),
    }
    assert_eq!(state.code(&derive_contract_address(CREATOR, 0)).unwrap(), None);
    assert_eq!(state.root_hash().unwrap(), empty_hash());
}

#[test]
fn test_every_determinism_rule_fires() {
    let validator = Validator::for_version(RuleSetVersion::V1);
    let code = ModuleBuilder::new()
        .with_type(
            TypeBuilder::contract("Everything")
                .method("native", METHOD_PUBLIC | METHOD_NATIVE, &[], vec![I::ReturnVoid])
                .method("clock", METHOD_PUBLIC, &[], vec![I::Now, I::Return])
                .method("dice", METHOD_PUBLIC, &[], vec![I::Random, I::Return]),
        )
        .build();
    let report = validator.validate(&load(&code).unwrap());
    assert!(!report.is_accepted());
    for member in ["Everything.native", "Everything.clock", "Everything.dice"] {
        assert!(report.names_member(member), "{member} not reported in {report}");
    }
}

/// Rejects any method that jumps backwards, i.e. every loop.
struct NoLoopsRule;

impl ValidationRule for NoLoopsRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Extension(1)
    }

    fn inspect_method(&self, ty: &TypeDef, method: &MethodDef) -> Vec<ValidationViolation> {
        method
            .body
            .iter()
            .enumerate()
            .filter_map(|(pc, instr)| match instr {
                I::Jump(target) | I::JumpIf(target) if (*target as usize) <= pc => {
                    Some(ValidationViolation::in_method(
                        self.kind(),
                        ty,
                        method,
                        format!("backward jump at {pc}"),
                    ))
                }
                _ => None,
            })
            .collect()
    }
}

#[test]
fn test_registered_rule_extends_deployment_checks() {
    init_tracing();
    let validator = Validator::for_version(RuleSetVersion::V1).with_rule(NoLoopsRule);
    let engine = ExecutionEngine::new(RuntimeConfig::default()).with_validator(validator);
    let mut state = fresh_state();

    // The vault's `spin` loops; the proxy has no loops.
    let report = match engine.execute(&mut state, &deploy_tx(vault(), 0)) {
        Err(TransactionRejected::Validation(report)) => report,
        other => panic!("expected a validation rejection, got {other:?}"),
    };
    assert_eq!(report.version(), RuleSetVersion::V1);
    let violations = report.into_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule, RuleKind::Extension(1));
    assert_eq!(violations[0].member, "Vault.spin");
    assert_eq!(violations[0].message, "backward jump at 0");

    let receipt = execute(&engine, &mut state, &deploy_tx(proxy(), 1));
    assert!(receipt.success, "{receipt:?}");

    // The stock engine still accepts the vault.
    let stock = ExecutionEngine::new(RuntimeConfig::default());
    assert!(execute(&stock, &mut fresh_state(), &deploy_tx(vault(), 0)).success);
}

// =============================================================================
// NESTED CALLS
// =============================================================================

#[test]
fn test_nested_call_commits_writes_and_logs() {
    let (engine, mut state, vault, proxy) = vault_and_proxy();

    let receipt = execute(
        &engine,
        &mut state,
        &call_tx(
            proxy,
            "forward",
            vec![Value::Address(vault), Value::U64(42)],
            1_000_000,
        ),
    );
    assert!(receipt.success, "{receipt:?}");
    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].contract_address, vault);
    assert_eq!(read(&engine, &mut state, vault, "get"), Value::U64(42));
    assert_eq!(read(&engine, &mut state, proxy, "calls"), Value::U64(1));
}

#[test]
fn test_bubbled_fault_rolls_back_whole_tree() {
    let (engine, mut state, vault, proxy) = vault_and_proxy();
    let root = state.root_hash().unwrap();

    let receipt = execute(
        &engine,
        &mut state,
        &call_tx(
            proxy,
            "forward_failing",
            vec![Value::Address(vault), Value::U64(5)],
            1_000_000,
        ),
    );
    assert_eq!(receipt.error, Some(ExecutionFault::ExplicitRevert("boom".into())));
    assert!(receipt.logs.is_empty());
    assert!(receipt.gas_used > 0 && receipt.gas_used < 1_000_000);
    assert_eq!(state.root_hash().unwrap(), root);
    assert_eq!(read(&engine, &mut state, proxy, "calls"), Value::Null);
}

#[test]
fn test_try_call_isolates_callee_failure() {
    let (engine, mut state, vault, proxy) = vault_and_proxy();

    let receipt = execute(
        &engine,
        &mut state,
        &call_tx(
            proxy,
            "try_forward_failing",
            vec![Value::Address(vault), Value::U64(5)],
            1_000_000,
        ),
    );
    assert!(receipt.success, "{receipt:?}");
    assert_eq!(receipt.return_value, Some(Value::Bool(false)));
    // The vault's write and event went with its snapshot; the proxy's stayed.
    assert!(receipt.logs.is_empty());
    assert_eq!(read(&engine, &mut state, vault, "get"), Value::Null);
    assert_eq!(read(&engine, &mut state, proxy, "calls"), Value::U64(7));
}

#[test]
fn test_callee_out_of_gas_forfeits_forwarded_gas_only() {
    let (engine, mut state, vault, proxy) = vault_and_proxy();
    let run = |state: &mut StateRepository, forwarded: u64| {
        let args = vec![Value::Address(vault), Value::U64(forwarded)];
        execute(&engine, state, &call_tx(proxy, "try_spin", args, 1_000_000))
    };

    let small = run(&mut state, 500);
    let large = run(&mut state, 800);
    assert!(small.success && large.success);
    assert_eq!(small.return_value, Some(Value::Bool(false)));
    assert_eq!(large.gas_used - small.gas_used, 300);
}

#[test]
fn test_reraised_callee_out_of_gas_keeps_caller_budget() {
    let (engine, mut state, vault, proxy) = vault_and_proxy();
    let root = state.root_hash().unwrap();
    let run = |state: &mut StateRepository, forwarded: u64| {
        let args = vec![Value::Address(vault), Value::U64(forwarded)];
        execute(&engine, state, &call_tx(proxy, "spin_through", args, 1_000_000))
    };

    let small = run(&mut state, 500);
    let large = run(&mut state, 800);
    assert_eq!(small.error, Some(ExecutionFault::OutOfGas));
    assert_eq!(large.error, Some(ExecutionFault::OutOfGas));

    // The caller pays its own steps plus what it forwarded, not its limit.
    let schedule = &engine.config().gas_schedule;
    let own = schedule.invocation + 2 * schedule.context_load + schedule.call;
    assert_eq!(small.gas_used, own + 500);
    assert_eq!(large.gas_used - small.gas_used, 300);
    assert_eq!(state.root_hash().unwrap(), root);
}

#[test]
fn test_forwarded_gas_is_capped_by_remaining() {
    let (engine, mut state, vault, proxy) = vault_and_proxy();
    let args = vec![Value::Address(vault), Value::U64(u64::MAX)];
    let receipt = execute(&engine, &mut state, &call_tx(proxy, "try_spin", args, 50_000));
    // The spinning callee burns everything the caller had; the caller then
    // cannot afford to return.
    assert_eq!(receipt.error, Some(ExecutionFault::OutOfGas));
    assert_eq!(receipt.gas_used, 50_000);
}

#[test]
fn test_callee_that_never_starts_faults_the_caller() {
    let (engine, mut state, _, proxy) = vault_and_proxy();
    // The proxy has no `set` method.
    let receipt = execute(
        &engine,
        &mut state,
        &call_tx(
            proxy,
            "forward",
            vec![Value::Address(proxy), Value::U64(1)],
            1_000_000,
        ),
    );
    assert_eq!(receipt.error, Some(ExecutionFault::MethodNotFound("set".into())));
    assert!(receipt.gas_used >= engine.config().gas_schedule.call);

    let missing = Address::new([0xEE; 20]);
    let receipt = execute(
        &engine,
        &mut state,
        &call_tx(
            proxy,
            "forward",
            vec![Value::Address(missing), Value::U64(1)],
            1_000_000,
        ),
    );
    assert_eq!(receipt.error, Some(ExecutionFault::AddressNotFound(missing)));
}

#[test]
fn test_call_depth_limit_is_catchable() {
    init_tracing();
    let engine = ExecutionEngine::new(RuntimeConfig::default());
    let mut state = fresh_state();
    let diver = execute(&engine, &mut state, &deploy_tx(diver(), 0))
        .new_contract_address
        .unwrap();

    let dive = call_tx(diver, "dive", Vec::new(), 10_000_000);
    let receipt = execute(&engine, &mut state, &dive);
    assert_eq!(
        receipt.error,
        Some(ExecutionFault::CallDepthExceeded { depth: 65, max: 64 })
    );

    let try_dive = call_tx(diver, "try_dive", Vec::new(), 10_000_000);
    let receipt = execute(&engine, &mut state, &try_dive);
    assert!(receipt.success, "{receipt:?}");
    assert_eq!(receipt.return_value, Some(Value::Bool(false)));
}

// =============================================================================
// DETERMINISM
// =============================================================================

#[test]
fn test_independent_engines_agree() {
    let script = |engine: &ExecutionEngine, state: &mut StateRepository| -> Vec<Vec<u8>> {
        let vault_at = derive_contract_address(CREATOR, 0);
        let proxy_at = derive_contract_address(CREATOR, 1);
        let pair = |n: u64| vec![Value::Address(vault_at), Value::U64(n)];
        let txs = vec![
            deploy_tx(vault(), 0),
            deploy_tx(proxy(), 1),
            call_tx(proxy_at, "forward", pair(3), 1_000_000),
            call_tx(proxy_at, "try_forward_failing", pair(4), 1_000_000),
            call_tx(vault_at, "set", vec![Value::U64(1)], 30),
        ];
        txs.iter()
            .map(|tx| encode_receipt(&execute(engine, state, tx)).unwrap())
            .collect()
    };

    let first_engine = ExecutionEngine::new(RuntimeConfig::default());
    let second_engine = ExecutionEngine::new(RuntimeConfig::default());
    let mut first = fresh_state();
    let mut second = fresh_state();

    assert_eq!(script(&first_engine, &mut first), script(&second_engine, &mut second));
    assert_eq!(first.root_hash().unwrap(), second.root_hash().unwrap());
}

#[test]
fn test_concurrent_trees_match_sequential_replay() {
    const TREES: u64 = 8;
    init_tracing();

    let deploy_vaults = |engine: &ExecutionEngine, backend: &Arc<InMemoryStateBackend>| {
        let mut state = StateRepository::new(backend.clone());
        (0..TREES)
            .map(|nonce| {
                execute(engine, &mut state, &deploy_tx(vault(), nonce))
                    .new_contract_address
                    .expect("vault deployed")
            })
            .collect::<Vec<_>>()
    };
    let calls = |vaults: &[Address]| {
        vaults
            .iter()
            .zip(1u64..)
            .map(|(vault, n)| call_tx(*vault, "set", vec![Value::U64(n)], 1_000_000))
            .collect::<Vec<_>>()
    };

    // Every thread runs its own tree against its own repository; only the
    // engine and the committed backend are shared.
    let engine = ExecutionEngine::new(RuntimeConfig::default());
    let backend = Arc::new(InMemoryStateBackend::new());
    let vaults = deploy_vaults(&engine, &backend);
    let txs = calls(&vaults);
    let estimate_tx = call_tx(vaults[0], "set", vec![Value::U64(99)], 1_000_000);

    let (receipts, estimate) = std::thread::scope(|scope| {
        let workers: Vec<_> = txs
            .iter()
            .map(|tx| {
                let (engine, backend) = (&engine, backend.clone());
                scope.spawn(move || {
                    let mut state = StateRepository::new(backend);
                    let receipt = engine.execute(&mut state, tx).expect("call not rejected");
                    assert_eq!(state.depth(), 0);
                    receipt
                })
            })
            .collect();
        let estimator = scope.spawn(|| {
            let mut state = StateRepository::new(backend.clone());
            let scratch = state.open_snapshot();
            let receipt = engine
                .execute(&mut state, &estimate_tx)
                .expect("estimate not rejected");
            state.rollback(scratch).expect("scratch snapshot rolls back");
            receipt
        });
        let receipts: Vec<Receipt> = workers
            .into_iter()
            .map(|worker| worker.join().expect("worker panicked"))
            .collect();
        (receipts, estimator.join().expect("estimator panicked"))
    });
    assert!(engine.observers().is_empty());

    let replay_engine = ExecutionEngine::new(RuntimeConfig::default());
    let replay_backend = Arc::new(InMemoryStateBackend::new());
    let replay_vaults = deploy_vaults(&replay_engine, &replay_backend);
    assert_eq!(replay_vaults, vaults);
    let mut replay_state = StateRepository::new(replay_backend.clone());
    let expected: Vec<Receipt> = calls(&replay_vaults)
        .iter()
        .map(|tx| execute(&replay_engine, &mut replay_state, tx))
        .collect();

    assert_eq!(receipts, expected);
    for (receipt, tx) in receipts.iter().zip(&txs) {
        assert!(receipt.success, "{receipt:?}");
        assert!(check_all_invariants(tx, receipt).is_valid());
    }
    // The estimate priced the same work and left nothing behind.
    assert!(estimate.success);
    assert_eq!(estimate.gas_used, receipts[0].gas_used);

    let mut state = StateRepository::new(backend.clone());
    assert_eq!(state.root_hash().unwrap(), replay_state.root_hash().unwrap());
    assert_eq!(read(&engine, &mut state, vaults[0], "get"), Value::U64(1));
}

#[test]
fn test_uncommitted_writes_stay_private_to_their_tree() {
    let backend = Arc::new(InMemoryStateBackend::new());
    let mut writer = StateRepository::new(backend.clone());
    let reader = StateRepository::new(backend.clone());
    let (address, key) = (Address::new([0xAB; 20]), StorageKey::new(vec![1, 2]));

    let snapshot = writer.open_snapshot();
    writer
        .set(address, key.clone(), StorageValue::new(vec![7]))
        .unwrap();
    let seen = std::thread::scope(|scope| {
        scope
            .spawn(|| reader.get(&address, &key).unwrap())
            .join()
            .expect("reader panicked")
    });
    assert_eq!(seen, None);

    writer.commit(snapshot).unwrap();
    assert_eq!(reader.get(&address, &key).unwrap(), Some(StorageValue::new(vec![7])));
}

// =============================================================================
// ARTIFACTS
// =============================================================================

#[test]
fn test_receipt_round_trip_with_null_topic() {
    let (engine, mut state, vault, _) = vault_and_proxy();
    let emitter = ModuleBuilder::new()
        .with_type(TypeBuilder::contract("Emitter").method(
            "emit_null",
            METHOD_PUBLIC,
            &[],
            vec![
                I::Push(Value::Null),
                I::Push(Value::Address(vault)),
                I::Emit { event: "Pair".into(), topics: 2 },
                I::ReturnVoid,
            ],
        ))
        .build();
    let emitter = execute(&engine, &mut state, &deploy_tx(emitter, 2))
        .new_contract_address
        .unwrap();

    let emit_null = call_tx(emitter, "emit_null", Vec::new(), 100_000);
    let receipt = execute(&engine, &mut state, &emit_null);
    let log = &receipt.logs[0];
    assert_eq!(log.topics.len(), 3);
    assert!(log.topics[1].is_empty());
    assert_eq!(decode_topic(&log.topics[1], ValueType::U64).unwrap(), Value::Null);

    let bytes = encode_receipt(&receipt).unwrap();
    assert_eq!(decode_receipt(&bytes).unwrap(), receipt);
}

#[test]
fn test_signed_bytecode() {
    let private = [0x5Au8; 32];
    let public = qc_11_contract_runtime::signer::public_key(&private).unwrap();
    let code = vault();
    let signature = sign(&private, &code).unwrap();

    assert!(verify(&public, &code, signature.as_bytes()));
    assert!(!verify(&public, &proxy(), signature.as_bytes()));
}

#[test]
fn test_disassembly_names_every_method() {
    let listing = disassemble(&load(&proxy()).unwrap());
    let methods = [
        "forward",
        "forward_failing",
        "try_forward_failing",
        "try_spin",
        "spin_through",
        "calls",
    ];
    for method in methods {
        assert!(listing.contains(method), "{method} missing from\n{listing}");
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_contract_addresses_are_unique(
        a in any::<[u8; 20]>(),
        b in any::<[u8; 20]>(),
        n in any::<u64>(),
        m in any::<u64>(),
    ) {
        prop_assume!((a, n) != (b, m));
        prop_assert_ne!(
            derive_contract_address(Address::new(a), n),
            derive_contract_address(Address::new(b), m)
        );
    }

    #[test]
    fn prop_root_hash_ignores_write_order(
        writes in proptest::collection::btree_map(any::<u8>(), any::<u8>(), 1..24)
    ) {
        let apply = |order: Vec<(&u8, &u8)>| {
            let mut state = fresh_state();
            let snapshot = state.open_snapshot();
            for (k, v) in order {
                let value = StorageValue::new(&[*v, 1]);
                state
                    .set(Address::new([*k; 20]), StorageKey(vec![1, *k]), value)
                    .unwrap();
            }
            state.commit(snapshot).unwrap();
            state.root_hash().unwrap()
        };
        let forward: Vec<_> = writes.iter().collect();
        let backward: Vec<_> = writes.iter().rev().collect();
        prop_assert_eq!(apply(forward), apply(backward));
    }

    #[test]
    fn prop_gas_used_never_exceeds_limit(limit in 0u64..2_000) {
        let engine = ExecutionEngine::new(RuntimeConfig::default());
        let mut state = fresh_state();
        let vault = execute(&engine, &mut state, &deploy_tx(vault(), 0))
            .new_contract_address
            .unwrap();
        let first = call_tx(vault, "set", vec![Value::U64(1)], 1_000_000);
        let needed = execute(&engine, &mut state, &first).gas_used;

        let second = call_tx(vault, "set", vec![Value::U64(2)], limit);
        let receipt = execute(&engine, &mut state, &second);
        prop_assert!(receipt.gas_used <= limit);
        if limit >= needed {
            prop_assert!(receipt.success);
            prop_assert_eq!(receipt.gas_used, needed);
        } else {
            prop_assert_eq!(receipt.error, Some(ExecutionFault::OutOfGas));
            prop_assert_eq!(receipt.gas_used, limit);
        }
    }
}
