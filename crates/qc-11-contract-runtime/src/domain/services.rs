//! # Domain Services
//!
//! Pure functions for the consensus-critical derivations: hashing, contract
//! address derivation and the storage keyspace layout.
//!
//! Every function here must produce byte-identical output on every node.
//! NO I/O, NO clocks, NO randomness.

use crate::domain::value_objects::{Address, ByteCode, Hash, StorageKey};
use sha3::{Digest, Keccak256};

// =============================================================================
// HASHING
// =============================================================================

/// Computes the 256-bit Keccak digest of `data`.
#[must_use]
pub fn hash256(data: &[u8]) -> Hash {
    Hash::new(Keccak256::digest(data).into())
}

/// Computes the digest of several byte slices fed in order.
///
/// Equivalent to `hash256(&concat(parts))` without the intermediate buffer.
#[must_use]
pub fn hash256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash::new(hasher.finalize().into())
}

/// Digest of the empty byte string (root of an empty state).
#[must_use]
pub fn empty_hash() -> Hash {
    hash256(&[])
}

/// Code hash of a module; keys the module cache and the signed message.
#[must_use]
pub fn code_hash(code: &ByteCode) -> Hash {
    hash256(code.as_slice())
}

// =============================================================================
// CONTRACT ADDRESS DERIVATION
// =============================================================================

/// Derives the address of a contract deployed by `creator` at `nonce`.
///
/// Address = hash256(rlp(\[creator, nonce\]))\[12:\]
///
/// The function is pure: equal inputs give equal addresses, and the RLP
/// framing keeps `{creator, nonce}` pairs from aliasing one another.
#[must_use]
pub fn derive_contract_address(creator: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(30);

    // Address: 20-byte string, 0x80 + 20 = 0x94
    content.push(0x94);
    content.extend_from_slice(creator.as_bytes());

    // Nonce: canonical big-endian scalar
    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 0x80 {
        content.push(nonce as u8);
    } else {
        let nonce_bytes = minimal_be_bytes(nonce);
        content.push(0x80 + nonce_bytes.len() as u8);
        content.extend_from_slice(&nonce_bytes);
    }

    // Content never exceeds 55 bytes, so the short list header always applies.
    let mut rlp = Vec::with_capacity(content.len() + 1);
    rlp.push(0xc0 + content.len() as u8);
    rlp.extend_from_slice(&content);

    let hash = hash256(&rlp);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.as_bytes()[12..32]);
    Address::new(addr)
}

/// Big-endian bytes without leading zeros.
fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[start..].to_vec()
}

// =============================================================================
// STORAGE KEYSPACE
// =============================================================================

/// Storage keyspace layout inside one contract address.
pub mod keyspace {
    /// Prefix of the key holding the contract's deployed bytecode.
    pub const CODE: u8 = 0x00;
    /// Prefix of every key a contract can address itself.
    pub const FIELD: u8 = 0x01;
    /// Separator between a field name and a dynamic entry key.
    pub const ENTRY_SEPARATOR: u8 = 0x00;
}

/// Key under which a contract's bytecode is stored.
#[must_use]
pub fn code_key() -> StorageKey {
    StorageKey::new(vec![keyspace::CODE])
}

/// Key of a scalar contract field.
#[must_use]
pub fn field_key(field: &str) -> StorageKey {
    let mut key = Vec::with_capacity(1 + field.len());
    key.push(keyspace::FIELD);
    key.extend_from_slice(field.as_bytes());
    StorageKey::new(key)
}

/// Key of one entry of a map-like contract field.
///
/// `entry` is the untyped key content, so two keys with equal bytes address
/// the same entry whatever their value types.
#[must_use]
pub fn entry_key(field: &str, entry: &[u8]) -> StorageKey {
    let mut key = Vec::with_capacity(2 + field.len() + entry.len());
    key.push(keyspace::FIELD);
    key.extend_from_slice(field.as_bytes());
    key.push(keyspace::ENTRY_SEPARATOR);
    key.extend_from_slice(entry);
    StorageKey::new(key)
}

// =============================================================================
// TESTS
// =============================================================================
