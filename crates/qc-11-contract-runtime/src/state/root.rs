//! # State Root
//!
//! Order-independent commitment to a set of `(address, key, value)` entries.
//!
//! ```text
//! leaf = H(address | u32 len(key) | key | u32 len(value) | value)
//! root = merkle(sort(leaves))      pairs hashed as H(left | right),
//!                                  an odd node is promoted unchanged
//! root(empty) = H("")
//! ```
//!
//! Sorting the leaf digests makes the root a function of the entry set
//! alone, independent of write order or snapshot history.

use crate::domain::services::{empty_hash, hash256_concat};
use crate::domain::value_objects::{Address, Hash, StorageKey, StorageValue};

/// Digest of one entry.
#[must_use]
pub fn leaf_hash(address: &Address, key: &StorageKey, value: &StorageValue) -> Hash {
    let key_len = (key.as_slice().len() as u32).to_be_bytes();
    let value_len = (value.as_slice().len() as u32).to_be_bytes();
    hash256_concat(&[
        address.as_bytes(),
        &key_len,
        key.as_slice(),
        &value_len,
        value.as_slice(),
    ])
}

/// Computes the root of a set of entries. Empty values are skipped, since
/// they denote deleted keys.
#[must_use]
pub fn compute_root<'a, I>(entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a Address, &'a StorageKey, &'a StorageValue)>,
{
    let mut level: Vec<Hash> = entries
        .into_iter()
        .filter(|(_, _, value)| !value.is_empty())
        .map(|(address, key, value)| leaf_hash(address, key, value))
        .collect();
    if level.is_empty() {
        return empty_hash();
    }
    level.sort_unstable();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash256_concat(&[left.as_bytes(), right.as_bytes()]),
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }
    level[0]
}
