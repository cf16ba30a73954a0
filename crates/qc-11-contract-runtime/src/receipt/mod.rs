//! # Receipt & Log Codec
//!
//! Canonical, consensus-visible encodings.
//!
//! ## Topics
//!
//! One topic per indexed field plus one for the event name, in declared
//! order. Each value encodes to its bare payload:
//!
//! | Value | Topic bytes |
//! |-------|-------------|
//! | `Null` | zero-length |
//! | `Bool` | `0x00` / `0x01` |
//! | `U64` | 8 bytes big-endian |
//! | `Bytes` | the bytes |
//! | `Str` | UTF-8 bytes |
//! | `Address` | 20 bytes |
//!
//! ## Entry keys
//!
//! Map-like fields key their entries by the same bytes. Keys therefore
//! compare by content, not by type: `Null`, empty `Bytes` and empty `Str`
//! name one entry, as do `Str("a")` and `Bytes(b"a")`, or an `Address` and
//! the equal 20 `Bytes`. A contract that needs typed keys encodes the type
//! into the key itself.
//!
//! ## Receipts
//!
//! `bincode` with fixed-width big-endian integers, trailing bytes rejected
//! and a size limit on decode. Encoding and decoding are exact inverses.

pub use crate::domain::entities::{LogEntry, Receipt};

use crate::domain::value_objects::{Address, Value, ValueType};
use crate::errors::CodecError;
use bincode::Options;

/// Upper bound on an encoded receipt accepted by [`decode_receipt`].
pub const MAX_RECEIPT_SIZE: u64 = 4 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .reject_trailing_bytes()
        .with_limit(MAX_RECEIPT_SIZE)
}

// =============================================================================
// TOPICS
// =============================================================================

/// Canonical topic bytes of an indexed field, also used as entry keys.
/// Total: never fails.
#[must_use]
pub fn encode_topic(value: &Value) -> Vec<u8> {
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![u8::from(*b)],
        Value::U64(n) => n.to_be_bytes().to_vec(),
        Value::Bytes(b) => b.clone(),
        Value::Str(s) => s.as_bytes().to_vec(),
        Value::Address(a) => a.as_bytes().to_vec(),
    }
}

/// Topic bytes of an event name.
#[must_use]
pub fn event_topic(event_name: &str) -> Vec<u8> {
    event_name.as_bytes().to_vec()
}

/// Reads a topic back as a value of the declared field type.
///
/// A zero-length topic is always `Null`.
pub fn decode_topic(bytes: &[u8], ty: ValueType) -> Result<Value, CodecError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    let wrong_len =
        || CodecError::Decode(format!("topic of {} bytes is not a {ty:?}", bytes.len()));
    match ty {
        ValueType::Bool => match bytes {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            _ => Err(wrong_len()),
        },
        ValueType::U64 => <[u8; 8]>::try_from(bytes)
            .map(|b| Value::U64(u64::from_be_bytes(b)))
            .map_err(|_| wrong_len()),
        ValueType::Bytes | ValueType::Any => Ok(Value::Bytes(bytes.to_vec())),
        ValueType::Str => String::from_utf8(bytes.to_vec())
            .map(Value::Str)
            .map_err(|_| CodecError::Decode("topic is not utf-8".into())),
        ValueType::Address => Address::from_slice(bytes)
            .map(Value::Address)
            .ok_or_else(wrong_len),
        ValueType::F32 | ValueType::F64 => {
            Err(CodecError::Decode(format!("{ty:?} is not a topic type")))
        }
    }
}

/// Builds the topic list of an event: name first, then the fields in order.
#[must_use]
pub fn event_topics(event_name: &str, fields: &[Value]) -> Vec<Vec<u8>> {
    std::iter::once(event_topic(event_name))
        .chain(fields.iter().map(encode_topic))
        .collect()
}

// =============================================================================
// RECEIPTS
// =============================================================================

/// Canonical receipt bytes.
pub fn encode_receipt(receipt: &Receipt) -> Result<Vec<u8>, CodecError> {
    options()
        .serialize(receipt)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Parses canonical receipt bytes.
pub fn decode_receipt(bytes: &[u8]) -> Result<Receipt, CodecError> {
    options()
        .deserialize(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))
}
