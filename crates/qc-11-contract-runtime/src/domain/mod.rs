//! # Domain Layer (Inner Hexagon)
//!
//! Pure domain concepts of the contract runtime.
//! NO I/O, NO async.
//!
//! - `value_objects` - addresses, hashes, bytecode, storage slots, values
//! - `entities` - logs, receipts, transactions
//! - `services` - hashing, address derivation, storage keyspace
//! - `invariants` - receipt invariants

pub mod entities;
pub mod invariants;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use value_objects::*;
