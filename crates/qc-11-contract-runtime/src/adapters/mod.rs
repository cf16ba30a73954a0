//! # Adapters Layer (Outer Hexagon)
//!
//! Adapters connect the contract runtime to concrete storage.
//!
//! - Adapters implement domain ports
//! - `memory_store` backs tests, estimation and single-node setups

pub mod memory_store;

pub use memory_store::*;
