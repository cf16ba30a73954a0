//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for contract execution.
//! These are the interfaces between the domain and the outside world.
//!
//! - **Driving Ports (Inbound)**: `ContractRuntimeApi`
//! - **Driven Ports (Outbound)**: `StateBackend`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
