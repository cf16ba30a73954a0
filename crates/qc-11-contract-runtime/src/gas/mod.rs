//! # Gas Metering
//!
//! - `schedule.rs` - explicit cost model
//! - `meter.rs` - per-invocation budget with nested reservation and refund
//! - `registry.rs` - id-keyed registry of live invocations

pub mod meter;
pub mod registry;
pub mod schedule;

pub use meter::GasMeter;
pub use registry::{ObserverHandle, ObserverRegistry, Registration, RegistrationGuard};
pub use schedule::{costs, GasSchedule};
