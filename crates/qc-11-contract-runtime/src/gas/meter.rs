//! # Gas Meter
//!
//! Per-invocation budget. `spent` never exceeds `limit`: an attempted spend
//! that would cross the limit is refused without being applied, and the
//! meter becomes terminal.
//!
//! Nested calls reserve their budget from the parent up front with
//! [`GasMeter::sub_meter`]. When the child completes, [`GasMeter::settle`]
//! charges the parent what the child actually spent and releases the rest.

use crate::errors::ExecutionFault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Budget tracker owned by exactly one invocation.
#[derive(Debug)]
pub struct GasMeter {
    limit: u64,
    spent: u64,
    /// Held by live sub-meters, not yet spent.
    reserved: u64,
    exhausted: bool,
    /// Published copy of `spent` for observers.
    gauge: Option<Arc<AtomicU64>>,
}

impl GasMeter {
    /// Creates a fresh top-level meter.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            spent: 0,
            reserved: 0,
            exhausted: false,
            gauge: None,
        }
    }

    /// Publishes `spent` into `gauge` on every change.
    #[must_use]
    pub fn with_gauge(mut self, gauge: Arc<AtomicU64>) -> Self {
        gauge.store(self.spent, Ordering::Release);
        self.gauge = Some(gauge);
        self
    }

    /// Budget.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas charged so far.
    #[must_use]
    pub fn spent(&self) -> u64 {
        self.spent
    }

    /// Gas still available to this invocation.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit - self.spent - self.reserved
    }

    /// Returns true once a spend has been refused.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Charges `amount`.
    ///
    /// Fails with [`ExecutionFault::OutOfGas`] if `amount` exceeds what
    /// remains, leaving `spent` untouched, and on every call after that.
    pub fn spend(&mut self, amount: u64) -> Result<(), ExecutionFault> {
        if self.exhausted {
            return Err(ExecutionFault::OutOfGas);
        }
        if amount > self.remaining() {
            self.exhausted = true;
            return Err(ExecutionFault::OutOfGas);
        }
        self.spent += amount;
        self.publish();
        Ok(())
    }

    /// Reserves a child budget of `min(requested, remaining)`.
    pub fn sub_meter(&mut self, requested: u64) -> GasMeter {
        let limit = requested.min(self.remaining());
        self.reserved += limit;
        GasMeter::new(limit)
    }

    /// Closes a child created by [`Self::sub_meter`]: its spend is charged,
    /// its unspent budget returns to this meter.
    pub fn settle(&mut self, child: GasMeter) {
        debug_assert!(child.limit <= self.reserved, "settling a foreign sub-meter");
        self.reserved = self.reserved.saturating_sub(child.limit);
        self.spent = self.spent.saturating_add(child.spent).min(self.limit - self.reserved);
        self.publish();
    }

    /// Charges everything that remains. Used when the invocation runs out of
    /// gas: the whole budget is forfeit.
    pub fn forfeit_remaining(&mut self) {
        self.spent = self.limit - self.reserved;
        self.exhausted = true;
        self.publish();
    }

    fn publish(&self) {
        if let Some(gauge) = &self.gauge {
            gauge.store(self.spent, Ordering::Release);
        }
    }
}
