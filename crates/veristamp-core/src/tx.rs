//! Transaction lifecycle value types.
//!
//! A [`PendingTransaction`] is created when a write is submitted and moves
//! exactly once to a terminal status. Terminal states are absorbing: a
//! confirmed or failed transaction never transitions again.

use serde::{Deserialize, Serialize};

use crate::types::TxHash;

/// Status of a submitted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Submitted, awaiting inclusion.
    Pending,
    /// Durably included in a block.
    Confirmed,
    /// Rejected or reverted.
    Failed,
}

impl TxStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed)
    }
}

/// Ephemeral state of one submitted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// The submission reference.
    pub hash: TxHash,

    /// Current status.
    pub status: TxStatus,

    /// Block of inclusion, once confirmed.
    pub block_number: Option<u64>,

    /// Execution units consumed, once confirmed.
    pub units_consumed: Option<u64>,
}

impl PendingTransaction {
    /// A freshly submitted transaction.
    pub fn new(hash: TxHash) -> Self {
        Self {
            hash,
            status: TxStatus::Pending,
            block_number: None,
            units_consumed: None,
        }
    }

    /// Transition to `Confirmed`. No-op if already terminal.
    pub fn confirm(&mut self, block_number: u64, units_consumed: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TxStatus::Confirmed;
        self.block_number = Some(block_number);
        self.units_consumed = Some(units_consumed);
    }

    /// Transition to `Failed`. No-op if already terminal.
    pub fn fail(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TxStatus::Failed;
    }
}

/// Cost estimate for a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Estimated execution units.
    pub units_estimated: u64,

    /// Current network price per unit.
    pub unit_price: u128,

    /// `units_estimated * unit_price`.
    pub total_cost: u128,
}

impl CostEstimate {
    /// Build an estimate from units and price.
    pub fn new(units_estimated: u64, unit_price: u128) -> Self {
        Self {
            units_estimated,
            unit_price,
            total_cost: unit_price.saturating_mul(units_estimated as u128),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_is_terminal() {
        let mut tx = PendingTransaction::new(TxHash::from_bytes([0x11; 32]));
        assert_eq!(tx.status, TxStatus::Pending);

        tx.confirm(42, 66_000);
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.block_number, Some(42));
        assert_eq!(tx.units_consumed, Some(66_000));

        // A later failure must not undo the terminal state
        tx.fail();
        assert_eq!(tx.status, TxStatus::Confirmed);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut tx = PendingTransaction::new(TxHash::from_bytes([0x22; 32]));
        tx.fail();
        assert_eq!(tx.status, TxStatus::Failed);

        tx.confirm(7, 1);
        assert_eq!(tx.status, TxStatus::Failed);
        assert_eq!(tx.block_number, None);
    }

    #[test]
    fn test_cost_estimate_total() {
        let estimate = CostEstimate::new(66_000, 30);
        assert_eq!(estimate.total_cost, 1_980_000);
    }
}
