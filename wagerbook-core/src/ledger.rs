//! # Escrow Ledger
//!
//! Custody of value attached to bets. The ledger never initiates transfers on
//! its own: a release only produces a [`Transfer`] effect, which the caller
//! dispatches after the bet's state change has been committed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{bet::BetId, error::Result, Identity, WagerError};

/// Outbound payment effect: send `amount` to `to`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub to: Identity,
    pub amount: u64,
}

/// Per-bet custody plus the running totals across all bets.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EscrowLedger {
    custody: BTreeMap<BetId, u64>,
    total_locked: u64,
    retained_fees: u64,
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value currently held for a bet.
    pub fn held(&self, bet_id: BetId) -> u64 {
        self.custody.get(&bet_id).copied().unwrap_or(0)
    }

    /// Sum of all per-bet custody.
    pub fn total_locked(&self) -> u64 {
        self.total_locked
    }

    /// Platform fees kept from resolved bets.
    pub fn retained_fees(&self) -> u64 {
        self.retained_fees
    }

    /// Checks that `amount` more can be locked without overflowing.
    pub fn can_lock(&self, bet_id: BetId, amount: u64) -> Result<()> {
        self.held(bet_id)
            .checked_add(amount)
            .and(self.total_locked.checked_add(amount))
            .map(|_| ())
            .ok_or_else(|| WagerError::Overflow(format!("custody of bet {bet_id}")))
    }

    /// Record custody of incoming value for a bet.
    pub fn lock(&mut self, bet_id: BetId, amount: u64) -> Result<()> {
        self.can_lock(bet_id, amount)?;
        *self.custody.entry(bet_id).or_insert(0) += amount;
        self.total_locked += amount;
        Ok(())
    }

    /// Checks that `amount` can be released from a bet's custody.
    pub fn can_release(&self, bet_id: BetId, amount: u64) -> Result<()> {
        let held = self.held(bet_id);
        if amount > held {
            return Err(WagerError::InsufficientCustody {
                bet_id,
                held,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Decrement a bet's custody and produce the matching transfer.
    pub fn release(&mut self, bet_id: BetId, to: Identity, amount: u64) -> Result<Transfer> {
        self.can_release(bet_id, amount)?;
        if let Some(held) = self.custody.get_mut(&bet_id) {
            *held -= amount;
        }
        self.total_locked -= amount;
        Ok(Transfer { to, amount })
    }

    /// Checks that `amount` more can be kept as platform fee.
    pub fn can_retain(&self, amount: u64) -> Result<()> {
        self.retained_fees
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| WagerError::Overflow("retained fees".to_string()))
    }

    /// Drop a bet's custody entry, keeping whatever remains as platform fee.
    /// Returns the retained amount.
    pub fn close(&mut self, bet_id: BetId) -> Result<u64> {
        let remainder = self.held(bet_id);
        self.can_retain(remainder)?;
        self.custody.remove(&bet_id);
        self.total_locked -= remainder;
        self.retained_fees += remainder;
        Ok(remainder)
    }
}
