//! Per-creator bet collections.
//!
//! Indices are positions in a dense vector. Removal swaps the last bet into
//! the vacated slot, so an index is only stable until another bet of the same
//! creator is removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{bet::Bet, error::Result, Identity, WagerError};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BetRegistry {
    bets: BTreeMap<Identity, Vec<Bet>>,
}

impl BetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bet to its creator's collection and return its index.
    pub fn add(&mut self, bet: Bet) -> usize {
        let bets = self.bets.entry(bet.creator).or_default();
        bets.push(bet);
        bets.len() - 1
    }

    /// Bet at `index` in `creator`'s collection.
    pub fn get(&self, creator: &Identity, index: usize) -> Result<&Bet> {
        self.bets
            .get(creator)
            .and_then(|bets| bets.get(index))
            .ok_or(WagerError::UnknownBet)
    }

    /// Mutable access to the bet at `index` in `creator`'s collection.
    pub fn get_mut(&mut self, creator: &Identity, index: usize) -> Result<&mut Bet> {
        self.bets
            .get_mut(creator)
            .and_then(|bets| bets.get_mut(index))
            .ok_or(WagerError::UnknownBet)
    }

    /// Swap-and-pop removal.
    pub fn remove(&mut self, creator: &Identity, index: usize) -> Result<Bet> {
        let bets = self.bets.get_mut(creator).ok_or(WagerError::UnknownBet)?;
        if index >= bets.len() {
            return Err(WagerError::UnknownBet);
        }
        let removed = bets.swap_remove(index);
        if bets.is_empty() {
            self.bets.remove(creator);
        }
        Ok(removed)
    }

    /// Number of live bets created by `creator`.
    pub fn count(&self, creator: &Identity) -> usize {
        self.bets.get(creator).map_or(0, Vec::len)
    }

    /// Live bets of `creator`, in index order.
    pub fn bets_of(&self, creator: &Identity) -> &[Bet] {
        self.bets.get(creator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every live bet, grouped by creator.
    pub fn iter(&self) -> impl Iterator<Item = &Bet> {
        self.bets.values().flatten()
    }
}
