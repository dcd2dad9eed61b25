//! # Bet Records
//!
//! A bet is a single proposition wager between a creator, who backs a
//! predicted outcome and locks liability sized to the odds, and an acceptor,
//! who takes the other side by matching the base stake.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::Result,
    payout::{self, Odds},
    Identity,
};

/// Internal custody key. Stable for the lifetime of a bet, unlike its index.
pub type BetId = u64;

/// Live states of a bet. Resolution and withdrawal remove the bet instead of
/// storing a terminal status.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BetStatus {
    /// Waiting for an acceptor; the creator may still withdraw
    Open,
    /// Matched; only resolution can close it
    Accepted,
}

impl std::fmt::Display for BetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Accepted => f.write_str("Accepted"),
        }
    }
}

/// A proposition bet held in escrow.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    /// Custody key in the escrow ledger
    pub id: BetId,

    /// Proposer of the bet
    pub creator: Identity,

    /// Counterparty, set once on acceptance
    pub acceptor: Option<Identity>,

    /// Base stake the acceptor must match (smallest currency unit)
    pub stake_amount: u64,

    /// Payout multiplier applied to the stake to size the creator's liability
    pub odds: Odds,

    /// Opaque label of the event (e.g. `CLE@PIT`)
    #[serde(with = "hex_bytes")]
    pub match_identifier: Vec<u8>,

    /// Opaque label of the creator's predicted outcome
    #[serde(with = "hex_bytes")]
    pub predicted_outcome: Vec<u8>,

    pub status: BetStatus,

    /// Value the creator attached on creation
    pub creator_deposit: u64,

    /// Value the acceptor attached on acceptance
    pub acceptor_deposit: u64,

    /// Unix timestamp of creation
    pub created_at: i64,
}

impl Bet {
    /// Creator's liability, `stake * numerator / denominator`.
    pub fn creator_locked(&self) -> Result<u64> {
        payout::locked_stake(self.stake_amount, self.odds.numerator, self.odds.denominator)
    }

    /// Amount the winner receives on resolution.
    pub fn final_payout(&self) -> Result<u64> {
        payout::final_payout(self.stake_amount, self.odds.numerator, self.odds.denominator)
    }

    /// Whether `actual` names the outcome the creator predicted. Exact byte
    /// comparison, no normalisation.
    pub fn creator_wins(&self, actual: &[u8]) -> bool {
        self.predicted_outcome.as_slice() == actual
    }

    /// Hex sha256 over the terms both sides agree to.
    pub fn terms_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.creator.to_bytes());
        hasher.update(self.stake_amount.to_be_bytes());
        hasher.update(self.odds.numerator.to_be_bytes());
        hasher.update(self.odds.denominator.to_be_bytes());
        hasher.update((self.match_identifier.len() as u64).to_be_bytes());
        hasher.update(&self.match_identifier);
        hasher.update((self.predicted_outcome.len() as u64).to_be_bytes());
        hasher.update(&self.predicted_outcome);
        hex::encode(hasher.finalize())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
