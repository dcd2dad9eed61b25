//! Common test utilities for wagerbook-core tests.
//!
//! Deterministic identities and canned bets shared by the module tests.

use crate::{
    bet::{Bet, BetStatus},
    lifecycle::BetTerms,
    payout::Odds,
    Identity,
};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const CAROL: &str = "carol";

/// Deterministic identity derived from a seed alias.
pub fn identity(seed: &str) -> Identity {
    Identity::from_seed(seed).unwrap()
}

/// Terms on the standard test match with the given prediction.
pub fn terms(stake: u64, numerator: u64, denominator: u64, predicted: &str) -> BetTerms {
    BetTerms {
        stake_amount: stake,
        odds_numerator: numerator,
        odds_denominator: denominator,
        match_identifier: constants::TEST_MATCH.to_vec(),
        predicted_outcome: predicted.as_bytes().to_vec(),
    }
}

/// An open bet with an exact deposit, as the registry would hold it.
pub fn open_bet(creator: Identity, stake: u64, numerator: u64, denominator: u64) -> Bet {
    let odds = Odds::new(numerator, denominator).unwrap();
    Bet {
        id: 0,
        creator,
        acceptor: None,
        stake_amount: stake,
        odds,
        match_identifier: constants::TEST_MATCH.to_vec(),
        predicted_outcome: constants::TEST_PREDICTION.to_vec(),
        status: BetStatus::Open,
        creator_deposit: stake * numerator / denominator,
        acceptor_deposit: 0,
        created_at: constants::TEST_CREATED_AT,
    }
}

/// Common test constants
pub mod constants {
    /// Match label used throughout the tests
    pub const TEST_MATCH: &[u8] = b"CLE@PIT";

    /// Creator prediction used throughout the tests
    pub const TEST_PREDICTION: &[u8] = b"PIT";

    /// Creation timestamp (Jan 1, 2025)
    pub const TEST_CREATED_AT: i64 = 1735689600;
}
