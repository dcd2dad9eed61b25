//! # Payout Arithmetic
//!
//! Fixed-odds stake and payout calculation. All arithmetic is integer-only and
//! truncating; intermediate products are widened to `u128` so that large
//! stakes do not wrap before the division.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, ZERO_DENOMINATOR, ZERO_NUMERATOR},
    WagerError, PAYOUT_PERCENT,
};

/// Rational odds `numerator / denominator`, both strictly positive.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Odds {
    pub numerator: u64,
    pub denominator: u64,
}

impl Odds {
    /// Validates and builds odds. The numerator is checked first.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if numerator == 0 {
            return Err(WagerError::InvalidOdds(ZERO_NUMERATOR));
        }
        if denominator == 0 {
            return Err(WagerError::InvalidOdds(ZERO_DENOMINATOR));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }
}

impl std::fmt::Display for Odds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn narrow(value: u128, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| WagerError::Overflow(format!("{what} exceeds u64")))
}

/// Amount the creator must lock: `stake * numerator / denominator`, truncated.
pub fn locked_stake(stake: u64, numerator: u64, denominator: u64) -> Result<u64> {
    let odds = Odds::new(numerator, denominator)?;
    let locked = u128::from(stake) * u128::from(odds.numerator) / u128::from(odds.denominator);
    narrow(locked, "locked stake")
}

/// Combined pot of a matched bet: acceptor stake plus creator liability.
pub fn pot(stake: u64, numerator: u64, denominator: u64) -> Result<u64> {
    let locked = locked_stake(stake, numerator, denominator)?;
    stake
        .checked_add(locked)
        .ok_or_else(|| WagerError::Overflow("pot exceeds u64".to_string()))
}

/// Amount paid to the winner: `pot * 95 / 100`, truncated.
pub fn final_payout(stake: u64, numerator: u64, denominator: u64) -> Result<u64> {
    let pot = pot(stake, numerator, denominator)?;
    narrow(
        u128::from(pot) * u128::from(PAYOUT_PERCENT) / 100,
        "final payout",
    )
}

/// Portion of the pot retained by the platform on resolution.
pub fn platform_fee(stake: u64, numerator: u64, denominator: u64) -> Result<u64> {
    Ok(pot(stake, numerator, denominator)? - final_payout(stake, numerator, denominator)?)
}

/// Full quote for a prospective bet.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    pub stake: u64,
    pub odds: Odds,
    pub creator_locked: u64,
    pub pot: u64,
    pub payout: u64,
    pub fee: u64,
}

impl Quote {
    /// Quote `stake` at `numerator/denominator`, validating the odds first.
    pub fn new(stake: u64, numerator: u64, denominator: u64) -> Result<Self> {
        let odds = Odds::new(numerator, denominator)?;
        let creator_locked = locked_stake(stake, numerator, denominator)?;
        let pot = pot(stake, numerator, denominator)?;
        let payout = final_payout(stake, numerator, denominator)?;
        Ok(Self {
            stake,
            odds,
            creator_locked,
            pot,
            payout,
            fee: pot - payout,
        })
    }
}
