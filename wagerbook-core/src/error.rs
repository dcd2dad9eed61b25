//! Error types for wagerbook-core

use thiserror::Error;

/// Result type alias for wagerbook operations
pub type Result<T> = std::result::Result<T, WagerError>;

/// Reason reported when a bet does not exist for the resolved creator.
pub const UNKNOWN_BET: &str = "unknown bet";
/// Reason reported when attached value does not cover the potential loss.
pub const INSUFFICIENT_FUNDS: &str = "must send enough to cover bet loss";
/// Reason reported when accepting a bet that already has an acceptor.
pub const ALREADY_ACCEPTED: &str = "bet has already been accepted";
/// Reason reported when withdrawing from a bet that already has an acceptor.
pub const WITHDRAW_ACCEPTED: &str = "can't withdraw from accepted bet";
/// Reason reported when resolving a bet that was never accepted.
pub const NOT_ACCEPTED: &str = "can't resolve unaccepted bet";
/// Reason reported for a zero odds numerator.
pub const ZERO_NUMERATOR: &str = "oddsNumerator must be greater than 0";
/// Reason reported for a zero odds denominator.
pub const ZERO_DENOMINATOR: &str = "oddsDenominator must be greater than 0";

/// Error types for wagering operations.
///
/// Every variant is a rejection: the operation that produced it left the
/// registry and the ledger untouched.
#[derive(Error, Debug)]
pub enum WagerError {
    /// Numerator or denominator of the odds is zero
    #[error("{0}")]
    InvalidOdds(&'static str),

    /// Attached value is below the creator's liability or the acceptor's stake
    #[error("{}", INSUFFICIENT_FUNDS)]
    InsufficientFunds { required: u64, attached: u64 },

    /// No bet at the given index for the creator
    #[error("{}", UNKNOWN_BET)]
    UnknownBet,

    /// Operation requires an open bet but the bet has been accepted
    #[error("{0}")]
    AlreadyAccepted(&'static str),

    /// Resolution attempted on a bet that is still open
    #[error("{}", NOT_ACCEPTED)]
    NotAccepted,

    /// Ledger asked to release more than it holds for a bet
    #[error("insufficient custody for bet {bet_id}: held {held}, requested {requested}")]
    InsufficientCustody {
        bet_id: u64,
        held: u64,
        requested: u64,
    },

    /// Checked arithmetic overflowed
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// Value attached to an operation that does not take any
    #[error("operation does not accept value (attached {0})")]
    UnexpectedValue(u64),

    /// Caller cannot fund the value it attached
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: u64, required: u64 },

    /// Identity parsing errors
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Hex decoding errors
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Serde JSON errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WagerError {
    /// Bare reason string, the wording callers match on.
    pub fn reason(&self) -> String {
        match self {
            Self::InvalidOdds(reason) | Self::AlreadyAccepted(reason) => (*reason).to_string(),
            Self::InsufficientFunds { .. } => INSUFFICIENT_FUNDS.to_string(),
            Self::UnknownBet => UNKNOWN_BET.to_string(),
            Self::NotAccepted => NOT_ACCEPTED.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<secp256k1::Error> for WagerError {
    fn from(err: secp256k1::Error) -> Self {
        Self::InvalidIdentity(err.to_string())
    }
}
