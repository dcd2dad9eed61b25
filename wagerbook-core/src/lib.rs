//! # Wagerbook Core
//!
//! Escrow engine for peer-to-peer fixed-odds wagers.
//!
//! A creator proposes a bet on a sporting outcome and locks collateral sized
//! to the odds. A second party accepts by matching the base stake. The creator
//! then resolves the bet with the actual outcome, and the combined pot, minus
//! a 5% platform fee, goes to whichever side called it.
//!
//! ## Components
//!
//! - **Payout arithmetic** ([`payout`]): locked stake and final payout, integer-only
//! - **Escrow ledger** ([`ledger`]): per-bet custody and outbound transfer effects
//! - **Bet registry** ([`registry`]): per-creator dense bet collections
//! - **Lifecycle** ([`lifecycle`]): the `Open -> Accepted -> removed` state machine
//! - **Wagerbook** ([`book`]): the public operations, keyed by call context
//! - **Local host** ([`host`]): balances and revert semantics for running the book
//!
//! ## Examples
//!
//! ```rust
//! use wagerbook_core::{Identity, LocalHost};
//!
//! let mut host = LocalHost::new(10_000);
//! let alice = Identity::from_seed("alice")?;
//! let bob = Identity::from_seed("bob")?;
//!
//! // 100 at 8/1: alice locks 800, bob matches 100
//! let index = host.create_bet(alice, 800, 100, 8, 1, b"CLE@PIT", b"PIT")?;
//! host.accept_bet(bob, 100, &alice, index)?;
//!
//! let settlement = host.resolve_bet(alice, index, b"PIT")?;
//! assert_eq!(settlement.payout, 855);
//! assert_eq!(host.balance_of(&alice), 10_000 - 800 + 855);
//! Ok::<(), wagerbook_core::WagerError>(())
//! ```

pub mod bet;
pub mod book;
pub mod error;
pub mod host;
pub mod identity;
pub mod ledger;
pub mod lifecycle;
pub mod payout;
pub mod registry;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bet::{Bet, BetId, BetStatus};
pub use book::{CallContext, TransferSink, Wagerbook};
pub use error::{Result, WagerError};
pub use host::{Balances, LocalHost};
pub use identity::Identity;
pub use ledger::{EscrowLedger, Transfer};
pub use lifecycle::{BetLifecycle, BetTerms, Settlement};
pub use payout::{Odds, Quote};

/// Share of the pot paid to the winner, in percent
pub const PAYOUT_PERCENT: u64 = 95;

/// Share of the pot kept by the platform, in percent
pub const PLATFORM_FEE_PERCENT: u64 = 100 - PAYOUT_PERCENT;
