//! # Wagerbook
//!
//! Public entry points of the ledger. Each call carries a [`CallContext`]
//! supplied by the host environment: who is calling and how much value came
//! with the call. Payments leave the book through a [`TransferSink`], and only
//! after the state change behind them has been committed.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    bet::Bet,
    error::Result,
    ledger::Transfer,
    lifecycle::{BetLifecycle, BetTerms, Settlement},
    Identity, WagerError,
};

/// Implicit parameters of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Identity of the caller
    pub caller: Identity,
    /// Value attached to the call
    pub value: u64,
}

impl CallContext {
    pub fn new(caller: Identity, value: u64) -> Self {
        Self { caller, value }
    }
}

/// Receiver of outbound payments, implemented by the host environment.
pub trait TransferSink {
    /// Checks that every transfer of a settlement can be received. Called
    /// before the book commits, so a refusal leaves the bet in place.
    fn can_deliver(&self, _transfers: &[Transfer]) -> Result<()> {
        Ok(())
    }

    fn deliver(&mut self, transfer: &Transfer) -> Result<()>;
}

/// The escrow book: the four bet operations plus read-only queries.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Wagerbook {
    lifecycle: BetLifecycle,
}

fn log_rejection<'a>(operation: &'static str, ctx: &'a CallContext) -> impl FnOnce(&WagerError) + 'a {
    move |err: &WagerError| {
        warn!(
            operation,
            caller = %ctx.caller.short(),
            value = ctx.value,
            reason = %err.reason(),
            "call rejected"
        )
    }
}

fn require_no_value(ctx: &CallContext) -> Result<()> {
    if ctx.value != 0 {
        return Err(WagerError::UnexpectedValue(ctx.value));
    }
    Ok(())
}

fn dispatch(settlement: &Settlement, sink: &mut dyn TransferSink) -> Result<()> {
    for transfer in &settlement.transfers {
        debug!(to = %transfer.to.short(), amount = transfer.amount, "transfer");
        sink.deliver(transfer)?;
    }
    Ok(())
}

impl Wagerbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Propose a bet backing `predicted_outcome` for `match_identifier`.
    ///
    /// The attached value must cover `stake * numerator / denominator`.
    /// Returns the index of the new bet in the caller's collection.
    pub fn create_bet(
        &mut self,
        ctx: &CallContext,
        stake_amount: u64,
        odds_numerator: u64,
        odds_denominator: u64,
        match_identifier: &[u8],
        predicted_outcome: &[u8],
    ) -> Result<usize> {
        let terms = BetTerms {
            stake_amount,
            odds_numerator,
            odds_denominator,
            match_identifier: match_identifier.to_vec(),
            predicted_outcome: predicted_outcome.to_vec(),
        };
        self.lifecycle
            .create_bet(ctx.caller, ctx.value, terms)
            .inspect_err(log_rejection("createBet", ctx))
    }

    /// Take the other side of `creator`'s bet at `index`.
    pub fn accept_bet(&mut self, ctx: &CallContext, creator: &Identity, index: usize) -> Result<()> {
        self.lifecycle
            .accept_bet(ctx.caller, ctx.value, creator, index)
            .inspect_err(log_rejection("acceptBet", ctx))
    }

    /// Settle the caller's accepted bet at `index` and pay the winner.
    pub fn resolve_bet(
        &mut self,
        ctx: &CallContext,
        index: usize,
        actual_outcome: &[u8],
        sink: &mut dyn TransferSink,
    ) -> Result<Settlement> {
        let settlement = require_no_value(ctx)
            .and_then(|()| self.lifecycle.preview_resolve(&ctx.caller, index, actual_outcome))
            .and_then(|preview| sink.can_deliver(&preview.transfers))
            .and_then(|()| self.lifecycle.resolve_bet(&ctx.caller, index, actual_outcome))
            .inspect_err(log_rejection("resolveBet", ctx))?;
        dispatch(&settlement, sink)?;
        Ok(settlement)
    }

    /// Cancel the caller's open bet at `index` and refund its deposit.
    pub fn withdraw_bet(
        &mut self,
        ctx: &CallContext,
        index: usize,
        sink: &mut dyn TransferSink,
    ) -> Result<Settlement> {
        let settlement = require_no_value(ctx)
            .and_then(|()| self.lifecycle.preview_withdraw(&ctx.caller, index))
            .and_then(|preview| sink.can_deliver(&preview.transfers))
            .and_then(|()| self.lifecycle.withdraw_bet(&ctx.caller, index))
            .inspect_err(log_rejection("withdrawBet", ctx))?;
        dispatch(&settlement, sink)?;
        Ok(settlement)
    }

    /// Number of live bets created by `caller`.
    pub fn get_number_of_bets(&self, caller: &Identity) -> usize {
        self.lifecycle.count(caller)
    }

    pub fn get_bet(&self, creator: &Identity, index: usize) -> Result<&Bet> {
        self.lifecycle.registry().get(creator, index)
    }

    pub fn bets_of(&self, creator: &Identity) -> &[Bet] {
        self.lifecycle.registry().bets_of(creator)
    }

    /// All live bets, grouped by creator.
    pub fn bets(&self) -> impl Iterator<Item = &Bet> {
        self.lifecycle.registry().iter()
    }

    pub fn total_locked(&self) -> u64 {
        self.lifecycle.ledger().total_locked()
    }

    pub fn retained_fees(&self) -> u64 {
        self.lifecycle.ledger().retained_fees()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
