//! # Bet Lifecycle
//!
//! State machine driving every bet through `Open -> Accepted -> removed` or
//! `Open -> removed`. Each transition validates everything up front, then
//! mutates the registry, then moves custody in the ledger. A rejected call
//! leaves both untouched.
//!
//! Releases only produce [`Transfer`] effects. A settlement is previewed
//! first, so callers can check the transfers before anything changes, and
//! the bet is removed before any transfer leaves the book. A payee that calls
//! back into the book while being paid finds no bet to settle a second time.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    bet::{Bet, BetId, BetStatus},
    error::{Result, ALREADY_ACCEPTED, WITHDRAW_ACCEPTED},
    ledger::{EscrowLedger, Transfer},
    payout::{self, Odds},
    registry::BetRegistry,
    Identity, WagerError,
};

/// Terms proposed by a bet creator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetTerms {
    pub stake_amount: u64,
    pub odds_numerator: u64,
    pub odds_denominator: u64,
    pub match_identifier: Vec<u8>,
    pub predicted_outcome: Vec<u8>,
}

/// Result of closing a bet by resolution or withdrawal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// The bet as it was just before removal
    pub bet: Bet,
    /// Party that received the pot (the creator, for a withdrawal)
    pub winner: Identity,
    /// Amount paid to the winner
    pub payout: u64,
    /// Amount kept by the platform
    pub fee: u64,
    /// Every outbound payment, winner first
    pub transfers: Vec<Transfer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BetLifecycle {
    registry: BetRegistry,
    ledger: EscrowLedger,
    next_bet_id: BetId,
}

fn excess(deposit: u64, required: u64) -> u64 {
    deposit.saturating_sub(required)
}

impl BetLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &BetRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    /// Open a new bet for `creator`, locking everything attached.
    ///
    /// Returns the bet's index in the creator's collection.
    pub fn create_bet(&mut self, creator: Identity, attached: u64, terms: BetTerms) -> Result<usize> {
        let odds = Odds::new(terms.odds_numerator, terms.odds_denominator)?;
        let required = payout::locked_stake(terms.stake_amount, odds.numerator, odds.denominator)?;
        if attached < required {
            return Err(WagerError::InsufficientFunds { required, attached });
        }
        // Pot must stay representable for resolution to succeed later
        payout::final_payout(terms.stake_amount, odds.numerator, odds.denominator)?;

        let id = self.next_bet_id;
        let next_bet_id = id
            .checked_add(1)
            .ok_or_else(|| WagerError::Overflow("bet id".to_string()))?;
        self.ledger.can_lock(id, attached)?;

        let bet = Bet {
            id,
            creator,
            acceptor: None,
            stake_amount: terms.stake_amount,
            odds,
            match_identifier: terms.match_identifier,
            predicted_outcome: terms.predicted_outcome,
            status: BetStatus::Open,
            creator_deposit: attached,
            acceptor_deposit: 0,
            created_at: chrono::Utc::now().timestamp(),
        };

        self.next_bet_id = next_bet_id;
        let index = self.registry.add(bet);
        self.ledger.lock(id, attached)?;

        info!(
            bet_id = id,
            creator = %creator.short(),
            index,
            stake = terms.stake_amount,
            odds = %odds,
            locked = attached,
            "bet created"
        );
        Ok(index)
    }

    /// Match an open bet as `acceptor`, locking the attached stake.
    pub fn accept_bet(
        &mut self,
        acceptor: Identity,
        attached: u64,
        creator: &Identity,
        index: usize,
    ) -> Result<()> {
        let bet = self.registry.get(creator, index)?;
        if bet.status != BetStatus::Open {
            return Err(WagerError::AlreadyAccepted(ALREADY_ACCEPTED));
        }
        if attached < bet.stake_amount {
            return Err(WagerError::InsufficientFunds {
                required: bet.stake_amount,
                attached,
            });
        }
        let id = bet.id;
        self.ledger.can_lock(id, attached)?;

        let bet = self.registry.get_mut(creator, index)?;
        bet.acceptor = Some(acceptor);
        bet.acceptor_deposit = attached;
        bet.status = BetStatus::Accepted;
        self.ledger.lock(id, attached)?;

        info!(
            bet_id = id,
            creator = %creator.short(),
            acceptor = %acceptor.short(),
            index,
            locked = attached,
            "bet accepted"
        );
        Ok(())
    }

    /// Settlement that resolving the caller's bet at `index` would produce.
    ///
    /// Runs every check of [`BetLifecycle::resolve_bet`] without touching the
    /// registry or the ledger. Only the creator can resolve: the bet is looked
    /// up in the caller's own collection, so anyone else gets
    /// [`WagerError::UnknownBet`].
    pub fn preview_resolve(&self, caller: &Identity, index: usize, actual_outcome: &[u8]) -> Result<Settlement> {
        let bet = self.registry.get(caller, index)?;
        if bet.status != BetStatus::Accepted {
            return Err(WagerError::NotAccepted);
        }
        let acceptor = bet.acceptor.ok_or(WagerError::NotAccepted)?;
        let winner = if bet.creator_wins(actual_outcome) {
            bet.creator
        } else {
            acceptor
        };

        let payout = bet.final_payout()?;
        let creator_refund = excess(bet.creator_deposit, bet.creator_locked()?);
        let acceptor_refund = excess(bet.acceptor_deposit, bet.stake_amount);
        let mut transfers = vec![Transfer { to: winner, amount: payout }];
        if creator_refund > 0 {
            transfers.push(Transfer {
                to: bet.creator,
                amount: creator_refund,
            });
        }
        if acceptor_refund > 0 {
            transfers.push(Transfer {
                to: acceptor,
                amount: acceptor_refund,
            });
        }
        let fee = self.check_release(bet.id, &transfers)?;

        Ok(Settlement {
            bet: bet.clone(),
            winner,
            payout,
            fee,
            transfers,
        })
    }

    /// Settle one of the caller's accepted bets against the actual outcome.
    pub fn resolve_bet(&mut self, caller: &Identity, index: usize, actual_outcome: &[u8]) -> Result<Settlement> {
        let settlement = self.preview_resolve(caller, index, actual_outcome)?;
        self.commit(caller, index, &settlement)?;

        info!(
            bet_id = settlement.bet.id,
            creator = %settlement.bet.creator.short(),
            winner = %settlement.winner.short(),
            payout = settlement.payout,
            fee = settlement.fee,
            "bet resolved"
        );
        debug!(transfers = settlement.transfers.len(), "settlement transfers prepared");
        Ok(settlement)
    }

    /// Settlement that withdrawing the caller's bet at `index` would produce,
    /// without touching the registry or the ledger.
    pub fn preview_withdraw(&self, caller: &Identity, index: usize) -> Result<Settlement> {
        let bet = self.registry.get(caller, index)?;
        if bet.status != BetStatus::Open {
            return Err(WagerError::AlreadyAccepted(WITHDRAW_ACCEPTED));
        }
        let refund = bet.creator_deposit;
        let transfers = vec![Transfer {
            to: bet.creator,
            amount: refund,
        }];
        let fee = self.check_release(bet.id, &transfers)?;

        Ok(Settlement {
            bet: bet.clone(),
            winner: bet.creator,
            payout: refund,
            fee,
            transfers,
        })
    }

    /// Cancel one of the caller's open bets and refund the creator's deposit.
    pub fn withdraw_bet(&mut self, caller: &Identity, index: usize) -> Result<Settlement> {
        let settlement = self.preview_withdraw(caller, index)?;
        self.commit(caller, index, &settlement)?;

        info!(
            bet_id = settlement.bet.id,
            creator = %settlement.bet.creator.short(),
            refund = settlement.payout,
            "bet withdrawn"
        );
        Ok(settlement)
    }

    /// Checks that the ledger can pay out `transfers` for a bet and keep the
    /// rest as fee. Returns the fee.
    fn check_release(&self, bet_id: BetId, transfers: &[Transfer]) -> Result<u64> {
        let outgoing = transfers
            .iter()
            .try_fold(0u64, |sum, transfer| sum.checked_add(transfer.amount))
            .ok_or_else(|| WagerError::Overflow("settlement total".to_string()))?;
        self.ledger.can_release(bet_id, outgoing)?;
        let fee = self.ledger.held(bet_id) - outgoing;
        self.ledger.can_retain(fee)?;
        Ok(fee)
    }

    /// Remove a previewed bet, then move its custody out of the ledger.
    fn commit(&mut self, caller: &Identity, index: usize, settlement: &Settlement) -> Result<()> {
        let bet = self.registry.remove(caller, index)?;
        for transfer in &settlement.transfers {
            self.ledger.release(bet.id, transfer.to, transfer.amount)?;
        }
        self.ledger.close(bet.id)?;
        Ok(())
    }

    pub fn count(&self, creator: &Identity) -> usize {
        self.registry.count(creator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{identity, terms, ALICE, BOB, CAROL};

    #[test]
    fn test_create_validates_before_locking() {
        let alice = identity(ALICE);
        let mut engine = BetLifecycle::new();

        let err = engine.create_bet(alice, 150, terms(100, 0, 2, "PIT")).unwrap_err();
        assert_eq!(err.reason(), "oddsNumerator must be greater than 0");
        let err = engine.create_bet(alice, 150, terms(100, 3, 0, "PIT")).unwrap_err();
        assert_eq!(err.reason(), "oddsDenominator must be greater than 0");
        let err = engine.create_bet(alice, 149, terms(100, 3, 2, "PIT")).unwrap_err();
        assert!(matches!(
            err,
            WagerError::InsufficientFunds {
                required: 150,
                attached: 149
            }
        ));

        assert_eq!(engine.count(&alice), 0);
        assert_eq!(engine.ledger().total_locked(), 0);

        assert_eq!(engine.create_bet(alice, 150, terms(100, 3, 2, "PIT")).unwrap(), 0);
        assert_eq!(engine.count(&alice), 1);
        assert_eq!(engine.ledger().total_locked(), 150);
    }

    #[test]
    fn test_accept_rules() {
        let (alice, bob) = (identity(ALICE), identity(BOB));
        let mut engine = BetLifecycle::new();

        assert!(matches!(
            engine.accept_bet(bob, 100, &alice, 0),
            Err(WagerError::UnknownBet)
        ));

        engine.create_bet(alice, 150, terms(100, 3, 2, "PIT")).unwrap();
        let err = engine.accept_bet(bob, 99, &alice, 0).unwrap_err();
        assert_eq!(err.reason(), "must send enough to cover bet loss");
        assert_eq!(engine.registry().get(&alice, 0).unwrap().status, BetStatus::Open);

        engine.accept_bet(bob, 100, &alice, 0).unwrap();
        let bet = engine.registry().get(&alice, 0).unwrap();
        assert_eq!(bet.status, BetStatus::Accepted);
        assert_eq!(bet.acceptor, Some(bob));
        assert_eq!(engine.ledger().held(bet.id), 250);
        assert_eq!(engine.count(&alice), 1);

        let err = engine.accept_bet(identity(CAROL), 100, &alice, 0).unwrap_err();
        assert_eq!(err.reason(), "bet has already been accepted");
        assert_eq!(engine.registry().get(&alice, 0).unwrap().acceptor, Some(bob));
    }

    #[test]
    fn test_resolve_rules() {
        let (alice, bob) = (identity(ALICE), identity(BOB));
        let mut engine = BetLifecycle::new();

        assert!(matches!(
            engine.resolve_bet(&alice, 0, b"PIT"),
            Err(WagerError::UnknownBet)
        ));

        engine.create_bet(alice, 150, terms(100, 3, 2, "PIT")).unwrap();
        assert!(matches!(
            engine.resolve_bet(&bob, 0, b"PIT"),
            Err(WagerError::UnknownBet)
        ));
        assert!(matches!(
            engine.resolve_bet(&alice, 0, b"PIT"),
            Err(WagerError::NotAccepted)
        ));

        engine.accept_bet(bob, 100, &alice, 0).unwrap();
        assert!(matches!(
            engine.resolve_bet(&bob, 0, b"CLE"),
            Err(WagerError::UnknownBet)
        ));

        let settlement = engine.resolve_bet(&alice, 0, b"CLE").unwrap();
        assert_eq!(settlement.winner, bob);
        assert_eq!(settlement.payout, 237);
        assert_eq!(settlement.fee, 13);
        assert_eq!(settlement.transfers, vec![Transfer { to: bob, amount: 237 }]);
        assert_eq!(engine.count(&alice), 0);
        assert_eq!(engine.ledger().total_locked(), 0);
        assert_eq!(engine.ledger().retained_fees(), 13);

        // Settled bets cannot be settled again
        assert!(matches!(
            engine.resolve_bet(&alice, 0, b"CLE"),
            Err(WagerError::UnknownBet)
        ));
    }

    #[test]
    fn test_withdraw_rules() {
        let (alice, bob) = (identity(ALICE), identity(BOB));
        let mut engine = BetLifecycle::new();

        assert!(matches!(
            engine.withdraw_bet(&alice, 0),
            Err(WagerError::UnknownBet)
        ));

        engine.create_bet(alice, 100, terms(100, 1, 1, "CLE")).unwrap();
        assert!(matches!(
            engine.withdraw_bet(&bob, 0),
            Err(WagerError::UnknownBet)
        ));

        let settlement = engine.withdraw_bet(&alice, 0).unwrap();
        assert_eq!(settlement.transfers, vec![Transfer { to: alice, amount: 100 }]);
        assert_eq!(settlement.fee, 0);
        assert_eq!(engine.count(&alice), 0);

        engine.create_bet(alice, 100, terms(100, 1, 1, "CLE")).unwrap();
        engine.accept_bet(bob, 100, &alice, 0).unwrap();
        let err = engine.withdraw_bet(&alice, 0).unwrap_err();
        assert_eq!(err.reason(), "can't withdraw from accepted bet");
        assert_eq!(engine.count(&alice), 1);
        assert_eq!(engine.ledger().total_locked(), 200);
    }

    #[test]
    fn test_excess_deposits_are_refunded() {
        let (alice, bob) = (identity(ALICE), identity(BOB));
        let mut engine = BetLifecycle::new();

        engine.create_bet(alice, 810, terms(100, 8, 1, "PIT")).unwrap();
        engine.accept_bet(bob, 103, &alice, 0).unwrap();
        let settlement = engine.resolve_bet(&alice, 0, b"PIT").unwrap();

        assert_eq!(
            settlement.transfers,
            vec![
                Transfer { to: alice, amount: 855 },
                Transfer { to: alice, amount: 10 },
                Transfer { to: bob, amount: 3 },
            ]
        );
        assert_eq!(settlement.fee, 45);
        assert_eq!(engine.ledger().held(settlement.bet.id), 0);

        // Withdrawal refunds the whole deposit, excess included
        engine.create_bet(alice, 120, terms(100, 1, 1, "PIT")).unwrap();
        let settlement = engine.withdraw_bet(&alice, 0).unwrap();
        assert_eq!(settlement.payout, 120);
    }

    #[test]
    fn test_preview_leaves_state_untouched() {
        let (alice, bob) = (identity(ALICE), identity(BOB));
        let mut engine = BetLifecycle::new();

        engine.create_bet(alice, 810, terms(100, 8, 1, "PIT")).unwrap();
        let withdrawal = engine.preview_withdraw(&alice, 0).unwrap();
        assert_eq!(withdrawal.transfers, vec![Transfer { to: alice, amount: 810 }]);
        assert_eq!(engine.count(&alice), 1);

        engine.accept_bet(bob, 100, &alice, 0).unwrap();
        let preview = engine.preview_resolve(&alice, 0, b"CLE").unwrap();
        assert_eq!(engine.count(&alice), 1);
        assert_eq!(engine.ledger().total_locked(), 910);
        assert_eq!(engine.ledger().retained_fees(), 0);

        let settlement = engine.resolve_bet(&alice, 0, b"CLE").unwrap();
        assert_eq!(settlement, preview);
        assert_eq!(settlement.fee, 45);
    }

    #[test]
    fn test_indices_are_renumbered_after_removal() {
        let (alice, bob) = (identity(ALICE), identity(BOB));
        let mut engine = BetLifecycle::new();

        engine.create_bet(alice, 100, terms(100, 1, 1, "first")).unwrap();
        engine.create_bet(alice, 200, terms(200, 1, 1, "second")).unwrap();
        engine.withdraw_bet(&alice, 0).unwrap();

        // The second bet moved into slot 0 and keeps its custody key
        let bet = engine.registry().get(&alice, 0).unwrap();
        assert_eq!(bet.predicted_outcome, b"second".to_vec());
        assert_eq!(engine.ledger().held(bet.id), 200);

        engine.accept_bet(bob, 200, &alice, 0).unwrap();
        let settlement = engine.resolve_bet(&alice, 0, b"second").unwrap();
        assert_eq!(settlement.winner, alice);
        assert_eq!(settlement.payout, 380);
    }
}
