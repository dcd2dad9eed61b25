//! Local host environment.
//!
//! Simulates the execution environment a [`Wagerbook`] runs inside: account
//! balances, value attached to calls, and revert-on-failure. Attached value is
//! debited from the caller before dispatch and restored in full when the call
//! is rejected, so a failed call is invisible in every balance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    book::{CallContext, TransferSink, Wagerbook},
    error::Result,
    ledger::Transfer,
    lifecycle::Settlement,
    Identity, WagerError,
};

/// Balance given to identities the host has not seen before.
pub const DEFAULT_OPENING_BALANCE: u64 = 10_000;

/// Account balances of the host environment.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Balances {
    accounts: BTreeMap<Identity, u64>,
    opening_balance: u64,
}

impl Default for Balances {
    fn default() -> Self {
        Self::new(DEFAULT_OPENING_BALANCE)
    }
}

impl Balances {
    /// Empty book of accounts; unseen identities start at `opening_balance`.
    pub fn new(opening_balance: u64) -> Self {
        Self {
            accounts: BTreeMap::new(),
            opening_balance,
        }
    }

    /// Current balance of `who`, or the opening balance if never seen.
    pub fn balance_of(&self, who: &Identity) -> u64 {
        self.accounts
            .get(who)
            .copied()
            .unwrap_or(self.opening_balance)
    }

    /// Take `amount` from `who`, failing if the balance does not cover it.
    pub fn debit(&mut self, who: Identity, amount: u64) -> Result<()> {
        let available = self.balance_of(&who);
        if available < amount {
            return Err(WagerError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        self.accounts.insert(who, available - amount);
        Ok(())
    }

    /// Add `amount` to `who`, failing if the balance would overflow.
    pub fn credit(&mut self, who: Identity, amount: u64) -> Result<()> {
        let balance = self.headroom_for(&who, amount)?;
        self.accounts.insert(who, balance);
        Ok(())
    }

    fn headroom_for(&self, who: &Identity, amount: u64) -> Result<u64> {
        self.balance_of(who)
            .checked_add(amount)
            .ok_or_else(|| WagerError::Overflow(format!("balance of {}", who.short())))
    }

    /// Accounts that have been touched, in identity order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Identity, &u64)> {
        self.accounts.iter()
    }
}

impl TransferSink for Balances {
    fn can_deliver(&self, transfers: &[Transfer]) -> Result<()> {
        let mut incoming: BTreeMap<Identity, u64> = BTreeMap::new();
        for transfer in transfers {
            let total = incoming.entry(transfer.to).or_insert(0);
            *total = total
                .checked_add(transfer.amount)
                .ok_or_else(|| WagerError::Overflow("settlement total".to_string()))?;
        }
        for (who, amount) in &incoming {
            self.headroom_for(who, *amount)?;
        }
        Ok(())
    }

    fn deliver(&mut self, transfer: &Transfer) -> Result<()> {
        self.credit(transfer.to, transfer.amount)
    }
}

/// A [`Wagerbook`] together with the balances of everyone calling it.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LocalHost {
    pub book: Wagerbook,
    pub balances: Balances,
}

impl LocalHost {
    /// Empty book; unseen identities start at `opening_balance`.
    pub fn new(opening_balance: u64) -> Self {
        Self {
            book: Wagerbook::new(),
            balances: Balances::new(opening_balance),
        }
    }

    /// Run `call` with `value` taken from `caller`, reverting the debit if the
    /// call fails.
    fn call<T>(
        &mut self,
        caller: Identity,
        value: u64,
        call: impl FnOnce(&mut Wagerbook, &CallContext, &mut Balances) -> Result<T>,
    ) -> Result<T> {
        let before = self.balances.balance_of(&caller);
        self.balances.debit(caller, value)?;
        let ctx = CallContext::new(caller, value);
        call(&mut self.book, &ctx, &mut self.balances).inspect_err(|_| {
            self.balances.accounts.insert(caller, before);
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_bet(
        &mut self,
        caller: Identity,
        value: u64,
        stake_amount: u64,
        odds_numerator: u64,
        odds_denominator: u64,
        match_identifier: &[u8],
        predicted_outcome: &[u8],
    ) -> Result<usize> {
        self.call(caller, value, |book, ctx, _| {
            book.create_bet(
                ctx,
                stake_amount,
                odds_numerator,
                odds_denominator,
                match_identifier,
                predicted_outcome,
            )
        })
    }

    pub fn accept_bet(&mut self, caller: Identity, value: u64, creator: &Identity, index: usize) -> Result<()> {
        self.call(caller, value, |book, ctx, _| book.accept_bet(ctx, creator, index))
    }

    pub fn resolve_bet(&mut self, caller: Identity, index: usize, actual_outcome: &[u8]) -> Result<Settlement> {
        self.call(caller, 0, |book, ctx, balances| {
            book.resolve_bet(ctx, index, actual_outcome, balances)
        })
    }

    pub fn withdraw_bet(&mut self, caller: Identity, index: usize) -> Result<Settlement> {
        self.call(caller, 0, |book, ctx, balances| {
            book.withdraw_bet(ctx, index, balances)
        })
    }

    pub fn get_number_of_bets(&self, caller: &Identity) -> usize {
        self.book.get_number_of_bets(caller)
    }

    pub fn balance_of(&self, who: &Identity) -> u64 {
        self.balances.balance_of(who)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{constants::*, identity, ALICE, BOB};

    fn host() -> (LocalHost, Identity, Identity) {
        (LocalHost::new(1_000_000), identity(ALICE), identity(BOB))
    }

    fn create(host: &mut LocalHost, creator: Identity, value: u64, stake: u64, num: u64, den: u64) -> Result<usize> {
        host.create_bet(creator, value, stake, num, den, TEST_MATCH, TEST_PREDICTION)
    }

    #[test]
    fn test_bet_flow_creator_wins() {
        let (mut host, alice, bob) = host();
        let start_a = host.balance_of(&alice);
        let start_b = host.balance_of(&bob);
        assert_eq!(host.get_number_of_bets(&alice), 0);

        create(&mut host, alice, 800, 100, 8, 1).unwrap();
        assert_eq!(host.get_number_of_bets(&alice), 1);
        assert_eq!(host.balance_of(&alice), start_a - 800);

        host.accept_bet(bob, 100, &alice, 0).unwrap();
        assert_eq!(host.get_number_of_bets(&alice), 1);
        assert_eq!(host.balance_of(&alice), start_a - 800);
        assert_eq!(host.balance_of(&bob), start_b - 100);

        host.resolve_bet(alice, 0, b"PIT").unwrap();
        assert_eq!(host.get_number_of_bets(&alice), 0);
        assert_eq!(host.balance_of(&alice), start_a - 800 + 855);
        assert_eq!(host.balance_of(&bob), start_b - 100);
    }

    #[test]
    fn test_bet_flow_acceptor_wins() {
        let (mut host, alice, bob) = host();
        let start_a = host.balance_of(&alice);
        let start_b = host.balance_of(&bob);

        create(&mut host, alice, 800, 100, 8, 1).unwrap();
        host.accept_bet(bob, 100, &alice, 0).unwrap();
        host.resolve_bet(alice, 0, b"CLE").unwrap();

        assert_eq!(host.get_number_of_bets(&alice), 0);
        assert_eq!(host.balance_of(&alice), start_a - 800);
        assert_eq!(host.balance_of(&bob), start_b - 100 + 855);
    }

    #[test]
    fn test_rejected_calls_restore_balances() {
        let (mut host, alice, bob) = host();
        let start_a = host.balance_of(&alice);
        let start_b = host.balance_of(&bob);

        let err = create(&mut host, alice, 149, 100, 3, 2).unwrap_err();
        assert_eq!(err.reason(), "must send enough to cover bet loss");
        let err = create(&mut host, alice, 150, 100, 0, 2).unwrap_err();
        assert_eq!(err.reason(), "oddsNumerator must be greater than 0");
        let err = create(&mut host, alice, 150, 100, 3, 0).unwrap_err();
        assert_eq!(err.reason(), "oddsDenominator must be greater than 0");
        let err = host.accept_bet(bob, 0, &alice, 0).unwrap_err();
        assert_eq!(err.reason(), "unknown bet");

        create(&mut host, alice, 150, 100, 3, 2).unwrap();
        let err = host.accept_bet(bob, 99, &alice, 0).unwrap_err();
        assert_eq!(err.reason(), "must send enough to cover bet loss");

        assert_eq!(host.balance_of(&alice), start_a - 150);
        assert_eq!(host.balance_of(&bob), start_b);
        assert_eq!(host.book.total_locked(), 150);
    }

    #[test]
    fn test_accept_and_withdraw_interplay() {
        let (mut host, alice, bob) = host();

        create(&mut host, alice, 150, 100, 3, 2).unwrap();
        host.accept_bet(bob, 100, &alice, 0).unwrap();
        assert_eq!(host.get_number_of_bets(&alice), 1);

        let err = host.accept_bet(bob, 100, &alice, 0).unwrap_err();
        assert_eq!(err.reason(), "bet has already been accepted");
        let err = host.withdraw_bet(alice, 0).unwrap_err();
        assert_eq!(err.reason(), "can't withdraw from accepted bet");
    }

    #[test]
    fn test_resolve_guards() {
        let (mut host, alice, bob) = host();

        let err = host.resolve_bet(alice, 0, b"PIT").unwrap_err();
        assert_eq!(err.reason(), "unknown bet");

        create(&mut host, alice, 150, 100, 3, 2).unwrap();
        let err = host.resolve_bet(bob, 0, b"PIT").unwrap_err();
        assert_eq!(err.reason(), "unknown bet");
        let err = host.resolve_bet(alice, 0, b"PIT").unwrap_err();
        assert_eq!(err.reason(), "can't resolve unaccepted bet");
    }

    #[test]
    fn test_resolve_payouts_truncate() {
        let (mut host, alice, bob) = host();

        create(&mut host, alice, 300, 200, 3, 2).unwrap();
        host.accept_bet(bob, 200, &alice, 0).unwrap();
        let before = host.balance_of(&alice);
        host.resolve_bet(alice, 0, b"PIT").unwrap();
        assert_eq!(host.balance_of(&alice), before + 475);

        create(&mut host, alice, 300, 200, 3, 2).unwrap();
        host.accept_bet(bob, 200, &alice, 0).unwrap();
        let before = host.balance_of(&bob);
        host.resolve_bet(alice, 0, b"CLE").unwrap();
        assert_eq!(host.balance_of(&bob), before + 475);
        assert_eq!(host.book.retained_fees(), 50);
    }

    #[test]
    fn test_withdraw_refunds_exactly() {
        let (mut host, alice, _) = host();
        let start = host.balance_of(&alice);

        let err = host.withdraw_bet(alice, 0).unwrap_err();
        assert_eq!(err.reason(), "unknown bet");

        host.create_bet(alice, 100, 100, 1, 1, TEST_MATCH, b"CLE").unwrap();
        host.withdraw_bet(alice, 0).unwrap();
        assert_eq!(host.balance_of(&alice), start);
        assert_eq!(host.get_number_of_bets(&alice), 0);
        assert_eq!(host.book.retained_fees(), 0);
    }

    #[test]
    fn test_value_is_conserved() {
        let (mut host, alice, bob) = host();
        let total = |host: &LocalHost| {
            host.balance_of(&alice)
                + host.balance_of(&bob)
                + host.book.total_locked()
                + host.book.retained_fees()
        };
        let start = total(&host);

        create(&mut host, alice, 700, 700, 1, 1).unwrap();
        create(&mut host, alice, 35, 10, 7, 2).unwrap();
        create(&mut host, bob, 33, 100, 1, 3).unwrap();
        host.accept_bet(bob, 700, &alice, 0).unwrap();
        host.accept_bet(alice, 100, &bob, 0).unwrap();
        assert_eq!(total(&host), start);

        host.resolve_bet(alice, 0, b"nope").unwrap();
        host.withdraw_bet(alice, 0).unwrap();
        host.resolve_bet(bob, 0, TEST_PREDICTION).unwrap();
        assert_eq!(total(&host), start);
        assert_eq!(host.book.total_locked(), 0);
    }

    #[test]
    fn test_settlement_rejected_when_balance_would_overflow() {
        let mut host = LocalHost::new(u64::MAX);
        let (alice, bob) = (identity(ALICE), identity(BOB));

        create(&mut host, alice, 800, 100, 8, 1).unwrap();
        host.accept_bet(bob, 100, &alice, 0).unwrap();
        let bob_before = host.balance_of(&bob);

        let err = host.resolve_bet(alice, 0, b"CLE").unwrap_err();
        assert!(matches!(err, WagerError::Overflow(_)));
        assert_eq!(host.balance_of(&bob), bob_before);
        assert_eq!(host.balance_of(&alice), u64::MAX - 800);
        assert_eq!(host.get_number_of_bets(&alice), 1);
        assert_eq!(host.book.total_locked(), 900);
        assert_eq!(host.book.retained_fees(), 0);

        // Once bob has room, the same bet settles and nothing is lost
        host.balances.debit(bob, 1_000).unwrap();
        host.resolve_bet(alice, 0, b"CLE").unwrap();
        assert_eq!(host.balance_of(&bob), bob_before - 1_000 + 855);
        assert_eq!(host.book.retained_fees(), 45);
        assert_eq!(host.book.total_locked(), 0);
    }

    #[test]
    fn test_refunds_to_one_account_are_checked_together() {
        let mut balances = Balances::new(u64::MAX - 10);
        let alice = identity(ALICE);
        let transfers = [
            Transfer { to: alice, amount: 6 },
            Transfer { to: alice, amount: 5 },
        ];
        assert!(matches!(
            balances.can_deliver(&transfers),
            Err(WagerError::Overflow(_))
        ));
        assert!(balances.can_deliver(&transfers[..1]).is_ok());
        assert!(balances.credit(alice, 11).is_err());
        assert_eq!(balances.balance_of(&alice), u64::MAX - 10);
        balances.deliver(&transfers[0]).unwrap();
        assert_eq!(balances.balance_of(&alice), u64::MAX - 4);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut host = LocalHost::new(500);
        let alice = identity(ALICE);
        let err = create(&mut host, alice, 800, 100, 8, 1).unwrap_err();
        assert!(matches!(
            err,
            WagerError::InsufficientBalance {
                available: 500,
                required: 800
            }
        ));
        assert_eq!(host.balance_of(&alice), 500);
        assert_eq!(host.get_number_of_bets(&alice), 0);
    }

    #[test]
    fn test_host_snapshot() {
        let (mut host, alice, bob) = host();
        create(&mut host, alice, 800, 100, 8, 1).unwrap();
        host.accept_bet(bob, 100, &alice, 0).unwrap();

        let mut restored = LocalHost::from_json(&host.to_json().unwrap()).unwrap();
        assert_eq!(restored.balance_of(&alice), host.balance_of(&alice));
        restored.resolve_bet(alice, 0, b"CLE").unwrap();
        assert_eq!(restored.balance_of(&bob), host.balance_of(&bob) + 855);
    }
}
