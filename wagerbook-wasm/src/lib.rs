//! # Wagerbook WASM
//!
//! WebAssembly bindings for the wagerbook escrow ledger.
//! Exposes a self-contained book with local balances to JavaScript callers,
//! using the same operation names as the ledger's public interface.

use serde::Serialize;
use wagerbook_core::{
    payout,
    utils::{self, display_label},
    Bet, Identity, LocalHost, WagerError,
};
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(err: WagerError) -> JsValue {
    JsValue::from_str(&err.reason())
}

fn from_js_index(index: u32) -> Result<usize, JsValue> {
    usize::try_from(index).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_index(index: usize) -> Result<u32, JsValue> {
    u32::try_from(index).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_identity(identity: &str) -> Result<Identity, JsValue> {
    identity.parse().map_err(to_js)
}

/// Bet as seen from JavaScript
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BetView {
    creator: String,
    acceptor: Option<String>,
    stake_amount: u64,
    odds_numerator: u64,
    odds_denominator: u64,
    match_identifier: String,
    predicted_outcome: String,
    status: String,
    terms_digest: String,
}

impl From<&Bet> for BetView {
    fn from(bet: &Bet) -> Self {
        Self {
            creator: bet.creator.to_string(),
            acceptor: bet.acceptor.map(|a| a.to_string()),
            stake_amount: bet.stake_amount,
            odds_numerator: bet.odds.numerator,
            odds_denominator: bet.odds.denominator,
            match_identifier: display_label(&bet.match_identifier),
            predicted_outcome: display_label(&bet.predicted_outcome),
            status: bet.status.to_string(),
            terms_digest: bet.terms_digest(),
        }
    }
}

/// A wagerbook with its own account balances
#[wasm_bindgen]
pub struct WasmWagerbook {
    host: LocalHost,
}

#[wasm_bindgen]
impl WasmWagerbook {
    /// Creates an empty book; unseen identities start at `opening_balance`
    #[wasm_bindgen(constructor)]
    pub fn new(opening_balance: u64) -> WasmWagerbook {
        WasmWagerbook {
            host: LocalHost::new(opening_balance),
        }
    }

    /// Restores a book from `toJson` output
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Result<WasmWagerbook, JsValue> {
        let host = LocalHost::from_json(json).map_err(to_js)?;
        Ok(WasmWagerbook { host })
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.host.to_json().map_err(to_js)
    }

    /// Proposes a bet; returns its index in the caller's collection
    #[wasm_bindgen(js_name = createBet)]
    #[allow(clippy::too_many_arguments)]
    pub fn create_bet(
        &mut self,
        from: &str,
        value: u64,
        stake_amount: u64,
        odds_numerator: u64,
        odds_denominator: u64,
        match_identifier: &[u8],
        predicted_outcome: &[u8],
    ) -> Result<u32, JsValue> {
        let caller = parse_identity(from)?;
        let index = self
            .host
            .create_bet(
                caller,
                value,
                stake_amount,
                odds_numerator,
                odds_denominator,
                match_identifier,
                predicted_outcome,
            )
            .map_err(to_js)?;
        to_js_index(index)
    }

    #[wasm_bindgen(js_name = acceptBet)]
    pub fn accept_bet(&mut self, from: &str, value: u64, creator: &str, index: u32) -> Result<(), JsValue> {
        let caller = parse_identity(from)?;
        let creator = parse_identity(creator)?;
        self.host
            .accept_bet(caller, value, &creator, from_js_index(index)?)
            .map_err(to_js)
    }

    /// Resolves the caller's bet; returns the amount paid to the winner
    #[wasm_bindgen(js_name = resolveBet)]
    pub fn resolve_bet(&mut self, from: &str, index: u32, actual_outcome: &[u8]) -> Result<u64, JsValue> {
        let caller = parse_identity(from)?;
        let settlement = self
            .host
            .resolve_bet(caller, from_js_index(index)?, actual_outcome)
            .map_err(to_js)?;
        Ok(settlement.payout)
    }

    /// Withdraws the caller's open bet; returns the refunded amount
    #[wasm_bindgen(js_name = withdrawBet)]
    pub fn withdraw_bet(&mut self, from: &str, index: u32) -> Result<u64, JsValue> {
        let caller = parse_identity(from)?;
        let settlement = self
            .host
            .withdraw_bet(caller, from_js_index(index)?)
            .map_err(to_js)?;
        Ok(settlement.payout)
    }

    #[wasm_bindgen(js_name = getNumberOfBets)]
    pub fn get_number_of_bets(&self, from: &str) -> Result<u32, JsValue> {
        let caller = parse_identity(from)?;
        to_js_index(self.host.get_number_of_bets(&caller))
    }

    /// Returns the creator's bets as an array of plain objects
    #[wasm_bindgen(js_name = betsOf)]
    pub fn bets_of(&self, creator: &str) -> Result<JsValue, JsValue> {
        let creator = parse_identity(creator)?;
        let bets: Vec<BetView> = self.host.book.bets_of(&creator).iter().map(BetView::from).collect();
        serde_wasm_bindgen::to_value(&bets).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = balanceOf)]
    pub fn balance_of(&self, who: &str) -> Result<u64, JsValue> {
        let who = parse_identity(who)?;
        Ok(self.host.balance_of(&who))
    }

    #[wasm_bindgen(getter, js_name = retainedFees)]
    pub fn retained_fees(&self) -> u64 {
        self.host.book.retained_fees()
    }

    #[wasm_bindgen(getter, js_name = totalLocked)]
    pub fn total_locked(&self) -> u64 {
        self.host.book.total_locked()
    }
}

/// Amount a creator must lock for the given stake and odds
#[wasm_bindgen(js_name = lockedStake)]
pub fn locked_stake(stake: u64, numerator: u64, denominator: u64) -> Result<u64, JsValue> {
    payout::locked_stake(stake, numerator, denominator).map_err(to_js)
}

/// Amount the winner receives for the given stake and odds
#[wasm_bindgen(js_name = finalPayout)]
pub fn final_payout(stake: u64, numerator: u64, denominator: u64) -> Result<u64, JsValue> {
    payout::final_payout(stake, numerator, denominator).map_err(to_js)
}

/// Deterministic hex identity for a seed alias
#[wasm_bindgen(js_name = identityFromSeed)]
pub fn identity_from_seed(seed: &str) -> Result<String, JsValue> {
    Identity::from_seed(seed)
        .map(|identity| identity.to_string())
        .map_err(to_js)
}

/// Label bytes for `createBet`/`resolveBet` from text or `0x`-prefixed hex
#[wasm_bindgen(js_name = decodeLabel)]
pub fn decode_label(input: &str) -> Result<Vec<u8>, JsValue> {
    utils::decode_label(input).map_err(to_js)
}
