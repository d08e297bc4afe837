//! Position reconstruction from the fight trade ledger.
//!
//! Positions are never persisted; they are replayed on demand from the
//! ordered FightTrade sequence. State per symbol is a signed net amount
//! (positive long, negative short) plus the cost basis of whatever is
//! still open.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use tfc_core::{Amount, FightTrade, Price, Side, Symbol};

/// Residual amounts below this are treated as fully closed. Guards against
/// rounding residue from repeated partial fills.
pub const DUST_THRESHOLD: Decimal = dec!(0.0000001);

/// Derived position state for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// Signed net amount: positive long, negative short.
    pub amount: Decimal,
    /// Cost basis of the open amount, always non-negative.
    pub total_cost: Decimal,
    pub trades_count: u32,
    /// Last leverage seen for this symbol.
    pub leverage: Option<u32>,
}

impl PositionState {
    /// Apply one fill.
    ///
    /// Same direction (or flat): extend the position at the fill price.
    /// Opposite direction: close proportionally at the average entry first,
    /// then open the remainder at the fill price (position flip).
    pub fn apply_fill(&mut self, side: Side, amount: Amount, price: Price, leverage: Option<u32>) {
        let qty = amount.inner();
        let px = price.inner();
        let signed = qty * Decimal::from(side.sign());

        self.trades_count += 1;
        if leverage.is_some() {
            self.leverage = leverage;
        }

        if self.amount.is_zero() || (self.amount.is_sign_positive() == signed.is_sign_positive()) {
            self.amount += signed;
            self.total_cost += qty * px;
            return;
        }

        let open = self.amount.abs();
        let closing = qty.min(open);
        let remaining = qty - closing;

        if closing == open {
            // Fully closed; any remainder flips to the opposite side with a
            // fresh basis at the fill price.
            self.total_cost = remaining * px;
        } else {
            // Partial close at the average entry of the open position.
            let avg_entry = self.total_cost / open;
            self.total_cost -= closing * avg_entry;
        }
        self.amount += signed;
    }

    #[inline]
    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// True when the residual amount is below the dust threshold.
    #[inline]
    pub fn is_dust(&self) -> bool {
        self.amount.abs() < DUST_THRESHOLD
    }

    /// Side of the open position, `None` when flat/dust.
    pub fn side(&self) -> Option<Side> {
        if self.is_dust() {
            None
        } else if self.amount.is_sign_positive() {
            Some(Side::Buy)
        } else {
            Some(Side::Sell)
        }
    }

    /// Average entry price of the open position, `None` when flat/dust.
    pub fn avg_entry_price(&self) -> Option<Price> {
        if self.is_dust() {
            None
        } else {
            Some(Price::new(self.total_cost / self.amount.abs()))
        }
    }
}

/// An open position as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: Symbol,
    pub side: Side,
    pub amount: Amount,
    pub avg_entry_price: Price,
    pub trades_count: u32,
    pub leverage: Option<u32>,
}

/// Replay trades in execution order into per-symbol position state.
///
/// Deterministic and side-effect free; re-derivable from the FightTrade log
/// alone. The input is sorted by execution time (stable, so ledger insertion
/// order breaks ties).
pub fn positions_from_trades(trades: &[FightTrade]) -> HashMap<Symbol, PositionState> {
    let mut ordered: Vec<&FightTrade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.executed_at);

    let mut book: HashMap<Symbol, PositionState> = HashMap::new();
    for trade in ordered {
        let state = book.entry(trade.symbol.clone()).or_default();
        state.apply_fill(trade.side, trade.amount, trade.price, trade.leverage);
    }
    book
}

/// Filter dust and derive the open-position view, sorted by symbol.
pub fn open_positions(book: &HashMap<Symbol, PositionState>) -> Vec<OpenPosition> {
    let mut out: Vec<OpenPosition> = book
        .iter()
        .filter_map(|(symbol, state)| {
            let side = state.side()?;
            let avg_entry_price = state.avg_entry_price()?;
            Some(OpenPosition {
                symbol: symbol.clone(),
                side,
                amount: Amount::new(state.abs_amount()),
                avg_entry_price,
                trades_count: state.trades_count,
                leverage: state.leverage,
            })
        })
        .collect();
    out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    out
}

/// Total notional exposure of the ledger-derived open positions.
pub fn ledger_exposure(book: &HashMap<Symbol, PositionState>) -> Decimal {
    book.values()
        .filter(|state| !state.is_dust())
        .map(|state| state.total_cost)
        .sum()
}

/// Signed net fight position for one symbol.
pub fn fight_net_amount(trades: &[FightTrade], symbol: &Symbol) -> Decimal {
    positions_from_trades(trades)
        .get(symbol)
        .map(|s| s.amount)
        .unwrap_or(Decimal::ZERO)
}
