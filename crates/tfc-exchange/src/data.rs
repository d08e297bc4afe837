//! Exchange data shapes: live positions and open orders.
//!
//! Raw REST responses carry decimals as strings; parse helpers convert them
//! into typed records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tfc_core::{Amount, Price, Side, Symbol};

use crate::error::{ExchangeError, ExchangeResult};

// ============================================================================
// Typed records
// ============================================================================

/// An open position on the exchange account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPosition {
    pub symbol: Symbol,
    /// Signed amount: positive long, negative short.
    pub amount: Decimal,
    pub entry_price: Price,
    pub unrealized_pnl: Decimal,
    /// Funding paid since the position opened (positive = paid out).
    pub funding_since_open: Decimal,
    pub leverage: Option<u32>,
}

impl AccountPosition {
    pub fn is_long(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_flat(&self) -> bool {
        self.amount.is_zero()
    }

    /// Absolute notional at entry: |amount| * entry price.
    pub fn notional(&self) -> Decimal {
        self.amount.abs() * self.entry_price.inner()
    }
}

/// A still-open order resting on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub exchange_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    /// Limit price if the order carries one.
    pub price: Option<Price>,
    /// Trigger price for stop orders.
    pub stop_price: Option<Price>,
    pub initial_amount: Amount,
    pub filled_amount: Amount,
    pub cancelled_amount: Amount,
    pub reduce_only: bool,
}

impl OpenOrder {
    /// Unfilled remainder: initial - filled - cancelled, clamped at zero.
    pub fn remaining(&self) -> Decimal {
        (self.initial_amount.inner() - self.filled_amount.inner() - self.cancelled_amount.inner())
            .max(Decimal::ZERO)
    }

    /// Notional still earmarked by this order. Priced off the limit price,
    /// falling back to the stop price; pure market remainders carry none.
    pub fn pending_notional(&self) -> Decimal {
        let px = match self.price.or(self.stop_price) {
            Some(px) => px,
            None => return Decimal::ZERO,
        };
        self.remaining() * px.inner()
    }
}

// ============================================================================
// Raw wire shapes
// ============================================================================

/// Raw position entry from the info endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPositionEntry {
    pub symbol: String,
    /// Signed size as string, e.g. "-0.00186".
    #[serde(rename = "szi")]
    pub signed_amount: String,
    #[serde(rename = "entryPx")]
    pub entry_price: String,
    #[serde(rename = "unrealizedPnl", default)]
    pub unrealized_pnl: Option<String>,
    #[serde(rename = "fundingSinceOpen", default)]
    pub funding_since_open: Option<String>,
    #[serde(default)]
    pub leverage: Option<u32>,
}

impl RawPositionEntry {
    pub fn parse(&self) -> ExchangeResult<AccountPosition> {
        let amount: Decimal = self.signed_amount.parse()?;
        let entry: Decimal = self.entry_price.parse()?;
        let unrealized_pnl = match &self.unrealized_pnl {
            Some(s) => s.parse()?,
            None => Decimal::ZERO,
        };
        let funding_since_open = match &self.funding_since_open {
            Some(s) => s.parse()?,
            None => Decimal::ZERO,
        };
        Ok(AccountPosition {
            symbol: Symbol::from(self.symbol.clone()),
            amount,
            entry_price: Price::new(entry),
            unrealized_pnl,
            funding_since_open,
            leverage: self.leverage,
        })
    }
}

/// Raw open-order entry from the info endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawOpenOrderEntry {
    #[serde(rename = "oid")]
    pub exchange_order_id: String,
    pub symbol: String,
    pub side: Side,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(rename = "stopPrice", default)]
    pub stop_price: Option<String>,
    #[serde(rename = "initialAmount")]
    pub initial_amount: String,
    #[serde(rename = "filledAmount", default)]
    pub filled_amount: Option<String>,
    #[serde(rename = "cancelledAmount", default)]
    pub cancelled_amount: Option<String>,
    #[serde(rename = "reduceOnly", default)]
    pub reduce_only: bool,
}

impl RawOpenOrderEntry {
    pub fn parse(&self) -> ExchangeResult<OpenOrder> {
        let parse_opt = |v: &Option<String>| -> ExchangeResult<Option<Price>> {
            match v {
                Some(s) => Ok(Some(Price::new(s.parse().map_err(ExchangeError::Decimal)?))),
                None => Ok(None),
            }
        };
        let parse_amount = |v: &Option<String>| -> ExchangeResult<Amount> {
            match v {
                Some(s) => Ok(Amount::new(s.parse().map_err(ExchangeError::Decimal)?)),
                None => Ok(Amount::ZERO),
            }
        };
        Ok(OpenOrder {
            exchange_order_id: self.exchange_order_id.clone(),
            symbol: Symbol::from(self.symbol.clone()),
            side: self.side,
            price: parse_opt(&self.price)?,
            stop_price: parse_opt(&self.stop_price)?,
            initial_amount: Amount::new(self.initial_amount.parse()?),
            filled_amount: parse_amount(&self.filled_amount)?,
            cancelled_amount: parse_amount(&self.cancelled_amount)?,
            reduce_only: self.reduce_only,
        })
    }
}
