//! Fight trade and order-correlation records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Amount, Price};
use crate::ids::{FightId, Symbol, UserId};
use crate::side::Side;

/// One fill attributable to a fight. Immutable once created.
///
/// The ordered sequence per (fight, user, symbol) is the sole input to
/// position reconstruction. Only the fight-attributable portion of a raw
/// exchange fill lands here; portions that merely close a pre-fight
/// position are never recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightTrade {
    pub id: Uuid,
    pub fight_id: FightId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub amount: Amount,
    pub price: Price,
    pub leverage: Option<u32>,
    /// Fee in USDC for the attributable portion.
    pub fee: Decimal,
    /// Realized PnL in USDC for the attributable portion.
    pub realized_pnl: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl FightTrade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fight_id: FightId,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        amount: Amount,
        price: Price,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fight_id,
            user_id,
            symbol,
            side,
            amount,
            price,
            leverage: None,
            fee: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            executed_at,
        }
    }

    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = Some(leverage);
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_realized_pnl(mut self, pnl: Decimal) -> Self {
        self.realized_pnl = pnl;
        self
    }

    /// Notional value of this fill: amount * price.
    pub fn notional(&self) -> Decimal {
        self.amount.notional(self.price)
    }
}

/// Append-only correlation between an exchange order id and a fight.
///
/// Written when the upstream order router submits a fight order; lets the
/// stake validator restrict live open orders to this fight's orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightOrderAction {
    pub fight_id: FightId,
    pub user_id: UserId,
    pub exchange_order_id: String,
    pub created_at: DateTime<Utc>,
}

impl FightOrderAction {
    pub fn new(fight_id: FightId, user_id: UserId, exchange_order_id: impl Into<String>) -> Self {
        Self {
            fight_id,
            user_id,
            exchange_order_id: exchange_order_id.into(),
            created_at: Utc::now(),
        }
    }
}
