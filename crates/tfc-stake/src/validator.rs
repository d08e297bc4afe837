//! Stake limit validation for prospective orders.
//!
//! A fighter's capital is the fixed fight stake. Capital consumed is the
//! high-water mark of exposure ever reached; capital locked in an open
//! position can be closed and reopened without consuming fresh stake.
//! Resting unfilled orders earmark capital too.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use tfc_core::{
    AccountId, Amount, Fight, FightId, FightParticipant, FightTrade, OrderKind, Price, Side,
    Symbol, UserId,
};
use tfc_exchange::ExchangeClient;
use tfc_exposure::{ledger_exposure, positions_from_trades};
use tfc_store::FightStore;
use tfc_telemetry::Metrics;

use crate::error::{StakeError, StakeLimitDetail, StakeResult};

// ============================================================================
// Inputs and outcomes
// ============================================================================

/// A prospective order as seen by stake validation. Mirrors what the
/// upstream order router knows before submission.
#[derive(Debug, Clone)]
pub struct OrderIntent {
    pub account: AccountId,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub amount: Amount,
    /// Limit price where the order carries one. Market-priced orders fetch
    /// the current mark price instead.
    pub price: Option<Price>,
    pub reduce_only: bool,
}

impl OrderIntent {
    /// Price used for notional. Falls back to the mark price upstream when
    /// absent.
    fn declared_price(&self) -> Option<Price> {
        if self.kind.is_market_priced() {
            None
        } else {
            self.price
        }
    }
}

/// Outcome of a passed validation.
#[derive(Debug, Clone)]
pub enum OrderClearance {
    /// The user has no LIVE fight; no stake restriction applies.
    NotInFight,
    /// The order fits within the fight stake (or cannot increase exposure).
    Cleared {
        fight: Fight,
        participant: FightParticipant,
    },
}

impl OrderClearance {
    pub fn is_in_fight(&self) -> bool {
        matches!(self, Self::Cleared { .. })
    }

    pub fn fight_id(&self) -> Option<FightId> {
        match self {
            Self::Cleared { fight, .. } => Some(fight.id),
            Self::NotInFight => None,
        }
    }
}

/// Capital still available against the stake, before pending orders.
///
/// The `+ current_exposure` term models that capital locked in an open
/// position can be closed and reopened without consuming fresh stake.
/// Clamped at zero.
pub fn available_capital(
    stake: Decimal,
    max_exposure_used: Decimal,
    current_exposure: Decimal,
) -> Decimal {
    (stake - max_exposure_used + current_exposure).max(Decimal::ZERO)
}

// ============================================================================
// Validator
// ============================================================================

/// Validates prospective orders against the fighter's stake.
pub struct StakeValidator {
    store: Arc<dyn FightStore>,
    exchange: Arc<dyn ExchangeClient>,
}

impl StakeValidator {
    pub fn new(store: Arc<dyn FightStore>, exchange: Arc<dyn ExchangeClient>) -> Self {
        Self { store, exchange }
    }

    /// Validate a prospective order.
    ///
    /// Reduce-only orders always pass: they cannot increase exposure. Users
    /// without a LIVE fight are unrestricted. Otherwise the order is
    /// rejected when its notional exceeds the remaining available capital,
    /// with the full numeric breakdown in the error.
    ///
    /// Side effects: none beyond an optional fire-and-forget advance of the
    /// exposure high-water mark when live positions run ahead of the trade
    /// ledger.
    pub async fn validate_order(
        &self,
        user_id: UserId,
        intent: &OrderIntent,
        fight_hint: Option<FightId>,
    ) -> StakeResult<OrderClearance> {
        let Some((fight, participant)) =
            self.store.live_fight_for_user(user_id, fight_hint).await?
        else {
            Metrics::order_validated("not_in_fight");
            return Ok(OrderClearance::NotInFight);
        };

        if intent.reduce_only {
            debug!(%user_id, fight_id = %fight.id, "Reduce-only order, stake check skipped");
            Metrics::order_validated("cleared");
            return Ok(OrderClearance::Cleared { fight, participant });
        }

        let trades = self.store.trades(fight.id).await?;
        let own_trades: Vec<FightTrade> =
            trades.into_iter().filter(|t| t.user_id == user_id).collect();

        let book = positions_from_trades(&own_trades);
        let ledger = ledger_exposure(&book);
        let live = self.live_exposure(&intent.account, &own_trades).await;
        let current_exposure = ledger.max(live);

        // Live positions can run ahead of the ledger when fills have not
        // been ingested yet. The stored mark is advanced in the background;
        // the effective mark used here already includes the candidate.
        if current_exposure > participant.max_exposure_used {
            self.bump_mark_in_background(fight.id, user_id, current_exposure);
        }
        let max_exposure_used = participant.max_exposure_used.max(current_exposure);

        let order_notional = self.order_notional(intent).await?;
        let pending_notional = self
            .pending_notional(fight.id, user_id, &intent.account)
            .await?;

        let available = (available_capital(fight.stake, max_exposure_used, current_exposure)
            - pending_notional)
            .max(Decimal::ZERO);

        if order_notional > available {
            let detail = StakeLimitDetail {
                stake: fight.stake,
                max_exposure_used,
                current_exposure,
                pending_notional,
                order_notional,
                available,
            };
            warn!(%user_id, fight_id = %fight.id, %detail, "Order rejected by stake limit");
            Metrics::order_validated("rejected");
            Metrics::stake_rejected(intent.symbol.as_str());
            return Err(StakeError::StakeLimitExceeded(detail));
        }

        debug!(
            %user_id,
            fight_id = %fight.id,
            %order_notional,
            %available,
            "Order within stake limit"
        );
        Metrics::order_validated("cleared");
        Ok(OrderClearance::Cleared { fight, participant })
    }

    /// Exposure from live exchange positions, restricted to symbols this
    /// user actually traded in the fight. Fails open to zero on adapter
    /// errors so a flaky venue cannot block order flow.
    async fn live_exposure(&self, account: &AccountId, own_trades: &[FightTrade]) -> Decimal {
        let fight_symbols: HashSet<&Symbol> = own_trades.iter().map(|t| &t.symbol).collect();
        if fight_symbols.is_empty() {
            return Decimal::ZERO;
        }

        match self.exchange.open_positions(account).await {
            Ok(positions) => positions
                .iter()
                .filter(|p| fight_symbols.contains(&p.symbol))
                .map(|p| p.notional())
                .sum(),
            Err(err) => {
                warn!(%account, error = %err, "Live position lookup failed, using ledger exposure only");
                Decimal::ZERO
            }
        }
    }

    /// Notional still earmarked by this fight's resting orders on the
    /// exchange. Adapter errors fail open to zero.
    async fn pending_notional(
        &self,
        fight_id: FightId,
        user_id: UserId,
        account: &AccountId,
    ) -> StakeResult<Decimal> {
        let fight_order_ids = self.store.fight_order_ids(fight_id, user_id).await?;
        if fight_order_ids.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let open_orders = match self.exchange.open_orders(account).await {
            Ok(orders) => orders,
            Err(err) => {
                warn!(%account, error = %err, "Open order lookup failed, pending notional treated as zero");
                return Ok(Decimal::ZERO);
            }
        };

        Ok(open_orders
            .iter()
            .filter(|o| fight_order_ids.iter().any(|id| id == &o.exchange_order_id))
            .map(|o| o.pending_notional())
            .sum())
    }

    async fn order_notional(&self, intent: &OrderIntent) -> StakeResult<Decimal> {
        let price = match intent.declared_price() {
            Some(price) => price,
            None => self
                .exchange
                .mark_price(&intent.symbol)
                .await
                .map_err(|source| StakeError::MarkPrice {
                    symbol: intent.symbol.clone(),
                    source,
                })?,
        };
        Ok(intent.amount.notional(price))
    }

    fn bump_mark_in_background(&self, fight_id: FightId, user_id: UserId, candidate: Decimal) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.bump_max_exposure(fight_id, user_id, candidate).await {
                warn!(%fight_id, %user_id, error = %err, "Failed to advance exposure high-water mark");
            }
        });
    }
}
