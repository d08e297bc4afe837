//! Fight trade recording from raw exchange fills.
//!
//! The fill stream hands us every execution on the user's account. Only the
//! fight-attributable portion becomes a FightTrade; the portion that merely
//! unwinds a pre-fight position is skipped, and the participant's stored
//! pre-fight snapshot is decremented in the same store application so later
//! fills see an accurate remainder. The decrement carries the snapshot value
//! this decision was based on, and the store rejects the application if the
//! snapshot moved underneath us.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use tfc_core::{
    Amount, FightId, FightOrderAction, FightTrade, Price, Side, Symbol, UserId,
};
use tfc_exposure::{
    fight_relevant_for_trade, ledger_exposure, positions_from_trades, DUST_THRESHOLD,
};
use tfc_store::{FightStore, FillApplication, PrefightDraw, StoreError};

use crate::error::{StakeError, StakeResult};

/// Attempts before giving up on a snapshot that keeps moving.
const MAX_RECORD_ATTEMPTS: u32 = 3;

/// A raw fill from the exchange stream, before fight attribution.
#[derive(Debug, Clone)]
pub struct RawFill {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub amount: Amount,
    pub price: Price,
    pub leverage: Option<u32>,
    /// Fee in USDC for the whole fill.
    pub fee: Decimal,
    /// Realized PnL in USDC for the whole fill.
    pub realized_pnl: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// Turns raw fills into FightTrade rows and keeps the exposure high-water
/// mark current.
pub struct TradeRecorder {
    store: Arc<dyn FightStore>,
}

impl TradeRecorder {
    pub fn new(store: Arc<dyn FightStore>) -> Self {
        Self { store }
    }

    /// Record the fight-attributable portion of a raw fill.
    ///
    /// Returns the persisted trade, or `None` when the user has no LIVE
    /// fight or the fill only unwound pre-fight position. Fee and realized
    /// PnL are scaled down to the attributable share of the fill.
    pub async fn record_fill(
        &self,
        fill: &RawFill,
        fight_hint: Option<FightId>,
    ) -> StakeResult<Option<FightTrade>> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let Some((fight, participant)) = self
                .store
                .live_fight_for_user(fill.user_id, fight_hint)
                .await?
            else {
                return Ok(None);
            };

            let raw_amount = fill.amount.inner();
            let split =
                fight_relevant_for_trade(fill.side, raw_amount, &fill.symbol, &participant);

            let prefight_draw = (!split.prefight_consumed.is_zero()).then(|| PrefightDraw {
                symbol: fill.symbol.clone(),
                delta: Decimal::from(fill.side.sign()) * split.prefight_consumed,
                expected_remaining: participant.remaining_prefight(&fill.symbol),
            });

            let (application, recorded) = if split.attributable < DUST_THRESHOLD {
                debug!(
                    user_id = %fill.user_id,
                    fight_id = %fight.id,
                    symbol = %fill.symbol,
                    amount = %raw_amount,
                    "Fill only unwound pre-fight position, not recorded"
                );
                (
                    FillApplication {
                        trade: None,
                        prefight_draw,
                    },
                    None,
                )
            } else {
                let mut trade = FightTrade::new(
                    fight.id,
                    fill.user_id,
                    fill.symbol.clone(),
                    fill.side,
                    Amount::new(split.attributable),
                    fill.price,
                    fill.executed_at,
                )
                .with_fee(fill.fee * split.attributable / raw_amount)
                .with_realized_pnl(fill.realized_pnl * split.attributable / raw_amount);
                if let Some(leverage) = fill.leverage {
                    trade = trade.with_leverage(leverage);
                }
                (
                    FillApplication {
                        trade: Some(trade.clone()),
                        prefight_draw,
                    },
                    Some(trade),
                )
            };

            match self
                .store
                .apply_fill(fight.id, fill.user_id, application)
                .await
            {
                Ok(()) => {
                    if let Some(trade) = &recorded {
                        info!(
                            user_id = %fill.user_id,
                            fight_id = %fight.id,
                            symbol = %trade.symbol,
                            side = %trade.side,
                            amount = %trade.amount,
                            price = %trade.price,
                            "Recorded fight trade"
                        );
                        self.advance_exposure_mark(fight.id, fill.user_id).await;
                    }
                    return Ok(recorded);
                }
                Err(StoreError::Conflict(reason)) if attempt < MAX_RECORD_ATTEMPTS => {
                    warn!(
                        fight_id = %fight.id,
                        user_id = %fill.user_id,
                        attempt,
                        %reason,
                        "Fill application conflicted, refreshing snapshot"
                    );
                }
                Err(StoreError::Conflict(_)) => {
                    return Err(StakeError::RecordingContention {
                        fight_id: fight.id,
                        attempts: attempt,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Correlate a submitted exchange order with the fight. The stake
    /// validator later restricts pending notional to these ids.
    pub async fn record_order_placed(
        &self,
        fight_id: FightId,
        user_id: UserId,
        exchange_order_id: impl Into<String>,
    ) -> StakeResult<()> {
        self.store
            .append_order_action(FightOrderAction::new(fight_id, user_id, exchange_order_id))
            .await?;
        Ok(())
    }

    /// Replay the ledger and advance the stored high-water mark. The trade
    /// is already persisted at this point, so a failed advance is logged
    /// rather than surfaced; the next validation reconciles it.
    async fn advance_exposure_mark(&self, fight_id: FightId, user_id: UserId) {
        let exposure = match self.store.trades(fight_id).await {
            Ok(trades) => {
                let own: Vec<FightTrade> =
                    trades.into_iter().filter(|t| t.user_id == user_id).collect();
                ledger_exposure(&positions_from_trades(&own))
            }
            Err(err) => {
                warn!(%fight_id, %user_id, error = %err, "Could not replay ledger after fill");
                return;
            }
        };
        if let Err(err) = self.store.bump_max_exposure(fight_id, user_id, exposure).await {
            warn!(%fight_id, %user_id, error = %err, "Failed to advance exposure high-water mark");
        }
    }
}
