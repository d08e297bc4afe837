//! Pre-fight vs. fight-attributable allocation of raw fills.
//!
//! A user may enter a fight already holding positions. Closing those
//! pre-fight positions must neither consume stake nor produce a FightTrade.
//! Allocation order for a SELL: (1) consume remaining pre-fight long (not
//! recorded), (2) close any fight-opened long (recorded), (3) remainder
//! opens a new short (recorded). Symmetric for a BUY against a short.
//!
//! The "remaining pre-fight" figure is explicit persisted state on the
//! participant (the stored initial-positions snapshot), decremented
//! transactionally with each recording decision.

use rust_decimal::Decimal;
use tracing::debug;

use tfc_core::{FightParticipant, Side, Symbol};

/// How a raw fill divides between the user's outside book and the fight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FightSplit {
    /// Portion recorded as a FightTrade (closing fight positions and/or
    /// opening new ones).
    pub attributable: Decimal,
    /// Portion that closed remaining pre-fight position; never recorded.
    /// Always non-negative, expressed as a quantity.
    pub prefight_consumed: Decimal,
}

impl FightSplit {
    /// True when nothing is recordable and the caller must skip persisting
    /// a FightTrade.
    pub fn is_prefight_only(&self) -> bool {
        self.attributable.is_zero()
    }
}

/// Split a raw fill quantity against the remaining signed pre-fight amount
/// for its symbol.
///
/// A SELL consumes pre-fight long; a BUY consumes pre-fight short. A fill in
/// the same direction as the pre-fight position consumes nothing and is
/// fully attributable.
pub fn fight_relevant_amount(
    side: Side,
    trade_amount: Decimal,
    prefight_remaining: Decimal,
) -> FightSplit {
    let closable = match side {
        Side::Sell => prefight_remaining.max(Decimal::ZERO),
        Side::Buy => (-prefight_remaining).max(Decimal::ZERO),
    };
    let prefight_consumed = trade_amount.min(closable);
    FightSplit {
        attributable: trade_amount - prefight_consumed,
        prefight_consumed,
    }
}

/// Split a raw fill using the participant's stored snapshot for the symbol.
pub fn fight_relevant_for_trade(
    side: Side,
    trade_amount: Decimal,
    symbol: &Symbol,
    participant: &FightParticipant,
) -> FightSplit {
    let remaining = participant.remaining_prefight(symbol);
    let split = fight_relevant_amount(side, trade_amount, remaining);
    if !split.prefight_consumed.is_zero() {
        debug!(
            user = %participant.user_id,
            %symbol,
            %side,
            amount = %trade_amount,
            prefight_remaining = %remaining,
            consumed = %split.prefight_consumed,
            attributable = %split.attributable,
            "Fill partially closes pre-fight position"
        );
    }
    split
}
