//! Exposure calculation for Trade Fight Club.
//!
//! Pure position arithmetic: replaying the fight trade ledger into signed
//! per-symbol positions (with flip handling), filtering dust, deriving
//! notional exposure, and splitting raw fills between pre-fight and
//! fight-attributable portions.

pub mod book;
pub mod split;

pub use book::{
    fight_net_amount, ledger_exposure, open_positions, positions_from_trades, OpenPosition,
    PositionState, DUST_THRESHOLD,
};
pub use split::{fight_relevant_amount, fight_relevant_for_trade, FightSplit};
