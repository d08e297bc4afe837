//! Winner determination with epsilon-tolerant draw detection.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tfc_core::UserId;

/// Score differences below this are a draw. Protects near-tied scores from
/// producing spurious winners out of rounding noise.
pub const SCORE_EPSILON: Decimal = dec!(0.000001);

/// Outcome of score comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerOutcome {
    pub winner: Option<UserId>,
    pub is_draw: bool,
}

impl WinnerOutcome {
    pub fn draw() -> Self {
        Self {
            winner: None,
            is_draw: true,
        }
    }

    pub fn won_by(user: UserId) -> Self {
        Self {
            winner: Some(user),
            is_draw: false,
        }
    }
}

/// Determine the winner from two USDC scores.
pub fn determine_winner(
    id_a: UserId,
    score_a: Decimal,
    id_b: UserId,
    score_b: Decimal,
) -> WinnerOutcome {
    let diff = (score_a - score_b).abs();
    if diff < SCORE_EPSILON {
        debug!(%id_a, %score_a, %id_b, %score_b, "Scores within epsilon, draw");
        return WinnerOutcome::draw();
    }
    if score_a > score_b {
        WinnerOutcome::won_by(id_a)
    } else {
        WinnerOutcome::won_by(id_b)
    }
}
