//! Virtual equity and score calculation.
//!
//! Scores are virtual: the stake is never custodied, so equity is
//! reconstructed from the stake plus the fight's PnL components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};

/// Inputs to the score calculation, all in USDC.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreInput {
    pub stake: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub fees: Decimal,
    pub funding: Decimal,
}

/// Computed score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// stake + realized + unrealized - fees - funding.
    pub equity_virtual: Decimal,
    /// equity / stake - 1.
    pub pnl_percent: Decimal,
    /// stake * pnl_percent.
    pub score_usdc: Decimal,
}

/// Compute the score breakdown.
///
/// Fails on non-positive stake and on decimal overflow; checked arithmetic
/// stands in for the NaN/Infinity guards a float implementation would need.
pub fn calculate_score(input: &ScoreInput) -> ScoringResult<ScoreBreakdown> {
    if input.stake <= Decimal::ZERO {
        return Err(ScoringError::NonPositiveStake(input.stake));
    }

    let equity_virtual = input
        .stake
        .checked_add(input.realized_pnl)
        .and_then(|v| v.checked_add(input.unrealized_pnl))
        .and_then(|v| v.checked_sub(input.fees))
        .and_then(|v| v.checked_sub(input.funding))
        .ok_or(ScoringError::NumericOverflow("equity_virtual"))?;

    let pnl_percent = equity_virtual
        .checked_div(input.stake)
        .and_then(|v| v.checked_sub(Decimal::ONE))
        .ok_or(ScoringError::NumericOverflow("pnl_percent"))?;

    let score_usdc = input
        .stake
        .checked_mul(pnl_percent)
        .ok_or(ScoringError::NumericOverflow("score_usdc"))?;

    Ok(ScoreBreakdown {
        equity_virtual,
        pnl_percent,
        score_usdc,
    })
}
