//! Scoring engine for Trade Fight Club.
//!
//! Pure calculation: virtual equity, PnL percent, and USDC score from a
//! participant's fight results, plus epsilon-tolerant winner determination.

pub mod error;
pub mod score;
pub mod winner;

pub use error::{ScoringError, ScoringResult};
pub use score::{calculate_score, ScoreBreakdown, ScoreInput};
pub use winner::{determine_winner, WinnerOutcome, SCORE_EPSILON};
