//! Stake limit enforcement and fight trade recording.
//!
//! Sits between the upstream order router / fill stream and the fight
//! store. [`StakeValidator`] answers "does this order fit the fighter's
//! stake" before submission; [`TradeRecorder`] turns confirmed fills into
//! fight trades afterwards, splitting off the pre-fight portion and
//! advancing the exposure high-water mark.

pub mod error;
pub mod recorder;
pub mod validator;

pub use error::{StakeError, StakeLimitDetail, StakeResult};
pub use recorder::{RawFill, TradeRecorder};
pub use validator::{available_capital, OrderClearance, OrderIntent, StakeValidator};
