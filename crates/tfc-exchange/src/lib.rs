//! Exchange adapter for Trade Fight Club.
//!
//! Read-only venue queries used by stake validation and settlement:
//! mark price by symbol, open positions and open orders by account.

pub mod client;
pub mod data;
pub mod error;

pub use client::{ExchangeClient, RestExchangeClient};
pub use data::{AccountPosition, OpenOrder, RawOpenOrderEntry, RawPositionEntry};
pub use error::{ExchangeError, ExchangeResult};
