//! Exchange client trait and REST implementation.
//!
//! The settlement core only reads from the venue: mark prices, open
//! positions, open orders. Order placement and fills belong to the upstream
//! router and are out of scope here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tfc_core::{AccountId, Price, Symbol};

use crate::data::{AccountPosition, OpenOrder, RawOpenOrderEntry, RawPositionEntry};
use crate::error::{ExchangeError, ExchangeResult};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only view of the venue, as needed by stake validation and
/// settlement.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Current mark price for a symbol.
    async fn mark_price(&self, symbol: &Symbol) -> ExchangeResult<Price>;

    /// Open positions for an account.
    async fn open_positions(&self, account: &AccountId) -> ExchangeResult<Vec<AccountPosition>>;

    /// Still-open orders for an account.
    async fn open_orders(&self, account: &AccountId) -> ExchangeResult<Vec<OpenOrder>>;
}

/// Request type for the info endpoint with a symbol parameter.
#[derive(Debug, Serialize)]
struct InfoRequestWithSymbol {
    #[serde(rename = "type")]
    request_type: String,
    symbol: String,
}

/// Request type for the info endpoint with an account parameter.
#[derive(Debug, Serialize)]
struct InfoRequestWithAccount {
    #[serde(rename = "type")]
    request_type: String,
    account: String,
}

/// Mark price response.
#[derive(Debug, Deserialize)]
struct MarkPriceResponse {
    #[serde(rename = "markPx")]
    mark_px: String,
}

/// REST implementation over the venue's info endpoint.
pub struct RestExchangeClient {
    client: Client,
    info_url: String,
}

impl RestExchangeClient {
    /// Create a new client for an info endpoint URL.
    pub fn new(info_url: impl Into<String>) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            info_url: info_url.into(),
        })
    }

    async fn post_info<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        request: &Req,
    ) -> ExchangeResult<Resp> {
        let response = self
            .client
            .post(&self.info_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ExchangeError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::HttpClient(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl ExchangeClient for RestExchangeClient {
    async fn mark_price(&self, symbol: &Symbol) -> ExchangeResult<Price> {
        debug!(url = %self.info_url, %symbol, "Fetching mark price");
        let request = InfoRequestWithSymbol {
            request_type: "markPrice".to_string(),
            symbol: symbol.as_str().to_string(),
        };
        let response: MarkPriceResponse = self.post_info(&request).await?;
        Ok(Price::new(response.mark_px.parse()?))
    }

    async fn open_positions(&self, account: &AccountId) -> ExchangeResult<Vec<AccountPosition>> {
        debug!(url = %self.info_url, %account, "Fetching open positions");
        let request = InfoRequestWithAccount {
            request_type: "openPositions".to_string(),
            account: account.as_str().to_string(),
        };
        let raw: Vec<RawPositionEntry> = self.post_info(&request).await?;
        raw.iter().map(|entry| entry.parse()).collect()
    }

    async fn open_orders(&self, account: &AccountId) -> ExchangeResult<Vec<OpenOrder>> {
        debug!(url = %self.info_url, %account, "Fetching open orders");
        let request = InfoRequestWithAccount {
            request_type: "openOrders".to_string(),
            account: account.as_str().to_string(),
        };
        let raw: Vec<RawOpenOrderEntry> = self.post_info(&request).await?;
        raw.iter().map(|entry| entry.parse()).collect()
    }
}
