use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::{BondPrice, PriceProvider};

// Market quote provider: POSTs a ticker and reads back its last price.
pub struct BondPriceProvider {
    base_url: String,
    market: String,
    asset_type: String,
    client: reqwest::Client,
}

impl BondPriceProvider {
    pub fn new(base_url: &str, market: &str, asset_type: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("expense-sync/1.0")
            .timeout(timeout)
            .build()?;
        Ok(BondPriceProvider {
            base_url: base_url.to_string(),
            market: market.to_string(),
            asset_type: asset_type.to_string(),
            client,
        })
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BondRequest<'a> {
    market: &'a str,
    ticker: &'a str,
    asset_type: &'a str,
}

// Informational fields in the response are ignored.
#[derive(Deserialize, Debug)]
struct BondResponse {
    value: f64,
}

#[async_trait]
impl PriceProvider for BondPriceProvider {
    #[instrument(
        name = "BondPriceFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_price(&self, ticker: &str) -> Result<BondPrice> {
        let payload = BondRequest {
            market: &self.market,
            ticker,
            asset_type: &self.asset_type,
        };
        debug!(?payload, "Requesting bond price from {}", self.base_url);

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {} price: {}", ticker, e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(anyhow!(
                "API returned non-200 status code for {}: {}",
                ticker,
                response.status()
            ));
        }

        let text = response.text().await?;
        let data: BondResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to decode {} response: {}", ticker, e))?;
        debug!(response = ?data, "Received bond price");

        Ok(BondPrice {
            ticker: ticker.to_string(),
            price: data.value,
        })
    }
}
