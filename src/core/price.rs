//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A quote for one instrument, consumed immediately to derive an exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondPrice {
    pub ticker: String,
    pub price: f64,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, ticker: &str) -> Result<BondPrice>;
}
