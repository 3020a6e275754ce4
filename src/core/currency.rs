//! Currency conversion between the local and reference currencies

use crate::core::error::{ErrorCode, IngestError};
use crate::core::rate::RateCache;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// The two supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Argentine peso.
    Local,
    /// US dollar.
    Reference,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Local => "ARS",
            Currency::Reference => "USD",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ars" | "local" => Ok(Currency::Local),
            "usd" | "reference" => Ok(Currency::Reference),
            _ => Err(IngestError::MalformedInput {
                field: "currency",
                code: ErrorCode::InvalidCurrency,
                message: format!("unsupported currency: {s} (supported: ARS, USD)"),
            }),
        }
    }
}

/// An amount expressed in both currencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvertedAmount {
    pub local: f64,
    pub reference: f64,
}

impl ConvertedAmount {
    pub fn from_rate(amount: f64, currency: Currency, rate: f64) -> Self {
        match currency {
            Currency::Local => ConvertedAmount {
                local: amount,
                reference: amount / rate,
            },
            Currency::Reference => ConvertedAmount {
                local: amount * rate,
                reference: amount,
            },
        }
    }
}

/// Converts submitted amounts using the freshest rate the cache allows.
#[derive(Clone)]
pub struct CurrencyConverter {
    rates: Arc<RateCache>,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<RateCache>) -> Self {
        Self { rates }
    }

    pub async fn convert(&self, amount: f64, currency_code: &str) -> Result<ConvertedAmount, IngestError> {
        let currency = currency_code.parse::<Currency>()?;
        self.convert_currency(amount, currency).await
    }

    pub async fn convert_currency(
        &self,
        amount: f64,
        currency: Currency,
    ) -> Result<ConvertedAmount, IngestError> {
        let rate = self
            .rates
            .get_rate()
            .await
            .map_err(IngestError::RateUnavailable)?;
        Ok(ConvertedAmount::from_rate(amount, currency, rate))
    }
}
