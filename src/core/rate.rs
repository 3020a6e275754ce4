//! Cached local/reference exchange rate derived from two bond quotes.
//!
//! The rate is the ratio between the price of a bond quoted in local currency
//! and the price of the same bond quoted in the reference currency. Readers
//! share a read lock while the cached value is fresh; a stale read upgrades to
//! the write lock and re-checks freshness before refreshing, so a burst of
//! stale readers results in a single upstream round-trip.

use crate::core::price::{BondPrice, PriceProvider};
use anyhow::{Context, Result, bail};
use futures::future::try_join;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Instruments and freshness window used to derive the rate.
#[derive(Debug, Clone)]
pub struct RateSettings {
    /// Ticker quoted in local currency (numerator).
    pub local_ticker: String,
    /// Ticker quoted in the reference currency (denominator).
    pub reference_ticker: String,
    pub ttl: Duration,
}

/// Local currency units per reference currency unit, plus when it was captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRate {
    pub rate: f64,
    pub captured_at: Instant,
}

impl ExchangeRate {
    // A zero rate means it was never fetched.
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.rate != 0.0 && self.captured_at.elapsed() <= ttl
    }
}

pub struct RateCache {
    provider: Arc<dyn PriceProvider>,
    settings: RateSettings,
    state: RwLock<Option<ExchangeRate>>,
}

impl RateCache {
    /// Creates an empty cache. The first `get_rate` call fetches upstream.
    pub fn new(provider: Arc<dyn PriceProvider>, settings: RateSettings) -> Self {
        Self {
            provider,
            settings,
            state: RwLock::new(None),
        }
    }

    /// Creates the cache and performs the first fetch, failing if it errors.
    pub async fn connect(provider: Arc<dyn PriceProvider>, settings: RateSettings) -> Result<Self> {
        let cache = Self::new(provider, settings);
        cache
            .refresh()
            .await
            .context("Failed to fetch initial exchange rate")?;
        Ok(cache)
    }

    pub fn ttl(&self) -> Duration {
        self.settings.ttl
    }

    /// Returns the cached rate, refreshing it first when it is older than the TTL.
    pub async fn get_rate(&self) -> Result<f64> {
        {
            let state = self.state.read().await;
            if let Some(current) = state.as_ref().filter(|r| r.is_fresh(self.settings.ttl)) {
                debug!(rate = current.rate, "Exchange rate cache HIT");
                return Ok(current.rate);
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have refreshed while we waited for the write lock.
        if let Some(current) = state.as_ref().filter(|r| r.is_fresh(self.settings.ttl)) {
            debug!(rate = current.rate, "Exchange rate refreshed by a concurrent caller");
            return Ok(current.rate);
        }

        debug!("Exchange rate cache MISS");
        let updated = self.fetch_rate().await?;
        *state = Some(updated);
        Ok(updated.rate)
    }

    /// Unconditionally fetches a new rate. On failure the previous value is kept.
    pub async fn refresh(&self) -> Result<f64> {
        let mut state = self.state.write().await;
        let updated = self.fetch_rate().await?;
        *state = Some(updated);
        Ok(updated.rate)
    }

    /// Last known rate without triggering a refresh.
    pub async fn cached(&self) -> Option<ExchangeRate> {
        *self.state.read().await
    }

    async fn fetch_rate(&self) -> Result<ExchangeRate> {
        let (local, reference) = try_join(
            self.provider.fetch_price(&self.settings.local_ticker),
            self.provider.fetch_price(&self.settings.reference_ticker),
        )
        .await
        .context("Failed to fetch exchange rate")?;

        let rate = derive_rate(&local, &reference)?;
        info!(
            rate,
            local = %local.ticker,
            reference = %reference.ticker,
            "Exchange rate updated"
        );
        Ok(ExchangeRate {
            rate,
            captured_at: Instant::now(),
        })
    }
}

/// Ratio of the local-quoted price to the reference-quoted price, rounded to
/// two decimals (half away from zero).
pub fn derive_rate(local: &BondPrice, reference: &BondPrice) -> Result<f64> {
    if reference.price == 0.0 {
        bail!("{} price cannot be zero", reference.ticker);
    }
    let rate = ((local.price / reference.price) * 100.0).round() / 100.0;
    if rate == 0.0 {
        bail!(
            "Derived exchange rate is zero ({} = {}, {} = {})",
            local.ticker,
            local.price,
            reference.ticker,
            reference.price
        );
    }
    Ok(rate)
}
