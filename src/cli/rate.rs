use super::ui;
use crate::core::RateCache;
use crate::core::currency::Currency;
use anyhow::Result;

/// Prints the current exchange rate, refreshing it if stale.
pub async fn run(rates: &RateCache) -> Result<f64> {
    let rate = rates.get_rate().await?;
    println!(
        "{}/{}: {}",
        Currency::Reference,
        Currency::Local,
        ui::style_text(&format!("{rate:.2}"), ui::StyleType::Success)
    );
    println!(
        "{}",
        ui::style_text(
            &format!("cached for {} minutes", rates.ttl().as_secs() / 60),
            ui::StyleType::Subtle
        )
    );
    Ok(rate)
}
