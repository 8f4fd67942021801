use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::explorer::parse_base_url;

/// Quote client for a CryptoCompare-style price endpoint. Stateless; every
/// call is a fresh remote query, so callers keep lookups serial per worker.
#[derive(Clone)]
pub struct PriceOracle {
    client: Client,
    base_url: Url,
}

impl PriceOracle {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url, "PRICE_API_URL")?,
        })
    }

    /// Current USD price for a symbol. A response without a numeric "USD"
    /// field quotes as 0.0; that is data, not an error.
    pub async fn usd_price(&self, symbol: &str) -> Result<f64> {
        let url = self.base_url.join("data/price")?;
        let body: Value = self
            .client
            .get(url)
            .query(&[("fsym", symbol), ("tsyms", "USD")])
            .send()
            .await
            .with_context(|| format!("price request for {} failed", symbol))?
            .error_for_status()
            .with_context(|| format!("price request for {} rejected", symbol))?
            .json()
            .await
            .with_context(|| format!("malformed price response for {}", symbol))?;
        Ok(body.get("USD").and_then(Value::as_f64).unwrap_or(0.0))
    }
}
