use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use url::Url;

use crate::models::{AddressResponse, BalanceEntry, TransactionPage, TransactionRecord};

/// Shared HTTP client with the configured per-request timeout. The explorer
/// and the price oracle reuse the same client so connections pool.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build reqwest client")
}

/// Parse a base URL, ensuring the path ends with a slash so `join` appends
/// endpoints instead of replacing the last path segment.
pub(crate) fn parse_base_url(raw: &str, what: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid {}", what))?;
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

/// REST client for a zkSync-Era-style block-explorer API.
#[derive(Clone)]
pub struct ExplorerClient {
    client: Client,
    base_url: Url,
    tx_page_limit: u32,
}

impl ExplorerClient {
    pub fn new(client: Client, base_url: &str, tx_page_limit: u32) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url, "EXPLORER_API_URL")?,
            tx_page_limit,
        })
    }

    /// Most recent transactions for one address, capped at the configured
    /// page limit. A single page only; downstream statistics reflect at
    /// most that many transactions.
    pub async fn transactions(&self, address: &str) -> Result<Vec<TransactionRecord>> {
        let url = self.base_url.join("transactions")?;
        let limit = self.tx_page_limit.to_string();
        let page: TransactionPage = self
            .client
            .get(url)
            .query(&[("address", address), ("limit", limit.as_str())])
            .send()
            .await
            .with_context(|| format!("transaction request for {} failed", address))?
            .error_for_status()
            .with_context(|| format!("transaction request for {} rejected", address))?
            .json()
            .await
            .with_context(|| format!("malformed transaction response for {}", address))?;
        Ok(page.items)
    }

    /// Token balances for one address, keyed by token contract address.
    pub async fn balances(&self, address: &str) -> Result<HashMap<String, BalanceEntry>> {
        let url = self.base_url.join(&format!("address/{}", address))?;
        let response: AddressResponse = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("balance request for {} failed", address))?
            .error_for_status()
            .with_context(|| format!("balance request for {} rejected", address))?
            .json()
            .await
            .with_context(|| format!("malformed balance response for {}", address))?;
        Ok(response.balances)
    }
}
