use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context, Result};
use ethers_core::types::U256;

use crate::catalog::ContractCatalog;
use crate::explorer::ExplorerClient;
use crate::models::{
    AddressStats, BalanceEntry, TokenHolding, TransactionRecord, TxStats, UsdValue,
    WHITELISTED_SYMBOLS,
};
use crate::price::PriceOracle;

const STATUS_FAILED: &str = "failed";
const WEI_PER_ETH: f64 = 1e18;

/// Fetches and reduces the statistics for single addresses. Cheap to clone;
/// workers share the underlying HTTP client and catalog.
#[derive(Clone)]
pub struct StatsFetcher {
    explorer: ExplorerClient,
    oracle: PriceOracle,
    catalog: Arc<ContractCatalog>,
}

impl StatsFetcher {
    pub fn new(
        explorer: ExplorerClient,
        oracle: PriceOracle,
        catalog: Arc<ContractCatalog>,
    ) -> Self {
        Self {
            explorer,
            oracle,
            catalog,
        }
    }

    /// One address, start to finish: transaction page, then balances, each
    /// folded into its half of the record. The fetches stay sequential; the
    /// quote endpoint in particular is rate-sensitive.
    pub async fn address_stats(&self, address: &str) -> Result<AddressStats> {
        let transactions = self.explorer.transactions(address).await?;
        let tx = reduce_transactions(address, &transactions, &self.catalog)?;
        let raw_balances = self.explorer.balances(address).await?;
        let balances = reduce_balances(&self.oracle, raw_balances).await?;
        Ok(AddressStats { tx, balances })
    }
}

/// Fold one fetched transaction page into counters. `total` is the page
/// length regardless of status; contract counters move only for non-failed
/// transactions; the bridge counter looks only at the L1-origin flag; the
/// running `interactions` aggregate moves with both. Fees accrue only for
/// transactions this address sent.
pub fn reduce_transactions(
    address: &str,
    transactions: &[TransactionRecord],
    catalog: &ContractCatalog,
) -> Result<TxStats> {
    let mut stats = TxStats::zeroed(catalog);
    stats.total = transactions.len() as u64;

    let address = address.to_lowercase();
    for tx in transactions {
        if tx.status != STATUS_FAILED {
            if let Some(to) = tx.to.as_deref().map(str::to_lowercase) {
                for (slot, entry) in stats.contracts.iter_mut().zip(catalog.entries()) {
                    if to == entry.address {
                        slot.count += 1;
                        stats.interactions += 1;
                    }
                }
            }
        }

        if tx.is_l1_originated {
            stats.era_bridge += 1;
            stats.interactions += 1;
        }

        if tx.from.to_lowercase() == address {
            stats.total_fee += decode_fee(&tx.fee)?;
        }
    }

    stats.total_fee = round6(stats.total_fee);
    Ok(stats)
}

/// Fold the raw balance map into priced holdings. Null-token entries and
/// dust that rounds to zero are dropped before any price lookup; only
/// whitelisted symbols are priced, one serial call per held token.
pub async fn reduce_balances(
    oracle: &PriceOracle,
    raw: HashMap<String, BalanceEntry>,
) -> Result<BTreeMap<String, TokenHolding>> {
    let mut holdings = BTreeMap::new();
    for entry in raw.into_values() {
        let Some(token) = entry.token else {
            continue;
        };

        let units = U256::from_dec_str(&entry.balance)
            .with_context(|| format!("invalid balance for token {}", token.symbol))?;
        let balance = round6(u256_to_f64_lossy(units) / 10f64.powi(token.decimals as i32));
        if balance == 0.0 {
            continue;
        }

        let usd_value = if WHITELISTED_SYMBOLS.contains(&token.symbol.as_str()) {
            let price = oracle.usd_price(&token.symbol).await?;
            UsdValue::Known(round2(balance * price))
        } else {
            UsdValue::Unknown
        };

        holdings.insert(token.symbol, TokenHolding { balance, usd_value });
    }
    Ok(holdings)
}

/// Hex wei string to ETH. The explorer emits "0x"-prefixed values.
fn decode_fee(fee: &str) -> Result<f64> {
    let digits = fee.strip_prefix("0x").unwrap_or(fee);
    let wei = U256::from_str_radix(digits, 16)
        .with_context(|| format!("invalid transaction fee {:?}", fee))?;
    Ok(u256_to_f64_lossy(wei) / WEI_PER_ETH)
}

/// Wire integers to f64: exact for anything that fits u128, magnitude
/// preserving above that.
pub(crate) fn u256_to_f64_lossy(value: U256) -> f64 {
    match u128::try_from(value) {
        Ok(v) => v as f64,
        Err(_) => value.to_string().parse().unwrap_or(f64::MAX),
    }
}

pub(crate) fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::models::TokenMeta;

    const ME: &str = "0x00000000000000000000000000000000000000AA";
    const OTHER: &str = "0x00000000000000000000000000000000000000bb";
    const ALPHA: &str = "0x0000000000000000000000000000000000000aa1";
    const BETA: &str = "0x0000000000000000000000000000000000000bb2";

    // 10^18 wei
    const ONE_ETH_HEX: &str = "0xde0b6b3a7640000";

    fn catalog(entries: &[(&str, &str)]) -> ContractCatalog {
        ContractCatalog::new(
            entries
                .iter()
                .map(|(name, address)| CatalogEntry {
                    name: name.to_string(),
                    address: address.to_string(),
                })
                .collect(),
        )
    }

    fn tx(to: &str, from: &str, status: &str, l1: bool, fee: &str) -> TransactionRecord {
        TransactionRecord {
            to: Some(to.to_string()),
            from: from.to_string(),
            status: status.to_string(),
            is_l1_originated: l1,
            fee: fee.to_string(),
        }
    }

    #[test]
    fn interactions_runs_alongside_contract_and_bridge_counts() {
        let catalog = catalog(&[("Alpha", ALPHA), ("Beta", BETA)]);
        let txs = vec![
            tx(ALPHA, OTHER, "included", false, "0x0"),
            tx(ALPHA, OTHER, "included", true, "0x0"),
            tx(BETA, OTHER, "verified", false, "0x0"),
            tx(OTHER, OTHER, "included", true, "0x0"),
        ];

        let stats = reduce_transactions(ME, &txs, &catalog).unwrap();
        assert_eq!(stats.contracts[0].count, 2);
        assert_eq!(stats.contracts[1].count, 1);
        assert_eq!(stats.era_bridge, 2);
        assert_eq!(stats.interactions, 5);
        assert_eq!(stats.total, 4);
    }

    #[test]
    fn total_reflects_the_page_even_when_every_call_failed() {
        let catalog = catalog(&[("Alpha", ALPHA)]);
        let txs = vec![
            tx(ALPHA, OTHER, "failed", false, "0x0"),
            tx(ALPHA, OTHER, "failed", false, "0x0"),
        ];

        let stats = reduce_transactions(ME, &txs, &catalog).unwrap();
        assert_eq!(stats.contracts[0].count, 0);
        assert_eq!(stats.interactions, 0);
        assert_eq!(stats.total, 2);
    }

    #[test]
    fn bridge_counts_even_when_the_call_failed() {
        let catalog = catalog(&[("Alpha", ALPHA)]);
        let txs = vec![tx(ALPHA, OTHER, "failed", true, "0x0")];

        let stats = reduce_transactions(ME, &txs, &catalog).unwrap();
        assert_eq!(stats.contracts[0].count, 0);
        assert_eq!(stats.era_bridge, 1);
        assert_eq!(stats.interactions, 1);
    }

    #[test]
    fn fee_accrues_only_for_sent_transactions() {
        let catalog = catalog(&[]);
        let txs = vec![
            tx(OTHER, ME, "included", false, ONE_ETH_HEX),
            tx(OTHER, OTHER, "included", false, ONE_ETH_HEX),
        ];

        let stats = reduce_transactions(ME, &txs, &catalog).unwrap();
        assert_eq!(stats.total_fee, 1.0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let catalog = catalog(&[("Alpha", "0x0000000000000000000000000000000000000AA1")]);
        let txs = vec![tx(
            "0x0000000000000000000000000000000000000Aa1",
            ME,
            "included",
            false,
            ONE_ETH_HEX,
        )];

        // Catalog holds upper-cased hex, the wire mixed case, the input
        // lower case; all three still line up.
        let stats = reduce_transactions(&ME.to_lowercase(), &txs, &catalog).unwrap();
        assert_eq!(stats.contracts[0].count, 1);
        assert_eq!(stats.total_fee, 1.0);
    }

    #[test]
    fn missing_destination_is_skipped() {
        let catalog = catalog(&[("Alpha", ALPHA)]);
        let txs = vec![TransactionRecord {
            to: None,
            from: OTHER.to_string(),
            status: "included".to_string(),
            is_l1_originated: true,
            fee: "0x0".to_string(),
        }];

        let stats = reduce_transactions(ME, &txs, &catalog).unwrap();
        assert_eq!(stats.contracts[0].count, 0);
        assert_eq!(stats.era_bridge, 1);
    }

    #[test]
    fn malformed_fee_is_an_error_only_when_it_is_read() {
        let catalog = catalog(&[]);
        let sent = vec![tx(OTHER, ME, "included", false, "0xnope")];
        assert!(reduce_transactions(ME, &sent, &catalog).is_err());

        // Fees of transactions this address did not send are never decoded.
        let received = vec![tx(OTHER, OTHER, "included", false, "0xnope")];
        assert!(reduce_transactions(ME, &received, &catalog).is_ok());
    }

    #[test]
    fn empty_page_keeps_the_full_schema() {
        let catalog = catalog(&[("Alpha", ALPHA), ("Beta", BETA)]);
        let stats = reduce_transactions(ME, &[], &catalog).unwrap();

        assert_eq!(stats.contracts.len(), 2);
        assert!(stats.contracts.iter().all(|c| c.count == 0));
        assert_eq!(stats.era_bridge, 0);
        assert_eq!(stats.interactions, 0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.total_fee, 0.0);
    }

    // Any actual request against this oracle fails, which is what the
    // filtering tests rely on.
    fn unroutable_oracle() -> PriceOracle {
        PriceOracle::new(reqwest::Client::new(), "http://127.0.0.1:9").unwrap()
    }

    fn entry(meta: Option<(&str, u32)>, balance: &str) -> BalanceEntry {
        BalanceEntry {
            token: meta.map(|(symbol, decimals)| TokenMeta {
                symbol: symbol.to_string(),
                decimals,
            }),
            balance: balance.to_string(),
        }
    }

    #[tokio::test]
    async fn non_whitelisted_symbols_are_never_priced() {
        let raw = HashMap::from([("0xdoge".to_string(), entry(Some(("DOGE", 18)), "5000000000000000000"))]);

        let holdings = reduce_balances(&unroutable_oracle(), raw).await.unwrap();
        let doge = &holdings["DOGE"];
        assert_eq!(doge.balance, 5.0);
        assert_eq!(doge.usd_value, UsdValue::Unknown);
    }

    #[tokio::test]
    async fn dust_is_filtered_before_any_price_lookup() {
        // 1 wei of ETH rounds to zero, so the whitelisted symbol must be
        // dropped before the oracle would be consulted.
        let raw = HashMap::from([("0xeth".to_string(), entry(Some(("ETH", 18)), "1"))]);

        let holdings = reduce_balances(&unroutable_oracle(), raw).await.unwrap();
        assert!(holdings.is_empty());
    }

    #[tokio::test]
    async fn null_token_entries_are_skipped() {
        let raw = HashMap::from([("0xmystery".to_string(), entry(None, "123456"))]);

        let holdings = reduce_balances(&unroutable_oracle(), raw).await.unwrap();
        assert!(holdings.is_empty());
    }

    #[tokio::test]
    async fn invalid_balance_string_is_an_error() {
        let raw = HashMap::from([("0xdoge".to_string(), entry(Some(("DOGE", 18)), "0xff"))]);

        assert!(reduce_balances(&unroutable_oracle(), raw).await.is_err());
    }

    #[test]
    fn wire_integers_above_u128_keep_their_magnitude() {
        let exact = u256_to_f64_lossy(U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(exact, 1.5e18);

        let huge = U256::from(u128::MAX) * U256::from(1000u64);
        let approx = u256_to_f64_lossy(huge);
        assert!(approx > 3.0e41 && approx < 3.5e41);
    }

    #[test]
    fn rounding_helpers_clip_to_their_precision() {
        assert_eq!(round6(0.1234567), 0.123457);
        assert_eq!(round6(1.0000004), 1.0);
        assert_eq!(round2(1650.456), 1650.46);
        assert_eq!(round2(0.004), 0.0);
    }
}
