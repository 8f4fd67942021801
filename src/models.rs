use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize, Serializer};

use crate::catalog::ContractCatalog;

/// Token symbols that get a USD valuation. Everything else renders as the
/// unknown marker so the quote endpoint is not queried per exotic token.
pub const WHITELISTED_SYMBOLS: [&str; 3] = ["ETH", "USDC", "USDT"];

/// Placeholder shown for balances whose USD value is not computed.
pub const UNKNOWN_VALUE_MARKER: &str = "* * *";

/// One transaction as returned by the explorer. Only the fields the
/// reduction reads are kept; serde ignores the rest of the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub to: Option<String>,
    pub from: String,
    pub status: String,
    #[serde(rename = "isL1Originated")]
    pub is_l1_originated: bool,
    /// Hex-encoded fee in wei, e.g. "0xde0b6b3a7640000".
    pub fee: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<TransactionRecord>,
}

/// Token metadata attached to a balance entry. `null` on the wire means the
/// explorer has no metadata for the token and the entry is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMeta {
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub token: Option<TokenMeta>,
    /// Decimal integer string in the token's smallest unit.
    pub balance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResponse {
    pub balances: HashMap<String, BalanceEntry>,
}

/// Per-contract interaction counter, kept in catalog order so report
/// columns line up with the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractCount {
    pub name: String,
    pub count: u64,
}

/// Transaction-side reduction result. Every counter exists from the start;
/// the reduction only increments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxStats {
    pub contracts: Vec<ContractCount>,
    /// Transactions bridged in from L1.
    pub era_bridge: u64,
    /// Running aggregate, bumped together with every contract and bridge
    /// increment rather than derived afterwards.
    pub interactions: u64,
    /// Length of the fetched page, independent of any filtering.
    pub total: u64,
    /// Fees paid by this address, in ETH, rounded to 6 places.
    pub total_fee: f64,
}

impl TxStats {
    /// All counters zero, one slot per catalog entry in catalog order.
    pub fn zeroed(catalog: &ContractCatalog) -> Self {
        Self {
            contracts: catalog
                .entries()
                .iter()
                .map(|entry| ContractCount {
                    name: entry.name.clone(),
                    count: 0,
                })
                .collect(),
            era_bridge: 0,
            interactions: 0,
            total: 0,
            total_fee: 0.0,
        }
    }
}

/// USD valuation of one holding. Only whitelisted symbols are priced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsdValue {
    Known(f64),
    Unknown,
}

impl Serialize for UsdValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            UsdValue::Known(value) => serializer.serialize_f64(*value),
            UsdValue::Unknown => serializer.serialize_str(UNKNOWN_VALUE_MARKER),
        }
    }
}

/// One held token: human-unit balance plus its USD valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenHolding {
    pub balance: f64,
    pub usd_value: UsdValue,
}

/// Complete per-address record: transaction stats plus token holdings,
/// keyed by symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressStats {
    pub tx: TxStats,
    pub balances: BTreeMap<String, TokenHolding>,
}

/// What the batch records for one address: its stats, or the error that
/// made it fail when the run is not fail-fast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AddressOutcome {
    Stats(AddressStats),
    Failed { error: String },
}

/// Union of all per-worker result maps, keyed by input address.
pub type MergedResult = HashMap<String, AddressOutcome>;
