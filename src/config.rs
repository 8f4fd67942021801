use std::env;
use std::path::PathBuf;

pub const DEFAULT_EXPLORER_API_URL: &str = "https://block-explorer-api.mainnet.zksync.io";
pub const DEFAULT_PRICE_API_URL: &str = "https://min-api.cryptocompare.com";

/// Single explorer page per address; stats reflect at most this many of
/// the most recent transactions. Raising it past the explorer's own page
/// cap does not paginate.
pub const DEFAULT_TX_PAGE_LIMIT: u32 = 100;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration. Everything has a default so the binary works out
/// of the box against zkSync Era mainnet; the URLs themselves are validated
/// by the client constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub explorer_api_url: String,
    pub price_api_url: String,
    pub contracts_path: PathBuf,
    pub request_timeout_secs: u64,
    pub tx_page_limit: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid {0} env var: expected a positive integer")]
    InvalidPositiveInt(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let explorer_api_url =
            env::var("EXPLORER_API_URL").unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string());
        let price_api_url =
            env::var("PRICE_API_URL").unwrap_or_else(|_| DEFAULT_PRICE_API_URL.to_string());
        let contracts_path = env::var("CONTRACTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("contracts.json"));

        let request_timeout_secs = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(ConfigError::InvalidPositiveInt("REQUEST_TIMEOUT_SECS"))?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        let tx_page_limit = match env::var("EXPLORER_TX_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(ConfigError::InvalidPositiveInt("EXPLORER_TX_LIMIT"))?,
            Err(_) => DEFAULT_TX_PAGE_LIMIT,
        };

        Ok(Self {
            explorer_api_url,
            price_api_url,
            contracts_path,
            request_timeout_secs,
            tx_page_limit,
        })
    }
}
