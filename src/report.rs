use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::catalog::ContractCatalog;
use crate::models::{
    AddressOutcome, MergedResult, TokenHolding, UsdValue, UNKNOWN_VALUE_MARKER,
    WHITELISTED_SYMBOLS,
};
use crate::stats::round2;

/// Uniform row-oriented table, the shape both sinks consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Lay the merged mapping out as one row per input address, in input order.
/// Balance columns are the whitelist, interaction columns follow the
/// catalog. The ETH balance and fee columns are valued with the single
/// report-time ETH quote so they stay mutually comparable across rows.
pub fn build_table(
    addresses: &[String],
    results: &MergedResult,
    catalog: &ContractCatalog,
    eth_price: f64,
) -> ReportTable {
    let mut header = vec!["Address".to_string()];
    header.extend(WHITELISTED_SYMBOLS.iter().map(|s| s.to_string()));
    header.push("Interactions".to_string());
    header.extend(catalog.entries().iter().map(|e| e.name.clone()));
    header.push("Era Bridge".to_string());
    header.push("Total txs".to_string());
    header.push("Total fee (ETH)".to_string());

    let width = header.len();
    let mut rows = Vec::with_capacity(addresses.len());
    for address in addresses {
        let mut row = vec![address.clone()];
        match results.get(address) {
            Some(AddressOutcome::Stats(stats)) => {
                for symbol in WHITELISTED_SYMBOLS {
                    let cell = if symbol == "ETH" {
                        eth_cell(stats.balances.get(symbol), eth_price)
                    } else {
                        holding_cell(stats.balances.get(symbol))
                    };
                    row.push(cell);
                }
                row.push(stats.tx.interactions.to_string());
                for contract in &stats.tx.contracts {
                    row.push(contract.count.to_string());
                }
                row.push(stats.tx.era_bridge.to_string());
                row.push(stats.tx.total.to_string());
                row.push(fee_cell(stats.tx.total_fee, eth_price));
            }
            Some(AddressOutcome::Failed { error }) => {
                row.push(format!("failed: {}", error));
            }
            None => {
                row.push("failed: no result recorded".to_string());
            }
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    ReportTable { header, rows }
}

/// ETH is valued with the shared report-time quote, not a per-row lookup.
fn eth_cell(holding: Option<&TokenHolding>, eth_price: f64) -> String {
    match holding {
        Some(h) => format!("{} (${})", h.balance, round2(h.balance * eth_price)),
        None => String::new(),
    }
}

fn holding_cell(holding: Option<&TokenHolding>) -> String {
    match holding {
        Some(TokenHolding {
            balance,
            usd_value: UsdValue::Known(usd),
        }) => format!("{} (${})", balance, usd),
        Some(TokenHolding {
            balance,
            usd_value: UsdValue::Unknown,
        }) => format!("{} ({})", balance, UNKNOWN_VALUE_MARKER),
        None => String::new(),
    }
}

fn fee_cell(total_fee: f64, eth_price: f64) -> String {
    format!("{} (${})", total_fee, round2(total_fee * eth_price))
}

/// Minimal CSV sink: quotes any field containing a comma, quote or line
/// break, doubling embedded quotes. Opens in every spreadsheet app.
pub fn write_csv(table: &ReportTable, path: &Path) -> Result<()> {
    let mut out = String::new();
    push_csv_row(&mut out, &table.header);
    for row in &table.rows {
        push_csv_row(&mut out, row);
    }
    fs::write(path, out).with_context(|| format!("failed to write report {}", path.display()))
}

fn push_csv_row(out: &mut String, row: &[String]) {
    for (index, field) in row.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(field));
    }
    out.push('\n');
}

fn csv_field(field: &str) -> String {
    if field.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[derive(Serialize)]
struct AddressReportRow<'a> {
    address: &'a str,
    #[serde(flatten)]
    outcome: &'a AddressOutcome,
}

/// JSON sink: one object per input address, in input order.
pub fn write_json(addresses: &[String], results: &MergedResult, path: &Path) -> Result<()> {
    let rows: Vec<AddressReportRow> = addresses
        .iter()
        .filter_map(|address| {
            results
                .get(address)
                .map(|outcome| AddressReportRow { address, outcome })
        })
        .collect();
    let body = serde_json::to_string_pretty(&rows).context("failed to encode report as JSON")?;
    fs::write(path, body).with_context(|| format!("failed to write report {}", path.display()))
}
