use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One named contract from the catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "contract")]
    pub address: String,
}

/// Ordered name/contract list used to classify transactions. Loaded once at
/// startup and shared read-only across workers; entry order drives report
/// column order. Addresses are lowercased at load so all matching against
/// explorer data is case-insensitive.
#[derive(Debug, Clone)]
pub struct ContractCatalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    contracts: Vec<CatalogEntry>,
}

impl ContractCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read contract catalog {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid contract catalog {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self::new(file.contracts))
    }

    pub fn new(mut entries: Vec<CatalogEntry>) -> Self {
        for entry in &mut entries {
            entry.address = entry.address.to_lowercase();
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
