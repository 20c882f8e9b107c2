//! Local inventory sources.
//!
//! An inventory source yields the builds observed locally. Naming conventions
//! of the archive directory are handled by whatever produces the inventory
//! file; this crate consumes the resulting records.
use crate::catalog::Catalog;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One locally observed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub installed_version: Option<u64>,
}

impl InventoryRecord {
    pub fn new(id: &str, name: &str, installed_version: Option<u64>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            installed_version,
        }
    }
}

/// Produces candidate records for one run. Sources are consumed by `scan`.
pub trait InventorySource {
    fn scan(self) -> Result<Vec<InventoryRecord>>;
}

/// Inventory read from a JSON array of records.
#[derive(Debug, Clone)]
pub struct InventoryFile {
    path: PathBuf,
}

impl InventoryFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl InventorySource for InventoryFile {
    fn scan(self) -> Result<Vec<InventoryRecord>> {
        let bytes =
            fs::read(&self.path).with_context(|| format!("read inventory {}", self.path.display()))?;
        let records: Vec<InventoryRecord> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse inventory JSON {}", self.path.display()))?;
        validate_records(&records)?;
        tracing::info!(
            path = %self.path.display(),
            records = records.len(),
            "inventory scanned"
        );
        Ok(records)
    }
}

/// Every id already in the catalog, for unattended checks.
#[derive(Debug)]
pub struct CatalogInventory<'a> {
    catalog: &'a Catalog,
}

impl<'a> CatalogInventory<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }
}

impl InventorySource for CatalogInventory<'_> {
    fn scan(self) -> Result<Vec<InventoryRecord>> {
        Ok(self
            .catalog
            .entries()
            .map(|entry| InventoryRecord::new(&entry.id, &entry.name, entry.installed_version))
            .collect())
    }
}

fn validate_records(records: &[InventoryRecord]) -> Result<()> {
    for record in records {
        if record.id.trim().is_empty() {
            return Err(anyhow!("inventory record {:?} has an empty id", record.name));
        }
        if record.id.trim() != record.id {
            return Err(anyhow!(
                "inventory record id {:?} has surrounding whitespace",
                record.id
            ));
        }
    }
    let unique = records
        .iter()
        .map(|record| record.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    if unique != records.len() {
        tracing::debug!(
            records = records.len(),
            unique,
            "inventory repeats ids; last observation wins"
        );
    }
    Ok(())
}
