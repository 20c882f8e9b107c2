//! JSON schema types for the catalog document and resolution results.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tracked item, keyed by `id` in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Mirrors the map key; repaired from the key on load.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Only ever set from the local inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<u64>,
    /// Only ever set from oracle resolution; `None` when the last resolution failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<u64>,
    /// Epoch seconds associated with `latest_version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_observed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingSummary>,
}

impl CatalogEntry {
    /// Build a fresh entry from a local observation.
    pub fn new(id: &str, name: &str, installed_version: Option<u64>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            installed_version,
            ..Self::default()
        }
    }
}

/// Review metadata from the auxiliary rating source.
///
/// Every field is independently optional; a failed fetch yields the default
/// (all `None`) value rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
}

impl RatingSummary {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Per-item result of remote resolution.
///
/// The default value is the "could not resolve" result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub version: Option<u64>,
    /// Timestamp reported by the oracle itself, epoch seconds.
    pub observed_at: Option<i64>,
    pub external_ref: Option<String>,
    pub rating: Option<RatingSummary>,
}

/// Mapping from id to entry, persisted as one JSON object keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub(super) fn get_mut(&mut self, id: &str) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(id)
    }

    pub(super) fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Iterate entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Repair entries whose stored `id` field disagrees with their map key.
    pub(super) fn normalize_ids(&mut self) {
        for (key, entry) in self.entries.iter_mut() {
            if entry.id != *key {
                entry.id = key.clone();
            }
        }
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}
