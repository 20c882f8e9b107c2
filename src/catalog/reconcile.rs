//! Merge passes that fold local inventory and remote resolution into the catalog.
//!
//! Both passes mutate entries in place and never remove one. Field ownership is
//! strict: installed versions come only from inventory, latest versions and
//! their timestamps come only from resolution.
use super::{Catalog, CatalogEntry, Resolved};
use crate::inventory::InventoryRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which inventory records are handed to the resolver after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Re-resolve every observed record.
    #[default]
    All,
    /// Only records that are new to the catalog or whose installed version moved.
    Changed,
}

/// How an optional remote-side field reacts to a resolution without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Keep the stored value unless a new one arrives.
    Sticky,
    /// Replace the stored value every run, including with `None`.
    Overwrite,
}

pub const EXTERNAL_REF_POLICY: FieldPolicy = FieldPolicy::Sticky;
pub const RATING_POLICY: FieldPolicy = FieldPolicy::Overwrite;

/// Fold local observations into the catalog.
///
/// Existing entries get `name` and `installed_version` overwritten; nothing
/// else is touched. Unknown ids are inserted as new entries. Returns the
/// records to resolve, one per id, in first-observed order.
pub fn merge_inventory(
    catalog: &mut Catalog,
    inventory: &[InventoryRecord],
    policy: ResolvePolicy,
) -> Vec<InventoryRecord> {
    let mut candidates: Vec<InventoryRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut changed: HashMap<String, bool> = HashMap::new();

    for record in inventory {
        let moved = match catalog.get_mut(&record.id) {
            Some(entry) => {
                let moved = entry.installed_version != record.installed_version;
                entry.name = record.name.clone();
                entry.installed_version = record.installed_version;
                moved
            }
            None => {
                catalog.insert(CatalogEntry::new(
                    &record.id,
                    &record.name,
                    record.installed_version,
                ));
                true
            }
        };
        *changed.entry(record.id.clone()).or_insert(false) |= moved;

        match positions.get(&record.id) {
            Some(&index) => candidates[index] = record.clone(),
            None => {
                positions.insert(record.id.clone(), candidates.len());
                candidates.push(record.clone());
            }
        }
    }

    match policy {
        ResolvePolicy::All => candidates,
        ResolvePolicy::Changed => candidates
            .into_iter()
            .filter(|record| changed.get(&record.id).copied().unwrap_or(false))
            .collect(),
    }
}

/// Fold one resolution result into its catalog entry.
///
/// An oracle-supplied timestamp always wins. Without one, the timestamp moves
/// to `now` only when the version changed or no timestamp was ever recorded,
/// so an unchanged build keeps its original date across runs.
///
/// Returns `false` when `id` is not in the catalog.
pub fn apply_resolution(catalog: &mut Catalog, id: &str, resolved: Resolved, now: i64) -> bool {
    let Some(entry) = catalog.get_mut(id) else {
        tracing::warn!(id, "resolution for unknown catalog id ignored");
        return false;
    };

    let prev_version = entry.latest_version;
    let prev_observed_at = entry.latest_observed_at;
    entry.latest_observed_at = match resolved.observed_at {
        Some(observed_at) => Some(observed_at),
        None if resolved.version != prev_version || prev_observed_at.is_none() => Some(now),
        None => prev_observed_at,
    };
    // A failed resolution overwrites the previous version with `None`.
    entry.latest_version = resolved.version;

    let external_ref = resolved
        .external_ref
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty());
    apply_field(EXTERNAL_REF_POLICY, &mut entry.external_ref, external_ref);
    apply_field(RATING_POLICY, &mut entry.rating, resolved.rating);
    true
}

fn apply_field<T>(policy: FieldPolicy, slot: &mut Option<T>, incoming: Option<T>) {
    match policy {
        FieldPolicy::Sticky => {
            if incoming.is_some() {
                *slot = incoming;
            }
        }
        FieldPolicy::Overwrite => *slot = incoming,
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
