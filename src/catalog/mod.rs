//! Persisted catalog of tracked builds.
//!
//! The catalog is a flat keyed map written as a single JSON document. Entries
//! are only ever added or updated in place; nothing in this crate removes one.
mod reconcile;
mod store;
mod types;

pub use reconcile::{apply_resolution, merge_inventory, ResolvePolicy};
pub use store::{load_catalog, write_catalog};
pub use types::{Catalog, CatalogEntry, RatingSummary, Resolved};
