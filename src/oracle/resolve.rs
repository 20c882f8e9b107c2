//! Per-entry resolution: oracle invocation, extraction, and the retry policy.
use super::client::Oracle;
use super::extract::{extract, BuildInfo};
use super::link::LinkLookup;
use super::rating::{fetch_or_empty, RatingSource};
use crate::catalog::Resolved;
use crate::inventory::InventoryRecord;
use crate::util::truncate_string;

/// Extra oracle invocations allowed when the build id is missing.
pub const MAX_EXTRA_ATTEMPTS: usize = 1;

const LOGGED_RAW_BYTES: usize = 2048;

/// Outcome of resolving the build id for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResolution {
    pub info: BuildInfo,
    /// Oracle invocations spent, including the first.
    pub attempts: usize,
}

/// Resolve one id, re-invoking the oracle once when the build id is missing.
///
/// Each attempt is a fresh invocation. When every attempt misses, the raw text
/// of all attempts is logged and the result carries no fields.
pub fn resolve_build(oracle: &dyn Oracle, id: &str) -> BuildResolution {
    let mut misses: Vec<String> = Vec::new();
    for attempt in 0..=MAX_EXTRA_ATTEMPTS {
        if attempt > 0 {
            tracing::info!(id, attempt, "build id missing; retrying oracle");
        }
        let raw = match oracle.invoke(id) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(id, attempt, error = %format!("{err:#}"), "oracle invoke failed");
                String::new()
            }
        };
        let info = extract(&raw);
        if info.version.is_some() {
            return BuildResolution {
                info,
                attempts: attempt + 1,
            };
        }
        misses.push(raw);
    }

    tracing::warn!(id, attempts = misses.len(), "build id unresolved");
    for (index, raw) in misses.iter().enumerate() {
        tracing::debug!(
            id,
            attempt = index,
            raw = %truncate_string(raw, LOGGED_RAW_BYTES),
            "unresolved oracle output"
        );
    }
    BuildResolution {
        info: BuildInfo::default(),
        attempts: misses.len(),
    }
}

/// Collaborators used to resolve one inventory record.
pub struct Resolver<'a> {
    oracle: &'a dyn Oracle,
    rating: Option<&'a dyn RatingSource>,
    link: Option<&'a dyn LinkLookup>,
}

impl<'a> Resolver<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self {
            oracle,
            rating: None,
            link: None,
        }
    }

    pub fn with_rating(mut self, rating: &'a dyn RatingSource) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_link(mut self, link: &'a dyn LinkLookup) -> Self {
        self.link = Some(link);
        self
    }

    /// Resolve the remote-side fields for one record.
    ///
    /// The rating and link lookups run regardless of whether the build id
    /// resolved and never influence it.
    pub fn resolve(&self, record: &InventoryRecord) -> Resolved {
        let build = resolve_build(self.oracle, &record.id);
        let rating = self
            .rating
            .map(|source| fetch_or_empty(source, &record.id))
            .filter(|summary| !summary.is_empty());
        let external_ref = self
            .link
            .and_then(|link| link.lookup(&record.id, &record.name));
        tracing::debug!(
            id = %record.id,
            version = ?build.info.version,
            observed_at = ?build.info.observed_at,
            attempts = build.attempts,
            "entry resolved"
        );
        Resolved {
            version: build.info.version,
            observed_at: build.info.observed_at,
            external_ref,
            rating,
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
