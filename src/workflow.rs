//! Command implementations: load, merge, resolve, persist, report.
//!
//! The catalog is owned by the calling thread for the whole run. Resolution
//! workers only return values; every catalog mutation happens here, in
//! candidate order, once the pool has drained.
use crate::catalog::{self, apply_resolution, merge_inventory, Catalog};
use crate::cli::{CheckArgs, CommonArgs, ReportArgs};
use crate::config::{self, ConfigOverrides, WatchConfig, ORACLE_ENV_VAR};
use crate::inventory::{CatalogInventory, InventoryFile, InventoryRecord, InventorySource};
use crate::oracle::{CommandOracle, HttpRatingSource, Resolver, TemplateLink};
use crate::pool;
use crate::report::{self, Report};
use crate::util::now_epoch_secs;
use anyhow::{Context, Result};
use std::env;

/// Counts from one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub attempted: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    let config = load_run_config(&args.common, &args.overrides())?;
    config::validate_oracle_config(&config)?;
    let catalog_path = config.catalog_path()?;
    let mut catalog = catalog::load_catalog(&catalog_path)?;

    let oracle = CommandOracle::from_template(&config.oracle_command, config.oracle_timeout())?;
    let rating = config
        .rating_url_template
        .as_deref()
        .map(|template| HttpRatingSource::new(template, config.rating_timeout()))
        .transpose()?;
    let link = config.external_ref_template.as_deref().map(TemplateLink::new);

    let candidates = match &args.inventory {
        Some(inventory) if !args.unattended => {
            let records = InventoryFile::new(inventory).scan()?;
            let candidates = merge_inventory(&mut catalog, &records, config.resolve_policy);
            catalog::write_catalog(&catalog_path, &catalog)
                .context("persist catalog after inventory merge")?;
            candidates
        }
        _ => {
            if catalog.is_empty() {
                tracing::warn!(path = %catalog_path.display(), "catalog is empty; nothing to check");
            }
            CatalogInventory::new(&catalog).scan()?
        }
    };
    tracing::info!(
        candidates = candidates.len(),
        catalog = catalog.len(),
        unattended = args.unattended,
        "resolving candidates"
    );

    let mut resolver = Resolver::new(&oracle);
    if let Some(rating) = &rating {
        resolver = resolver.with_rating(rating);
    }
    if let Some(link) = &link {
        resolver = resolver.with_link(link);
    }
    let summary = resolve_candidates(
        &mut catalog,
        &candidates,
        &resolver,
        config.concurrency,
        now_epoch_secs,
    );
    tracing::info!(
        attempted = summary.attempted,
        resolved = summary.resolved,
        unresolved = summary.unresolved,
        "resolution complete"
    );

    catalog::write_catalog(&catalog_path, &catalog).context("persist catalog")?;
    emit_report(&catalog, &args.common)
}

pub fn run_report(args: ReportArgs) -> Result<()> {
    let config = load_run_config(&args.common, &args.overrides())?;
    let catalog = catalog::load_catalog(&config.catalog_path()?)?;
    emit_report(&catalog, &args.common)
}

fn load_run_config(common: &CommonArgs, overrides: &ConfigOverrides) -> Result<WatchConfig> {
    let file = config::load_config(common.config.as_deref())?;
    config::resolve_config(file, overrides, env::var(ORACLE_ENV_VAR).ok())
}

/// Resolve every candidate and fold the results into the catalog.
///
/// `clock` supplies the reconciliation instant for each applied result.
pub fn resolve_candidates<C>(
    catalog: &mut Catalog,
    candidates: &[InventoryRecord],
    resolver: &Resolver<'_>,
    concurrency: usize,
    clock: C,
) -> ResolveSummary
where
    C: Fn() -> i64,
{
    let mut summary = ResolveSummary {
        attempted: candidates.len(),
        ..ResolveSummary::default()
    };
    let results = pool::resolve_all(
        candidates,
        concurrency,
        |record| resolver.resolve(record),
        |index, resolved| {
            if resolved.version.is_some() {
                summary.resolved += 1;
            } else {
                summary.unresolved += 1;
                tracing::debug!(id = %candidates[index].id, "entry left unresolved");
            }
        },
    );
    for (record, resolved) in candidates.iter().zip(results) {
        apply_resolution(catalog, &record.id, resolved, clock());
    }
    summary
}

fn emit_report(catalog: &Catalog, common: &CommonArgs) -> Result<()> {
    let report = Report::new(report::assemble_catalog(catalog), now_epoch_secs());
    if let Some(path) = &common.report {
        report::write_report(path, &report)?;
        tracing::info!(path = %path.display(), "report written");
    }
    if common.json {
        let text = serde_json::to_string_pretty(&report.rows).context("serialize report rows")?;
        println!("{text}");
    } else {
        print!("{}", report::render_text(&report));
    }
    Ok(())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
