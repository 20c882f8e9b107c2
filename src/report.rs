//! Report rows handed to the rendering/publishing side.
//!
//! `assemble` is pure: it shapes catalog entries into display rows and never
//! touches the filesystem. Writing and printing live next to it but are kept
//! separate so the row shape can be tested on its own.
use crate::catalog::{Catalog, CatalogEntry, RatingSummary};
use crate::status::{classify, Status};
use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Current schema version for the report JSON handoff.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// One presentation row per catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub name: String,
    pub id: String,
    pub installed_version: Option<u64>,
    pub latest_version: Option<u64>,
    pub latest_observed_at: Option<i64>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
}

impl ReportRow {
    fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            name: entry.name.clone(),
            id: entry.id.clone(),
            installed_version: entry.installed_version,
            latest_version: entry.latest_version,
            latest_observed_at: entry.latest_observed_at,
            status: classify(entry.installed_version, entry.latest_version),
            rating: entry.rating.clone(),
            external_ref: entry.external_ref.clone(),
        }
    }
}

/// Report document written for the rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: u32,
    pub generated_at: i64,
    pub counts: BTreeMap<Status, usize>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn new(rows: Vec<ReportRow>, generated_at: i64) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at,
            counts: status_counts(&rows),
            rows,
        }
    }
}

/// Shape entries into rows sorted by display name, case-insensitively.
///
/// The sort is stable, so entries with equal names keep their input order.
pub fn assemble<'a, I>(entries: I) -> Vec<ReportRow>
where
    I: IntoIterator<Item = &'a CatalogEntry>,
{
    let mut rows: Vec<ReportRow> = entries.into_iter().map(ReportRow::from_entry).collect();
    rows.sort_by_cached_key(|row| row.name.to_lowercase());
    rows
}

/// Rows for every entry in the catalog.
pub fn assemble_catalog(catalog: &Catalog) -> Vec<ReportRow> {
    assemble(catalog.entries())
}

/// Number of rows in each status, with every status present.
pub fn status_counts(rows: &[ReportRow]) -> BTreeMap<Status, usize> {
    let mut counts: BTreeMap<Status, usize> =
        Status::ALL.iter().map(|status| (*status, 0)).collect();
    for row in rows {
        *counts.entry(row.status).or_insert(0) += 1;
    }
    counts
}

/// Persist the report handoff as pretty JSON.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let text = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Format an epoch-seconds timestamp for the text table.
pub fn format_observed(epoch_secs: Option<i64>) -> String {
    epoch_secs
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_version(version: Option<u64>) -> String {
    version
        .map(|version| version.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_rating(rating: Option<&RatingSummary>) -> String {
    let Some(rating) = rating else {
        return String::new();
    };
    match (rating.percent, rating.descriptor.as_deref()) {
        (Some(percent), Some(desc)) => format!("{percent}% {desc}"),
        (Some(percent), None) => format!("{percent}%"),
        (None, Some(desc)) => desc.to_string(),
        (None, None) => String::new(),
    }
}

/// Render rows as a plain text table followed by status counts.
pub fn render_text(report: &Report) -> String {
    let header = ["NAME", "ID", "INSTALLED", "LATEST", "OBSERVED", "STATUS", "RATING"];
    let cells: Vec<[String; 7]> = report
        .rows
        .iter()
        .map(|row| {
            [
                row.name.clone(),
                row.id.clone(),
                format_version(row.installed_version),
                format_version(row.latest_version),
                format_observed(row.latest_observed_at),
                row.status.to_string(),
                format_rating(row.rating.as_ref()),
            ]
        })
        .collect();

    let mut widths = header.map(|title| title.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &header.map(str::to_string), &widths);
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    let counts = report
        .counts
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("\n{} entries ({counts})\n", report.rows.len()));
    out
}

fn push_line(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
