//! Whole-document catalog persistence.
//!
//! The catalog is read once at start and replaced wholesale on write.
use super::Catalog;
use anyhow::{Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Load the catalog, treating a missing file as an empty catalog.
///
/// A file that exists but does not parse is an error: silently starting from
/// an empty catalog would discard the operator's history.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "catalog missing; starting empty");
            return Ok(Catalog::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read catalog {}", path.display()));
        }
    };
    let mut catalog: Catalog = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse catalog JSON {}", path.display()))?;
    catalog.normalize_ids();
    tracing::info!(path = %path.display(), entries = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Replace the catalog document on disk.
///
/// Writes go to a sibling temp file that is persisted over the target, so a
/// failed write never leaves a truncated document behind.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let text = serde_json::to_string_pretty(catalog).context("serialize catalog")?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("write {}", tmp.path().display()))?;
    tmp.write_all(b"\n")
        .with_context(|| format!("write {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = catalog.len(), "catalog written");
    Ok(())
}
