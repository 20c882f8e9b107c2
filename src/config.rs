//! Run configuration.
//!
//! Settings come from an optional JSON file, the `BUILDWATCH_ORACLE`
//! environment variable, and CLI flags, in increasing precedence. The result
//! is validated once before any catalog or oracle work starts; the oracle
//! templates are only checked by commands that invoke the oracle.
use crate::catalog::ResolvePolicy;
use crate::oracle::ID_PLACEHOLDER;
use crate::pool::DEFAULT_CONCURRENCY;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current schema version for `config.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Environment variable overriding the oracle command template.
pub const ORACLE_ENV_VAR: &str = "BUILDWATCH_ORACLE";
/// Oracle command used when nothing else is configured.
pub const DEFAULT_ORACLE_COMMAND: &str =
    "steamcmd +login anonymous +app_info_update 1 +app_info_print {id} +quit";
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RATING_TIMEOUT_SECS: u64 = 10;

const APP_DIR: &str = "buildwatch";

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub schema_version: u32,
    /// Catalog document; defaults to the user data directory.
    pub catalog_path: Option<PathBuf>,
    /// Shell-words command template with an `{id}` placeholder.
    pub oracle_command: String,
    pub oracle_timeout_secs: u64,
    pub concurrency: usize,
    pub resolve_policy: ResolvePolicy,
    /// Review endpoint with an `{id}` placeholder; unset disables ratings.
    pub rating_url_template: Option<String>,
    pub rating_timeout_secs: u64,
    /// Link template with `{id}`/`{name}` placeholders; unset disables links.
    pub external_ref_template: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            catalog_path: None,
            oracle_command: DEFAULT_ORACLE_COMMAND.to_string(),
            oracle_timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            resolve_policy: ResolvePolicy::default(),
            rating_url_template: None,
            rating_timeout_secs: DEFAULT_RATING_TIMEOUT_SECS,
            external_ref_template: None,
        }
    }
}

impl WatchConfig {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn rating_timeout(&self) -> Duration {
        Duration::from_secs(self.rating_timeout_secs)
    }

    /// Catalog path, falling back to `<data_dir>/buildwatch/catalog.json`.
    pub fn catalog_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.catalog_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join("catalog.json"))
            .ok_or_else(|| anyhow!("no data directory available; pass --catalog"))
    }
}

/// CLI-provided values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub oracle_command: Option<String>,
    pub concurrency: Option<usize>,
    pub resolve_policy: Option<ResolvePolicy>,
}

/// Default config location, `<config_dir>/buildwatch/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

/// Load the config file.
///
/// An explicitly named file must exist. The default location may be absent,
/// in which case defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<WatchConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(WatchConfig::default()),
        },
    };
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {
            return Ok(WatchConfig::default());
        }
        Err(err) => return Err(err).with_context(|| format!("read config {}", path.display())),
    };
    let config: WatchConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Layer environment and CLI values over the file config, then validate.
pub fn resolve_config(
    mut config: WatchConfig,
    overrides: &ConfigOverrides,
    env_oracle: Option<String>,
) -> Result<WatchConfig> {
    if let Some(command) = env_oracle.filter(|command| !command.trim().is_empty()) {
        config.oracle_command = command;
    }
    if let Some(command) = &overrides.oracle_command {
        config.oracle_command = command.clone();
    }
    if let Some(path) = &overrides.catalog_path {
        config.catalog_path = Some(path.clone());
    }
    if let Some(concurrency) = overrides.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(policy) = overrides.resolve_policy {
        config.resolve_policy = policy;
    }
    validate_config(&config)?;
    Ok(config)
}

/// Validate the settings every command depends on.
pub fn validate_config(config: &WatchConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.concurrency == 0 {
        return Err(anyhow!("concurrency must be >= 1"));
    }
    if config.oracle_timeout_secs == 0 {
        return Err(anyhow!("oracle_timeout_secs must be >= 1"));
    }
    if config.rating_timeout_secs == 0 {
        return Err(anyhow!("rating_timeout_secs must be >= 1"));
    }
    Ok(())
}

/// Validate the oracle and rating templates. Only commands that resolve
/// entries need them.
pub fn validate_oracle_config(config: &WatchConfig) -> Result<()> {
    if config.oracle_command.trim().is_empty() {
        return Err(anyhow!("oracle_command must not be empty"));
    }
    if !config.oracle_command.contains(ID_PLACEHOLDER) {
        return Err(anyhow!(
            "oracle_command must contain an {ID_PLACEHOLDER} placeholder"
        ));
    }
    if let Some(template) = &config.rating_url_template {
        if !template.contains(ID_PLACEHOLDER) {
            return Err(anyhow!(
                "rating_url_template must contain an {ID_PLACEHOLDER} placeholder"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
