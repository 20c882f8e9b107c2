//! CLI argument parsing for the build check workflow.
//!
//! The CLI only selects inputs and mode; catalog and resolution logic never
//! see clap types.
use crate::catalog::ResolvePolicy;
use crate::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "buildwatch",
    version,
    about = "Check archived builds against the latest remote builds",
    after_help = "Commands:\n  check --inventory <file>   Merge local inventory, resolve latest builds, report\n  check --unattended         Re-resolve every catalog entry, report\n  report                     Report from the catalog without resolving\n\nExamples:\n  buildwatch check --inventory backups.json\n  buildwatch check --unattended --report out/report.json\n  buildwatch report --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Check(CheckArgs),
    Report(ReportArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Catalog document (defaults to the user data directory)
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the report rows as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Print rows as JSON instead of a text table
    #[arg(long)]
    pub json: bool,

    /// Log progress to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Which inventory records get re-resolved after a local merge.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    All,
    Changed,
}

impl From<PolicyArg> for ResolvePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::All => ResolvePolicy::All,
            PolicyArg::Changed => ResolvePolicy::Changed,
        }
    }
}

/// Check command inputs.
#[derive(Parser, Debug)]
#[command(about = "Merge inventory, resolve latest builds, and report")]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// JSON inventory of locally archived builds
    #[arg(long, value_name = "PATH", required_unless_present = "unattended")]
    pub inventory: Option<PathBuf>,

    /// Check every catalog entry instead of a local inventory
    #[arg(long, conflicts_with = "inventory")]
    pub unattended: bool,

    /// Maximum concurrent oracle resolutions
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Oracle command template with an {id} placeholder
    #[arg(long, value_name = "CMD")]
    pub oracle: Option<String>,

    /// Which merged records to re-resolve
    #[arg(long, value_enum, value_name = "POLICY")]
    pub resolve: Option<PolicyArg>,
}

impl CheckArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            catalog_path: self.common.catalog.clone(),
            oracle_command: self.oracle.clone(),
            concurrency: self.concurrency,
            resolve_policy: self.resolve.map(ResolvePolicy::from),
        }
    }
}

/// Report command inputs.
#[derive(Parser, Debug)]
#[command(about = "Report catalog status without resolving")]
pub struct ReportArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl ReportArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            catalog_path: self.common.catalog.clone(),
            ..ConfigOverrides::default()
        }
    }
}
