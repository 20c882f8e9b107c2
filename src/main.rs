use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod catalog;
mod cli;
mod config;
mod inventory;
mod oracle;
mod pool;
mod report;
mod status;
mod util;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    let verbose = match &args.command {
        Command::Check(check) => check.common.verbose,
        Command::Report(report) => report.common.verbose,
    };
    init_tracing(verbose);

    match args.command {
        Command::Check(args) => workflow::run_check(args),
        Command::Report(args) => workflow::run_report(args),
    }
}

/// Log to stderr so stdout carries only the report.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
