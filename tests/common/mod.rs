//! Shared test infrastructure for integration tests.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated workspace with a catalog, config, and mock oracle responses.
pub struct TestFixture {
    pub dir: TempDir,
}

/// Result of one `buildwatch` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

impl TestFixture {
    /// Create a fixture with an explicit config so user config never leaks in.
    pub fn new() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("responses"))?;
        let script = manifest_dir().join("tests/mock-oracle.sh");
        let config = serde_json::json!({
            "schema_version": 1,
            "oracle_command": format!("sh '{}' {{id}}", script.display()),
            "oracle_timeout_secs": 30,
            "concurrency": 2,
        });
        fs::write(
            dir.path().join("config.json"),
            serde_json::to_vec_pretty(&config)?,
        )?;
        Ok(Self { dir })
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.path("catalog.json")
    }

    /// Script the oracle's output for one id.
    pub fn respond(&self, id: &str, text: &str) -> anyhow::Result<()> {
        fs::write(self.path(&format!("responses/{id}.txt")), text)?;
        Ok(())
    }

    pub fn write_inventory(&self, records: Value) -> anyhow::Result<PathBuf> {
        let path = self.path("inventory.json");
        fs::write(&path, serde_json::to_vec_pretty(&records)?)?;
        Ok(path)
    }

    pub fn write_catalog_text(&self, text: &str) -> anyhow::Result<()> {
        fs::write(self.catalog_path(), text)?;
        Ok(())
    }

    pub fn read_catalog(&self) -> anyhow::Result<Value> {
        read_json(&self.catalog_path())
    }

    /// Ids the mock oracle was invoked with, in call order.
    pub fn oracle_calls(&self) -> Vec<String> {
        fs::read_to_string(self.path("calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Run `buildwatch <command> <args>` against this fixture.
    pub fn run(&self, command: &str, args: &[&str]) -> anyhow::Result<RunResult> {
        self.run_with_env(command, args, &[])
    }

    /// Like `run`, with extra environment variables set last.
    pub fn run_with_env(
        &self,
        command: &str,
        args: &[&str],
        vars: &[(&str, &str)],
    ) -> anyhow::Result<RunResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_buildwatch"))
            .arg(command)
            .arg("--config")
            .arg(self.path("config.json"))
            .arg("--catalog")
            .arg(self.catalog_path())
            .args(args)
            .env("BUILDWATCH_MOCK_DIR", self.dir.path())
            .env_remove("BUILDWATCH_ORACLE")
            .env_remove("RUST_LOG")
            .envs(vars.iter().copied())
            .output()?;
        Ok(output.into())
    }
}

pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}
