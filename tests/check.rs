//! End-to-end checks of the `buildwatch` binary against a scripted oracle.
#![cfg(unix)]

mod common;

use common::{read_json, TestFixture};
use serde_json::json;

const ALPHA_INFO: &str = r#"AppID : 100, change number : 1/0, last change : Mon Jul 24 2023
"100"
{
	"depots"
	{
		"branches"
		{
			"public"
			{
				"buildid"		"12"
				"timeupdated"		"1690000000"
			}
		}
	}
}
"#;

const BETA_INFO: &str = r#""200"
{
	"depots"
	{
		"branches"
		{
			"public"
			{
				"buildid"		"3"
			}
		}
	}
}
"#;

#[test]
fn local_check_writes_catalog_and_report() -> anyhow::Result<()> {
    let fixture = TestFixture::new()?;
    fixture.respond("100", ALPHA_INFO)?;
    fixture.respond("200", BETA_INFO)?;
    let inventory = fixture.write_inventory(json!([
        {"id": "100", "name": "Alpha", "installed_version": 10},
        {"id": "200", "name": "Beta", "installed_version": 3},
        {"id": "300", "name": "Gamma", "installed_version": 1},
    ]))?;
    let report_path = fixture.path("out/report.json");

    let result = fixture.run(
        "check",
        &[
            "--inventory",
            inventory.to_str().expect("utf8 path"),
            "--report",
            report_path.to_str().expect("utf8 path"),
        ],
    )?;
    assert!(result.success, "stderr: {}", result.stderr);

    let catalog = fixture.read_catalog()?;
    assert_eq!(catalog["100"]["latest_version"], 12);
    assert_eq!(catalog["100"]["latest_observed_at"], 1_690_000_000);
    assert_eq!(catalog["200"]["latest_version"], 3);
    assert!(catalog["200"]["latest_observed_at"].is_i64());
    assert!(catalog["300"]["latest_version"].is_null());

    let mut calls = fixture.oracle_calls();
    calls.sort();
    // The unresolved id is retried once.
    assert_eq!(calls, vec!["100", "200", "300", "300"]);

    let report = read_json(&report_path)?;
    let statuses: Vec<(&str, &str)> = report["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|row| {
            (
                row["id"].as_str().unwrap_or_default(),
                row["status"].as_str().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("100", "update_available"),
            ("200", "up_to_date"),
            ("300", "unresolved"),
        ]
    );
    assert!(result.stdout.contains("3 entries"));
    Ok(())
}

#[test]
fn unattended_recheck_keeps_first_observed_date() -> anyhow::Result<()> {
    let fixture = TestFixture::new()?;
    fixture.respond("200", BETA_INFO)?;
    fixture.write_catalog_text(
        r#"{
  "200": {
    "id": "200",
    "name": "Beta",
    "installed_version": 3,
    "latest_version": 3,
    "latest_observed_at": 1000
  }
}"#,
    )?;

    for _ in 0..2 {
        let result = fixture.run("check", &["--unattended"])?;
        assert!(result.success, "stderr: {}", result.stderr);
    }

    let catalog = fixture.read_catalog()?;
    assert_eq!(catalog["200"]["latest_version"], 3);
    assert_eq!(catalog["200"]["latest_observed_at"], 1000);
    assert_eq!(fixture.oracle_calls(), vec!["200", "200"]);
    Ok(())
}

#[test]
fn malformed_catalog_aborts_before_any_oracle_call() -> anyhow::Result<()> {
    let fixture = TestFixture::new()?;
    fixture.write_catalog_text("{ not json")?;

    let result = fixture.run("check", &["--unattended"])?;

    assert!(!result.success);
    assert!(
        result.stderr.contains("parse catalog JSON"),
        "stderr: {}",
        result.stderr
    );
    assert!(fixture.oracle_calls().is_empty());
    let untouched = std::fs::read_to_string(fixture.catalog_path())?;
    assert_eq!(untouched, "{ not json");
    Ok(())
}

#[test]
fn report_prints_json_rows_without_resolving() -> anyhow::Result<()> {
    let fixture = TestFixture::new()?;
    fixture.write_catalog_text(
        r#"{
  "b": {"id": "b", "name": "beta", "installed_version": 2, "latest_version": 2},
  "a": {"id": "a", "name": "Alpha", "installed_version": 1, "latest_version": 5}
}"#,
    )?;

    let result = fixture.run("report", &["--json"])?;
    assert!(result.success, "stderr: {}", result.stderr);

    let rows: serde_json::Value = serde_json::from_str(&result.stdout)?;
    let rows = rows.as_array().expect("rows array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Alpha");
    assert_eq!(rows[0]["status"], "update_available");
    assert_eq!(rows[1]["name"], "beta");
    assert_eq!(rows[1]["status"], "up_to_date");
    assert!(fixture.oracle_calls().is_empty());
    Ok(())
}

#[test]
fn invalid_oracle_template_is_rejected() -> anyhow::Result<()> {
    let fixture = TestFixture::new()?;
    fixture.write_catalog_text("{}")?;

    let result = fixture.run("check", &["--unattended", "--oracle", "sh -c true"])?;

    assert!(!result.success);
    assert!(result.stderr.contains("{id}"), "stderr: {}", result.stderr);
    Ok(())
}

#[test]
fn report_ignores_a_broken_oracle_setting() -> anyhow::Result<()> {
    let fixture = TestFixture::new()?;
    fixture.write_catalog_text(r#"{"a": {"id": "a", "name": "Alpha", "installed_version": 1}}"#)?;

    let report = fixture.run_with_env("report", &[], &[("BUILDWATCH_ORACLE", "steamcmd +quit")])?;
    assert!(report.success, "stderr: {}", report.stderr);
    assert!(report.stdout.contains("1 entries"));

    let check = fixture.run_with_env(
        "check",
        &["--unattended"],
        &[("BUILDWATCH_ORACLE", "steamcmd +quit")],
    )?;
    assert!(!check.success);
    assert!(check.stderr.contains("{id}"), "stderr: {}", check.stderr);
    Ok(())
}
