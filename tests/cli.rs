mod common;

use assert_cmd::Command;
use common::{RecordFixture, v1_test_result, write_assets, write_json};
use predicates::prelude::*;

fn govreport() -> Command {
    let mut cmd = Command::cargo_bin("govreport").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn build_then_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let record = RecordFixture::all_yes().write(dir.path());
    let out = dir.path().join("report.pdf");

    govreport()
        .args(["build", "--date", "2024-05-01", "--chart-dpi", "72", "--record"])
        .arg(&record)
        .arg("--assets")
        .arg(&assets)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("pages"))
        .stdout(predicate::str::contains("chart_overview"));
    assert!(out.exists());

    govreport()
        .arg("inspect")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("pages="));
}

#[test]
fn build_json_summary_reports_pages_and_fingerprints() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let results = write_json(&dir.path().join("results.json"), &v1_test_result());
    let record = RecordFixture::all_yes().write(dir.path());
    let out = dir.path().join("report.pdf");

    let output = govreport()
        .args(["--json", "build", "--serial-charts", "--chart-dpi", "72", "--record"])
        .arg(&record)
        .arg("--test-result")
        .arg(&results)
        .arg("--assets")
        .arg(&assets)
        .arg("--out")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["data"]["page_count"].as_u64().unwrap() > 14);
    assert_eq!(body["data"]["chart_fingerprints"].as_object().unwrap().len(), 12);
}

#[test]
fn schema_mismatch_exits_nonzero_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let assets = write_assets(dir.path());
    let bad = write_json(&dir.path().join("bad.json"), &serde_json::json!({"rows": []}));
    let record = RecordFixture::all_yes().write(dir.path());
    let out = dir.path().join("report.pdf");

    govreport()
        .args(["build", "--record"])
        .arg(&record)
        .arg("--test-result")
        .arg(&bad)
        .arg("--assets")
        .arg(&assets)
        .arg("--out")
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SCHEMA_MISMATCH"));
    assert!(!out.exists());

    govreport()
        .arg("validate-test-result")
        .arg(&bad)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not match any known schema"));
}

#[test]
fn validate_test_result_prints_counts() {
    let dir = tempfile::tempdir().unwrap();
    let results = write_json(&dir.path().join("results.json"), &v1_test_result());
    govreport()
        .arg("validate-test-result")
        .arg(&results)
        .assert()
        .success()
        .stdout(predicate::str::contains("success=2\tfail=1\tskip=0"))
        .stdout(predicate::str::contains("toxicity"));
}

#[test]
fn stats_lists_principles_in_canonical_order() {
    let dir = tempfile::tempdir().unwrap();
    let record = RecordFixture::all_yes()
        .answer("2.1.1", Some("No"), "")
        .write(dir.path());

    let output = govreport()
        .args(["stats", "--json", "--record"])
        .arg(&record)
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let principles = body["data"]["principles"].as_array().unwrap();
    assert_eq!(principles.len(), 11);
    assert_eq!(principles[1]["principle"], "2. Explainability");
    assert_eq!(principles[1]["no"], 1);
    assert_eq!(principles[1]["all_yes"], false);
    assert_eq!(principles[9]["principle"], "10. Human agency");
    assert_eq!(body["data"]["overall"]["total"], 33);
}

#[test]
fn missing_record_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    govreport()
        .args(["stats", "--record"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO_ERROR"));
}
