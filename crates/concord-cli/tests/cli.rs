//! Integration tests for the concord CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const QUOTE: &str = "Quote No: Q-2041
Description   Qty   Unit   Rate    Total
Fire seal     10    m2     50.00   500.00
Cable tray    2     ea     25.00   50.00

Total: $550.00
";

/// Config with only the local text backends, so no external programs run.
const CONFIG: &str = r#"{
  "auto": { "order": ["table", "lines"] },
  "backends": [
    { "name": "table", "kind": { "type": "table" } },
    { "name": "lines", "kind": { "type": "lines" } },
    { "name": "cloud", "kind": { "type": "command", "program": "concord-cloud" },
      "required_env": ["CONCORD_TEST_CLOUD_TOKEN"] }
  ]
}"#;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_concord"))
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), CONFIG).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn config(&self) -> PathBuf {
        self.path("config.json")
    }
}

fn with_config(ws: &Workspace) -> Command {
    let mut cmd = cli();
    cmd.arg("--config").arg(ws.config());
    cmd
}

#[test]
fn test_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("auto"));
}

#[test]
fn test_extract_json() {
    let ws = Workspace::new();
    let input = ws.file("quote.txt", QUOTE);

    let output = with_config(&ws)
        .args(["extract", "--backends", "table,lines", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(json["recommendation"], "HIGH_CONFIDENCE_MULTI_PARSER");
    assert_eq!(json["all_results"].as_array().unwrap().len(), 2);
    assert_eq!(json["consensus_items"].as_array().unwrap().len(), 2);
    assert_eq!(json["consensus_items"][0]["consensus_level"], "multi_source_averaged");
    assert_eq!(json["extraction_metadata"]["file_name"], "quote.txt");
    assert_eq!(json["best_result"]["metadata"]["quote_number"], "Q-2041");
}

#[test]
fn test_extract_drops_unknown_backends() {
    let ws = Workspace::new();
    let input = ws.file("quote.txt", QUOTE);

    let output = with_config(&ws)
        .args(["extract", "--backends", "table,nonexistent,table"])
        .arg(&input)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["extraction_metadata"]["parsers_used"], serde_json::json!(["table"]));
    assert_eq!(json["recommendation"], "MODERATE_CONFIDENCE_SINGLE_PARSER");
}

#[test]
fn test_extract_csv_to_file() {
    let ws = Workspace::new();
    let input = ws.file("quote.txt", QUOTE);
    let out = ws.path("items.csv");

    with_config(&ws)
        .args(["extract", "--format", "csv", "--output"])
        .arg(&out)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("line_number,description"));
    assert!(lines.next().unwrap().contains("Fire seal"));
}

#[test]
fn test_empty_file_rejected() {
    let ws = Workspace::new();
    let input = ws.file("empty.pdf", "");

    with_config(&ws)
        .arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn test_missing_file_rejected() {
    let ws = Workspace::new();

    with_config(&ws)
        .arg("extract")
        .arg(ws.path("nope.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_auto_selects_first_confident_backend() {
    let ws = Workspace::new();
    let input = ws.file("quote.txt", QUOTE);

    with_config(&ws)
        .args(["auto", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Selected: table"))
        .stdout(predicate::str::contains("Tried: table"));
}

#[test]
fn test_auto_falls_back_to_ensemble() {
    let ws = Workspace::new();
    let input = ws.file("quote.txt", QUOTE);

    let output = with_config(&ws)
        .args(["auto", "--threshold", "1.0"])
        .arg(&input)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mode"], "ensemble");
    assert_eq!(json["all_results"].as_array().unwrap().len(), 2);
}

#[test]
fn test_backends_listing() {
    let ws = Workspace::new();

    let output = with_config(&ws).args(["backends", "--json"]).output().unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0]["name"], "table");
    assert_eq!(listed[2]["kind"], "command");
    assert_eq!(listed[2]["available"], false);
}

#[test]
fn test_batch_with_summary() {
    let ws = Workspace::new();
    let inputs = ws.path("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.txt"), QUOTE).unwrap();
    fs::write(inputs.join("b.txt"), "").unwrap();
    let out_dir = ws.path("out");

    with_config(&ws)
        .arg("batch")
        .arg(format!("{}/*.txt", inputs.display()))
        .arg("--output-dir")
        .arg(&out_dir)
        .args(["--summary", "--continue-on-error"])
        .assert()
        .success();

    assert!(out_dir.join("a.json").exists());
    assert!(!out_dir.join("b.json").exists());

    let summary = fs::read_to_string(out_dir.join("summary.csv")).unwrap();
    let rows: Vec<&str> = summary.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("a.txt,success,HIGH_CONFIDENCE_MULTI_PARSER"));
    assert!(rows[2].starts_with("b.txt,error"));
}

#[test]
fn test_batch_stops_on_error() {
    let ws = Workspace::new();
    let inputs = ws.path("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("empty.txt"), "").unwrap();

    with_config(&ws)
        .arg("batch")
        .arg(format!("{}/*.txt", inputs.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

fn config_get(config: &Path, key: &str) -> String {
    let output = cli()
        .arg("--config")
        .arg(config)
        .args(["config", "get", key])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn test_config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    assert_eq!(config_get(&config, "dispatch.backend_timeout_secs"), "60");
    assert_eq!(config_get(&config, "backends.3.name"), "\"textract\"");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "auto.confidence_threshold", "0.8"])
        .assert()
        .success();
    assert_eq!(config_get(&config, "auto.confidence_threshold"), "0.8");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "auto.confidence_threshold", "4"])
        .assert()
        .failure();

    cli()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
