use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn stocksync_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stocksync"))
}

/// Run the CLI in `cwd` with a clean environment for our variables.
fn run_cli(cwd: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(stocksync_bin());
    cmd.current_dir(cwd)
        .args(args)
        .env_remove("B2B_FEED_URL")
        .env_remove("DATA_DIR")
        .env_remove("STOCKSYNC_DIALECT")
        .env_remove("RUST_LOG");
    cmd.output().expect("failed to execute stocksync CLI")
}

fn dump(output: &Output) -> String {
    format!(
        "stdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[derive(Debug, Deserialize)]
struct Summary {
    universe: usize,
    changed: usize,
    retained: usize,
    whatif: bool,
    import_file: Option<PathBuf>,
    change_log: Option<PathBuf>,
    feed_archive: Option<PathBuf>,
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<products>
  <product>
    <mpn>SHIRT-1</mpn>
    <stock>
      <item quantity="2" ean="4000000000011"/>
      <item quantity="3" ean="4000000000028"/>
    </stock>
  </product>
  <product>
    <mpn>MUG-1</mpn>
    <stock><item quantity="0" ean="4000000000035"/></stock>
  </product>
</products>
"#;

const EXPORT: &str = "ID,sku,ean,post_parent,stock,stock_status
100,SHIRT-1,,0,4,instock
101,SHIRT-1-S,4000000000011.0,100,1,instock
102,SHIRT-1-M,4000000000028,100,3,instock
200,MUG-1,,0,0,outofstock
300,HAT-1,,0,9,instock
";

/// Workspace with an archived feed and an export file.
fn workspace(export: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("b2b_feed_20260101_000000.xml"), "<products/>").unwrap();
    fs::write(data.join("b2b_feed_20260102_000000.xml"), FEED).unwrap();
    fs::write(dir.path().join("export.csv"), export).unwrap();
    dir
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}

#[test]
fn sync_from_archive_writes_import_and_change_log() {
    let dir = workspace(EXPORT);
    let output = run_cli(
        dir.path(),
        &["--data-dir", "data", "sync", "--no-download", "-f", "export.csv", "--json"],
    );
    assert!(output.status.success(), "{}", dump(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary: Summary = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(summary.universe, 5);
    assert_eq!(summary.changed, 2);
    assert_eq!(summary.retained, 1);
    assert!(summary
        .feed_archive
        .unwrap()
        .ends_with("b2b_feed_20260102_000000.xml"));

    let import = dir.path().join(summary.import_file.unwrap());
    let content = fs::read_to_string(import).unwrap();
    assert_eq!(
        content,
        "sku,ean,manage_stock,stock_status,stock\n\
         SHIRT-1,,yes,instock,5\n\
         SHIRT-1-S,4000000000011,yes,instock,2\n\
         HAT-1,,yes,instock,9\n"
    );

    let log = fs::read_to_string(dir.path().join(summary.change_log.unwrap())).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "=== STOCK CHANGE LOG ===");
    assert!(lines[1].starts_with("Time: "));
    assert_eq!(
        &lines[3..],
        &[
            "SHIRT-1: stock 4→5, status instock→instock",
            "SHIRT-1-S: stock 1→2, status instock→instock",
        ]
    );

    // one run log per run
    assert_eq!(files_with_prefix(&dir.path().join("data/logs"), "stock_sync_").len(), 1);
}

#[test]
fn legacy_dialect_from_env() {
    let dir = workspace(EXPORT);
    let mut cmd = Command::new(stocksync_bin());
    let output = cmd
        .current_dir(dir.path())
        .args(["--data-dir", "data", "sync", "--no-download", "-f", "export.csv"])
        .env_remove("B2B_FEED_URL")
        .env("STOCKSYNC_DIALECT", "legacy")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", dump(&output));

    let imports = files_with_prefix(&dir.path().join("data"), "import_");
    assert_eq!(imports.len(), 1);
    let content = fs::read_to_string(&imports[0]).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("ID,sku,ean,manage_stock,stock_status,stock,backorders")
    );
    assert_eq!(lines.next(), Some("100,SHIRT-1,,yes,instock,5,no"));

    let logs = files_with_prefix(&dir.path().join("data"), "change_log_");
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert!(log.contains("ID: 101, SHIRT-1-S: stock 1→2"));
}

#[test]
fn in_sync_inventory_writes_no_import() {
    let export = "ID,sku,ean,post_parent,stock,stock_status
100,SHIRT-1,,0,5,instock
200,MUG-1,,0,0,outofstock
";
    let dir = workspace(export);
    let output = run_cli(
        dir.path(),
        &["--data-dir", "data", "sync", "--no-download", "-f", "export.csv"],
    );
    assert!(output.status.success(), "{}", dump(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("no import needed"));
    assert!(files_with_prefix(&dir.path().join("data"), "import_").is_empty());
    assert!(files_with_prefix(&dir.path().join("data"), "change_log_").is_empty());
}

#[test]
fn whatif_reports_without_writing() {
    let dir = workspace(EXPORT);
    let output = run_cli(
        dir.path(),
        &["--data-dir", "data", "sync", "--no-download", "-f", "export.csv", "--whatif", "--json"],
    );
    assert!(output.status.success(), "{}", dump(&output));
    let summary: Summary =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert!(summary.whatif);
    assert_eq!(summary.changed + summary.retained, 3);
    assert!(summary.import_file.is_none());
    assert!(files_with_prefix(&dir.path().join("data"), "import_").is_empty());
}

#[test]
fn missing_export_exits_nonzero() {
    let dir = workspace(EXPORT);
    let output = run_cli(
        dir.path(),
        &["--data-dir", "data", "sync", "--no-download", "-f", "missing.csv"],
    );
    assert_eq!(output.status.code(), Some(1), "{}", dump(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File not found"), "{}", dump(&output));
    assert!(files_with_prefix(&dir.path().join("data"), "import_").is_empty());

    let logs = files_with_prefix(&dir.path().join("data/logs"), "stock_sync_");
    assert_eq!(logs.len(), 1);
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert!(log.contains("ERROR"), "{}", log);
    assert!(log.contains("Input file not found: missing.csv"), "{}", log);
}

#[test]
fn missing_feed_url_exits_nonzero() {
    let dir = workspace(EXPORT);
    let output = run_cli(dir.path(), &["--data-dir", "data", "sync", "-f", "export.csv"]);
    assert_eq!(output.status.code(), Some(1), "{}", dump(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("B2B_FEED_URL"));

    let logs = files_with_prefix(&dir.path().join("data/logs"), "stock_sync_");
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert!(log.contains("Supplier feed URL is not configured"), "{}", log);
}

#[test]
fn no_archive_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("export.csv"), EXPORT).unwrap();
    let output = run_cli(
        dir.path(),
        &["--data-dir", "data", "sync", "--no-download", "-f", "export.csv"],
    );
    assert_eq!(output.status.code(), Some(1), "{}", dump(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No archived supplier feed"));
}

#[test]
fn config_command_prints_json() {
    let dir = workspace(EXPORT);
    let output = run_cli(
        dir.path(),
        &["--data-dir", "data", "config", "-f", "export.csv", "--json"],
    );
    assert!(output.status.success(), "{}", dump(&output));
    let value: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(value["export_exists"], true);
    assert_eq!(value["config"]["dialect"], "standard");
    assert!(value["config"]["feed_url"].is_null());
}
