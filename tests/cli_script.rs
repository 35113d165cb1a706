use std::fs;

use assert_cmd::Command;
use chrono::Utc;
use predicates::str::contains;
use tempfile::TempDir;

/// Data directory with a fresh rate cache so the binary never goes to the network.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let cache = format!(
        r#"{{"rates":{{"USD":1.0,"ARS":1000.0,"EUR":0.5}},"last_update":"{}"}}"#,
        Utc::now().to_rfc3339()
    );
    fs::write(dir.path().join("exchange_rates.json"), cache).unwrap();
    dir
}

fn shell(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("finance_tracker_cli").unwrap();
    cmd.env("FINANCE_TRACKER_CLI_SCRIPT", "1")
        .env("FINANCE_TRACKER_HOME", dir.path())
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn script_mode_records_and_lists_transactions() {
    let dir = data_dir();
    shell(&dir)
        .write_stdin("add 2025-01-05 25 EUR\nadd 2025-01-06 -10\nlist\nexit\n")
        .assert()
        .success()
        .stdout(contains("Recorded €25.00 on 2025-01-05."))
        .stdout(contains("NEGATIVE"))
        .stdout(contains("$50.00"));

    let json = fs::read_to_string(dir.path().join("transactions.json")).unwrap();
    assert!(json.contains("\"EUR\""));
}

#[test]
fn stats_and_convert_use_cached_rates() {
    let dir = data_dir();
    shell(&dir)
        .write_stdin("config principal ARS\nadd 2025-02-01 3\nstats\nconvert 100 USD ARS\nconvert 5 USD GBP\n")
        .assert()
        .success()
        .stdout(contains("Statistics (ARS)"))
        .stdout(contains("AR$3.00"))
        .stdout(contains("100.00 USD = 100,000.00 ARS"))
        .stdout(contains("amount left unchanged"));
}

#[test]
fn config_lists_data_files() {
    let dir = data_dir();
    shell(&dir)
        .write_stdin("config\n")
        .assert()
        .success()
        .stdout(contains("config.json"))
        .stdout(contains("transactions.json"));
}

#[test]
fn help_version_and_unknown_commands() {
    let dir = data_dir();
    shell(&dir)
        .write_stdin("help\nversion\nstast\nexit\n")
        .assert()
        .success()
        .stdout(contains("Available commands"))
        .stdout(contains("Finance Tracker v"))
        .stdout(contains("Suggestion: `stats`?"));
}

#[test]
fn invalid_arguments_do_not_stop_the_script() {
    let dir = data_dir();
    shell(&dir)
        .write_stdin("add yesterday 5\ndelete 3\nrates\n")
        .assert()
        .success()
        .stdout(contains("not a date"))
        .stdout(contains("Exchange rates (cache)"));
}
