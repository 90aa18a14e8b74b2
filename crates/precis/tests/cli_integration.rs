//! CLI integration tests for the Precis command-line interface.
//!
//! These tests verify help output, argument parsing, configuration
//! discovery and the record commands against a temporary database. None of
//! them load a model.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the precis binary, isolated from the user's config
/// and data directories.
fn precis(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("precis").unwrap();
    cmd.current_dir(home)
        .env("PRECIS_CONFIG_DIR", home.join("config"))
        .env("PRECIS_DATABASE_PATH", home.join("precis.db"))
        .env_remove("PRECIS_CONFIG")
        .env_remove("PRECIS_MODELS_DIR");
    cmd
}

/// Insert a pending record directly into the test database.
fn seed_record(home: &Path, url: &str) -> i64 {
    let store = precis_store::SummaryStore::open(home.join("precis.db")).unwrap();
    store.create_placeholder(url).unwrap().id
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Precis"))
        .stdout(predicate::str::contains("summarization"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("precis"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("retry"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("edit"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("config"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Parsing Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_no_subcommand_fails() {
    let home = TempDir::new().unwrap();
    precis(home.path()).assert().failure();
}

#[test]
fn test_detect_requires_input() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .arg("detect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_detect_text_and_file_conflict() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["detect", "hello", "--file", "article.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_show_requires_numeric_id() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["show", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn test_record_ids_must_be_positive() {
    let home = TempDir::new().unwrap();
    for args in [
        vec!["show", "0"],
        vec!["retry", "0"],
        vec!["delete", "0"],
        vec!["edit", "0", "--summary", "x"],
    ] {
        precis(home.path())
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value '0'"));
    }
}

#[test]
fn test_edit_requires_a_change() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["edit", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_submit_rejects_non_http_url() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["submit", "ftp://example.com/article"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid URL"));

    // nothing was stored
    precis(home.path())
        .args(["--json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Record Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_list_empty_database() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No records found"));
    assert!(home.path().join("precis.db").exists());
}

#[test]
fn test_show_missing_record() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record 42 not found"));
}

#[test]
fn test_delete_missing_record() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["delete", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record 42 not found"));
}

#[test]
fn test_retry_missing_record() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["retry", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record 7 not found"));
}

#[test]
fn test_edit_replaces_summary_and_url() {
    let home = TempDir::new().unwrap();
    let id = seed_record(home.path(), "https://example.com/a");

    precis(home.path())
        .args(["edit", &id.to_string(), "--summary", "Council approves budget."])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated"))
        .stdout(predicate::str::contains("Council approves budget."))
        .stdout(predicate::str::contains("https://example.com/a"));

    precis(home.path())
        .args(["--json", "edit", &id.to_string(), "--url", "https://example.com/b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/b"))
        .stdout(predicate::str::contains("Council approves budget."));
}

#[test]
fn test_edit_rejects_non_http_url() {
    let home = TempDir::new().unwrap();
    let id = seed_record(home.path(), "https://example.com/a");

    precis(home.path())
        .args(["edit", &id.to_string(), "--url", "ftp://example.com/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid URL"));

    precis(home.path())
        .args(["show", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/a"));
}

#[test]
fn test_edit_missing_record() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["edit", "5", "--summary", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record 5 not found"));
}

#[test]
fn test_summarize_does_not_open_database() {
    let home = TempDir::new().unwrap();
    let article = home.path().join("article.txt");
    std::fs::write(&article, "The city council approved a new budget.").unwrap();

    precis(home.path())
        .env("PRECIS_MODELS_DIR", home.path().join("models"))
        .args(["summarize", "--file", article.to_str().unwrap()])
        .assert()
        .failure();
    assert!(!home.path().join("precis.db").exists());
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config files loaded"))
        .stdout(predicate::str::contains("facebook/bart-large-cnn"))
        .stdout(predicate::str::contains("IlyaGusev/mbart_ru_sum_gazeta"))
        .stdout(predicate::str::contains("PRECIS_DATABASE_PATH"));
}

#[test]
fn test_config_show_reads_project_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("precis.toml"),
        "[models.summarizers.de]\nmodel = \"local/german\"\nstrategy = \"extractive\"\n",
    )
    .unwrap();

    precis(home.path())
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local/german"))
        .stdout(predicate::str::contains("precis.toml"));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["--config", "missing.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_config_init_and_which() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    assert!(home.path().join("config").join("config.toml").exists());

    precis(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    precis(home.path())
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ loaded"))
        .stdout(predicate::str::contains("1 config file(s) loaded."));
}

#[test]
fn test_config_path_honors_env() {
    let home = TempDir::new().unwrap();
    precis(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
