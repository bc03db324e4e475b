//! The `bundle-updater` binary's offline commands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(root: &Path) -> std::path::PathBuf {
    let path = root.join("updater.toml");
    let content = format!(
        "check_interval_secs = 60\n\n[paths]\ndata_dir = {:?}\nresources_dir = {:?}\n",
        root.join("data").display().to_string(),
        root.join("resources").display().to_string()
    );
    fs::write(&path, content).unwrap();
    path
}

fn updater() -> Command {
    let mut cmd = Command::cargo_bin("bundle-updater").unwrap();
    cmd.env_remove("BUNDLE_UPDATER_CONFIG").env("BUNDLE_UPDATER_NO_PROGRESS", "1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    updater()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_status_fresh_install() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    updater()
        .arg("status")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed:"))
        .stdout(predicate::str::contains("none"));
}

#[test]
fn test_status_json_reports_installed_hash() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    fs::create_dir_all(temp.path().join("data")).unwrap();
    fs::write(
        temp.path().join("data").join("abyui-release.json"),
        r#"{"client":{"hash":"abc","app":{"urls":[]}}}"#,
    )
    .unwrap();

    let output = updater()
        .args(["status", "--json"])
        .env("BUNDLE_UPDATER_CONFIG", &config)
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["installed_hash"], "abc");
    assert_eq!(json["config_present"], true);
    assert!(json["staged_bytes"].is_null());
}

#[test]
fn test_config_init_then_show() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("conf").join("updater.toml");

    updater()
        .args(["config", "init"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created updater config"));
    assert!(config.exists());

    updater()
        .args(["config", "show"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("check_interval_secs = 300"))
        .stdout(predicate::str::contains("backend = \"gitlab\""));
}

#[test]
fn test_invalid_config_fails_with_message() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("updater.toml");
    fs::write(&config, "mirrors = []\n").unwrap();

    updater()
        .arg("status")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("at least one tier"));
}
