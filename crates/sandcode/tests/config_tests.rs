//! Configuration command tests.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn sandcode(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sandcode"));
    command
        .args(args)
        .current_dir(cwd)
        .env("HOME", cwd)
        .env("XDG_CONFIG_HOME", cwd.join(".config"))
        .env_remove("SANDCODE_CONFIG_CONTENT");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute command")
}

#[test]
fn test_config_without_sources() {
    let dir = TempDir::new().unwrap();
    let output = sandcode(dir.path(), &["config"], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration sources:"));
    assert!(stdout.contains("(none)"));
}

#[test]
fn test_config_lists_project_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("sandcode.json"),
        r#"{ "server": { "port": 9100 } }"#,
    )
    .unwrap();

    let output = sandcode(dir.path(), &["config"], &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sandcode.json"));
    assert!(stdout.contains("9100"));
}

#[test]
fn test_config_from_environment_content() {
    let dir = TempDir::new().unwrap();
    let output = sandcode(
        dir.path(),
        &["config"],
        &[("SANDCODE_CONFIG_CONTENT", r#"{ "log_level": "warn" }"#)],
    );

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"warn\""));
}

#[test]
fn test_extra_config_file_wins() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("sandcode.json"),
        r#"{ "server": { "port": 9100 } }"#,
    )
    .unwrap();
    let extra = dir.path().join("extra.jsonc");
    std::fs::write(&extra, "{ /* ci */ \"server\": { \"port\": 9200 } }").unwrap();

    let output = sandcode(
        dir.path(),
        &["--config", extra.to_str().unwrap(), "config"],
        &[],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("extra.jsonc"));
    assert!(stdout.contains("9200"));
    assert!(!stdout.contains("9100"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("sandcode.json"), "{ not json").unwrap();

    let output = sandcode(dir.path(), &["config"], &[]);
    assert!(!output.status.success());
}
