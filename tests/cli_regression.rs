// Regression tests for the skein binary.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

/// A fresh scratch directory for one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("skein-cli-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn cli_parse_prints_outline() {
    let dir = scratch("outline");
    let file = dir.join("story.ink");
    fs::write(&file, "Hello\n* Choice\n- Gathered\n").unwrap();

    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.arg("parse").arg(&file);
    cmd.assert()
        .success()
        .stdout(contains("Story story.ink").and(contains("Choice")).and(contains("Gather")));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_parse_json() {
    let dir = scratch("json");
    let file = dir.join("story.ink");
    fs::write(&file, "Hello\n").unwrap();

    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.arg("parse").arg("--json").arg(&file);
    cmd.assert().success().stdout(contains(r#""text": "Hello""#));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_reports_miette_diagnostics_on_error() {
    let dir = scratch("errors");
    let file = dir.join("bad.ink");
    fs::write(&file, "Fine\n{x: a|b|c}\n").unwrap();

    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.arg("check").arg(&file);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("skein::parse::error").and(contains("Expected one or two alternatives")))
        .stdout(contains("FAILED"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_check_walks_directories() {
    let dir = scratch("walk");
    fs::create_dir_all(dir.join("chapters")).unwrap();
    fs::write(dir.join("main.ink"), "INCLUDE chapters/one.ink\nStart\n").unwrap();
    fs::write(dir.join("chapters/one.ink"), "== one ==\nOne\n").unwrap();
    fs::write(dir.join("notes.txt"), "{{{ not ink").unwrap();

    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.arg("check").arg(&dir);
    cmd.assert()
        .success()
        .stdout(contains("main.ink").and(contains("one.ink")).and(contains("Checked 2 file(s), 0 with errors")));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_warnings_as_errors_from_config() {
    let dir = scratch("config");
    let file = dir.join("story.ink");
    let config = dir.join("skein.yaml");
    fs::write(&file, "* \n").unwrap();
    fs::write(&config, "warnings_as_errors: true\n").unwrap();

    let mut plain = Command::cargo_bin("skein").unwrap();
    plain.arg("check").arg(&file);
    plain.assert().success().stderr(contains("Choice is completely empty"));

    let mut strict = Command::cargo_bin("skein").unwrap();
    strict.arg("check").arg(&file).arg("--config").arg(&config);
    strict.assert().failure().code(1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_missing_file_fails() {
    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.arg("tree").arg("definitely/not/here.ink");
    cmd.assert().failure().code(2).stderr(contains("skein::io").or(contains("failed to read")));
}
