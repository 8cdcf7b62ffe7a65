//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, each subcommand
//! responds to `--help`, and `extract` rejects bad input before touching the
//! network.

#![allow(deprecated)] // cargo_bin deprecation; replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `reelgrab` binary, isolated from user config.
fn reelgrab() -> Command {
    let mut cmd = Command::cargo_bin("reelgrab").expect("binary 'reelgrab' should be built");
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("reelgrab-cli-tests"))
        .env_remove("REELGRAB_CONFIG")
        .env_remove("REELGRAB_RENDERER")
        .env_remove("REELGRAB_DEVICE")
        .env_remove("PORT")
        .env_remove("HOST");
    cmd
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    reelgrab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: reelgrab"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn version_flag_shows_semver() {
    reelgrab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^reelgrab \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    reelgrab()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: reelgrab"));
}

#[test]
fn invalid_subcommand_fails() {
    reelgrab()
        .arg("download")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn serve_help() {
    reelgrab()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--renderer"))
        .stdout(predicate::str::contains("--static-dir"));
}

#[test]
fn extract_help() {
    reelgrab()
        .args(["extract", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<URL>"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--device"));
}

#[test]
fn extract_requires_url() {
    reelgrab()
        .arg("extract")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn unknown_renderer_is_rejected_by_parser() {
    reelgrab()
        .args(["extract", "https://instagram.com/reel/x", "--renderer", "firefox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'firefox'"));
}

// ─── Validation (no network) ─────────────────────────────────────────────────

#[test]
fn extract_rejects_unsupported_host() {
    reelgrab()
        .args(["extract", "https://example.com/video"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Only Instagram / Facebook URLs supported",
        ));
}

#[test]
fn extract_rejects_malformed_url() {
    reelgrab()
        .args(["extract", "instagram.com/reel/abc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid URL"));
}

#[test]
fn extract_json_prints_error_body() {
    reelgrab()
        .args(["extract", "--json", "https://example.com/video"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""error": "Only Instagram / Facebook URLs supported""#));
}

#[test]
fn unknown_device_is_a_config_error() {
    reelgrab()
        .args(["extract", "--device", "toaster", "https://instagram.com/reel/x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown device 'toaster'"));
}

#[test]
fn missing_explicit_config_file_fails() {
    reelgrab()
        .args([
            "--config",
            "/nonexistent/reelgrab.toml",
            "extract",
            "https://instagram.com/reel/x",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read /nonexistent/reelgrab.toml"));
}

#[test]
fn config_file_allow_list_is_used() {
    let path = std::env::temp_dir().join(format!("reelgrab-cli-allow-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[[allow]]\nname = \"TikTok\"\npattern = \"tiktok.com\"\n",
    )
    .unwrap();

    let assert = reelgrab()
        .arg("--config")
        .arg(&path)
        .args(["extract", "https://instagram.com/reel/x"])
        .assert();
    std::fs::remove_file(&path).ok();

    assert
        .code(2)
        .stderr(predicate::str::contains("Only TikTok URLs supported"));
}
