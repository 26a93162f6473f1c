//! Command-line integration tests
//!
//! Every test points the binary at its own config directory with the file
//! storage backend so nothing touches the system keyring or the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn soundscout(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("soundscout").unwrap();
    cmd.env("SOUNDSCOUT_CONFIG_DIR", dir.path())
        .env_remove("SOUNDSCOUT_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn config_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "storage = \"file\"\n").unwrap();
    dir
}

#[test]
fn test_help_lists_commands() {
    let dir = config_dir();
    soundscout(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("auth")
                .and(predicate::str::contains("sync"))
                .and(predicate::str::contains("likes"))
                .and(predicate::str::contains("nearby")),
        );
}

#[test]
fn test_auth_status_when_signed_out() {
    let dir = config_dir();
    soundscout(&dir)
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"))
        .stdout(predicate::str::contains("Storage: file"));
}

#[test]
fn test_auth_status_with_env_token() {
    let dir = config_dir();
    soundscout(&dir)
        .env("SOUNDSCOUT_ACCESS_TOKEN", "BQ-env-token")
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SOUNDSCOUT_ACCESS_TOKEN"));
}

#[test]
fn test_logout_when_signed_out() {
    let dir = config_dir();
    soundscout(&dir)
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not currently signed in"));
}

#[test]
fn test_cancelled_consent_is_reported() {
    let dir = config_dir();
    soundscout(&dir)
        .args([
            "auth",
            "complete",
            "soundscout://callback?error=access_denied",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cancelled"));
}

#[test]
fn test_complete_without_pending_login() {
    let dir = config_dir();
    soundscout(&dir)
        .args(["auth", "complete", "soundscout://callback?code=abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No sign-in in progress"));
}

#[test]
fn test_login_no_wait_prints_consent_url() {
    let dir = config_dir();
    soundscout(&dir)
        .args(["auth", "login", "--no-browser", "--no-wait"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://accounts.spotify.com/authorize?response_type=code",
        ))
        .stdout(predicate::str::contains("code_challenge_method=S256"));

    // The verifier survives the process
    let store = std::fs::read_to_string(dir.path().join("store.json")).unwrap();
    assert!(store.contains("pending_code_verifier"));
}

#[test]
fn test_config_set_and_get() {
    let dir = config_dir();
    soundscout(&dir)
        .args(["config", "set", "location", "43.07,-89.40"])
        .assert()
        .success();

    soundscout(&dir)
        .args(["config", "get", "location"])
        .assert()
        .success()
        .stdout(predicate::str::contains("43.07, -89.4"));

    soundscout(&dir)
        .args(["config", "set", "sync-interval", "0"])
        .assert()
        .failure();
}

#[test]
fn test_profile_commands_need_a_profile_store() {
    let dir = config_dir();
    soundscout(&dir)
        .args(["likes", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile store configured"));
}
