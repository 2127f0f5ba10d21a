//! Offline CLI commands: config hashing and shift suggestion.

use assert_cmd::Command;
use predicates::prelude::*;

fn fpt() -> Command {
    Command::cargo_bin("fpt").expect("binary built")
}

#[test]
fn config_hash_prints_hash_and_canonical_json() {
    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/base.yaml");
    fpt()
        .args(["config-hash", base])
        .assert()
        .success()
        .stdout(predicate::str::is_match("config_hash=[0-9a-f]{64}").expect("regex"))
        .stdout(predicate::str::contains("\"implausible_threshold\":1000.0"));
}

#[test]
fn config_with_db_password_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = dir.path().join("bad.yaml");
    std::fs::write(&cfg, "db:\n  url_env: \"postgres://u:secret@h/db\"\n").expect("write config");

    fpt()
        .args(["config-hash", cfg.to_str().expect("utf8 path")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("secret@").not());
}

#[test]
fn shift_suggestion_windows() {
    fpt()
        .args(["shift", "suggest", "--at", "2024-03-01 06:15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("record_date=2024-02-29"))
        .stdout(predicate::str::contains("shift=3"));

    fpt()
        .args(["shift", "suggest", "--at", "2024-03-01 14:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("record_date=2024-03-01"))
        .stdout(predicate::str::contains("shift=1"));

    fpt()
        .args(["shift", "suggest", "--at", "2024-03-01 22:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shift=2"));
}

#[test]
fn entry_commands_need_a_database_url() {
    fpt()
        .env_remove("FPT_DATABASE_URL")
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["entry", "prior", "--machine", "1", "--date", "2024-01-01", "--shift", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing env var FPT_DATABASE_URL"));
}
