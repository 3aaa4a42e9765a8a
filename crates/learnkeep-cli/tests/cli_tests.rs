//! CLI integration tests using assert_cmd.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TYPICAL_SESSION: &str = r#"{
  "game_id": "memory",
  "rounds_total": 5,
  "rounds_completed": 5,
  "attempts": 6,
  "correct_total": 5,
  "correct_first_attempt": 4,
  "duration_ms": 40000
}"#;

fn learnkeep(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("learnkeep").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("LEARNKEEP_DATA_DIR")
        .env_remove("RUST_LOG");
    cmd
}

/// A temp dir with a config pointing at `./data`.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("learnkeep.toml"), "data_dir = \"./data\"\n").unwrap();
    dir
}

fn write_profiles(dir: &Path, json: &str) {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("profiles.json"), json).unwrap();
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    learnkeep(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created learnkeep.toml"));

    let content = fs::read_to_string(dir.path().join("learnkeep.toml")).unwrap();
    assert!(content.contains("backup_retention = 30"));
}

#[test]
fn init_skips_existing_config() {
    let dir = workspace();

    learnkeep(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));

    let content = fs::read_to_string(dir.path().join("learnkeep.toml")).unwrap();
    assert_eq!(content, "data_dir = \"./data\"\n");
}

#[test]
fn score_prints_breakdown() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("session.json"), TYPICAL_SESSION).unwrap();

    learnkeep(dir.path())
        .args(["score", "--session", "session.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 85"));
}

#[test]
fn score_json_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("session.json"), TYPICAL_SESSION).unwrap();

    let output = learnkeep(dir.path())
        .args(["score", "--session", "session.json", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["score"], 85);
}

#[test]
fn score_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    learnkeep(dir.path())
        .args(["score", "--session", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn learners_lists_profiles() {
    let dir = workspace();
    write_profiles(
        dir.path(),
        r#"[{"id": "l1", "display_name": "Ana", "points": 120,
             "assigned_games": ["memory"],
             "difficulty": {"memory": {"automatic_difficulty": 3}}}]"#,
    );

    learnkeep(dir.path())
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana"))
        .stdout(predicate::str::contains("120"))
        .stdout(predicate::str::contains("memory@3"));
}

#[test]
fn learners_reports_corruption() {
    let dir = workspace();
    write_profiles(dir.path(), "{ not json");

    learnkeep(dir.path())
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("No learners yet."))
        .stderr(predicate::str::contains("profiles.json was unreadable"));
}

#[test]
fn record_stores_session_and_awards_points() {
    let dir = workspace();
    write_profiles(
        dir.path(),
        r#"[{"id": "l1", "display_name": "Ana", "assigned_games": ["memory"]}]"#,
    );
    let session = TYPICAL_SESSION.replacen('{', "{\n  \"learner_id\": \"l1\",", 1);
    fs::write(dir.path().join("session.json"), session).unwrap();

    learnkeep(dir.path())
        .args(["record", "--session", "session.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 85"))
        .stdout(predicate::str::contains("stored"));

    let profiles = fs::read_to_string(dir.path().join("data/profiles.json")).unwrap();
    let profiles: serde_json::Value = serde_json::from_str(&profiles).unwrap();
    assert_eq!(profiles[0]["points"], 85);

    let sessions = fs::read_to_string(dir.path().join("data/sessions.json")).unwrap();
    let sessions: serde_json::Value = serde_json::from_str(&sessions).unwrap();
    assert_eq!(sessions.as_array().unwrap().len(), 1);
}

#[test]
fn recording_the_same_session_twice_fails() {
    let dir = workspace();
    write_profiles(
        dir.path(),
        r#"[{"id": "l1", "display_name": "Ana", "assigned_games": ["memory"]}]"#,
    );
    let session =
        TYPICAL_SESSION.replacen('{', "{\n  \"id\": \"s-1\",\n  \"learner_id\": \"l1\",", 1);
    fs::write(dir.path().join("session.json"), session).unwrap();

    learnkeep(dir.path())
        .args(["record", "--session", "session.json"])
        .assert()
        .success();
    learnkeep(dir.path())
        .args(["record", "--session", "session.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session already stored: s-1"));

    let profiles = fs::read_to_string(dir.path().join("data/profiles.json")).unwrap();
    let profiles: serde_json::Value = serde_json::from_str(&profiles).unwrap();
    assert_eq!(profiles[0]["points"], 85);
}

#[test]
fn backup_then_restore() {
    let dir = workspace();
    write_profiles(dir.path(), r#"[{"id": "l1", "display_name": "Ana"}]"#);

    learnkeep(dir.path())
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created snapshot"));

    let backups = dir.path().join("data/backups");
    let name = fs::read_dir(&backups)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .next()
        .unwrap();

    write_profiles(dir.path(), r#"[{"id": "l2", "display_name": "Ben"}]"#);

    learnkeep(dir.path())
        .arg("snapshots")
        .assert()
        .success()
        .stdout(predicate::str::contains(name.as_str()));

    learnkeep(dir.path())
        .args(["restore", "--snapshot", &name])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored"));

    learnkeep(dir.path())
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana"))
        .stdout(predicate::str::contains("Ben").not());
}

#[test]
fn restore_unknown_snapshot_exits_nonzero() {
    let dir = workspace();

    learnkeep(dir.path())
        .args(["restore", "--snapshot", "20200101T000000.000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("restore failed"));
}

#[test]
fn restore_rejects_path_traversal() {
    let dir = workspace();

    learnkeep(dir.path())
        .args(["restore", "--snapshot", "../.."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("restore failed"));
}

#[test]
fn recompute_with_no_plans() {
    let dir = workspace();

    learnkeep(dir.path())
        .arg("recompute")
        .assert()
        .success()
        .stdout(predicate::str::contains("No objectives to recompute."));
}

#[test]
fn explicit_config_flag() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("custom.toml"), "data_dir = \"./elsewhere\"\n").unwrap();

    learnkeep(dir.path())
        .args(["--config", "custom.toml", "learners"])
        .assert()
        .success();
    assert!(dir.path().join("elsewhere/profiles.json").exists());
}

#[test]
fn data_dir_env_overrides_config() {
    let dir = workspace();

    learnkeep(dir.path())
        .env("LEARNKEEP_DATA_DIR", dir.path().join("from-env"))
        .arg("learners")
        .assert()
        .success();
    assert!(dir.path().join("from-env/profiles.json").exists());
    assert!(!dir.path().join("data/profiles.json").exists());
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("learnkeep.toml"), "backup_retention = 0\n").unwrap();

    learnkeep(dir.path())
        .arg("learners")
        .assert()
        .failure()
        .stderr(predicate::str::contains("backup_retention"));
}
