#![forbid(unsafe_code)]
use assert_cmd::Command;
use chrono::{Duration, DurationRound, Utc};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Répertoire avec configuration, export de calendrier et annuaire.
fn setup(items: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("events.json"), format!(r#"{{"items":[{items}]}}"#)).unwrap();
    fs::write(
        dir.path().join("contacts.json"),
        r#"[{"name":"Alice","email":"alice@example.com","phone":"+33100"}]"#,
    )
    .unwrap();
    let cfg = dir.path().join("roster.json");
    fs::write(
        &cfg,
        r#"{"name":"ops","calendar_id":"ops@calendar.example.com",
            "all_day_offset":9,
            "fallback_email":"oncall@example.com","fallback_phone":"+33999",
            "events_path":"events.json","contacts_path":"contacts.json"}"#,
    )
    .unwrap();
    (dir, cfg)
}

fn item(who: &str, from_h: i64, to_h: i64) -> String {
    let now = Utc::now().duration_trunc(Duration::minutes(1)).unwrap();
    format!(
        r#"{{"summary":"{who}","start":{{"dateTime":"{}"}},"end":{{"dateTime":"{}"}}}}"#,
        (now + Duration::hours(from_h)).to_rfc3339(),
        (now + Duration::hours(to_h)).to_rfc3339()
    )
}

fn cli(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("permanence-cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[test]
fn current_prints_person_on_duty_and_writes_cache() {
    let items = [item("Alice", -1, 2), item("Bob", 2, 5)].join(",");
    let (dir, cfg) = setup(&items);

    cli(&cfg)
        .arg("current")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice\talice@example.com\t+33100"));
    assert!(dir.path().join("ops.cache").exists());
}

#[test]
fn missing_contact_uses_fallback() {
    let items = [item("Bob", -1, 2)].join(",");
    let (_dir, cfg) = setup(&items);

    cli(&cfg)
        .args(["current", "--fields", "name,email"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bob\toncall@example.com"));
}

#[test]
fn stats_flags_holes() {
    let items = [item("Alice", -1, 2), item("Bob", 3, 5)].join(",");
    let (_dir, cfg) = setup(&items);

    cli(&cfg)
        .arg("stats")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("cache.fragments\t2"))
        .stderr(predicate::str::contains("hole:"));
}

#[test]
fn stats_on_contiguous_roster_succeeds() {
    let items = [item("Alice", -1, 2), item("Bob", 2, 5)].join(",");
    let (_dir, cfg) = setup(&items);

    cli(&cfg)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("cache.fragments\t1"))
        .stdout(predicate::str::contains("cache.shifts\t2"));
}

#[test]
fn inverted_query_is_rejected() {
    let items = [item("Alice", -1, 2)].join(",");
    let (_dir, cfg) = setup(&items);

    cli(&cfg)
        .args([
            "query",
            "--start",
            "2030-01-02T00:00:00Z",
            "--end",
            "2030-01-01T00:00:00Z",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid range"));
}

#[test]
fn update_without_calendar_or_cache_fails() {
    let (dir, cfg) = setup("");
    fs::remove_file(dir.path().join("events.json")).unwrap();

    cli(&cfg).arg("update").assert().failure();
}

fn fixed(who: &str, start: &str, end: &str) -> String {
    format!(r#"{{"summary":"{who}","start":{{"dateTime":"{start}"}},"end":{{"dateTime":"{end}"}}}}"#)
}

#[test]
fn report_lists_people_per_day() {
    let items = [
        fixed("Alice", "2030-01-01T09:00:00Z", "2030-01-02T09:00:00Z"),
        fixed("Bob", "2030-01-02T09:00:00Z", "2030-01-03T09:00:00Z"),
    ]
    .join(",");
    let (_dir, cfg) = setup(&items);

    cli(&cfg)
        .args(["report", "--from", "2030-01-01", "--to", "2030-01-03"])
        .assert()
        .success()
        .stdout("2030-01-01\tAlice\n2030-01-02\tBob\n2030-01-03\t-\n");
}

#[test]
fn update_then_table_dumps_the_cache() {
    let items = [
        fixed("Alice", "2030-01-01T09:00:00Z", "2030-01-02T09:00:00Z"),
        fixed("Bob", "2030-01-02T09:00:00Z", "2030-01-03T09:00:00Z"),
    ]
    .join(",");
    let (dir, cfg) = setup(&items);

    cli(&cfg)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache updated for ops"));
    assert!(dir.path().join("ops.cache").exists());

    cli(&cfg)
        .args(["table", "--fields", "name,email"])
        .assert()
        .success()
        .stdout("Alice\talice@example.com\nBob\t-\n");
}
