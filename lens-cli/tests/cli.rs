use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn lens(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lens").unwrap();
    cmd.env_remove("LENS_REMOTE")
        .env_remove("RUST_LOG")
        .arg("--path")
        .arg(root);
    cmd
}

fn record(root: &Path, text: &str, extra: &[&str]) -> String {
    let output = lens(root)
        .args(["--quiet", "record", "--text", text])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success(), "record failed: {output:?}");
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn list_json(root: &Path, extra: &[&str]) -> serde_json::Value {
    let output = lens(root)
        .args(["list", "--json"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success(), "list failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Init ─────────────────────────────────────────────────────────

#[test]
fn init_creates_config_and_refuses_to_clobber() {
    let dir = tempfile::tempdir().unwrap();

    lens(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized Technique Lens"));
    assert!(dir.path().join(".lens/config.toml").exists());
    assert!(dir.path().join(".lens/history.db").exists());

    lens(dir.path())
        .arg("init")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    lens(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".lens")).unwrap();
    std::fs::write(dir.path().join(".lens/config.toml"), "[view]\nbadge_limit = 0\n").unwrap();

    lens(dir.path()).arg("list").assert().code(2);
}

// ── Record / list ────────────────────────────────────────────────

#[test]
fn list_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let first = record(dir.path(), "first message", &[]);
    let second = record(dir.path(), "second message", &["-t", "T1:Spoofing:0.9"]);

    let entries = list_json(dir.path(), &[]);
    let ids: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [second.as_str(), first.as_str()]);
    assert_eq!(entries[0]["techniques"][0]["name"], "Spoofing");
}

#[test]
fn list_table_and_search() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path(), "phishing email", &["-t", "T1:Spoofing:0.8", "-t", "T2:Urgency:0.6"]);
    record(dir.path(), "quarterly invoice", &[]);

    lens(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Your saved analysis results"))
        .stdout(predicate::str::contains("70%"))
        .stdout(predicate::str::contains("—"));

    let hits = list_json(dir.path(), &["--search", "SPOOF"]);
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["inputText"], "phishing email");

    lens(dir.path())
        .args(["list", "--search", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No Results Found"));
}

#[test]
fn empty_history_shows_call_to_action() {
    let dir = tempfile::tempdir().unwrap();
    lens(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No History Yet"))
        .stdout(predicate::str::contains("Start Analyzing"));
}

#[test]
fn record_rejects_blank_text() {
    let dir = tempfile::tempdir().unwrap();
    lens(dir.path())
        .args(["record", "--text", "   "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Analysis rejected"));
}

// ── Delete / clear ───────────────────────────────────────────────

#[test]
fn delete_removes_only_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let keep = record(dir.path(), "keep me", &[]);
    let gone = record(dir.path(), "delete me", &[]);

    lens(dir.path())
        .args(["delete", &gone])
        .assert()
        .success()
        .stderr(predicate::str::contains("Deleted"));

    let entries = list_json(dir.path(), &[]);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["id"], keep.as_str());

    lens(dir.path())
        .args(["delete", "no-such-id"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No history entry"));
}

#[test]
fn clear_empties_history() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path(), "one", &[]);
    record(dir.path(), "two", &[]);

    lens(dir.path())
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 entries"))
        .stderr(predicate::str::contains("History Cleared"));
    assert!(list_json(dir.path(), &[]).as_array().unwrap().is_empty());
}

// ── Guest mode ───────────────────────────────────────────────────

#[test]
fn guest_history_is_separate_and_cleared_on_logout() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path(), "saved analysis", &[]);
    record(dir.path(), "guest analysis", &["--guest"]);

    let guest = list_json(dir.path(), &["--guest"]);
    assert_eq!(guest.as_array().unwrap().len(), 1);
    assert_eq!(guest[0]["inputText"], "guest analysis");

    let saved = list_json(dir.path(), &[]);
    assert_eq!(saved.as_array().unwrap().len(), 1);
    assert_eq!(saved[0]["inputText"], "saved analysis");

    lens(dir.path())
        .args(["--guest", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session history (temporary)"));

    lens(dir.path()).arg("logout").assert().success();
    assert!(list_json(dir.path(), &["--guest"]).as_array().unwrap().is_empty());
    assert_eq!(list_json(dir.path(), &[]).as_array().unwrap().len(), 1);
}

#[test]
fn corrupt_guest_session_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join(".lens/session");
    std::fs::create_dir_all(&session).unwrap();
    std::fs::write(
        session.join("guest.json"),
        r#"{"analysis-history": "not an array"}"#,
    )
    .unwrap();

    assert!(list_json(dir.path(), &["--guest"]).as_array().unwrap().is_empty());
}

// ── Export ───────────────────────────────────────────────────────

#[test]
fn export_writes_csv_and_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let id = record(dir.path(), "phishing email", &["-t", "T1:Spoofing:0.8"]);
    let out = dir.path().join("out");

    let output = lens(dir.path())
        .args(["export", "--format", "csv", "--dir"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    let path = String::from_utf8(output.stdout).unwrap();
    let csv = std::fs::read_to_string(path.trim()).unwrap();
    assert!(csv.starts_with("id,timestamp,input_text"));
    assert!(csv.contains(&id));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Export Started"));
    assert!(stderr.contains("Export Complete"));

    let output = lens(dir.path())
        .args(["--quiet", "export", "--format", "pdf", "--id", &id, "--dir"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    let path = String::from_utf8(output.stdout).unwrap();
    let pdf = std::fs::read(path.trim()).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
}

#[test]
fn export_of_unknown_entry_fails_with_export_code() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path(), "something", &[]);

    lens(dir.path())
        .args(["export", "--id", "missing"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Export Failed"));
}

// ── Remote ───────────────────────────────────────────────────────

#[test]
fn unreachable_remote_exits_with_service_code() {
    let dir = tempfile::tempdir().unwrap();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    lens(dir.path())
        .args(["--remote", &format!("http://127.0.0.1:{port}"), "list"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Failed to load history"));
}
