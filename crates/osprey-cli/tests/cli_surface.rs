use assert_cmd::Command;
use predicates::prelude::*;

fn osprey() -> Command {
    Command::cargo_bin("osprey").unwrap()
}

#[test]
fn test_top_level_help_lists_commands() {
    osprey()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("click"))
        .stdout(predicate::str::contains("input"))
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("profile"));
}

#[test]
fn test_click_help_documents_disambiguation_index() {
    osprey()
        .args(["click", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--index"))
        .stdout(predicate::str::contains("--within"));
}

#[test]
fn test_wait_help_documents_gone_mode() {
    osprey()
        .args(["wait", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--gone"))
        .stdout(predicate::str::contains("--timeout-ms"));
}

#[test]
fn test_snapshot_help_documents_full_flag() {
    osprey()
        .args(["snapshot", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--full"));
}

#[test]
fn test_open_without_browser_fails_with_status_line() {
    // Port 1 is never a debugging endpoint; the command must fail fast with
    // a structured status prefix and a non-zero exit code.
    osprey()
        .args(["open", "http://example.com", "--port", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR:"))
        .stderr(predicate::str::contains("port 1"));
}

#[test]
fn test_snapshot_without_browser_fails() {
    osprey()
        .args(["snapshot", "--port", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}
