use assert_cmd::Command;
use predicates::prelude::*;

fn osprey() -> Command {
    Command::cargo_bin("osprey").unwrap()
}

#[test]
fn test_profile_command_help() {
    osprey()
        .args(["profile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage profile leases"))
        .stdout(predicate::str::contains("acquire"))
        .stdout(predicate::str::contains("release"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_profile_acquire_prints_port_in_range() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");

    let output = osprey()
        .args(["profile", "acquire", "github-alice"])
        .arg("--registry")
        .arg(&registry)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let status_line = stdout
        .lines()
        .find(|l| l.starts_with("OK: profile github-alice leased on port "))
        .expect("missing OK status line");
    let port: u16 = status_line.rsplit(' ').next().unwrap().parse().unwrap();
    assert!((9222..=9299).contains(&port));
}

#[test]
fn test_profile_acquire_is_deterministic_after_reclaim() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");

    // No browser ever listens on the leased port, so the first lease is
    // stale by the time of the second acquire and must be reclaimed.
    for _ in 0..2 {
        osprey()
            .args(["profile", "acquire", "github-alice"])
            .arg("--registry")
            .arg(&registry)
            .assert()
            .success()
            .stdout(predicate::str::contains("leased on port"));
    }

    let content = std::fs::read_to_string(&registry).unwrap();
    assert_eq!(content.lines().count(), 1, "stale lease was not purged");
}

#[test]
fn test_verbose_flag_surfaces_library_logs() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");

    osprey()
        .args(["--verbose", "profile", "acquire", "github-alice"])
        .arg("--registry")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("lease acquired"));
}

#[test]
fn test_profile_release_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");

    for _ in 0..2 {
        osprey()
            .args(["profile", "release", "never-acquired"])
            .arg("--registry")
            .arg(&registry)
            .assert()
            .success()
            .stdout(predicate::str::contains("OK: profile never-acquired released"));
    }
}

#[test]
fn test_profile_list_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");

    osprey()
        .args(["profile", "list"])
        .arg("--registry")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: 0 lease(s)"));
}

#[test]
fn test_profile_list_flags_listener_without_devtools() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");

    // The lease's pid is alive and its port listens, but the listener is a
    // plain socket, not a debugging endpoint.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::fs::write(
        &registry,
        format!("scratch:{}:{}:0\n", port, std::process::id()),
    )
    .unwrap();

    osprey()
        .args(["profile", "list"])
        .arg("--registry")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("[live, no devtools]"));
}

#[test]
fn test_profile_list_shows_stale_entry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("leases");
    std::fs::write(&registry, "github-alice:9250:4294967294:0\n").unwrap();

    osprey()
        .args(["profile", "list"])
        .arg("--registry")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("github-alice"))
        .stdout(predicate::str::contains("[stale]"))
        .stdout(predicate::str::contains("OK: 1 lease(s)"));
}
