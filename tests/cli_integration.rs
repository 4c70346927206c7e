//! Integration tests for the `tb` CLI.
//!
//! Each test creates a temp directory holding a task store, runs `tb` as a
//! subprocess, and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the built `tb` binary.
fn tb_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tb");
    path
}

/// Run `tb` with the given args in the given directory, returning (stdout, stderr, success).
fn run_tb(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tb_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("TB_LOG")
        .output()
        .expect("failed to run tb");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tb` expecting success, return stdout.
fn run_tb_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if !success {
        panic!("tb {:?} failed:\nstdout: {}\nstderr: {}", args, stdout, stderr);
    }
    stdout
}

/// Run `tb` expecting failure, return stderr.
fn run_tb_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if success {
        panic!("tb {:?} should have failed:\nstdout: {}", args, stdout);
    }
    stderr
}

/// Store with three tasks: #1 todo, #2 todo scheduled June 3..5, #3 review
fn create_test_board(root: &Path) {
    run_tb_ok(root, &["init"]);
    run_tb_ok(root, &["add", "Write release notes", "--priority", "high"]);
    run_tb_ok(root, &["add", "Draft blog post", "--start", "2025-06-03", "--days", "2"]);
    run_tb_ok(root, &["add", "Fix login", "--status", "review"]);
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_store_and_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tb_ok(tmp.path(), &["init"]);
    assert!(out.contains("created tasks.json"));
    assert!(out.lines().any(|l| l.starts_with("created") && l.ends_with("taskboard.toml")));

    let store = fs::read_to_string(tmp.path().join("tasks.json")).unwrap();
    assert!(store.contains("\"version\": 1"));
    assert!(tmp.path().join("taskboard.toml").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tb_ok(tmp.path(), &["init"]);
    let err = run_tb_err(tmp.path(), &["init"]);
    assert!(err.contains("error:"));
}

#[test]
fn test_commands_without_store_fail() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_tb_err(tmp.path(), &["list"]);
    assert!(err.contains("error:"));
    assert!(err.contains("tasks.json"));
}

#[test]
fn test_add_assigns_ids() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tb_ok(tmp.path(), &["init", "--no-config"]);
    assert_eq!(run_tb_ok(tmp.path(), &["add", "First"]).trim(), "added #1 First");
    assert_eq!(run_tb_ok(tmp.path(), &["add", "Second"]).trim(), "added #2 Second");
    assert!(!tmp.path().join("taskboard.toml").exists());
}

#[test]
fn test_add_rejects_bad_status() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tb_ok(tmp.path(), &["init"]);
    let err = run_tb_err(tmp.path(), &["add", "Nope", "--status", "blocked"]);
    assert!(err.contains("invalid status: blocked"));
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_list_and_filters() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());

    let out = run_tb_ok(tmp.path(), &["list"]);
    assert_eq!(out.lines().count(), 3);
    assert!(out.contains("[ ] #1 Write release notes (High)"));
    assert!(out.contains("#2 Draft blog post (Medium)  2025-06-03 00:00 .. 2025-06-05 00:00"));

    let out = run_tb_ok(tmp.path(), &["list", "--status", "review"]);
    assert_eq!(out.trim(), "[ ] #3 Fix login (Medium)");

    let out = run_tb_ok(tmp.path(), &["list", "--search", "BLOG"]);
    assert!(out.contains("#2"));
    assert_eq!(out.lines().count(), 1);
}

#[test]
fn test_list_reads_every_page() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["list", "--page-size", "1"]);
    assert_eq!(out.lines().count(), 3);
}

#[test]
fn test_list_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["list", "--json"]);
    let tasks: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(tasks.as_array().unwrap().len(), 3);
    assert_eq!(tasks[0]["priority"], "High");
    assert_eq!(tasks[2]["status"], "review");
    assert_eq!(tasks[1]["isCompleted"], false);
}

#[test]
fn test_board_groups_by_column() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["board"]);
    assert!(out.contains("To Do (2)"));
    assert!(out.contains("In Progress (0)"));
    assert!(out.contains("Review (1)"));
    assert!(!out.contains("Backlog"));

    let out = run_tb_ok(tmp.path(), &["board", "--json"]);
    let columns: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(columns[0]["id"], "todo");
    assert_eq!(columns[0]["tasks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_show() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["show", "2"]);
    assert!(out.starts_with("#2 Draft blog post"));
    assert!(out.contains("status: todo"));
    assert!(out.contains("start: 2025-06-03T00:00:00+00:00"));
}

#[test]
fn test_show_not_found() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let err = run_tb_err(tmp.path(), &["show", "99"]);
    assert!(err.contains("task not found: 99"));
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[test]
fn test_mv_single_and_many() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());

    let out = run_tb_ok(tmp.path(), &["mv", "1", "--to", "in_progress"]);
    assert_eq!(out.trim(), "Task moved to in_progress");

    let out = run_tb_ok(tmp.path(), &["mv", "1", "2", "--to", "done"]);
    assert_eq!(out.trim(), "2 tasks moved to done");

    let out = run_tb_ok(tmp.path(), &["list", "--status", "done"]);
    assert_eq!(out.lines().count(), 2);
}

#[test]
fn test_mv_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["mv", "3", "--to", "done", "--json"]);
    let result: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(result["ok"], true);
    assert_eq!(result["tasks"][0]["id"], 3);
    assert_eq!(result["tasks"][0]["status"], "done");
}

#[test]
fn test_mv_unknown_task() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let err = run_tb_err(tmp.path(), &["mv", "42", "--to", "done"]);
    assert!(err.contains("task not found: #42"));
}

#[test]
fn test_mv_with_some_unknown_ids_moves_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let before = fs::read_to_string(tmp.path().join("tasks.json")).unwrap();

    let err = run_tb_err(tmp.path(), &["mv", "1", "21", "99", "--to", "review"]);
    assert!(err.contains("task not found: #21, #99"));
    assert_eq!(fs::read_to_string(tmp.path().join("tasks.json")).unwrap(), before);
    let out = run_tb_ok(tmp.path(), &["show", "1"]);
    assert!(out.contains("status: todo"));
}

#[test]
fn test_board_and_mv_see_tasks_past_the_first_page() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    run_tb_ok(tmp.path(), &["add", "Update changelog", "--status", "review"]);
    run_tb_ok(tmp.path(), &["add", "Tag release"]);
    fs::write(tmp.path().join("taskboard.toml"), "[remote]\npage_size = 2\n").unwrap();

    let out = run_tb_ok(tmp.path(), &["board"]);
    assert!(out.contains("To Do (3)"));
    assert!(out.contains("Review (2)"));
    assert!(out.contains("#5 Tag release"));

    let out = run_tb_ok(tmp.path(), &["mv", "5", "--to", "done"]);
    assert_eq!(out.trim(), "Task moved to done");
    let out = run_tb_ok(tmp.path(), &["bulk", "complete", "1", "4"]);
    assert_eq!(out.trim(), "2 tasks marked as complete");
    let out = run_tb_ok(tmp.path(), &["show", "5"]);
    assert!(out.contains("status: done"));
}

#[test]
fn test_shift_snaps_and_keeps_duration() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());

    let out = run_tb_ok(tmp.path(), &["shift", "2", "1.3"]);
    assert_eq!(out.trim(), "Task rescheduled");
    let out = run_tb_ok(tmp.path(), &["show", "2"]);
    assert!(out.contains("start: 2025-06-04T12:00:00+00:00"));
    assert!(out.contains("end: 2025-06-06T12:00:00+00:00"));

    run_tb_ok(tmp.path(), &["shift", "2", "-2"]);
    let out = run_tb_ok(tmp.path(), &["show", "2"]);
    assert!(out.contains("start: 2025-06-02T12:00:00+00:00"));
}

#[test]
fn test_shift_below_half_step_does_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let before = fs::read_to_string(tmp.path().join("tasks.json")).unwrap();
    let out = run_tb_ok(tmp.path(), &["shift", "2", "0.2"]);
    assert!(out.contains("nothing to do"));
    assert_eq!(fs::read_to_string(tmp.path().join("tasks.json")).unwrap(), before);
}

#[test]
fn test_shift_unscheduled_task() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let err = run_tb_err(tmp.path(), &["shift", "1", "1"]);
    assert!(err.contains("task #1 is not scheduled"));
}

#[test]
fn test_bulk_complete() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["bulk", "complete", "1", "3"]);
    assert_eq!(out.trim(), "2 tasks marked as complete");

    let out = run_tb_ok(tmp.path(), &["list", "--completed"]);
    assert_eq!(out.lines().count(), 2);
    assert!(out.lines().all(|l| l.starts_with("[x]")));
}

#[test]
fn test_bulk_requires_value() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let err = run_tb_err(tmp.path(), &["bulk", "set_priority", "1"]);
    assert!(err.contains("invalid bulk action: set_priority"));

    run_tb_ok(tmp.path(), &["bulk", "set_priority", "1", "2", "--value", "low"]);
    let out = run_tb_ok(tmp.path(), &["show", "2"]);
    assert!(out.contains("priority: Low"));
}

// ---------------------------------------------------------------------------
// Rejected edits and the recovery log
// ---------------------------------------------------------------------------

#[test]
fn test_rejected_bulk_is_rolled_back_and_logged() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    fs::write(tmp.path().join("taskboard.toml"), "[remote]\nbulk_limit = 1\n").unwrap();
    let before = fs::read_to_string(tmp.path().join("tasks.json")).unwrap();

    let err = run_tb_err(tmp.path(), &["bulk", "delete", "1", "2"]);
    assert!(err.contains("error: Failed to perform bulk action: rejected: bulk action accepts between 1 and 1 ids"));
    assert!(!err.contains('\x1b'), "log output to a pipe must not carry colour codes");
    assert_eq!(fs::read_to_string(tmp.path().join("tasks.json")).unwrap(), before);

    let out = run_tb_ok(tmp.path(), &["recovery"]);
    assert!(out.contains("rollback: bulkPatch not applied"));
    assert!(out.contains("Tasks: 1, 2"));

    let out = run_tb_ok(tmp.path(), &["recovery", "--json"]);
    let entries: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["category"], "rollback");
    assert_eq!(entries[0]["fields"]["Query"], "tasks");
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    fs::write(tmp.path().join("taskboard.toml"), "[timeline]\nday_width = 0.0\n").unwrap();
    let err = run_tb_err(tmp.path(), &["board"]);
    assert!(err.contains("timeline.day_width must be positive"));
}

#[test]
fn test_recovery_empty_and_prune() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_board(tmp.path());
    let out = run_tb_ok(tmp.path(), &["recovery"]);
    assert_eq!(out.trim(), "recovery log is empty");

    fs::write(tmp.path().join("taskboard.toml"), "[remote]\nbulk_limit = 1\n").unwrap();
    run_tb_err(tmp.path(), &["bulk", "complete", "1", "2"]);
    let out = run_tb_ok(tmp.path(), &["recovery", "prune", "--all"]);
    assert_eq!(out.trim(), "removed 1 entries");
    let out = run_tb_ok(tmp.path(), &["recovery"]);
    assert_eq!(out.trim(), "recovery log is empty");
}

#[test]
fn test_recovery_path() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tb_ok(tmp.path(), &["recovery", "path"]);
    assert!(out.trim().ends_with(".recovery.log"));
}
