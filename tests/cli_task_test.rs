//! Integration tests for task operations via CLI.
//!
//! These tests verify that:
//! - `tb create/list/show/update/delete` work and persist to the snapshot
//! - status, notes, complete and reopen change only what they should
//! - checklist add/toggle/remove/clear address items by index
//! - JSON and human-readable output formats are correct

mod common;

use common::{TestEnv, stdout_json};
use predicates::prelude::*;

// === Create / List / Show ===

#[test]
fn test_list_empty_board() {
    let env = TestEnv::new();

    env.tb()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":0"));
    assert!(!env.data_file().exists());
}

#[test]
fn test_create_task_json() {
    let env = TestEnv::with_users();

    env.tb_admin()
        .args([
            "create",
            "Design",
            "--start",
            "2024-01-01",
            "--finish",
            "2024-01-10",
            "--category",
            "Planning",
            "--item",
            "Draft spec",
            "--item",
            "Review spec",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":0"))
        .stdout(predicate::str::contains("\"Task\":\"Design\""))
        .stdout(predicate::str::contains("\"Status\":\"未開始\""))
        .stdout(predicate::str::contains("\"Created_by\":\"alice\""));

    let snapshot = env.snapshot();
    let tasks = snapshot.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["Start"], "2024-01-01");
    assert_eq!(tasks[0]["Finish"], "2024-01-10");
    assert_eq!(tasks[0]["Checklist"][0]["item"], "Draft spec");
    assert_eq!(tasks[0]["Checklist"][0]["completed"], false);
}

#[test]
fn test_create_assigns_increasing_ids() {
    let env = TestEnv::with_users();
    env.create_task("a", &[]);
    env.create_task("b", &[]);
    env.tb_admin().args(["delete", "0"]).assert().success();
    env.create_task("c", &[]);

    let snapshot = env.snapshot();
    let ids: Vec<u64> = snapshot
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_create_rejects_finish_before_start() {
    let env = TestEnv::with_users();

    env.tb_admin()
        .args([
            "create", "Backwards", "--start", "2024-02-01", "--finish", "2024-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before start date"));
    assert!(!env.data_file().exists());
}

#[test]
fn test_create_requires_dates() {
    let env = TestEnv::with_users();

    env.tb_admin()
        .args(["create", "Undated"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_show_task_with_progress() {
    let env = TestEnv::with_users();
    env.create_task("Design", &["one", "two", "three", "four"]);
    env.tb_admin()
        .args(["checklist", "toggle", "0", "1"])
        .assert()
        .success();

    let output = env.tb().args(["show", "0"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["Progress"]["total"], 4);
    assert_eq!(json["Progress"]["completed"], 1);
    assert_eq!(json["Progress"]["percentage"], 25.0);
}

#[test]
fn test_show_missing_task() {
    let env = TestEnv::new();

    env.tb()
        .args(["show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: 42"));
}

#[test]
fn test_list_human() {
    let env = TestEnv::with_users();
    env.create_task("Design", &["a", "b"]);

    env.tb()
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 task(s):"))
        .stdout(predicate::str::contains("[0] Design  2024-01-01 .. 2024-01-10"));
}

#[test]
fn test_list_filter_by_status() {
    let env = TestEnv::with_users();
    env.create_task("a", &[]);
    env.create_task("b", &[]);
    env.tb_admin().args(["status", "1", "已完成"]).assert().success();

    let output = env.tb().args(["list", "--status", "completed"]).output().unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["count"], 1);
    assert_eq!(json["tasks"][0]["Task"], "b");
}

// === Update / Delete ===

#[test]
fn test_update_task_fields() {
    let env = TestEnv::with_users();
    env.create_task("Design", &[]);

    env.tb_admin()
        .args(["update", "0", "--name", "Design v2", "--category", "Build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Task\":\"Design v2\""));

    let snapshot = env.snapshot();
    assert_eq!(snapshot[0]["Category"], "Build");
    assert!(snapshot[0]["last_modified"].is_string());
}

#[test]
fn test_delete_task() {
    let env = TestEnv::with_users();
    env.create_task("a", &[]);
    env.create_task("b", &[]);

    env.tb_admin()
        .args(["delete", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\":true"));

    let snapshot = env.snapshot();
    assert_eq!(snapshot.as_array().unwrap().len(), 1);
    assert_eq!(snapshot[0]["Task"], "b");
}

// === Status / Notes / Complete / Reopen ===

#[test]
fn test_status_change_persists() {
    let env = TestEnv::with_users();
    env.create_task("Design", &[]);

    env.tb_admin()
        .args(["status", "0", "進行中"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\":true"));
    assert_eq!(env.snapshot()[0]["Status"], "進行中");

    env.tb_admin()
        .args(["status", "0", "in-progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\":false"));
}

#[test]
fn test_notes_unicode() {
    let env = TestEnv::with_users();
    env.create_task("Design", &[]);

    env.tb_admin()
        .args(["notes", "0", "需要審核"])
        .assert()
        .success();
    assert_eq!(env.snapshot()[0]["Notes"], "需要審核");
}

#[test]
fn test_complete_then_reopen() {
    let env = TestEnv::with_users();
    env.create_task("Design", &["a", "b"]);

    env.tb_admin().args(["complete", "0"]).assert().success();
    let snapshot = env.snapshot();
    assert_eq!(snapshot[0]["Status"], "已完成");
    assert_eq!(snapshot[0]["Checklist"][0]["completed"], true);
    assert_eq!(snapshot[0]["Checklist"][1]["completed"], true);

    env.tb_admin().args(["reopen", "0"]).assert().success();
    let snapshot = env.snapshot();
    assert_eq!(snapshot[0]["Status"], "進行中");
    assert_eq!(snapshot[0]["Checklist"][0]["completed"], true);
}

// === Checklist ===

#[test]
fn test_checklist_toggle_twice_restores() {
    let env = TestEnv::with_users();
    env.create_task("Design", &["a"]);

    env.tb_admin().args(["checklist", "toggle", "0", "0"]).assert().success();
    assert_eq!(env.snapshot()[0]["Checklist"][0]["completed"], true);
    env.tb_admin().args(["checklist", "toggle", "0", "0"]).assert().success();
    assert_eq!(env.snapshot()[0]["Checklist"][0]["completed"], false);
}

#[test]
fn test_checklist_remove_shifts_items() {
    let env = TestEnv::with_users();
    env.create_task("Design", &["A", "B", "C"]);

    env.tb_admin()
        .args(["checklist", "remove", "0", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"remaining\":2"));

    let snapshot = env.snapshot();
    assert_eq!(snapshot[0]["Checklist"][0]["item"], "A");
    assert_eq!(snapshot[0]["Checklist"][1]["item"], "C");
}

#[test]
fn test_checklist_index_out_of_range() {
    let env = TestEnv::with_users();
    env.create_task("Design", &["A"]);

    env.tb_admin()
        .args(["checklist", "toggle", "0", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_checklist_add_and_clear() {
    let env = TestEnv::with_users();
    env.create_task("Design", &[]);

    env.tb_admin()
        .args(["checklist", "add", "0", "Write tests"])
        .assert()
        .success();
    assert_eq!(env.snapshot()[0]["Checklist"][0]["item"], "Write tests");

    env.tb_admin().args(["checklist", "clear", "0"]).assert().success();
    assert_eq!(env.snapshot()[0]["Checklist"], serde_json::json!([]));
}

// === Summary ===

#[test]
fn test_summary() {
    let env = TestEnv::with_users();
    env.create_task("a", &[]);
    env.create_task("b", &[]);
    env.tb_admin().args(["complete", "0"]).assert().success();

    let output = env.tb().arg("summary").output().unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["total"], 2);
    assert_eq!(json["completed"], 1);
    assert_eq!(json["not_started"], 1);
    assert_eq!(json["completion_rate"], 50.0);
    assert_eq!(json["by_category"]["Planning"], 2);
}

#[test]
fn test_corrupt_snapshot_reads_as_empty() {
    let env = TestEnv::new();
    std::fs::write(env.data_file(), "{ not json").unwrap();

    env.tb()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":0"));
}
