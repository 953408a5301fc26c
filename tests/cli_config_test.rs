//! Integration tests for configuration resolution via CLI.

mod common;

use common::{TestEnv, stdout_json};
use predicates::prelude::*;
use std::fs;

#[test]
fn test_config_show_defaults() {
    let env = TestEnv::new();

    let output = env.tb().args(["config", "show"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["data_file_source"], "default");
    assert!(json["data_file"].as_str().unwrap().ends_with("tasks.json"));
    assert_eq!(json["output_format"], "json");
    assert_eq!(json["users"], serde_json::json!([]));
}

#[test]
fn test_config_show_never_prints_passwords() {
    let env = TestEnv::with_users();

    env.tb()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"username\":\"alice\""))
        .stdout(predicate::str::contains("wonderland").not());
}

#[test]
fn test_data_file_precedence() {
    let env = TestEnv::new();
    let from_config = env.work_dir.path().join("config-tasks.json");
    let from_env = env.work_dir.path().join("env-tasks.json");
    let from_flag = env.work_dir.path().join("flag-tasks.json");
    fs::write(
        env.config_path(),
        format!("data-file \"{}\"\n", from_config.display()),
    )
    .unwrap();

    let show = |cmd: &mut assert_cmd::Command| {
        let output = cmd.args(["config", "show"]).output().unwrap();
        stdout_json(&output)
    };

    let json = show(&mut env.tb());
    assert_eq!(json["data_file_source"], "config");

    let json = show(env.tb().env("TB_DATA_FILE", &from_env));
    assert_eq!(json["data_file"], from_env.display().to_string());
    assert_eq!(json["data_file_source"], "env:TB_DATA_FILE");

    let json = show(
        env.tb()
            .env("TB_DATA_FILE", &from_env)
            .args(["--data-file", from_flag.to_str().unwrap()]),
    );
    assert_eq!(json["data_file"], from_flag.display().to_string());
    assert_eq!(json["data_file_source"], "cli");
}

#[test]
fn test_output_format_from_config() {
    let env = TestEnv::new();
    fs::write(env.config_path(), "output-format \"human\"\n").unwrap();

    env.tb()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

#[test]
fn test_set_user_bootstrap_then_login() {
    let env = TestEnv::new();

    env.tb()
        .args([
            "config",
            "set-user",
            "root",
            "--new-password",
            "pw",
            "--role",
            "admin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"role\":\"admin\""));

    env.tb()
        .args(["-u", "root", "--password", "pw", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"role\":\"admin\""));

    // Once a user exists, guests can no longer add users.
    env.tb()
        .args(["config", "set-user", "mallory", "--new-password", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));
}

#[test]
fn test_invalid_config_is_reported() {
    let env = TestEnv::new();
    fs::write(env.config_path(), "user \"eve\" role=\"root\"\n").unwrap();

    env.tb()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error"));
}
