use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

const TOKEN_VARS: [&str; 5] = ["HUGGING_FACE_TOKEN", "HF_TOKEN", "GITHUB_TOKEN", "GH_TOKEN", "AWS_TOKEN"];

/// Binary rooted at an isolated home, with CI and token variables cleared
fn mycli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mycli").unwrap();
    cmd.env("MYCLI_HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("CI")
        .env_remove("RUST_LOG")
        .env_remove("MYCLI_TELEMETRY_URL")
        .env_remove("DEBUG")
        .env_remove("MYCLI_DEBUG")
        .timeout(Duration::from_secs(20));
    for var in TOKEN_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn config_file(home: &TempDir) -> std::path::PathBuf {
    home.path().join(".mycli-config.json")
}

#[test]
fn test_version_and_help_exit_zero() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    mycli(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("greet"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_unknown_command_is_usage_error() {
    let home = TempDir::new().unwrap();
    mycli(&home).arg("frobnicate").assert().code(2);
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let home = TempDir::new().unwrap();
    mycli(&home).args(["docker", "deploy"]).assert().code(2);
}

#[test]
fn test_greet() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .args(["greet", "Ada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello, Ada!"));

    mycli(&home)
        .args(["greet", "Ada", "--uppercase"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HELLO, ADA!"));
}

#[test]
fn test_config_set_then_show() {
    let home = TempDir::new().unwrap();
    mycli(&home).args(["config", "set", "theme", "light"]).assert().success();

    mycli(&home)
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""theme":"light""#));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config_file(&home)).unwrap()).unwrap();
    assert_eq!(saved["theme"], "light");
}

#[test]
fn test_invalid_config_value_writes_nothing() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .args(["config", "set", "theme", "blue"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("blue"));
    assert!(!config_file(&home).exists());
}

#[test]
fn test_theme_switch_persists() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .args(["theme", "light"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Theme activated: light"));

    mycli(&home)
        .args(["theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current theme: light"));
}

#[test]
fn test_ci_refuses_prompts() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .args(["--ci", "auth", "login"])
        .timeout(Duration::from_secs(5))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--ci"));

    let mut cmd = mycli(&home);
    cmd.env("CI", "true")
        .current_dir(home.path())
        .args(["docker", "createfile"])
        .timeout(Duration::from_secs(5))
        .assert()
        .code(1);
    assert!(!home.path().join("Dockerfile").exists());
}

#[test]
fn test_json_output_is_single_line() {
    let home = TempDir::new().unwrap();
    let output = mycli(&home)
        .args(["--output", "json", "greet", "Ada"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim_end().lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["message"], "Hello, Ada!");
}

#[test]
fn test_json_errors_go_to_stderr() {
    let home = TempDir::new().unwrap();
    let output = mycli(&home)
        .args(["--output", "json", "config", "get", "nope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let value: serde_json::Value =
        serde_json::from_str(String::from_utf8(output.stderr).unwrap().trim()).unwrap();
    assert_eq!(value["status"], "error");
    assert_eq!(value["exitCode"], 1);
}

#[test]
fn test_json_mode_renders_usage_errors_as_json() {
    let home = TempDir::new().unwrap();
    let output = mycli(&home)
        .args(["--output", "json", "frobnicate"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.trim_end().lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(value["status"], "error");
    assert_eq!(value["category"], "usage");
    assert_eq!(value["exitCode"], 2);
    assert!(value["message"].as_str().unwrap().contains("frobnicate"));

    mycli(&home)
        .args(["--output=json", "--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_auth_status_never_prints_secrets() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .env("HF_TOKEN", "hf_supersecretvalue")
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("env:HF_TOKEN"))
        .stdout(predicate::str::contains("hf_supersecretvalue").not());
}

#[test]
fn test_ask_without_token_fails_with_hint() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .args(["--ci", "ask", "hello"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("HUGGING_FACE_TOKEN"));
}

#[test]
fn test_invocations_are_logged() {
    let home = TempDir::new().unwrap();
    mycli(&home).args(["greet", "Ada"]).assert().success();

    let log = std::fs::read_to_string(home.path().join(".mycli").join("logs").join("cli.log")).unwrap();
    let entry: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert_eq!(entry["level"], "INFO");
    assert_eq!(entry["message"], "Command invoked");
    assert_eq!(entry["meta"]["command"], "greet");
}

#[test]
fn test_invalid_log_level_is_usage_error() {
    let home = TempDir::new().unwrap();
    mycli(&home)
        .args(["--log-level", "mycli=verbose", "greet", "Ada"])
        .assert()
        .code(2);
}
