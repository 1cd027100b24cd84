//! Black-box CLI behavior: exit codes and the validation error format.

use assert_cmd::Command;
use tempfile::TempDir;

fn ixado(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ixado").expect("binary builds");
    cmd.current_dir(dir.path())
        .env("IXADO_CLI_LOG_FILE", dir.path().join("cli.log"))
        .env("HOME", dir.path());
    cmd
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).to_string()
}

fn stderr_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).to_string()
}

#[test]
fn init_succeeds_with_exit_zero() {
    let dir = TempDir::new().unwrap();
    let assert = ixado(&dir).args(["init", "IxADO"]).assert().success();
    assert!(stdout_of(&assert).contains("Initialized project IxADO"));
}

#[test]
fn validation_errors_print_usage_and_hint_and_exit_one() {
    let dir = TempDir::new().unwrap();
    ixado(&dir).args(["init", "IxADO"]).assert().success();

    let assert = ixado(&dir)
        .args(["phase", "create", "", "feature/p1"])
        .assert()
        .failure()
        .code(1);
    let stderr = stderr_of(&assert);
    assert!(
        stderr.contains("Error: phase name must not be empty"),
        "{stderr}"
    );
    assert!(
        stderr.contains("  Usage: ixado phase create <name> <branch>"),
        "{stderr}"
    );
    assert!(stderr.contains("  Hint:  "), "{stderr}");
}

#[test]
fn missing_state_file_is_a_plain_error() {
    let dir = TempDir::new().unwrap();
    let assert = ixado(&dir).arg("status").assert().failure().code(1);
    let stderr = stderr_of(&assert);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(!stderr.contains("Usage:"), "{stderr}");
}
