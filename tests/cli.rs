//! End-to-end tests driving the djin binary

mod common;

use assert_cmd::Command;
use common::{create_test_config, version_header, write_file};
use predicates::prelude::*;
use serial_test::serial;
use std::path::Path;

fn djin(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("djin").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("NO_COLOR", "1")
        .env_remove("DJIN_LOG");
    cmd
}

fn hello_config() -> String {
    format!(
        "{}tasks:\n  hello:\n    local:\n      run:\n        - echo Hello\n",
        version_header()
    )
}

#[test]
fn test_run_hello() {
    let (dir, _) = create_test_config(&hello_config());

    djin(dir.path())
        .arg("hello")
        .assert()
        .success()
        .stdout("Hello\n");
}

#[test]
fn test_version() {
    let dir = tempfile::TempDir::new().unwrap();

    for flag in ["--version", "-v"] {
        djin(dir.path())
            .arg(flag)
            .assert()
            .success()
            .stdout(format!("{}\n", djin::VERSION));
    }
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::TempDir::new().unwrap();

    djin(dir.path())
        .arg("hello")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("[FileNotFoundError]"))
        .stderr(predicate::str::contains("djin.yml"));
}

#[test]
fn test_failing_task_exits_non_zero() {
    let (dir, _) = create_test_config(&format!(
        "{}tasks:\n  broken:\n    local:\n      run: exit 3\n",
        version_header()
    ));

    djin(dir.path())
        .arg("broken")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[TaskError] Task 'broken' failed"));
}

#[test]
fn test_custom_files_and_args() {
    let dir = tempfile::TempDir::new().unwrap();
    write_file(
        dir.path(),
        "tasks/base.yml",
        &format!(
            "{}tasks:\n  greet:\n    local:\n      run: echo base\n",
            version_header()
        ),
    );
    write_file(
        dir.path(),
        "tasks/override.yml",
        &format!(
            "{}tasks:\n  greet:\n    aliases: [g]\n    local:\n      run: echo {{{{args}}}}\n",
            version_header()
        ),
    );

    djin(dir.path())
        .args([
            "-f",
            "tasks/base.yml",
            "--file",
            "tasks/override.yml",
            "g",
            "--",
            "hi",
            "there",
        ])
        .assert()
        .success()
        .stdout("hi there\n");
}

#[test]
fn test_help_lists_tasks() {
    let (dir, _) = create_test_config(&format!(
        "{}tasks:\n  hello:\n    local:\n      run: echo Hello\n  test:\n    description: Runs the suite\n    local:\n      run: rspec\n",
        version_header()
    ));

    djin(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Runs: echo Hello"))
        .stdout(predicate::str::contains("Runs the suite"))
        .stdout(predicate::str::contains("remote-config"));
}

#[test]
fn test_legacy_tasks_deprecation() {
    let (dir, _) = create_test_config(&format!(
        "{}hello:\n  local:\n    run: echo Hello\n",
        version_header()
    ));

    djin(dir.path())
        .arg("hello")
        .assert()
        .success()
        .stdout("Hello\n")
        .stderr(predicate::str::contains("[DEPRECATED]"));
}

#[test]
fn test_invalid_task_syntax() {
    let (dir, _) = create_test_config(&format!(
        "{}tasks:\n  nothing:\n    description: no command\n",
        version_header()
    ));

    djin(dir.path())
        .arg("nothing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[InvalidTaskSyntax] nothing:"));
}

#[test]
fn test_missing_remote_include_warns() {
    let (dir, _) = create_test_config(&format!(
        "{}include:\n  - file: tasks.yml\n    git: https://github.com/org/shared.git\n{}",
        version_header(),
        hello_config().trim_start_matches(&version_header())
    ));

    djin(dir.path())
        .arg("hello")
        .assert()
        .success()
        .stdout("Hello\n")
        .stderr(predicate::str::contains("[WARNING]"))
        .stderr(predicate::str::contains("remote-config fetch"));
}

#[test]
fn test_remote_config_clear_all() {
    let (dir, _) = create_test_config(&hello_config());
    let remote = dir.path().join(".djin/remote/shared@master");
    std::fs::create_dir_all(&remote).unwrap();

    djin(dir.path())
        .args(["remote-config", "clear", "--all"])
        .assert()
        .success();

    assert!(!dir.path().join(".djin/remote").exists());
}

#[test]
fn test_remote_config_runs_with_stale_cache() {
    let (dir, _) = create_test_config(&format!(
        "{}include:\n  - file: tasks.yml\n    git: https://github.com/org/shared.git\n  - file: tasks.yml\n    git: https://github.com/org/future.git\n{}",
        version_header(),
        hello_config().trim_start_matches(&version_header())
    ));
    let stale = dir.path().join(".djin/remote/shared@master");
    std::fs::create_dir_all(&stale).unwrap();
    write_file(
        &dir.path().join(".djin/remote/future@master"),
        "tasks.yml",
        "djin_version: '99.0.0'\ntasks: {}\n",
    );

    djin(dir.path())
        .arg("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[FileNotFoundError]"));

    djin(dir.path())
        .args(["remote-config", "fetch"])
        .assert()
        .stderr(predicate::str::contains("[FileNotFoundError]").not())
        .stderr(predicate::str::contains("[VersionNotSupportedError]").not());

    djin(dir.path())
        .args(["remote-config", "clear"])
        .assert()
        .success();

    assert!(!stale.exists());
    assert!(!dir.path().join(".djin/remote/future@master").exists());
}

#[test]
fn test_attached_file_option() {
    let dir = tempfile::TempDir::new().unwrap();
    write_file(dir.path(), "custom.yml", &hello_config());

    djin(dir.path())
        .args(["-fcustom.yml", "hello"])
        .assert()
        .success()
        .stdout("Hello\n");
}

#[test]
fn test_unknown_dependency_warns() {
    let (dir, _) = create_test_config(&format!(
        "{}  all:\n    depends_on: [hello, missing]\n",
        hello_config()
    ));

    djin(dir.path())
        .arg("all")
        .assert()
        .success()
        .stdout("Hello\n")
        .stderr(predicate::str::contains(
            "[WARNING] Task 'all' depends on unknown task 'missing', skipping it",
        ));
}

#[test]
fn test_task_named_like_builtin_warns() {
    let (dir, _) = create_test_config(&format!(
        "{}  remote-config:\n    local:\n      run: echo shadowed\n",
        hello_config()
    ));

    djin(dir.path())
        .arg("hello")
        .assert()
        .success()
        .stdout("Hello\n")
        .stderr(predicate::str::contains(
            "[WARNING] Task name 'remote-config' is already taken by another command, skipping it",
        ));
}

#[test]
#[serial]
fn test_default_image_named_after_current_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let project = dir.path().join("myapp");
    std::fs::create_dir_all(&project).unwrap();
    let original = std::env::current_dir().unwrap();

    std::env::set_current_dir(&project).unwrap();
    let interpreter = djin::runner::Interpreter::for_current_dir();
    std::env::set_current_dir(original).unwrap();

    let (config_dir, path) = create_test_config(&format!(
        "{}tasks:\n  test:\n    docker:\n      build: .\n      run: rake\n",
        version_header()
    ));
    let config = djin::config::ConfigLoader::new(config_dir.path().join("remote"))
        .load(&path)
        .unwrap();
    let tasks = interpreter.interpret(&config).unwrap();

    assert_eq!(
        tasks[0].build_command.as_deref(),
        Some("docker build . -t djin_myapp_test")
    );
}
