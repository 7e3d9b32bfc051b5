// tests/shell_tasks.rs

#![cfg(unix)]

use std::error::Error;
use std::fs;

use rundag::cli::{CliArgs, FailurePolicyArg};
use rundag::exec::run_shell_command;
use rundag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn args_for(config: &std::path::Path) -> CliArgs {
    CliArgs {
        config: config.to_path_buf(),
        concurrency: None,
        failure_policy: None,
        log_level: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn non_zero_exit_is_an_error() {
    init_tracing();
    let err = with_timeout(run_shell_command("t", "exit 3"))
        .await
        .expect_err("exit 3 must fail");
    assert!(err.to_string().contains("status 3"), "err: {err}");

    with_timeout(run_shell_command("t", "true"))
        .await
        .expect("true succeeds");
}

#[tokio::test]
async fn run_executes_task_file_in_planned_order() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("order.log");
    let config = dir.path().join("Rundag.toml");
    let log = log.display();

    fs::write(
        &config,
        format!(
            r#"
[scheduler]
concurrency = 1

[task.a]
cmd = "echo a >> {log}"
priority = 1

[task.b]
cmd = "echo b >> {log}"
priority = 3

[task.c]
cmd = "echo c >> {log}"
priority = 1

[task.d]
cmd = "echo d >> {log}"
priority = 9
after = ["c"]
"#
        ),
    )?;

    with_timeout(rundag::run(args_for(&config))).await?;

    let written = fs::read_to_string(dir.path().join("order.log"))?;
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, ["b", "a", "c", "d"]);
    Ok(())
}

#[tokio::test]
async fn run_fails_when_a_task_fails() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("after-ran");
    let config = dir.path().join("Rundag.toml");

    fs::write(
        &config,
        format!(
            r#"
[task.broken]
cmd = "exit 1"

[task.after]
cmd = "touch {}"
after = ["broken"]
"#,
            marker.display()
        ),
    )?;

    let mut args = args_for(&config);
    args.failure_policy = Some(FailurePolicyArg::Block);

    let err = with_timeout(rundag::run(args))
        .await
        .expect_err("a failed task fails the run");
    assert!(err.to_string().contains("1 task(s) failed, 1 skipped"), "err: {err}");
    assert!(!marker.exists());
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("ran");
    let config = dir.path().join("Rundag.toml");
    fs::write(
        &config,
        format!("[task.only]\ncmd = \"touch {}\"\n", marker.display()),
    )?;

    let mut args = args_for(&config);
    args.dry_run = true;
    with_timeout(rundag::run(args)).await?;

    assert!(!marker.exists());
    Ok(())
}
