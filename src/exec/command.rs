// src/exec/command.rs

//! Shell-command executors, used by the `rundag` binary.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::exec::JobFuture;

/// Build an executor closure that runs `cmd` through the platform shell.
pub fn shell_executor(task: String, cmd: String) -> impl FnOnce() -> JobFuture + Send + 'static {
    move || -> JobFuture { Box::pin(async move { run_shell_command(&task, &cmd).await }) }
}

/// Run a shell command, streaming its output into the log, and fail on a
/// non-zero exit status.
pub async fn run_shell_command(task: &str, cmd: &str) -> Result<()> {
    info!(task = %task, cmd = %cmd, "starting task process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{task}'"))?;

    // Always consume both pipes so buffers don't fill.
    if let Some(stdout) = child.stdout.take() {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task, "stdout: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{task}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(task = %task, exit_code = code, success = status.success(), "task process exited");

    if !status.success() {
        bail!("command `{cmd}` exited with status {code}");
    }
    Ok(())
}
