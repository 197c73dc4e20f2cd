//! Command runner
//!
//! Every external call goes through [`CommandRunner`]. It prints the
//! quoted command line before acting, turns mutating calls into no-ops in
//! dry-run mode, and retries the control plane's "operation in progress"
//! conflicts.

use crate::command::CommandLine;
use crate::error::{CloudError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn into_error(self, command: &CommandLine) -> CloudError {
        CloudError::CommandFailed {
            command: command.to_string(),
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// Executes command lines. The seam between the runner and the OS.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs with inherited stdout/stderr and returns the exit code.
    async fn status(&self, command: &CommandLine) -> Result<i32>;

    /// Runs with captured stdout/stderr.
    async fn output(&self, command: &CommandLine) -> Result<CommandOutput>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    fn command(&self, command: &CommandLine) -> Command {
        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments());
        if command.stdin_input().is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }
        cmd
    }

    fn spawn_error(command: &CommandLine, source: std::io::Error) -> CloudError {
        CloudError::Spawn {
            program: command.program().to_string(),
            source,
        }
    }

    async fn feed_stdin(
        child: &mut tokio::process::Child,
        command: &CommandLine,
    ) -> Result<()> {
        if let (Some(input), Some(mut stdin)) = (command.stdin_input(), child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| Self::spawn_error(command, e))?;
            // dropping closes the pipe so the child sees EOF
            drop(stdin);
        }
        Ok(())
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn status(&self, command: &CommandLine) -> Result<i32> {
        let mut child = self
            .command(command)
            .spawn()
            .map_err(|e| Self::spawn_error(command, e))?;
        Self::feed_stdin(&mut child, command).await?;
        let status = child
            .wait()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;
        Ok(status.code().unwrap_or(-1))
    }

    async fn output(&self, command: &CommandLine) -> Result<CommandOutput> {
        let mut child = self
            .command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(command, e))?;
        Self::feed_stdin(&mut child, command).await?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Retry budget for [`CommandRunner::run_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts; `0` means a single plain run without capture
    pub max_attempts: u32,
    /// Pause before each retry
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// 8 attempts, 20s apart: long enough for a conflicting revision
    /// operation on the control plane to finish.
    pub const fn control_plane() -> Self {
        Self::new(8, Duration::from_secs(20))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::control_plane()
    }
}

/// Runs command lines with audit logging and dry-run support.
#[derive(Clone)]
pub struct CommandRunner {
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
}

impl CommandRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, dry_run: bool) -> Self {
        Self { executor, dry_run }
    }

    /// Runner backed by real processes.
    pub fn process(dry_run: bool) -> Self {
        Self::new(Arc::new(ProcessExecutor), dry_run)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn log(&self, command: &CommandLine) {
        println!("CMD: {}", command);
        tracing::debug!(program = command.program(), dry_run = self.dry_run, "Running command");
    }

    /// Runs with inherited output; non-zero exit is an error.
    pub async fn run(&self, command: &CommandLine) -> Result<()> {
        self.log(command);
        if self.dry_run {
            return Ok(());
        }
        self.run_inherited(command).await
    }

    /// Runs and returns trimmed stdout. Dry-run returns an empty string.
    pub async fn capture(&self, command: &CommandLine) -> Result<String> {
        self.log(command);
        if self.dry_run {
            return Ok(String::new());
        }
        self.run_captured(command).await
    }

    /// Read-only capture that also runs in dry-run mode.
    ///
    /// Only for calls that cannot change remote state (show, list).
    pub async fn query(&self, command: &CommandLine) -> Result<String> {
        self.log(command);
        self.run_captured(command).await
    }

    /// Runs and returns the full output without judging the exit code.
    ///
    /// For callers that treat some failures as success. Dry-run returns a
    /// successful empty output.
    pub async fn output(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.log(command);
        if self.dry_run {
            return Ok(CommandOutput::default());
        }
        self.executor.output(command).await
    }

    /// Runs, retrying while the control plane reports a conflicting
    /// operation in progress.
    ///
    /// Any other failure is returned on the attempt it happens. When the
    /// attempts run out, the last in-progress failure is returned.
    pub async fn run_with_retry(&self, command: &CommandLine, policy: RetryPolicy) -> Result<()> {
        self.log(command);
        if self.dry_run {
            return Ok(());
        }
        if policy.max_attempts == 0 {
            return self.run_inherited(command).await;
        }

        let mut attempt = 1;
        loop {
            let output = self.executor.output(command).await?;
            if output.success() {
                print_trimmed(&output.stdout);
                print_trimmed(&output.stderr);
                return Ok(());
            }

            let err = output.into_error(command);
            if !err.is_operation_in_progress() || attempt >= policy.max_attempts {
                return Err(err);
            }

            println!(
                "OperationInProgress, retrying in {}s ({}/{})",
                policy.delay.as_secs(),
                attempt,
                policy.max_attempts
            );
            tokio::time::sleep(policy.delay).await;
            attempt += 1;
        }
    }

    async fn run_inherited(&self, command: &CommandLine) -> Result<()> {
        let exit_code = self.executor.status(command).await?;
        if exit_code != 0 {
            return Err(CommandOutput {
                exit_code,
                ..Default::default()
            }
            .into_error(command));
        }
        Ok(())
    }

    async fn run_captured(&self, command: &CommandLine) -> Result<String> {
        let output = self.executor.output(command).await?;
        if !output.success() {
            return Err(output.into_error(command));
        }
        Ok(output.stdout.trim().to_string())
    }
}

fn print_trimmed(text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        println!("{}", trimmed);
    }
}
