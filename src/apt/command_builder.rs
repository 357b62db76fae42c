//! Builder for `apt-get` / `apt-cache` invocations.
//!
//! Every apt call goes through [`AptCommand`] so that timeouts, logging and
//! error mapping behave the same way for each operation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::DEFAULT_COMMAND_TIMEOUT;
use crate::core::CredoError;

/// Fluent builder for one apt program invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use credo_cli::apt::command_builder::AptCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let output = AptCommand::depends("python3")
///     .with_context("python3")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
///
/// New commands default to a 10 minute timeout, captured output and the
/// process' working directory. `LC_ALL=C` is always set so output parsing does
/// not depend on the host locale.
#[derive(Debug, Clone)]
pub struct AptCommand {
    /// `apt-get` or `apt-cache`
    program: String,

    /// Arguments, including the operation as the first element
    args: Vec<String>,

    /// Working directory; `apt-get download` writes into it
    current_dir: Option<PathBuf>,

    /// Extra environment variables
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Item name included in log lines
    context: Option<String>,
}

impl AptCommand {
    /// Start a command for `program` (`apt-get` or `apt-cache`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: vec![("LC_ALL".to_string(), "C".to_string())],
            timeout_duration: Some(DEFAULT_COMMAND_TIMEOUT),
            context: None,
        }
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for this invocation.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set a custom timeout (None for no timeout).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Tag log lines with `context` (usually the package name).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The operation name used in errors: the first non-flag argument.
    fn operation(&self) -> String {
        self.args
            .iter()
            .find(|arg| !arg.starts_with('-'))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// The command line as it would be typed in a shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the command and capture its output.
    ///
    /// Non-zero exit and timeout both map to [`CredoError::AptCommandError`].
    pub async fn execute(self) -> Result<AptCommandOutput> {
        let start = std::time::Instant::now();
        let command_line = self.command_line();
        let operation = self.operation();
        let ctx = self.context.clone().unwrap_or_else(|| operation.clone());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(target: "apt", "({}) Executing command: {}", ctx, command_line);

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| format!("Failed to execute {command_line}"))?
            } else {
                tracing::warn!(
                    target: "apt",
                    "({}) Command timed out after {} seconds: {}",
                    ctx,
                    duration.as_secs(),
                    command_line
                );
                return Err(CredoError::AptCommandError {
                    operation,
                    stderr: format!(
                        "Command timed out after {} seconds. Another apt process may hold the \
                         dpkg lock, or the mirrors are unreachable. Try running it manually: {}",
                        duration.as_secs(),
                        command_line
                    ),
                }
                .into());
            }
        } else {
            output_future.await.with_context(|| format!("Failed to execute {command_line}"))?
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "apt",
                "({}) Command failed with exit code: {:?}",
                ctx,
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "apt", "({}) Error: {}", ctx, stderr.trim());
            }
            return Err(CredoError::AptCommandError {
                operation,
                stderr: if stderr.trim().is_empty() {
                    stdout
                } else {
                    stderr
                },
            }
            .into());
        }

        if !stdout.is_empty() {
            tracing::trace!(target: "apt", "({}) {}", ctx, stdout.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "apt::perf",
                "({}) {} took {:.2}s",
                ctx,
                operation,
                elapsed.as_secs_f64()
            );
        }

        Ok(AptCommandOutput {
            stdout,
            stderr,
        })
    }
}

/// Captured output of a successful apt command.
#[derive(Debug, Clone, Default)]
pub struct AptCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

// Convenience builders for the operations credo needs

impl AptCommand {
    /// `apt-get update`
    pub fn update() -> Self {
        Self::new("apt-get").arg("update")
    }

    /// `apt-get install --dry-run -y <name>`
    pub fn install_dry(name: &str) -> Self {
        Self::new("apt-get").args(["install", "--dry-run", "-y", name])
    }

    /// `apt-cache depends <name>`
    pub fn depends(name: &str) -> Self {
        Self::new("apt-cache").args(["depends", name])
    }

    /// `apt-get download <name>`, run inside `dest`.
    pub fn download(name: &str, dest: &Path) -> Self {
        Self::new("apt-get").args(["download", name]).current_dir(dest)
    }

    /// `apt-get install -y <target>` where `target` is a package name or a
    /// path to a `.deb` file.
    pub fn install(target: &str) -> Self {
        Self::new("apt-get")
            .args(["install", "-y", target])
            .env("DEBIAN_FRONTEND", "noninteractive")
    }
}
