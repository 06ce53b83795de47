//! Local command execution using `tokio::process`
//!
//! Used when a machine record points at this host, and in tests.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::RemoteExecutor;

/// Runs commands through `sh -c` on this machine
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn execute(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        // kill_on_drop so a timed-out command does not outlive us
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn(e.to_string()))?
            .wait_with_output()
            .await
            .map_err(|e| ExecError::Io(e.to_string()))?;

        let result = CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        };

        if result.success() {
            debug!(status = result.status, duration = ?result.duration, "command completed");
        } else {
            warn!(
                status = result.status,
                stderr = %result.stderr.trim_end(),
                "command exited non-zero"
            );
        }

        Ok(result)
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    #[instrument(skip(self), level = "debug")]
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.execute(cmd).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        timeout(timeout_duration, self.execute(cmd))
            .await
            .map_err(|_| ExecError::Timeout {
                timeout: timeout_duration,
            })?
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let result = LocalExecutor::new().run("printf overlay").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "overlay");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let result = LocalExecutor::new().run("echo nope >&2; exit 3").await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 3);
        assert_eq!(result.stderr.trim(), "nope");
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let result = LocalExecutor::new()
            .run_with_timeout("sleep 5", Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ExecError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_pipes_are_supported() {
        let result = LocalExecutor::new()
            .run("printf '127.0.0.1 localhost\\n127.0.1.1 old\\n' | sed /127.0.1.1/d")
            .await
            .unwrap();

        assert_eq!(result.stdout, "127.0.0.1 localhost\n");
    }
}
