//! Command execution trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs shell commands against a single, already addressed host.
///
/// A non-zero exit status is not an `Err`: it comes back as a
/// [`CommandResult`] and the caller decides what it means. `Err` is reserved
/// for transport problems (connect, auth, dropped channel, timeout).
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command and wait for it to finish
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a command, giving up after `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Whether a transport session is currently open
    fn is_connected(&self) -> bool {
        true
    }

    /// Short name of the transport, used in logs
    fn executor_type(&self) -> &'static str;
}
