//! Error types for dockyard-exec

use std::time::Duration;

use thiserror::Error;

/// Transport-level failures while running a command on a host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Could not reach the host
    #[error("connection to {host} failed: {reason}")]
    ConnectionFailed {
        /// Address that was dialed
        host: String,
        /// Underlying failure
        reason: String,
    },

    /// Host rejected our credentials
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Channel closed before the command reported an exit status
    ///
    /// This is what a command that reboots the host usually looks like.
    #[error("channel closed before exit status was received")]
    Disconnected,

    /// Command did not finish in time
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// SSH key could not be resolved or loaded
    #[error("SSH key error: {0}")]
    SshKey(String),

    /// Local process could not be spawned
    #[error("failed to spawn process: {0}")]
    Spawn(String),

    /// I/O error on the channel or process pipes
    #[error("I/O error: {0}")]
    Io(String),

    /// No session has been established
    #[error("not connected")]
    NotConnected,
}

impl ExecError {
    /// Whether the remote side went away mid-command
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ExecError::Disconnected | ExecError::NotConnected)
    }
}
