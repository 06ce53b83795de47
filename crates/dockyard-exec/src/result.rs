//! Command output and connection descriptors

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::KeySource;

/// Outcome of one command that ran to completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Wall-clock time of the command
    pub duration: Duration,
}

impl CommandResult {
    /// Build a result with no timing information
    #[must_use]
    pub fn new(status: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// stdout followed by stderr, skipping whichever is empty
    #[must_use]
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Where and as whom to open an SSH session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user
    pub user: String,
    /// Optional SSH private key path
    pub ssh_key: Option<String>,
    /// Environment variable holding a base64 private key, used when no path is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_env: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl ConnectionInfo {
    /// Create new connection info on the default port
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
            ssh_key: None,
            ssh_key_env: None,
        }
    }

    /// Set SSH key path
    #[must_use]
    pub fn with_ssh_key(mut self, path: impl Into<String>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    /// Read the key from a base64 environment variable at connect time
    #[must_use]
    pub fn with_ssh_key_env(mut self, var_name: impl Into<String>) -> Self {
        self.ssh_key_env = Some(var_name.into());
        self
    }

    /// Key to authenticate with; a recorded path wins over an env variable
    #[must_use]
    pub fn key_source(&self) -> Option<KeySource> {
        match (&self.ssh_key, &self.ssh_key_env) {
            (Some(path), _) => Some(KeySource::Path(path.into())),
            (None, Some(var)) => Some(KeySource::Env(var.clone())),
            (None, None) => None,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Whether the address points back at this machine
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}
