//! SSH command execution using russh

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{ChannelMsg, Disconnect, client};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecError;
use crate::keys::{KeySource, ResolvedKey};
use crate::result::{CommandResult, ConnectionInfo};
use crate::traits::RemoteExecutor;

/// SSH extended data stream id for stderr
const STDERR_STREAM: u32 = 1;

#[derive(Debug)]
struct MachineHandler;

impl client::Handler for MachineHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // freshly created machines have host keys we have never seen
        Ok(true)
    }
}

/// Runs commands on one machine over a lazily opened SSH session
///
/// The session is opened on first use and reused for every later command.
/// If the remote side drops the session (e.g. because it is rebooting) the
/// next command reconnects.
pub struct SshExecutor {
    conn_info: ConnectionInfo,
    key: ResolvedKey,
    session: Mutex<Option<client::Handle<MachineHandler>>>,
}

impl std::fmt::Debug for SshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshExecutor")
            .field("conn_info", &self.conn_info)
            .field("key", &self.key)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl SshExecutor {
    /// Create an executor for `conn_info`, authenticating with `key_source`
    ///
    /// # Errors
    /// Returns `ExecError::SshKey` if the key cannot be resolved
    pub fn new(conn_info: ConnectionInfo, key_source: &KeySource) -> Result<Self, ExecError> {
        let key = key_source
            .resolve()
            .map_err(|e| ExecError::SshKey(e.to_string()))?;

        Ok(Self {
            conn_info,
            key,
            session: Mutex::new(None),
        })
    }

    /// Create an executor using the key recorded in `conn_info`
    ///
    /// # Errors
    /// Returns `ExecError::SshKey` if no key is recorded or it cannot be used
    pub fn from_connection(conn_info: ConnectionInfo) -> Result<Self, ExecError> {
        let key_source = conn_info
            .key_source()
            .ok_or_else(|| ExecError::SshKey(format!("no SSH key for {}", conn_info.host)))?;
        Self::new(conn_info, &key_source)
    }

    /// Connection details this executor was built with
    #[must_use]
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.conn_info
    }

    #[instrument(skip(self), fields(host = %self.conn_info.host))]
    async fn connect(&self) -> Result<(), ExecError> {
        let mut session_lock = self.session.lock().await;

        if session_lock.as_ref().is_some_and(|s| !s.is_closed()) {
            return Ok(());
        }

        info!(
            port = self.conn_info.port,
            user = %self.conn_info.user,
            "connecting to SSH"
        );

        let config = Arc::new(client::Config::default());
        let mut session = client::connect(
            config,
            (self.conn_info.host.as_str(), self.conn_info.port),
            MachineHandler,
        )
        .await
        .map_err(|e| ExecError::ConnectionFailed {
            host: self.conn_info.host.clone(),
            reason: e.to_string(),
        })?;

        let key_pair =
            load_secret_key(self.key.path(), None).map_err(|e| ExecError::SshKey(e.to_string()))?;
        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        let auth = session
            .authenticate_publickey(
                &self.conn_info.user,
                PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
            )
            .await
            .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if !auth.success() {
            return Err(ExecError::AuthenticationFailed(format!(
                "public key rejected for {}@{}",
                self.conn_info.user, self.conn_info.host
            )));
        }

        info!("SSH connected and authenticated");

        *session_lock = Some(session);
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(host = %self.conn_info.host))]
    async fn execute_remote(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let mut session_lock = self.session.lock().await;
        let session = session_lock.as_mut().ok_or(ExecError::NotConnected)?;

        debug!(command = %cmd, "executing remote command");
        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::Io(e.to_string()))?;
        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::Io(e.to_string()))?;

        let mut exit_status = None;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // Eof may arrive before ExitStatus, so drain until the channel closes
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => stdout.extend_from_slice(&data),
                Some(ChannelMsg::ExtendedData { data, ext }) if ext == STDERR_STREAM => {
                    stderr.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExitStatus { exit_status: code }) => {
                    exit_status = Some(code);
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            }
        }

        let Some(status) = exit_status else {
            warn!(command = %cmd, "channel closed without exit status");
            session_lock.take();
            return Err(ExecError::Disconnected);
        };

        let result = CommandResult {
            status: status.cast_signed(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration: start.elapsed(),
        };

        debug!(
            status = result.status,
            duration = ?result.duration,
            "remote command completed"
        );

        Ok(result)
    }

    /// Close the session if one is open
    ///
    /// # Errors
    /// Returns `ExecError::Io` if the disconnect message cannot be sent
    pub async fn disconnect(&self) -> Result<(), ExecError> {
        if let Some(session) = self.session.lock().await.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
                .map_err(|e| ExecError::Io(e.to_string()))?;
            info!(host = %self.conn_info.host, "SSH disconnected");
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.connect().await?;
        self.execute_remote(cmd).await
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        // connecting is not counted against the command timeout
        self.connect().await?;

        timeout(timeout_duration, self.execute_remote(cmd))
            .await
            .map_err(|_| ExecError::Timeout {
                timeout: timeout_duration,
            })?
    }

    fn is_connected(&self) -> bool {
        self.session
            .try_lock()
            .map(|s| s.as_ref().is_some_and(|h| !h.is_closed()))
            .unwrap_or(false)
    }

    fn executor_type(&self) -> &'static str {
        "ssh"
    }
}
