//! Behaviour shared by every OS family

use std::sync::Arc;

use dockyard_exec::RemoteExecutor;
use dockyard_host::{Driver, EngineOptions};
use tracing::{debug, instrument, warn};

use crate::error::ProvisionError;
use crate::os_release::OsRelease;
use crate::traits::Provisioner;
use crate::types::{EngineConfigContext, ProvisionerContext};

/// State and commands common to all provisioners
///
/// OS-specific provisioners own one of these and delegate to it for
/// running commands, the shared hostname routine and bookkeeping.
pub struct GenericProvisioner {
    driver: Arc<dyn Driver>,
    executor: Arc<dyn RemoteExecutor>,
    os_release_id: &'static str,
    docker_options_dir: String,
    daemon_options_file: String,
    packages: Vec<String>,
    engine_options: EngineOptions,
    os_release: Option<OsRelease>,
}

impl std::fmt::Debug for GenericProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericProvisioner")
            .field("machine", &self.driver.machine_name())
            .field("executor", &self.executor.executor_type())
            .field("os_release_id", &self.os_release_id)
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

impl GenericProvisioner {
    /// Create a provisioner for hosts whose os-release `ID` is `os_release_id`
    pub fn new(ctx: ProvisionerContext, os_release_id: &'static str) -> Self {
        Self {
            driver: ctx.driver,
            executor: ctx.executor,
            os_release_id,
            docker_options_dir: "/etc/docker".to_string(),
            daemon_options_file: "/etc/default/docker".to_string(),
            packages: ctx.packages,
            engine_options: EngineOptions::default(),
            os_release: None,
        }
    }

    /// Set where engine options and TLS material live on the host
    #[must_use]
    pub fn with_docker_options_dir(mut self, dir: impl Into<String>) -> Self {
        self.docker_options_dir = dir.into();
        self
    }

    /// Set the file the engine daemon reads its flags from
    #[must_use]
    pub fn with_daemon_options_file(mut self, file: impl Into<String>) -> Self {
        self.daemon_options_file = file.into();
        self
    }

    /// Machine name from the driver
    #[must_use]
    pub fn machine_name(&self) -> &str {
        self.driver.machine_name()
    }

    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    #[must_use]
    pub fn daemon_options_file(&self) -> &str {
        &self.daemon_options_file
    }

    #[must_use]
    pub fn engine_options(&self) -> &EngineOptions {
        &self.engine_options
    }

    pub fn set_engine_options(&mut self, options: EngineOptions) {
        self.engine_options = options;
    }

    #[must_use]
    pub fn os_release(&self) -> Option<&OsRelease> {
        self.os_release.as_ref()
    }

    pub fn set_os_release(&mut self, os: OsRelease) {
        self.os_release = Some(os);
    }

    /// Matches on the os-release `ID`
    #[must_use]
    pub fn compatible_with_host(&self, os: &OsRelease) -> bool {
        os.id == self.os_release_id
    }

    #[must_use]
    pub fn engine_config_context(&self) -> EngineConfigContext {
        EngineConfigContext {
            engine_options: self.engine_options.clone(),
            docker_options_dir: self.docker_options_dir.clone(),
        }
    }

    /// Run `cmd` on the machine, treating a non-zero exit as failure
    ///
    /// # Errors
    /// `ProvisionError::Exec` on transport failure,
    /// `ProvisionError::CommandFailed` on non-zero exit
    #[instrument(skip(self), fields(host = %self.machine_name()))]
    pub async fn run_command(&self, cmd: &str) -> Result<String, ProvisionError> {
        let result = self.executor.run(cmd).await?;

        if !result.success() {
            return Err(ProvisionError::CommandFailed {
                command: cmd.to_string(),
                status: result.status,
                output: result.combined_output(),
            });
        }

        Ok(result.stdout)
    }

    /// Run `cmd` and discard whatever happens
    ///
    /// Only for commands that are expected to take the connection down with
    /// them, such as `reboot`.
    pub async fn run_discarding_result(&self, cmd: &str) {
        match self.executor.run(cmd).await {
            Ok(result) => debug!(command = %cmd, status = result.status, "command returned"),
            Err(e) if e.is_disconnect() => {
                debug!(command = %cmd, "connection dropped as expected");
            }
            Err(e) => warn!(command = %cmd, error = %e, "ignoring command failure"),
        }
    }

    /// Set the hostname for the running system and across reboots
    ///
    /// Writes `/etc/hostname` and points the `127.0.1.1` entry in
    /// `/etc/hosts` at the new name, replacing the line if present.
    #[instrument(skip(self), fields(host = %self.machine_name()))]
    pub async fn set_hostname(&self, hostname: &str) -> Result<(), ProvisionError> {
        let quoted = shell_quote(hostname);

        self.run_command(&format!(
            "sudo hostname {quoted} && echo {quoted} | sudo tee /etc/hostname"
        ))
        .await?;

        let entry = shell_quote(&format!("127.0.1.1 {hostname}"));
        let sed_expr = shell_quote(&format!("s/^127.0.1.1.*/127.0.1.1 {hostname}/g"));
        self.run_command(&format!(
            "if grep -xq '127.0.1.1.*' /etc/hosts; then \
             sudo sed -i {sed_expr} /etc/hosts; \
             else echo {entry} | sudo tee -a /etc/hosts; fi"
        ))
        .await?;

        Ok(())
    }
}

/// Download `url` and pipe it into `sh`, for non-default engine sources
///
/// # Errors
/// `ProvisionError::SelectEngine` carrying the script output on failure
pub async fn select_engine<P>(provisioner: &P, url: &str) -> Result<(), ProvisionError>
where
    P: Provisioner + ?Sized,
{
    let cmd = format!("wget -O- {} | sh -", shell_quote(url));

    match provisioner.run_command(&cmd).await {
        Ok(_) => Ok(()),
        Err(ProvisionError::CommandFailed { status, output, .. }) => {
            warn!(url, status, "engine install script failed");
            Err(ProvisionError::SelectEngine {
                reason: format!("exit status {status}"),
                output,
            })
        }
        Err(e) => Err(ProvisionError::SelectEngine {
            reason: e.to_string(),
            output: String::new(),
        }),
    }
}

/// Quote `value` as a single POSIX shell word
pub(crate) fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.:/=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("m1"), "m1");
        assert_eq!(shell_quote("https://get.docker.com"), "https://get.docker.com");
        assert_eq!(shell_quote("127.0.1.1 m1"), "'127.0.1.1 m1'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
