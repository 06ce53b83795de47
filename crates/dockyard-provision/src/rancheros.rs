//! RancherOS provisioner
//!
//! RancherOS runs system services as containers under `system-docker` and
//! persists configuration as cloud-config. Packages are system services
//! toggled with `rancherctl`.

use async_trait::async_trait;
use dockyard_host::EngineOptions;
use tracing::{debug, info, instrument};

use crate::action::{PackageAction, ServiceAction};
use crate::error::{ProvisionError, ProvisionStep};
use crate::generic::{GenericProvisioner, select_engine, shell_quote};
use crate::os_release::OsRelease;
use crate::traits::Provisioner;
use crate::types::{EngineConfigContext, ProvisionerContext};

/// Registry name and os-release `ID`
pub const RANCHEROS: &str = "rancheros";

/// Package whose upgrade means upgrading the OS itself
pub const ENGINE_PACKAGE: &str = "docker";

const DEFAULT_STORAGE_DRIVER: &str = "overlay";

const DOCKER_OPTIONS_DIR: &str = "/var/lib/rancher/conf";
const DAEMON_OPTIONS_FILE: &str = "/var/lib/rancher/conf/docker";
const CLOUD_CONFIG_DIR: &str = "/var/lib/rancher/conf/cloud-config.d";

/// `/etc/hosts` is bind-mounted from the engine, so it is rewritten in place
/// instead of being replaced
const STRIP_LOOPBACK_HOSTNAME: &str =
    "sed /127.0.1.1/d /etc/hosts > /tmp/hosts && cat /tmp/hosts | sudo tee /etc/hosts";

const UPGRADE_COMMAND: &str = "sudo rancherctl os upgrade -f --no-reboot";
const REBOOT_COMMAND: &str = "sudo reboot";

/// Provisioner for RancherOS hosts
#[derive(Debug)]
pub struct RancherProvisioner {
    generic: GenericProvisioner,
}

impl RancherProvisioner {
    pub fn new(ctx: ProvisionerContext) -> Self {
        Self::with_generic(
            GenericProvisioner::new(ctx, RANCHEROS)
                .with_docker_options_dir(DOCKER_OPTIONS_DIR)
                .with_daemon_options_file(DAEMON_OPTIONS_FILE),
        )
    }

    /// Wrap an already configured generic provisioner
    pub fn with_generic(generic: GenericProvisioner) -> Self {
        Self { generic }
    }

    /// Registry constructor
    pub fn boxed(ctx: ProvisionerContext) -> Box<dyn Provisioner> {
        Box::new(Self::new(ctx))
    }

    #[must_use]
    pub fn generic(&self) -> &GenericProvisioner {
        &self.generic
    }

    /// Fill in the default storage driver, reject anything else
    fn validate(mut options: EngineOptions) -> Result<EngineOptions, ProvisionError> {
        if options.storage_driver.is_empty() {
            options.storage_driver = DEFAULT_STORAGE_DRIVER.to_string();
        } else if options.storage_driver != DEFAULT_STORAGE_DRIVER {
            return Err(ProvisionError::UnsupportedStorageDriver(
                options.storage_driver,
            ));
        }
        Ok(options)
    }

    /// Upgrade the OS, then reboot into it
    async fn upgrade(&self) -> Result<(), ProvisionError> {
        info!(host = %self.generic.machine_name(), "running upgrade");
        self.generic.run_command(UPGRADE_COMMAND).await?;

        info!(host = %self.generic.machine_name(), "upgrade succeeded, rebooting");
        // the session dies with the host, so any outcome here counts as success
        self.generic.run_discarding_result(REBOOT_COMMAND).await;

        Ok(())
    }

    fn hostname_cloud_config(hostname: &str) -> String {
        format!(
            "sudo mkdir -p {CLOUD_CONFIG_DIR}/\n\
             sudo tee {CLOUD_CONFIG_DIR}/machine-hostname.yml << 'EOF'\n\
             #cloud-config\n\
             \n\
             hostname: {hostname}\n\
             EOF\n"
        )
    }
}

#[async_trait]
impl Provisioner for RancherProvisioner {
    fn name(&self) -> &'static str {
        RANCHEROS
    }

    fn compatible_with_host(&self, os: &OsRelease) -> bool {
        self.generic.compatible_with_host(os)
    }

    fn os_release(&self) -> Option<&OsRelease> {
        self.generic.os_release()
    }

    fn set_os_release(&mut self, os: OsRelease) {
        self.generic.set_os_release(os);
    }

    fn engine_options(&self) -> &EngineOptions {
        self.generic.engine_options()
    }

    fn engine_config_context(&self) -> EngineConfigContext {
        self.generic.engine_config_context()
    }

    async fn run_command(&self, cmd: &str) -> Result<String, ProvisionError> {
        self.generic.run_command(cmd).await
    }

    #[instrument(skip(self, engine_options), fields(host = %self.generic.machine_name()))]
    async fn provision(&mut self, engine_options: EngineOptions) -> Result<(), ProvisionError> {
        debug!("running RancherOS provisioner");

        let engine_options =
            Self::validate(engine_options).map_err(|e| e.in_step(ProvisionStep::Validate))?;
        self.generic.set_engine_options(engine_options);

        let hostname = self.generic.machine_name().to_string();
        debug!(hostname = %hostname, "setting hostname");
        self.set_hostname(&hostname)
            .await
            .map_err(|e| e.in_step(ProvisionStep::SetHostname))?;

        for pkg in self.generic.packages() {
            debug!(package = %pkg, "installing package");
            self.package(pkg, PackageAction::Install)
                .await
                .map_err(|e| e.in_step(ProvisionStep::InstallPackage(pkg.clone())))?;
        }

        let install_url = &self.generic.engine_options().install_url;
        if self.generic.engine_options().uses_default_install_url() {
            debug!(url = %install_url, "skipping default engine source");
            return Ok(());
        }

        debug!(url = %install_url, "selecting engine source");
        select_engine(&*self, install_url)
            .await
            .map_err(|e| e.in_step(ProvisionStep::SelectEngine))
    }

    async fn package(&self, name: &str, action: PackageAction) -> Result<(), ProvisionError> {
        let verb = match action {
            PackageAction::Upgrade if name == ENGINE_PACKAGE => return self.upgrade().await,
            PackageAction::Upgrade => {
                return Err(ProvisionError::UnsupportedAction {
                    package: name.to_string(),
                    action,
                });
            }
            PackageAction::Install => "enable",
            PackageAction::Remove => "disable",
        };

        self.generic
            .run_command(&format!(
                "sudo rancherctl service {verb} {}",
                shell_quote(name)
            ))
            .await?;
        Ok(())
    }

    async fn service(&self, name: &str, action: ServiceAction) -> Result<(), ProvisionError> {
        self.generic
            .run_command(&format!("sudo system-docker {action} {}", shell_quote(name)))
            .await?;
        Ok(())
    }

    async fn set_hostname(&self, hostname: &str) -> Result<(), ProvisionError> {
        self.generic.run_command(STRIP_LOOPBACK_HOSTNAME).await?;
        self.generic.set_hostname(hostname).await?;
        self.generic
            .run_command(&Self::hostname_cloud_config(hostname))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults_storage_driver() {
        let options = RancherProvisioner::validate(EngineOptions::default()).unwrap();
        assert_eq!(options.storage_driver, "overlay");
    }

    #[test]
    fn test_validate_rejects_other_drivers() {
        let err = RancherProvisioner::validate(
            EngineOptions::default().with_storage_driver("devicemapper"),
        )
        .unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedStorageDriver(d) if d == "devicemapper"));
    }

    #[test]
    fn test_hostname_cloud_config() {
        let cmd = RancherProvisioner::hostname_cloud_config("m1");
        assert_eq!(
            cmd,
            "sudo mkdir -p /var/lib/rancher/conf/cloud-config.d/\n\
             sudo tee /var/lib/rancher/conf/cloud-config.d/machine-hostname.yml << 'EOF'\n\
             #cloud-config\n\nhostname: m1\nEOF\n"
        );
    }

    #[test]
    fn test_hostname_cloud_config_is_not_expanded() {
        let cmd = RancherProvisioner::hostname_cloud_config("m$(id)`x`");
        assert!(cmd.contains("<< 'EOF'\n"));
        assert!(cmd.contains("hostname: m$(id)`x`\n"));
    }
}
