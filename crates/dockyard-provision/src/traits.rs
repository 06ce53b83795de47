//! Provisioner trait

use async_trait::async_trait;
use dockyard_host::EngineOptions;

use crate::action::{PackageAction, ServiceAction};
use crate::error::ProvisionError;
use crate::os_release::OsRelease;
use crate::types::EngineConfigContext;

/// Bootstraps a container engine on one machine of a given OS family
///
/// Each OS family implements this once, holding a
/// [`GenericProvisioner`](crate::GenericProvisioner) for the behaviour it
/// shares with every other family.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Registry name of the OS family, e.g. `rancheros`
    fn name(&self) -> &'static str;

    /// Whether this provisioner can drive a host reporting `os`
    fn compatible_with_host(&self, os: &OsRelease) -> bool;

    /// os-release info detected on the host, if any
    fn os_release(&self) -> Option<&OsRelease>;

    /// Remember the detected os-release info
    fn set_os_release(&mut self, os: OsRelease);

    /// Engine options of the last `provision` call, normalised
    fn engine_options(&self) -> &EngineOptions;

    /// Values for rendering the engine daemon configuration
    fn engine_config_context(&self) -> EngineConfigContext;

    /// Run one command on the machine and return its stdout
    ///
    /// A non-zero exit status is an error.
    async fn run_command(&self, cmd: &str) -> Result<String, ProvisionError>;

    /// Run the full bootstrap sequence; stops at the first failing step
    async fn provision(&mut self, engine_options: EngineOptions) -> Result<(), ProvisionError>;

    /// Apply a package action
    async fn package(&self, name: &str, action: PackageAction) -> Result<(), ProvisionError>;

    /// Apply a service action through the OS service supervisor
    async fn service(&self, name: &str, action: ServiceAction) -> Result<(), ProvisionError>;

    /// Set the machine's hostname; safe to repeat with the same value
    async fn set_hostname(&self, hostname: &str) -> Result<(), ProvisionError>;
}
