//! Provisioner registry
//!
//! The set of supported OS families is an ordinary value built at startup
//! and passed to whoever needs it. Nothing registers itself globally.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::error::ProvisionError;
use crate::os_release::{OS_RELEASE_COMMAND, OsRelease};
use crate::rancheros::{RANCHEROS, RancherProvisioner};
use crate::traits::Provisioner;
use crate::types::ProvisionerContext;

/// Builds a provisioner bound to one machine
pub type ProvisionerConstructor = fn(ProvisionerContext) -> Box<dyn Provisioner>;

/// Named provisioner constructors
#[derive(Debug, Clone, Default)]
pub struct ProvisionerRegistry {
    provisioners: BTreeMap<String, ProvisionerConstructor>,
}

impl ProvisionerRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every provisioner shipped in this crate
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RANCHEROS, RancherProvisioner::boxed);
        registry
    }

    /// Add or replace a provisioner
    pub fn register(&mut self, name: impl Into<String>, constructor: ProvisionerConstructor) {
        self.provisioners.insert(name.into(), constructor);
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.provisioners.keys().map(String::as_str)
    }

    /// Build the provisioner registered as `name`
    ///
    /// # Errors
    /// Returns `ProvisionError::UnknownProvisioner` if nothing is registered under `name`
    pub fn create(
        &self,
        name: &str,
        ctx: ProvisionerContext,
    ) -> Result<Box<dyn Provisioner>, ProvisionError> {
        let constructor = self
            .provisioners
            .get(name)
            .ok_or_else(|| ProvisionError::UnknownProvisioner(name.to_string()))?;
        Ok(constructor(ctx))
    }

    /// Pick a provisioner by reading `/etc/os-release` on the machine
    ///
    /// Provisioners are tried in name order; the first compatible one wins
    /// and is handed the parsed os-release info.
    ///
    /// # Errors
    /// Fails if the file cannot be read or parsed, or if no registered
    /// provisioner is compatible
    #[instrument(skip(self, ctx), fields(host = %ctx.driver.machine_name()))]
    pub async fn detect(
        &self,
        ctx: ProvisionerContext,
    ) -> Result<Box<dyn Provisioner>, ProvisionError> {
        let result = ctx.executor.run(OS_RELEASE_COMMAND).await?;
        if !result.success() {
            return Err(ProvisionError::CommandFailed {
                command: OS_RELEASE_COMMAND.to_string(),
                status: result.status,
                output: result.combined_output(),
            });
        }

        let os = OsRelease::parse(&result.stdout)?;
        debug!(id = %os.id, version = %os.version_id, "read os-release");

        for (name, constructor) in &self.provisioners {
            let mut provisioner = constructor(ctx.clone());
            if provisioner.compatible_with_host(&os) {
                info!(provisioner = %name, "found compatible provisioner");
                provisioner.set_os_release(os);
                return Ok(provisioner);
            }
        }

        Err(ProvisionError::NoCompatibleProvisioner(os.id))
    }
}
