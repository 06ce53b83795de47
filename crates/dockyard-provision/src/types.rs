//! Types shared by provisioner implementations

use std::sync::Arc;

use dockyard_exec::RemoteExecutor;
use dockyard_host::{Driver, EngineOptions};
use serde::{Deserialize, Serialize};

/// Collaborators a provisioner is constructed with
#[derive(Clone)]
pub struct ProvisionerContext {
    /// Supplies the machine name
    pub driver: Arc<dyn Driver>,
    /// Runs commands on the machine
    pub executor: Arc<dyn RemoteExecutor>,
    /// Packages installed during `provision`, in order
    pub packages: Vec<String>,
}

impl ProvisionerContext {
    pub fn new(driver: Arc<dyn Driver>, executor: Arc<dyn RemoteExecutor>) -> Self {
        Self {
            driver,
            executor,
            packages: Vec::new(),
        }
    }

    /// Declare the packages to install
    #[must_use]
    pub fn with_packages(mut self, packages: Vec<String>) -> Self {
        self.packages = packages;
        self
    }
}

impl std::fmt::Debug for ProvisionerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionerContext")
            .field("machine", &self.driver.machine_name())
            .field("driver", &self.driver.driver_name())
            .field("executor", &self.executor.executor_type())
            .field("packages", &self.packages)
            .finish()
    }
}

/// Values available when rendering the engine daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfigContext {
    /// Effective engine options
    pub engine_options: EngineOptions,
    /// Remote directory holding engine options and TLS material
    pub docker_options_dir: String,
}
