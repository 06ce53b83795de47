//! Container engine options

use serde::{Deserialize, Serialize};

/// Install script used when the caller does not ask for anything else
pub const DEFAULT_ENGINE_INSTALL_URL: &str = "https://get.docker.com";

/// Options the container engine is installed and configured with
///
/// Passed to each provision run. The provisioner may normalise fields (for
/// instance fill in a default storage driver) but never persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Script URL for a download-and-run engine install
    #[serde(default = "default_install_url")]
    pub install_url: String,
    /// Storage driver; empty means "use the OS default"
    #[serde(default)]
    pub storage_driver: String,
    /// Extra flags passed to the engine daemon verbatim
    #[serde(default)]
    pub arbitrary_flags: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub insecure_registry: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub registry_mirror: Vec<String>,
    #[serde(default)]
    pub log_level: String,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

fn default_install_url() -> String {
    DEFAULT_ENGINE_INSTALL_URL.to_string()
}

fn default_tls_verify() -> bool {
    true
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            install_url: default_install_url(),
            storage_driver: String::new(),
            arbitrary_flags: Vec::new(),
            dns: Vec::new(),
            env: Vec::new(),
            insecure_registry: Vec::new(),
            labels: Vec::new(),
            registry_mirror: Vec::new(),
            log_level: String::new(),
            tls_verify: default_tls_verify(),
        }
    }
}

impl EngineOptions {
    /// Whether the engine comes from the OS package rather than a custom script
    #[must_use]
    pub fn uses_default_install_url(&self) -> bool {
        self.install_url == DEFAULT_ENGINE_INSTALL_URL
    }

    /// Set the install script URL
    #[must_use]
    pub fn with_install_url(mut self, url: impl Into<String>) -> Self {
        self.install_url = url.into();
        self
    }

    /// Set the storage driver
    #[must_use]
    pub fn with_storage_driver(mut self, driver: impl Into<String>) -> Self {
        self.storage_driver = driver.into();
        self
    }
}
