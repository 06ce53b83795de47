//! The persisted machine record

use std::path::PathBuf;

use dockyard_exec::ConnectionInfo;
use serde::{Deserialize, Serialize};

use crate::engine::EngineOptions;

/// Current layout version of [`HostRecord`] documents
pub const CONFIG_VERSION: u32 = 3;

/// Everything known about one provisioned machine
///
/// Identity is `name`; everything else is payload that the store treats as
/// opaque. Every field defaults on decode so a partially written or older
/// document still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Document layout version
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    /// Unique machine name
    #[serde(default)]
    pub name: String,
    /// Compute-provider driver that created the machine
    #[serde(default)]
    pub driver_name: String,
    /// Driver-specific settings, kept verbatim
    #[serde(default)]
    pub driver: serde_json::Value,
    /// Engine, TLS and sizing options
    #[serde(default)]
    pub host_options: HostOptions,
    /// How to reach the machine once it exists
    #[serde(default)]
    pub connection: Option<ConnectionInfo>,
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

impl HostRecord {
    /// Create a record with default options
    pub fn new(name: impl Into<String>, driver_name: impl Into<String>) -> Self {
        Self {
            config_version: CONFIG_VERSION,
            name: name.into(),
            driver_name: driver_name.into(),
            ..Self::default()
        }
    }

    /// Attach connection details
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionInfo) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Engine options the machine was last provisioned with
    #[must_use]
    pub fn engine_options(&self) -> &EngineOptions {
        &self.host_options.engine_options
    }
}

/// Options shared by every driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostOptions {
    #[serde(default)]
    pub driver: String,
    /// Memory in MiB, 0 when the driver picks
    #[serde(default)]
    pub memory: u32,
    /// Disk in MiB, 0 when the driver picks
    #[serde(default)]
    pub disk: u32,
    #[serde(default)]
    pub engine_options: EngineOptions,
    #[serde(default)]
    pub auth_options: AuthOptions,
}

/// Locations of TLS material; generating it is someone else's job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOptions {
    #[serde(default)]
    pub cert_dir: PathBuf,
    #[serde(default)]
    pub ca_cert_path: PathBuf,
    #[serde(default)]
    pub ca_private_key_path: PathBuf,
    #[serde(default)]
    pub client_cert_path: PathBuf,
    #[serde(default)]
    pub client_key_path: PathBuf,
    #[serde(default)]
    pub server_cert_path: PathBuf,
    #[serde(default)]
    pub server_key_path: PathBuf,
    /// Machine directory the material is copied to
    #[serde(default)]
    pub store_path: PathBuf,
}
