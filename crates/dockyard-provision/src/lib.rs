//! dockyard-provision: container engine bootstrap
//!
//! Drives one reachable machine through a fixed, OS-specific sequence of
//! shell commands: set the hostname, install packages, pick the engine
//! source. Abstract package and service actions are translated into the
//! commands each OS family understands.

pub mod action;
pub mod error;
pub mod generic;
pub mod os_release;
pub mod rancheros;
pub mod registry;
pub mod traits;
pub mod types;

pub use action::{PackageAction, ServiceAction};
pub use error::{ProvisionError, ProvisionStep};
pub use generic::GenericProvisioner;
pub use os_release::OsRelease;
pub use rancheros::RancherProvisioner;
pub use registry::{ProvisionerConstructor, ProvisionerRegistry};
pub use traits::Provisioner;
pub use types::{EngineConfigContext, ProvisionerContext};
