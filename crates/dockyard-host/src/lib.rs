//! dockyard-host: machine records
//!
//! The data model shared by the store, the provisioners and the binary:
//! what a machine is, how to reach it, and which engine options it was
//! provisioned with.

pub mod driver;
pub mod engine;
pub mod record;

pub use driver::Driver;
pub use engine::{DEFAULT_ENGINE_INSTALL_URL, EngineOptions};
pub use record::{AuthOptions, CONFIG_VERSION, HostOptions, HostRecord};
