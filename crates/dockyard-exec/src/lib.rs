//! dockyard-exec: command execution capability
//!
//! Runs shell command strings against exactly one host, either the local
//! machine or a remote machine over SSH. Provisioners only ever talk to a
//! host through [`RemoteExecutor`].

pub mod error;
pub mod keys;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use error::ExecError;
pub use keys::{KeyError, KeySource, ResolvedKey};
pub use local::LocalExecutor;
pub use result::{CommandResult, ConnectionInfo};
pub use ssh::SshExecutor;
pub use traits::RemoteExecutor;
