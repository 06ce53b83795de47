//! Error types for dockyard-provision

use std::fmt;

use dockyard_exec::ExecError;
use thiserror::Error;

use crate::action::PackageAction;

/// Step of the provisioning sequence a failure happened in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStep {
    Validate,
    SetHostname,
    InstallPackage(String),
    SelectEngine,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStep::Validate => write!(f, "validate"),
            ProvisionStep::SetHostname => write!(f, "set-hostname"),
            ProvisionStep::InstallPackage(name) => write!(f, "install-package {name}"),
            ProvisionStep::SelectEngine => write!(f, "select-engine"),
        }
    }
}

/// Errors that can occur while provisioning a machine
#[derive(Error, Debug, Clone)]
pub enum ProvisionError {
    /// Storage driver the OS family cannot run
    #[error("unsupported storage driver: {0}")]
    UnsupportedStorageDriver(String),

    /// Action that has no mapping for this package yet
    #[error("{action} of package {package} is not supported yet")]
    UnsupportedAction {
        /// Package name
        package: String,
        /// Requested action
        action: PackageAction,
    },

    /// Remote command ran but exited non-zero
    #[error("command `{command}` exited with status {status}: {output}")]
    CommandFailed {
        /// Command string as sent
        command: String,
        /// Exit status
        status: i32,
        /// stdout and stderr
        output: String,
    },

    /// Transport failure from the executor
    #[error("execution error: {0}")]
    Exec(#[from] ExecError),

    /// Custom engine install script failed
    #[error("error selecting docker: ({reason}) {output}")]
    SelectEngine {
        /// Why the install failed
        reason: String,
        /// Output of the install script
        output: String,
    },

    /// A provisioning step failed; `source` is what went wrong in it
    #[error("provisioning step {step} failed: {source}")]
    Step {
        /// Failed step
        step: ProvisionStep,
        source: Box<ProvisionError>,
    },

    /// Registry has no provisioner with this name
    #[error("unknown provisioner: {0}")]
    UnknownProvisioner(String),

    /// No registered provisioner matches the host OS
    #[error("no provisioner compatible with host OS {0:?}")]
    NoCompatibleProvisioner(String),

    /// `/etc/os-release` could not be understood
    #[error("invalid os-release: {0}")]
    OsRelease(String),
}

impl ProvisionError {
    /// Tag this error with the step it happened in
    #[must_use]
    pub fn in_step(self, step: ProvisionStep) -> Self {
        ProvisionError::Step {
            step,
            source: Box::new(self),
        }
    }

    /// Step the error was raised in, if it was raised by `provision`
    #[must_use]
    pub fn step(&self) -> Option<&ProvisionStep> {
        match self {
            ProvisionError::Step { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Innermost error, with step context peeled off
    #[must_use]
    pub fn root_cause(&self) -> &ProvisionError {
        match self {
            ProvisionError::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_context_is_reported() {
        let err = ProvisionError::CommandFailed {
            command: "sudo rancherctl service enable docker".to_string(),
            status: 1,
            output: "no such service".to_string(),
        }
        .in_step(ProvisionStep::InstallPackage("docker".to_string()));

        assert_eq!(
            err.step(),
            Some(&ProvisionStep::InstallPackage("docker".to_string()))
        );
        assert!(matches!(
            err.root_cause(),
            ProvisionError::CommandFailed { status: 1, .. }
        ));
        assert!(err.to_string().contains("install-package docker"));
    }
}
