//! Abstract package and service actions

use std::fmt;

use serde::{Deserialize, Serialize};

/// What to do with a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageAction {
    Install,
    Remove,
    Upgrade,
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageAction::Install => write!(f, "install"),
            PackageAction::Remove => write!(f, "remove"),
            PackageAction::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// What to ask the service supervisor to do
///
/// The `Display` form is the verb passed to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
    DaemonReload,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAction::Start => write!(f, "start"),
            ServiceAction::Stop => write!(f, "stop"),
            ServiceAction::Restart => write!(f, "restart"),
            ServiceAction::Enable => write!(f, "enable"),
            ServiceAction::Disable => write!(f, "disable"),
            ServiceAction::DaemonReload => write!(f, "daemon-reload"),
        }
    }
}
