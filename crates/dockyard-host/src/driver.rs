//! Driver capability consumed by provisioners

use crate::record::HostRecord;

/// What a provisioner needs to know about the machine's driver
///
/// Concrete compute-provider drivers live outside this workspace; a stored
/// [`HostRecord`] is enough to satisfy this trait.
pub trait Driver: Send + Sync {
    /// Logical machine name, also used as the remote hostname
    fn machine_name(&self) -> &str;

    /// Name of the compute-provider driver (e.g. `virtualbox`, `none`)
    fn driver_name(&self) -> &str;
}

impl Driver for HostRecord {
    fn machine_name(&self) -> &str {
        &self.name
    }

    fn driver_name(&self) -> &str {
        &self.driver_name
    }
}
