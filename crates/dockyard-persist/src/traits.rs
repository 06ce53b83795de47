//! Host store trait

use dockyard_host::HostRecord;

use crate::error::StoreError;

/// Keyed registry of machine records
///
/// Implementations do not retry and do not serialise concurrent writers of
/// the same name; callers own both policies.
pub trait HostStore: Send + Sync {
    /// Whether a machine with this name exists
    fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Names of all stored machines, sorted
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Read a machine record
    ///
    /// Returns [`StoreError::NotFound`] if no machine has that name.
    fn load(&self, name: &str) -> Result<HostRecord, StoreError>;

    /// Delete a machine and everything stored with it; absent names are fine
    fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Create or fully overwrite a machine record
    fn save(&self, record: &HostRecord) -> Result<(), StoreError>;
}
