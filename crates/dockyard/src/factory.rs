//! Executor and provisioner construction for a stored machine

use std::sync::Arc;

use dockyard_exec::{LocalExecutor, RemoteExecutor, SshExecutor};
use dockyard_host::{Driver, HostRecord};
use dockyard_provision::{Provisioner, ProvisionerContext, ProvisionerRegistry};
use eyre::{Result, eyre};

/// Create a remote executor for a machine
///
/// Local addresses get a `LocalExecutor`, everything else goes over SSH.
///
/// # Errors
/// Fails if the record has no connection details or the SSH key cannot be
/// resolved
pub fn create_executor(record: &HostRecord) -> Result<Arc<dyn RemoteExecutor>> {
    let conn = record
        .connection
        .clone()
        .ok_or_else(|| eyre!("machine {} has no connection details", record.name))?;

    if conn.is_local() {
        tracing::debug!(host = %record.name, "using local executor");
        return Ok(Arc::new(LocalExecutor::new()));
    }

    let executor = SshExecutor::from_connection(conn)
        .map_err(|e| eyre!("failed to create SSH executor: {e}"))?;
    Ok(Arc::new(executor))
}

/// Pick the provisioner for a machine
///
/// With a `name` the registry entry is used as is; otherwise the machine's
/// os-release decides.
///
/// # Errors
/// Fails for an unknown name, or when detection finds no compatible provisioner
pub async fn create_provisioner(
    registry: &ProvisionerRegistry,
    name: Option<&str>,
    record: &HostRecord,
    executor: Arc<dyn RemoteExecutor>,
    packages: Vec<String>,
) -> Result<Box<dyn Provisioner>> {
    let driver: Arc<dyn Driver> = Arc::new(record.clone());
    let ctx = ProvisionerContext::new(driver, executor).with_packages(packages);

    let provisioner = match name {
        Some(name) => registry.create(name, ctx)?,
        None => registry.detect(ctx).await?,
    };

    tracing::info!(
        host = %record.name,
        provisioner = provisioner.name(),
        "selected provisioner"
    );
    Ok(provisioner)
}
