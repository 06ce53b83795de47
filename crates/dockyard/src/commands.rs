//! Subcommand implementations
//!
//! Each command takes the store (and registry where needed) as arguments
//! and writes its output to a caller-supplied writer.

use std::io::Write;

use clap::Args;
use dockyard_exec::ConnectionInfo;
use dockyard_host::{EngineOptions, HostRecord};
use dockyard_persist::HostStore;
use dockyard_provision::ProvisionerRegistry;
use eyre::{Result, bail};
use tracing::{info, instrument};

use crate::factory;

/// Arguments for `dockyard add`
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Machine name
    pub name: String,
    /// Address the machine is reachable at
    #[arg(long)]
    pub address: String,
    /// SSH user
    #[arg(long, default_value = "root")]
    pub user: String,
    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,
    /// Private key used to log in
    #[arg(long, conflicts_with = "ssh_key_env")]
    pub ssh_key: Option<String>,
    /// Environment variable holding a base64 private key, read at provision time
    #[arg(long)]
    pub ssh_key_env: Option<String>,
    /// Driver that created the machine
    #[arg(long, default_value = "generic")]
    pub driver: String,
}

/// Arguments for `dockyard provision`
#[derive(Debug, Clone, Default, Args)]
pub struct ProvisionArgs {
    /// Machine name
    pub name: String,
    /// Provisioner to use instead of detecting one from /etc/os-release
    #[arg(long)]
    pub provisioner: Option<String>,
    /// Engine install script URL
    #[arg(long)]
    pub install_url: Option<String>,
    /// Engine storage driver
    #[arg(long)]
    pub storage_driver: Option<String>,
    /// Package to install, in order; repeatable
    #[arg(long = "package")]
    pub packages: Vec<String>,
}

/// Register a new machine
///
/// # Errors
/// Fails if a machine with the same name exists or the store fails
pub fn add(store: &impl HostStore, args: AddArgs) -> Result<HostRecord> {
    if store.exists(&args.name)? {
        bail!("machine {} already exists", args.name);
    }

    let mut connection = ConnectionInfo::new(args.address, args.user).with_port(args.port);
    if let Some(key) = args.ssh_key {
        connection = connection.with_ssh_key(key);
    }
    if let Some(var) = args.ssh_key_env {
        connection = connection.with_ssh_key_env(var);
    }

    let mut record = HostRecord::new(args.name, args.driver).with_connection(connection);
    record.host_options.driver = record.driver_name.clone();
    store.save(&record)?;

    info!(host = %record.name, "machine added");
    Ok(record)
}

/// Print every machine name, one per line
///
/// # Errors
/// Fails if the store cannot be enumerated or the writer fails
pub fn list(store: &impl HostStore, out: &mut impl Write) -> Result<()> {
    for name in store.list()? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Print a machine's record as JSON
///
/// # Errors
/// Fails if the machine cannot be loaded or the writer fails
pub fn inspect(store: &impl HostStore, name: &str, out: &mut impl Write) -> Result<()> {
    let record = store.load(name)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
    Ok(())
}

/// Delete a machine's record
///
/// # Errors
/// Fails if the machine does not exist or cannot be removed
pub fn remove(store: &impl HostStore, name: &str) -> Result<()> {
    if !store.exists(name)? {
        bail!("machine {name} does not exist");
    }
    store.remove(name)?;
    info!(host = %name, "machine removed");
    Ok(())
}

/// Provision a stored machine and save the engine options it ended up with
///
/// `default_packages` is used when no `--package` was given.
///
/// # Errors
/// Fails on store errors, executor construction, provisioner selection or
/// any provisioning step; the record is only saved on success
#[instrument(skip_all, fields(host = %args.name))]
pub async fn provision(
    store: &impl HostStore,
    registry: &ProvisionerRegistry,
    args: ProvisionArgs,
    default_packages: &[String],
) -> Result<HostRecord> {
    let mut record = store.load(&args.name)?;
    let options = requested_engine_options(record.engine_options(), &args);
    let packages = if args.packages.is_empty() {
        default_packages.to_vec()
    } else {
        args.packages
    };

    let executor = factory::create_executor(&record)?;
    let mut provisioner = factory::create_provisioner(
        registry,
        args.provisioner.as_deref(),
        &record,
        executor,
        packages,
    )
    .await?;

    provisioner.provision(options).await?;

    record.host_options.engine_options = provisioner.engine_options().clone();
    store.save(&record)?;

    info!(provisioner = provisioner.name(), "machine provisioned");
    Ok(record)
}

/// Stored engine options with command-line overrides applied
pub fn requested_engine_options(stored: &EngineOptions, args: &ProvisionArgs) -> EngineOptions {
    let mut options = stored.clone();
    if let Some(url) = &args.install_url {
        options.install_url.clone_from(url);
    }
    if let Some(driver) = &args.storage_driver {
        options.storage_driver.clone_from(driver);
    }
    options
}

#[cfg(test)]
mod tests {
    use dockyard_exec::KeySource;
    use dockyard_persist::Filestore;
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, Filestore) {
        let dir = tempfile::tempdir().unwrap();
        let store = Filestore::new(dir.path());
        (dir, store)
    }

    fn add_args(name: &str, address: &str) -> AddArgs {
        AddArgs {
            name: name.to_string(),
            address: address.to_string(),
            user: "rancher".to_string(),
            port: 2222,
            ssh_key: Some("/keys/id_ed25519".to_string()),
            ssh_key_env: None,
            driver: "generic".to_string(),
        }
    }

    #[test]
    fn test_add_then_list_and_inspect() {
        let (_dir, store) = store();

        add(&store, add_args("m2", "10.0.0.2")).unwrap();
        add(&store, add_args("m1", "10.0.0.1")).unwrap();

        let mut out = Vec::new();
        list(&store, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "m1\nm2\n");

        let mut out = Vec::new();
        inspect(&store, "m1", &mut out).unwrap();
        let record: HostRecord = serde_json::from_slice(&out).unwrap();
        let conn = record.connection.unwrap();
        assert_eq!(conn.host, "10.0.0.1");
        assert_eq!(conn.port, 2222);
        assert_eq!(conn.ssh_key.as_deref(), Some("/keys/id_ed25519"));
        assert_eq!(record.host_options.driver, "generic");
    }

    #[test]
    fn test_add_with_env_key() {
        let (_dir, store) = store();
        let args = AddArgs {
            ssh_key: None,
            ssh_key_env: Some("MACHINE_KEY".to_string()),
            ..add_args("m1", "10.0.0.1")
        };

        add(&store, args).unwrap();

        let conn = store.load("m1").unwrap().connection.unwrap();
        assert!(conn.ssh_key.is_none());
        assert!(matches!(conn.key_source(), Some(KeySource::Env(v)) if v == "MACHINE_KEY"));
    }

    #[test]
    fn test_add_refuses_existing_machine() {
        let (_dir, store) = store();

        add(&store, add_args("m1", "10.0.0.1")).unwrap();
        assert!(add(&store, add_args("m1", "10.0.0.9")).is_err());

        let record = store.load("m1").unwrap();
        assert_eq!(record.connection.unwrap().host, "10.0.0.1");
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = store();

        add(&store, add_args("m1", "10.0.0.1")).unwrap();
        remove(&store, "m1").unwrap();

        assert!(!store.exists("m1").unwrap());
        assert!(remove(&store, "m1").is_err());
    }

    #[test]
    fn test_inspect_missing_machine() {
        let (_dir, store) = store();
        assert!(inspect(&store, "ghost", &mut Vec::new()).is_err());
    }

    #[test]
    fn test_requested_engine_options_overrides() {
        let stored = EngineOptions::default().with_storage_driver("overlay");

        let unchanged = requested_engine_options(&stored, &ProvisionArgs::default());
        assert_eq!(unchanged, stored);

        let args = ProvisionArgs {
            install_url: Some("https://test.docker.com".to_string()),
            storage_driver: Some("aufs".to_string()),
            ..Default::default()
        };
        let options = requested_engine_options(&stored, &args);
        assert_eq!(options.install_url, "https://test.docker.com");
        assert_eq!(options.storage_driver, "aufs");
    }

    #[tokio::test]
    async fn test_provision_without_connection_leaves_record_untouched() {
        let (_dir, store) = store();
        let record = HostRecord::new("m1", "none");
        store.save(&record).unwrap();

        let args = ProvisionArgs {
            name: "m1".to_string(),
            install_url: Some("https://test.docker.com".to_string()),
            ..Default::default()
        };
        let result = provision(&store, &ProvisionerRegistry::with_defaults(), args, &[]).await;

        assert!(result.is_err());
        assert_eq!(store.load("m1").unwrap(), record);
    }

    #[tokio::test]
    async fn test_provision_missing_machine() {
        let (_dir, store) = store();
        let args = ProvisionArgs {
            name: "ghost".to_string(),
            ..Default::default()
        };

        let result = provision(&store, &ProvisionerRegistry::with_defaults(), args, &[]).await;
        assert!(result.is_err());
    }
}
