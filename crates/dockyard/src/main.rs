//! dockyard
//!
//! Keeps a registry of machines on disk and provisions a container engine
//! onto them over SSH.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use dockyard_persist::Filestore;
use dockyard_provision::ProvisionerRegistry;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod factory;

use commands::{AddArgs, ProvisionArgs};
use config::{Config, LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "dockyard", version)]
#[command(about = "Machine registry and container engine provisioning", long_about = None)]
struct Cli {
    /// Config file, instead of the default search paths
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store root, overriding the config file
    #[arg(short, long, global = true)]
    storage_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all machines
    Ls,
    /// Show a machine's stored record
    Inspect {
        /// Machine name
        name: String,
    },
    /// Delete a machine's stored record
    Rm {
        /// Machine name
        name: String,
    },
    /// Register a machine
    Add(AddArgs),
    /// Install and configure the container engine on a machine
    Provision(ProvisionArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load_default(cli.config.as_deref())?;
    init_tracing(&config.log);

    let storage_path = cli.storage_path.unwrap_or(config.storage.path);
    tracing::debug!(path = %storage_path.display(), "opening machine store");
    let store = Filestore::new(storage_path);

    match cli.command {
        Commands::Ls => commands::list(&store, &mut io::stdout().lock())?,
        Commands::Inspect { name } => commands::inspect(&store, &name, &mut io::stdout().lock())?,
        Commands::Rm { name } => commands::remove(&store, &name)?,
        Commands::Add(args) => {
            commands::add(&store, args)?;
        }
        Commands::Provision(args) => {
            let registry = ProvisionerRegistry::with_defaults();
            commands::provision(&store, &registry, args, &config.provision.packages).await?;
        }
    }

    Ok(())
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match log.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
