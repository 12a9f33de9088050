//! netrecon CLI
//!
//! Reconciles the phone directory, a subnet scan or a Proxmox cluster
//! snapshot into the registry database. Runs are dry unless `--commit` is
//! given.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use netrecon_core::logging_facility::{init, Profile};

mod commands;
mod config;
mod http_source;

use config::FileConfig;

#[derive(Debug, Parser)]
#[command(name = "netrecon")]
#[command(about = "netrecon - reconcile upstream inventories into the asset registry", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Logging profile: development, production or test
    #[arg(long, global = true)]
    log_profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Phone directory departments and people
    Contacts(commands::sync::ContactsArgs),
    /// Live hosts of the scanned subnets
    Ipscan(commands::sync::IpScanArgs),
    /// Proxmox cluster nodes, guests and their addresses
    Proxmox(commands::sync::ProxmoxArgs),
    /// Create or upgrade the registry database
    Migrate(commands::migrate::MigrateArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let profile = cli
        .log_profile
        .as_deref()
        .or(file.run.log_profile.as_deref())
        .unwrap_or("development");
    init(Profile::parse(profile));

    match cli.command {
        Commands::Contacts(args) => commands::sync::execute_contacts(args, &file),
        Commands::Ipscan(args) => commands::sync::execute_ip_scan(args, &file),
        Commands::Proxmox(args) => commands::sync::execute_proxmox(args, &file),
        Commands::Migrate(args) => commands::migrate::execute(args, &file),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
