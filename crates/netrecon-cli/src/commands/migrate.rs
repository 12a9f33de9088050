//! Registry database creation and upgrade

use std::path::PathBuf;

use clap::Args;
use netrecon_store::SqliteRegistry;

use crate::config::FileConfig;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Registry database; overrides the configuration file
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub fn execute(args: MigrateArgs, file: &FileConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = args.db.unwrap_or_else(|| file.db());
    SqliteRegistry::open(&db)?;
    println!("Registry schema up to date: {}", db.display());
    Ok(())
}
