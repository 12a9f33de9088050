//! Reconciliation commands: `contacts`, `ipscan` and `proxmox`

#![allow(clippy::result_large_err)]

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use netrecon_core::errors::{ExError, ExErrorKind};
use netrecon_engine::pipelines::{PIPELINE_CONTACTS, PIPELINE_IPSCAN, PIPELINE_PROXMOX};
use netrecon_engine::{
    run_directory, run_ip_scan, run_proxmox, LogLevel, ObservationSource, ReconConfig, RunMode,
    RunReport,
};
use netrecon_store::SqliteRegistry;

use crate::config::FileConfig;
use crate::http_source::open_source;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Snapshot file or http(s) URL; overrides the configuration file
    #[arg(long)]
    pub source: Option<String>,

    /// Registry database; overrides the configuration file
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Write the changes; without it the run is a dry run
    #[arg(long)]
    pub commit: bool,

    /// Also list unchanged, kept and skipped entities
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct ContactsArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Leave departments as they are
    #[arg(long)]
    pub skip_groups: bool,

    /// Leave people as they are
    #[arg(long)]
    pub skip_contacts: bool,
}

#[derive(Debug, Args)]
pub struct IpScanArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Only scan subnets carrying this registry tag
    #[arg(long)]
    pub subnet_tag: Option<String>,

    /// Seconds to wait between subnets
    #[arg(long)]
    pub pause_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ProxmoxArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Registry tag of objects the sweep manages
    #[arg(long)]
    pub tag: Option<String>,
}

fn source_for(
    pipeline: &str,
    args: &SyncArgs,
    file: &FileConfig,
) -> Result<Box<dyn ObservationSource>, ExError> {
    let location = args
        .source
        .as_deref()
        .or_else(|| file.source(pipeline))
        .ok_or_else(|| {
            ExError::new(ExErrorKind::Config)
                .with_op(pipeline)
                .with_message(format!("no source configured for {}, pass --source", pipeline))
        })?;
    Ok(open_source(pipeline, location))
}

/// Open the registry, run `pipeline` against it and print the report
fn run_pipeline<F>(args: &SyncArgs, file: &FileConfig, pipeline: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut SqliteRegistry, RunMode) -> Result<RunReport, ExError>,
{
    let db = args.db.clone().unwrap_or_else(|| file.db());
    let mut store = SqliteRegistry::open(&db)?;
    let report = pipeline(&mut store, RunMode::from_commit_flag(args.commit))?;

    let min_level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    print!("{}", report.render_text(min_level));

    let failed = report.totals().failed;
    if failed > 0 {
        return Err(format!("{} entities could not be reconciled", failed).into());
    }
    Ok(())
}

pub fn execute_contacts(args: ContactsArgs, file: &FileConfig) -> Result<(), Box<dyn Error>> {
    let source = source_for(PIPELINE_CONTACTS, &args.sync, file)?;
    let mut config = file.recon_config(PIPELINE_CONTACTS);
    if args.skip_groups {
        config = config.with_import_groups(false);
    }
    if args.skip_contacts {
        config = config.with_import_contacts(false);
    }
    run_pipeline(&args.sync, file, |store, mode| {
        run_directory(store, source.as_ref(), config, mode)
    })
}

pub fn execute_ip_scan(args: IpScanArgs, file: &FileConfig) -> Result<(), Box<dyn Error>> {
    let source = source_for(PIPELINE_IPSCAN, &args.sync, file)?;
    let mut config: ReconConfig = file.recon_config(PIPELINE_IPSCAN);
    if let Some(tag) = args.subnet_tag {
        config = config.with_subnet_tag(tag);
    }
    if let Some(secs) = args.pause_secs {
        config = config.with_subnet_pause(Duration::from_secs(secs));
    }
    run_pipeline(&args.sync, file, |store, mode| {
        run_ip_scan(store, source.as_ref(), config, mode)
    })
}

pub fn execute_proxmox(args: ProxmoxArgs, file: &FileConfig) -> Result<(), Box<dyn Error>> {
    let source = source_for(PIPELINE_PROXMOX, &args.sync, file)?;
    let mut config = file.recon_config(PIPELINE_PROXMOX);
    if let Some(tag) = args.tag {
        config = config.with_proxmox_tag(tag);
    }
    run_pipeline(&args.sync, file, |store, mode| {
        run_proxmox(store, source.as_ref(), config, mode)
    })
}
