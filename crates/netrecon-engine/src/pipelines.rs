//! Run pipelines: fetch one snapshot, then reconcile its kinds in order.
//!
//! ## Logging Ownership
//!
//! Pipelines own the lifecycle lines of a run (`fetch` and `pipeline`
//! operations); the engine logs each sweep and each action.
//!
//! A source failure aborts before the engine is created, so nothing is
//! written. Kinds are reconciled parents first: a child's parent lookup
//! must see the entity its parent sweep created.

#![allow(clippy::result_large_err)]

use std::slice;
use std::time::Instant;

use netrecon_core::errors::ExError;
use netrecon_core::kinds::{
    ClusterProfile, ContactGroupProfile, ContactProfile, DeviceProfile, InterfaceProfile,
    IpAssignmentProfile, IpScanProfile, PrimaryIpProfile, VmInterfaceProfile, VmProfile,
};
use netrecon_core::model::EntityKind;
use netrecon_core::ops::RegistryStore;
use netrecon_core::{log_op_end, log_op_error, log_op_start};
use netrecon_core_types::RunContext;

use crate::config::ReconConfig;
use crate::engine::{ReconciliationEngine, RunMode};
use crate::prerequisites;
use crate::sources::{IpScan, ObservationSource, PhoneDirectory, ProxmoxInventory, Snapshot};
use crate::summary::RunReport;

pub const PIPELINE_CONTACTS: &str = "contacts";
pub const PIPELINE_IPSCAN: &str = "ipscan";
pub const PIPELINE_PROXMOX: &str = "proxmox";

/// Fetch a snapshot with lifecycle logging
fn fetch(source: &dyn ObservationSource, pipeline: &str) -> Result<Snapshot, ExError> {
    log_op_start!("fetch", pipeline = pipeline, source = source.name());
    let start = Instant::now();
    match source.fetch() {
        Ok(snapshot) => {
            log_op_end!(
                "fetch",
                duration_ms = start.elapsed().as_millis() as u64,
                pipeline = pipeline,
                digest = %snapshot.digest
            );
            Ok(snapshot)
        }
        Err(err) => {
            log_op_error!(
                "fetch",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                pipeline = pipeline
            );
            Err(err)
        }
    }
}

fn engine_for<'s, S: RegistryStore + ?Sized>(
    store: &'s mut S,
    config: ReconConfig,
    mode: RunMode,
    pipeline: &str,
    snapshot: &Snapshot,
) -> ReconciliationEngine<'s, S> {
    let context = RunContext::new().with_pipeline(pipeline);
    let mut engine = ReconciliationEngine::with_context(store, config, mode, context);
    engine.set_snapshot_digest(snapshot.digest.clone());
    engine
}

/// Run `body` between pipeline start and end lines
fn logged<'s, S, F>(
    pipeline: &str,
    mut engine: ReconciliationEngine<'s, S>,
    body: F,
) -> Result<RunReport, ExError>
where
    S: RegistryStore + ?Sized,
    F: FnOnce(&mut ReconciliationEngine<'s, S>) -> Result<(), ExError>,
{
    log_op_start!("pipeline", pipeline = pipeline, mode = ?engine.mode());
    let start = Instant::now();
    match body(&mut engine) {
        Ok(()) => {
            let report = engine.finish();
            let totals = report.totals();
            log_op_end!(
                "pipeline",
                duration_ms = start.elapsed().as_millis() as u64,
                pipeline = pipeline,
                mutations = totals.mutations(),
                failed = totals.failed
            );
            Ok(report)
        }
        Err(err) => {
            log_op_error!(
                "pipeline",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                pipeline = pipeline
            );
            Err(err)
        }
    }
}

/// Phone directory: departments, then people
///
/// `import_groups` and `import_contacts` select the sweeps; a kind whose
/// sweep is off is left exactly as it is, nothing of it is retired.
///
/// # Errors
///
/// Source and payload failures, and sweep-level failures of either kind.
pub fn run_directory<S: RegistryStore + ?Sized>(
    store: &mut S,
    source: &dyn ObservationSource,
    config: ReconConfig,
    mode: RunMode,
) -> Result<RunReport, ExError> {
    let snapshot = fetch(source, PIPELINE_CONTACTS)?;
    let directory = PhoneDirectory::parse(&snapshot)?;
    let (groups, contacts) = (config.import_groups, config.import_contacts);
    let engine = engine_for(store, config, mode, PIPELINE_CONTACTS, &snapshot);

    logged(PIPELINE_CONTACTS, engine, |engine| {
        if groups {
            engine.reconcile(&ContactGroupProfile, &directory.groups)?;
        } else {
            tracing::info!(
                component = module_path!(),
                kind = EntityKind::ContactGroup.as_str(),
                "import disabled"
            );
        }
        if contacts {
            engine.reconcile(&ContactProfile, &directory.contacts)?;
        } else {
            tracing::info!(
                component = module_path!(),
                kind = EntityKind::Contact.as_str(),
                "import disabled"
            );
        }
        Ok(())
    })
}

/// Subnet scan: one sweep per subnet, pausing between subnets
///
/// # Errors
///
/// Source and payload failures, and sweep-level failures.
pub fn run_ip_scan<S: RegistryStore + ?Sized>(
    store: &mut S,
    source: &dyn ObservationSource,
    config: ReconConfig,
    mode: RunMode,
) -> Result<RunReport, ExError> {
    let snapshot = fetch(source, PIPELINE_IPSCAN)?;
    let scan = IpScan::parse(&snapshot, config.subnet_tag.as_deref())?;
    let profile = IpScanProfile::new(config.script_name.as_str());
    let pause = config.subnet_pause;
    let engine = engine_for(store, config, mode, PIPELINE_IPSCAN, &snapshot);

    logged(PIPELINE_IPSCAN, engine, |engine| {
        for prefix in &scan.skipped {
            tracing::debug!(
                component = module_path!(),
                subnet = %prefix,
                "subnet not selected for scanning"
            );
        }
        for (index, batch) in scan.batches.iter().enumerate() {
            if index > 0 && !pause.is_zero() {
                std::thread::sleep(pause);
            }
            let summary = engine.reconcile(&profile, &batch.records)?;
            tracing::info!(
                component = module_path!(),
                subnet = %batch.prefix,
                hosts = batch.records.len(),
                created = summary.created,
                updated = summary.updated,
                "subnet reconciled"
            );
        }
        Ok(())
    })
}

/// Proxmox cluster: prerequisites, cluster, nodes, node interfaces, guests,
/// guest interfaces, address links, then primary addresses
///
/// # Errors
///
/// Source and payload failures, a prerequisite that cannot be ensured, and
/// sweep-level failures.
pub fn run_proxmox<S: RegistryStore + ?Sized>(
    store: &mut S,
    source: &dyn ObservationSource,
    config: ReconConfig,
    mode: RunMode,
) -> Result<RunReport, ExError> {
    let snapshot = fetch(source, PIPELINE_PROXMOX)?;
    let inventory = ProxmoxInventory::parse(&snapshot)?;
    let cluster = inventory.cluster_name().to_string();
    let script = config.script_name.clone();
    let required = prerequisites::proxmox(&config);
    let engine = engine_for(store, config, mode, PIPELINE_PROXMOX, &snapshot);

    logged(PIPELINE_PROXMOX, engine, |engine| {
        prerequisites::ensure_all(engine, &required)?;

        engine.reconcile(
            &ClusterProfile::new(cluster.as_str(), script.as_str()),
            slice::from_ref(&inventory.cluster),
        )?;
        engine.reconcile(&DeviceProfile::new(cluster.as_str(), script.as_str()), &inventory.devices)?;
        engine.reconcile(
            &InterfaceProfile::new(cluster.as_str(), script.as_str()),
            &inventory.interfaces,
        )?;
        engine.reconcile(&VmProfile::new(cluster.as_str(), script.as_str()), &inventory.vms)?;
        engine.reconcile(&VmInterfaceProfile::new(cluster.as_str()), &inventory.vm_interfaces)?;
        engine.reconcile(&IpAssignmentProfile::new(script.as_str()), &inventory.assignments)?;
        engine.reconcile(&PrimaryIpProfile::devices(), &inventory.devices)?;
        engine.reconcile(&PrimaryIpProfile::guests(), &inventory.vms)?;

        let offline = inventory.devices.iter().filter(|d| !d.online).count();
        if offline > 0 {
            engine.warn(
                EntityKind::Cluster,
                cluster.clone(),
                format!("{} of {} nodes are offline", offline, inventory.devices.len()),
            );
        }
        Ok(())
    })
}
