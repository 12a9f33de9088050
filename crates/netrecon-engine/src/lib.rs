//! netrecon engine - reconciliation orchestration
//!
//! Drives the two-pass sweep of every kind profile against the registry,
//! owns the staged (dry-run) store overlay, and provides the observation
//! sources and the pipelines that fix the cross-kind order.

pub mod config;
pub mod engine;
pub mod pipelines;
pub mod prerequisites;
pub mod sources;
pub mod staging;
pub mod summary;

pub use config::ReconConfig;
pub use engine::{ReconciliationEngine, RunMode};
pub use pipelines::{run_directory, run_ip_scan, run_proxmox};
pub use sources::{JsonFileSource, ObservationSource, Snapshot, StaticSource};
pub use staging::StagedStore;
pub use summary::{Action, ActionLogEntry, KindSummary, LogLevel, RunReport};
