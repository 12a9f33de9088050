//! netrecon core - reconciliation kernel
//!
//! This crate provides the pieces of a reconciliation run that do not
//! depend on a particular store or source:
//! - Registry entity model and typed observation records
//! - Entity matching (external id, then exact name, with ambiguity escalation)
//! - Field-level change detection driven by per-kind field rules
//! - Kind profiles for the phone directory, subnet scan and Proxmox sources
//! - The `RegistryStore` contract with an in-memory implementation
//! - Error and logging facilities shared by the workspace

pub mod diff;
pub mod errors;
pub mod kinds;
pub mod logging_facility;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod ops;
pub mod profile;
pub mod rules;

/// Canonical log field and event names, for the logging macros
pub use netrecon_core_types::schema;

// Re-export commonly used types
pub use diff::{diff, ChangeSet, FieldChange, FieldRule, FieldTarget};
pub use errors::{ExError, ExErrorKind, ReconError, Result};
pub use matcher::{resolve, MatchResult, MatchVia};
pub use model::{EntityDraft, EntityId, EntityKind, FieldValue, Observation, RegistryEntity};
pub use ops::{detach_reference, InMemoryRegistry, RegistryStore};
pub use profile::{KindProfile, RetirePolicy};
