//! Schema migrations of the registry database
//!
//! Steps are embedded in the binary, applied once each inside a transaction
//! and pinned by checksum.

mod catalog;
mod runner;

pub use catalog::{Migration, REGISTRY_MIGRATIONS};
pub use runner::{apply_migrations, applied_migrations};
