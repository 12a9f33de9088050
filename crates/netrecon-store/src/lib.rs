//! netrecon store - SQLite persistence for the asset registry
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - `SqliteRegistry`, the durable implementation of `RegistryStore`

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteRegistry;
