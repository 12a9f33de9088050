//! Repository layer persisting registry entities to SQLite

pub mod hydration;
pub mod sqlite_registry;

pub use sqlite_registry::SqliteRegistry;
