//! Registry schema migrations, embedded at compile time

use sha2::{Digest, Sha256};

/// One schema step of the registry database
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Hex SHA-256 of the SQL; recorded on apply and compared on every open
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

/// Registry schema history, oldest first. Append only: an applied step whose
/// SQL changes is reported as drift.
pub static REGISTRY_MIGRATIONS: &[Migration] = &[
    Migration {
        id: "001_registry",
        sql: include_str!("../../migrations/001_registry.sql"),
    },
    Migration {
        id: "002_unique_tags",
        sql: include_str!("../../migrations/002_unique_tags.sql"),
    },
];
