//! Connections to the registry database

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a write waits on a lock held by another process (a cron run
/// overlapping a manual one) before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the registry lives
#[derive(Debug, Clone, Copy)]
pub enum Location<'a> {
    File(&'a Path),
    Memory,
}

/// Open and configure a connection
///
/// Reference cleanup relies on `ON DELETE SET NULL`, so foreign keys are
/// always enforced. File databases switch to WAL.
pub fn connect(location: Location<'_>) -> Result<Connection> {
    let conn = match location {
        Location::File(path) => Connection::open(path),
        Location::Memory => Connection::open_in_memory(),
    }
    .map_err(from_rusqlite)?;

    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(from_rusqlite)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;

    if let Location::File(_) = location {
        // journal_mode returns a row, so it cannot go through execute()
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .map_err(from_rusqlite)?;
    }

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = connect(Location::Memory).unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::TempDir::new().unwrap();
        let conn = connect(Location::File(&dir.path().join("r.db"))).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }
}
