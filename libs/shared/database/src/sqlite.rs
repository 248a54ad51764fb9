use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../migrations/001_initial.sql"))];

/// Opens the database file at `path`, creating it and running pending
/// migrations when needed.
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;",
    )?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// A second handle on an already migrated file that refuses writes.
pub fn open_read_connection(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA query_only=ON;")?;
    Ok(conn)
}

pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = current_version(conn);

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            info!("Running migration v{}", version);
            conn.execute_batch(sql).map_err(|e| StoreError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// 0 when no schema exists yet.
fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}
