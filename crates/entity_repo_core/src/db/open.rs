//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply the connection pragmas requested by `DatabaseConfig`.
//!
//! # Invariants
//! - Returned connections have `foreign_keys` set as configured.
//! - Returned connections carry the configured busy timeout.

use super::DbResult;
use crate::config::DatabaseConfig;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and configures it.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, config: &DatabaseConfig) -> DbResult<Connection> {
    open_with("file", config, || Connection::open(path))
}

/// Opens a private in-memory SQLite database and configures it.
pub fn open_db_in_memory(config: &DatabaseConfig) -> DbResult<Connection> {
    open_with("memory", config, Connection::open_in_memory)
}

/// Opens the database described by `config`.
///
/// `path = None` selects an in-memory database.
pub fn open_db_with_config(config: &DatabaseConfig) -> DbResult<Connection> {
    match config.path.as_deref() {
        Some(path) => open_db(path, config),
        None => open_db_in_memory(config),
    }
}

fn open_with(
    mode: &'static str,
    config: &DatabaseConfig,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} foreign_keys={} duration_ms={}",
                mode,
                config.foreign_keys,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_configure_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> rusqlite::Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}
