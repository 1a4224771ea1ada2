// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All reads and writes are serialized through tokio-rusqlite's single
//! background thread. Migrations run once on a short-lived synchronous
//! connection before that thread is started.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use wagate_core::WagateError;

use crate::migrations;

/// Convert a tokio-rusqlite error into `WagateError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> WagateError {
    WagateError::Storage {
        source: Box::new(e),
    }
}

fn map_sqlite_err(e: rusqlite::Error) -> WagateError {
    WagateError::Storage {
        source: Box::new(e),
    }
}

/// Connection-level settings applied at open.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub wal_mode: bool,
    pub busy_timeout: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            wal_mode: true,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, options: &DatabaseOptions) -> rusqlite::Result<()> {
    conn.busy_timeout(options.busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if options.wal_mode {
        conn.query_row("PRAGMA journal_mode = WAL;", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
    }
    Ok(())
}

/// A migrated SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &Path, options: DatabaseOptions) -> Result<Self, WagateError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| WagateError::Storage {
                source: Box::new(e),
            })?;
        }

        let migrate_path = path.to_path_buf();
        let migrate_options = options.clone();
        tokio::task::spawn_blocking(move || -> Result<(), WagateError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(map_sqlite_err)?;
            apply_pragmas(&conn, &migrate_options).map_err(map_sqlite_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| WagateError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| WagateError::Storage {
                source: Box::new(e),
            })?;
        conn.call(move |conn| -> Result<(), rusqlite::Error> { apply_pragmas(conn, &options) })
            .await
            .map_err(map_tr_err)?;

        debug!(path = %path.display(), "database opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// The background connection all queries run on.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cheap liveness probe.
    pub async fn ping(&self) -> Result<(), WagateError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), WagateError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
