// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ledger operations.

use rusqlite::{Row, params};
use wagate_core::types::now_timestamp;
use wagate_core::{LedgerEntry, SyncStatus, WagateError};

use crate::database::{Database, map_tr_err};
use crate::queries::is_foreign_key_violation;

const COLUMNS: &str = "id, session_id, remote_message_id, chat, sender, from_me, message_type, \
                       timestamp, content, sync_status, synced_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let status: String = row.get(9)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        session_id: row.get(1)?,
        remote_message_id: row.get(2)?,
        chat: row.get(3)?,
        sender: row.get(4)?,
        from_me: row.get(5)?,
        message_type: row.get(6)?,
        timestamp: row.get(7)?,
        content: row.get(8)?,
        sync_status: status.parse().unwrap_or(SyncStatus::Pending),
        synced_at: row.get(10)?,
    })
}

/// Insert an entry unless `(session_id, remote_message_id)` is already
/// recorded. Returns `true` when a new row was written.
///
/// An entry for a session that no longer exists is ignored.
pub async fn record(db: &Database, entry: &LedgerEntry) -> Result<bool, WagateError> {
    let e = entry.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO message_ledger ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    e.id,
                    e.session_id,
                    e.remote_message_id,
                    e.chat,
                    e.sender,
                    e.from_me,
                    e.message_type,
                    e.timestamp,
                    e.content,
                    e.sync_status.to_string(),
                    e.synced_at,
                ],
            );
            match result {
                Ok(n) => Ok(n > 0),
                Err(err) if is_foreign_key_violation(&err) => Ok(false),
                Err(err) => Err(err),
            }
        })
        .await
        .map_err(map_tr_err)
}

async fn set_status(db: &Database, id: &str, status: SyncStatus) -> Result<bool, WagateError> {
    let id = id.to_string();
    let synced_at = (status == SyncStatus::Synced).then(now_timestamp);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE message_ledger SET sync_status = ?1, synced_at = ?2 WHERE id = ?3",
                params![status.to_string(), synced_at, id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_synced(db: &Database, id: &str) -> Result<bool, WagateError> {
    set_status(db, id, SyncStatus::Synced).await
}

pub async fn mark_failed(db: &Database, id: &str) -> Result<bool, WagateError> {
    set_status(db, id, SyncStatus::Failed).await
}

/// Oldest pending entries of a session.
pub async fn list_pending(
    db: &Database,
    session_id: &str,
    limit: u32,
) -> Result<Vec<LedgerEntry>, WagateError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<LedgerEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM message_ledger
                 WHERE session_id = ?1 AND sync_status = 'pending'
                 ORDER BY created_at ASC, rowid ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![session_id, limit], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
