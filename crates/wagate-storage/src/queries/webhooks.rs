// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook CRUD operations.

use rusqlite::{Row, params};
use wagate_core::{EventSubscription, WagateError, WebhookRecord};

use crate::database::{Database, map_tr_err};
use crate::queries::is_foreign_key_violation;

const COLUMNS: &str = "id, session_id, url, secret, events, enabled, created_at, updated_at";

fn decode_events(raw: &str) -> EventSubscription {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, events = raw, "unreadable webhook events, subscribing to all");
        EventSubscription::All
    })
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<WebhookRecord> {
    let events: String = row.get(4)?;
    Ok(WebhookRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        url: row.get(2)?,
        secret: row.get(3)?,
        events: decode_events(&events),
        enabled: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn select_by_session(
    conn: &rusqlite::Connection,
    session_id: &str,
) -> rusqlite::Result<Option<WebhookRecord>> {
    let result = conn.query_row(
        &format!("SELECT {COLUMNS} FROM webhooks WHERE session_id = ?1"),
        params![session_id],
        from_row,
    );
    match result {
        Ok(webhook) => Ok(Some(webhook)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn get_webhook(
    db: &Database,
    session_id: &str,
) -> Result<Option<WebhookRecord>, WagateError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<WebhookRecord>, rusqlite::Error> {
            select_by_session(conn, &session_id)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the session's webhook. An existing row keeps its id and
/// creation time. Fails with `NotFound` when the session does not exist.
pub async fn upsert_webhook(
    db: &Database,
    webhook: &WebhookRecord,
) -> Result<WebhookRecord, WagateError> {
    let w = webhook.clone();
    let events = serde_json::to_string(&webhook.events).map_err(|e| WagateError::Storage {
        source: Box::new(e),
    })?;
    let stored = db
        .connection()
        .call(move |conn| -> Result<Option<WebhookRecord>, rusqlite::Error> {
            let result = conn.execute(
                &format!(
                    "INSERT INTO webhooks ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(session_id) DO UPDATE SET
                        url = excluded.url,
                        secret = excluded.secret,
                        events = excluded.events,
                        enabled = excluded.enabled,
                        updated_at = excluded.updated_at"
                ),
                params![
                    w.id,
                    w.session_id,
                    w.url,
                    w.secret,
                    events,
                    w.enabled,
                    w.created_at,
                    w.updated_at,
                ],
            );
            match result {
                Ok(_) => select_by_session(conn, &w.session_id),
                Err(e) if is_foreign_key_violation(&e) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    stored.ok_or_else(|| WagateError::session_not_found(&webhook.session_id))
}

pub async fn delete_webhook(db: &Database, session_id: &str) -> Result<bool, WagateError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM webhooks WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_webhooks(db: &Database) -> Result<Vec<WebhookRecord>, WagateError> {
    db.connection()
        .call(|conn| -> Result<Vec<WebhookRecord>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM webhooks ORDER BY created_at ASC"))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
