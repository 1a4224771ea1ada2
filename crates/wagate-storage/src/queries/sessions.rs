// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD operations.

use rusqlite::{Row, params};
use wagate_core::{Page, ProxyConfig, SessionRecord, WagateError};

use crate::database::{Database, map_tr_err};
use crate::queries::is_constraint_violation;

const COLUMNS: &str =
    "id, name, device_id, proxy, created_at, updated_at, connected_at, last_seen";

/// Proxy settings are stored as a JSON column; an unreadable value is
/// treated as absent rather than failing the whole row.
fn decode_proxy(raw: Option<String>) -> Option<ProxyConfig> {
    raw.and_then(|json| match serde_json::from_str(&json) {
        Ok(proxy) => Some(proxy),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable proxy column");
            None
        }
    })
}

fn encode_proxy(proxy: Option<&ProxyConfig>) -> Option<String> {
    proxy.and_then(|p| serde_json::to_string(p).ok())
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        device_id: row.get(2)?,
        proxy: decode_proxy(row.get(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        connected_at: row.get(6)?,
        last_seen: row.get(7)?,
    })
}

fn name_taken(name: &str) -> WagateError {
    WagateError::AlreadyExists {
        entity: "session",
        name: name.to_string(),
    }
}

/// Insert a new session. A duplicate name yields `AlreadyExists`.
pub async fn insert_session(db: &Database, session: &SessionRecord) -> Result<(), WagateError> {
    let s = session.clone();
    let proxy = encode_proxy(session.proxy.as_ref());
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                &format!("INSERT INTO sessions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    s.id,
                    s.name,
                    s.device_id,
                    proxy,
                    s.created_at,
                    s.updated_at,
                    s.connected_at,
                    s.last_seen,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(name_taken(&session.name))
    }
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<SessionRecord>, WagateError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SessionRecord>, rusqlite::Error> {
            let result = conn.query_row(
                &format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                from_row,
            );
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List sessions oldest first, bounded by `page`.
pub async fn list_sessions(db: &Database, page: Page) -> Result<Vec<SessionRecord>, WagateError> {
    db.connection()
        .call(move |conn| -> Result<Vec<SessionRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM sessions ORDER BY created_at ASC, id ASC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt.query_map(params![page.limit, page.offset], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_sessions(db: &Database) -> Result<u64, WagateError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}

/// Sessions that have completed pairing at least once.
pub async fn list_paired_sessions(db: &Database) -> Result<Vec<SessionRecord>, WagateError> {
    db.connection()
        .call(|conn| -> Result<Vec<SessionRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM sessions WHERE device_id != '' ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Single-row upsert keyed by id.
pub async fn save_session(db: &Database, session: &SessionRecord) -> Result<(), WagateError> {
    let s = session.clone();
    let proxy = encode_proxy(session.proxy.as_ref());
    let saved = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                &format!(
                    "INSERT INTO sessions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        device_id = excluded.device_id,
                        proxy = excluded.proxy,
                        updated_at = excluded.updated_at,
                        connected_at = excluded.connected_at,
                        last_seen = excluded.last_seen"
                ),
                params![
                    s.id,
                    s.name,
                    s.device_id,
                    proxy,
                    s.created_at,
                    s.updated_at,
                    s.connected_at,
                    s.last_seen,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if saved {
        Ok(())
    } else {
        Err(name_taken(&session.name))
    }
}

/// Delete a session; webhook and ledger rows cascade.
pub async fn delete_session(db: &Database, id: &str) -> Result<bool, WagateError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseOptions;
    use tempfile::tempdir;
    use wagate_core::ProxyScheme;

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("sessions.db"), DatabaseOptions::default())
            .await
            .unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn insert_then_get() {
        let (_dir, db) = open().await;
        let mut session = SessionRecord::new("s1", None);
        session.proxy = Some(ProxyConfig {
            scheme: ProxyScheme::Socks5,
            host: "127.0.0.1".into(),
            port: 1080,
            username: None,
            password: None,
        });
        insert_session(&db, &session).await.unwrap();

        let loaded = get_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(get_session(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_name_is_already_exists() {
        let (_dir, db) = open().await;
        insert_session(&db, &SessionRecord::new("dup", None)).await.unwrap();
        let err = insert_session(&db, &SessionRecord::new("dup", None))
            .await
            .unwrap_err();
        assert!(matches!(err, WagateError::AlreadyExists { .. }));
        assert_eq!(count_sessions(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_updates_device_and_lists_paired() {
        let (_dir, db) = open().await;
        let mut a = SessionRecord::new("a", None);
        let b = SessionRecord::new("b", None);
        insert_session(&db, &a).await.unwrap();
        insert_session(&db, &b).await.unwrap();

        a.device_id = "DEV-A".into();
        a.connected_at = Some("2026-01-01T00:00:00.000Z".into());
        save_session(&db, &a).await.unwrap();

        let paired = list_paired_sessions(&db).await.unwrap();
        assert_eq!(paired.len(), 1);
        assert_eq!(paired[0].device_id, "DEV-A");
    }

    #[tokio::test]
    async fn save_into_taken_name_fails() {
        let (_dir, db) = open().await;
        insert_session(&db, &SessionRecord::new("a", None)).await.unwrap();
        let mut b = SessionRecord::new("b", None);
        insert_session(&db, &b).await.unwrap();
        b.name = "a".into();
        assert!(matches!(
            save_session(&db, &b).await.unwrap_err(),
            WagateError::AlreadyExists { .. }
        ));
    }

    #[tokio::test]
    async fn list_is_paginated() {
        let (_dir, db) = open().await;
        for i in 0..5 {
            insert_session(&db, &SessionRecord::new(format!("s{i}"), None))
                .await
                .unwrap();
        }
        assert_eq!(list_sessions(&db, Page::new(2, 0)).await.unwrap().len(), 2);
        assert_eq!(list_sessions(&db, Page::new(10, 4)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let (_dir, db) = open().await;
        let s = SessionRecord::new("gone", None);
        insert_session(&db, &s).await.unwrap();
        assert!(delete_session(&db, &s.id).await.unwrap());
        assert!(!delete_session(&db, &s.id).await.unwrap());
    }
}
