// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage behaviour through the trait objects the runtime uses.

use std::sync::Arc;

use tempfile::tempdir;
use wagate_config::model::StorageConfig;
use wagate_core::types::now_timestamp;
use wagate_core::{
    EventSubscription, LedgerEntry, MessageLedger, SessionRecord, SessionStore, WebhookRecord,
    WebhookStore,
};
use wagate_storage::SqliteStorage;

async fn storage(dir: &std::path::Path) -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new(StorageConfig {
        database_url: dir.join("it.db").display().to_string(),
        ..StorageConfig::default()
    });
    storage.initialize().await.unwrap();
    Arc::new(storage)
}

#[tokio::test]
async fn deleting_a_session_removes_its_rows() {
    let dir = tempdir().unwrap();
    let storage = storage(dir.path()).await;
    let sessions: Arc<dyn SessionStore> = storage.clone();
    let webhooks: Arc<dyn WebhookStore> = storage.clone();
    let ledger: Arc<dyn MessageLedger> = storage.clone();

    let session = SessionRecord::new("cascade", None);
    sessions.insert_session(&session).await.unwrap();

    let now = now_timestamp();
    webhooks
        .upsert_webhook(&WebhookRecord {
            id: "wh-1".into(),
            session_id: session.id.clone(),
            url: "http://127.0.0.1:9/hook".into(),
            secret: None,
            events: EventSubscription::All,
            enabled: true,
            created_at: now.clone(),
            updated_at: now,
        })
        .await
        .unwrap();
    let entry = LedgerEntry::pending(
        &session.id,
        "MSG-1",
        "1@s.whatsapp.net",
        "1@s.whatsapp.net",
        false,
        "text",
        "2026-01-01T00:00:00.000Z",
        None,
    );
    assert!(ledger.record(&entry).await.unwrap());

    assert!(sessions.delete_session(&session.id).await.unwrap());
    assert!(webhooks.list_webhooks().await.unwrap().is_empty());
    assert!(ledger.list_pending(&session.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn key_file_is_reused_across_restarts() {
    use wagate_core::DeviceKeystore;

    let dir = tempdir().unwrap();
    {
        let storage = storage(dir.path()).await;
        storage.put("DEV-9", b"persisted").await.unwrap();
        storage.close().await.unwrap();
    }
    assert!(dir.path().join("it.db.key").exists());

    let storage = storage(dir.path()).await;
    assert_eq!(
        storage.get("DEV-9").await.unwrap().as_deref(),
        Some(&b"persisted"[..])
    );
}
