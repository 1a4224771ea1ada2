// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for session rows, device blobs, webhooks and the
//! message ledger.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::types::{LedgerEntry, Page, SessionRecord, WebhookRecord};

/// Durable session rows.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new row. Fails with `AlreadyExists` when the name is taken.
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), WagateError>;

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, WagateError>;

    async fn list_sessions(&self, page: Page) -> Result<Vec<SessionRecord>, WagateError>;

    async fn count_sessions(&self) -> Result<u64, WagateError>;

    /// Sessions with a non-empty device id, oldest first.
    async fn list_paired_sessions(&self) -> Result<Vec<SessionRecord>, WagateError>;

    /// Single-row upsert keyed by id.
    async fn save_session(&self, record: &SessionRecord) -> Result<(), WagateError>;

    /// Returns `true` when a row was removed.
    async fn delete_session(&self, id: &str) -> Result<bool, WagateError>;
}

/// Opaque per-device blob storage used by the remote client.
#[async_trait]
pub trait DeviceKeystore: Send + Sync {
    async fn get(&self, device_id: &str) -> Result<Option<Vec<u8>>, WagateError>;

    async fn put(&self, device_id: &str, blob: &[u8]) -> Result<(), WagateError>;

    /// Returns `true` when a device was removed.
    async fn delete(&self, device_id: &str) -> Result<bool, WagateError>;

    async fn list(&self) -> Result<Vec<String>, WagateError>;
}

/// Webhook rows, at most one per session.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn get_webhook(&self, session_id: &str) -> Result<Option<WebhookRecord>, WagateError>;

    /// Insert or replace the session's webhook, returning the stored row.
    ///
    /// An existing row keeps its id and `created_at`.
    async fn upsert_webhook(&self, record: &WebhookRecord) -> Result<WebhookRecord, WagateError>;

    async fn delete_webhook(&self, session_id: &str) -> Result<bool, WagateError>;

    async fn list_webhooks(&self) -> Result<Vec<WebhookRecord>, WagateError>;
}

/// Light sync-status ledger of sent and received messages.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    /// Record an entry. Returns `false` when the `(session, remote id)` pair
    /// was already present.
    async fn record(&self, entry: &LedgerEntry) -> Result<bool, WagateError>;

    async fn mark_synced(&self, id: &str) -> Result<bool, WagateError>;

    async fn mark_failed(&self, id: &str) -> Result<bool, WagateError>;

    async fn list_pending(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, WagateError>;
}
