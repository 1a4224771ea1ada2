// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the persistence traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use wagate_config::model::StorageConfig;
use wagate_core::{
    DeviceKeystore, LedgerEntry, MessageLedger, Page, SessionRecord, SessionStore, WagateError,
    WebhookRecord, WebhookStore,
};

use crate::crypto;
use crate::database::{Database, DatabaseOptions};
use crate::keystore::{self, KeystoreKey};
use crate::queries;
use crate::queries::devices::SealedDevice;

/// SQLite-backed storage.
///
/// The database is opened by [`SqliteStorage::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
    key: OnceCell<KeystoreKey>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("database", &self.config.database_path())
            .field("initialized", &self.db.initialized())
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Create a storage handle. Nothing is opened until [`Self::initialize`].
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            key: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, WagateError> {
        self.db.get().ok_or_else(|| WagateError::Storage {
            source: "storage not initialized: call initialize() first".into(),
        })
    }

    fn key(&self) -> Result<&KeystoreKey, WagateError> {
        self.key.get().ok_or_else(|| WagateError::Storage {
            source: "keystore key not loaded: call initialize() first".into(),
        })
    }

    /// Resolve the keystore key, open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), WagateError> {
        let path = self.config.database_path();
        let key = keystore::resolve_key(self.config.keystore_key.as_deref(), &path)?;

        let options = DatabaseOptions {
            wal_mode: self.config.wal_mode,
            busy_timeout: std::time::Duration::from_millis(self.config.busy_timeout_ms),
        };
        let db = Database::open(&path, options).await?;
        self.db.set(db).map_err(|_| WagateError::Storage {
            source: "storage already initialized".into(),
        })?;
        self.key.set(key).map_err(|_| WagateError::Storage {
            source: "keystore key already loaded".into(),
        })?;
        debug!(path = %path.display(), "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoint the WAL. Safe to call when never initialized.
    pub async fn close(&self) -> Result<(), WagateError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), WagateError> {
        self.db()?.ping().await
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), WagateError> {
        queries::sessions::insert_session(self.db()?, record).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, WagateError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn list_sessions(&self, page: Page) -> Result<Vec<SessionRecord>, WagateError> {
        queries::sessions::list_sessions(self.db()?, page).await
    }

    async fn count_sessions(&self) -> Result<u64, WagateError> {
        queries::sessions::count_sessions(self.db()?).await
    }

    async fn list_paired_sessions(&self) -> Result<Vec<SessionRecord>, WagateError> {
        queries::sessions::list_paired_sessions(self.db()?).await
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<(), WagateError> {
        queries::sessions::save_session(self.db()?, record).await
    }

    async fn delete_session(&self, id: &str) -> Result<bool, WagateError> {
        queries::sessions::delete_session(self.db()?, id).await
    }
}

#[async_trait]
impl DeviceKeystore for SqliteStorage {
    async fn get(&self, device_id: &str) -> Result<Option<Vec<u8>>, WagateError> {
        let Some(sealed) = queries::devices::get_device(self.db()?, device_id).await? else {
            return Ok(None);
        };
        crypto::open(self.key()?, &sealed.nonce, &sealed.ciphertext).map(Some)
    }

    async fn put(&self, device_id: &str, blob: &[u8]) -> Result<(), WagateError> {
        let (ciphertext, nonce) = crypto::seal(self.key()?, blob)?;
        let sealed = SealedDevice {
            nonce: nonce.to_vec(),
            ciphertext,
        };
        queries::devices::put_device(self.db()?, device_id, sealed).await
    }

    async fn delete(&self, device_id: &str) -> Result<bool, WagateError> {
        queries::devices::delete_device(self.db()?, device_id).await
    }

    async fn list(&self) -> Result<Vec<String>, WagateError> {
        queries::devices::list_devices(self.db()?).await
    }
}

#[async_trait]
impl WebhookStore for SqliteStorage {
    async fn get_webhook(&self, session_id: &str) -> Result<Option<WebhookRecord>, WagateError> {
        queries::webhooks::get_webhook(self.db()?, session_id).await
    }

    async fn upsert_webhook(&self, record: &WebhookRecord) -> Result<WebhookRecord, WagateError> {
        queries::webhooks::upsert_webhook(self.db()?, record).await
    }

    async fn delete_webhook(&self, session_id: &str) -> Result<bool, WagateError> {
        queries::webhooks::delete_webhook(self.db()?, session_id).await
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookRecord>, WagateError> {
        queries::webhooks::list_webhooks(self.db()?).await
    }
}

#[async_trait]
impl MessageLedger for SqliteStorage {
    async fn record(&self, entry: &LedgerEntry) -> Result<bool, WagateError> {
        queries::ledger::record(self.db()?, entry).await
    }

    async fn mark_synced(&self, id: &str) -> Result<bool, WagateError> {
        queries::ledger::mark_synced(self.db()?, id).await
    }

    async fn mark_failed(&self, id: &str) -> Result<bool, WagateError> {
        queries::ledger::mark_failed(self.db()?, id).await
    }

    async fn list_pending(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, WagateError> {
        queries::ledger::list_pending(self.db()?, session_id, limit).await
    }
}
