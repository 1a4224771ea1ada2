// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook registry: validated CRUD over webhook rows plus change
//! notifications for the dispatcher's cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};
use wagate_core::types::now_timestamp;
use wagate_core::{EventSubscription, WagateError, WebhookRecord, WebhookStore};

/// Minimum accepted HMAC secret length, in characters.
pub const MIN_SECRET_LEN: usize = 16;

const CHANGE_BUFFER: usize = 64;

/// A registry write the dispatcher must observe.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookChange {
    Upserted(WebhookRecord),
    Removed { session_id: String },
}

impl WebhookChange {
    pub fn session_id(&self) -> &str {
        match self {
            WebhookChange::Upserted(record) => &record.session_id,
            WebhookChange::Removed { session_id } => session_id,
        }
    }
}

/// Requested webhook settings for a session.
#[derive(Debug, Clone, Default)]
pub struct WebhookInput {
    pub url: String,
    pub secret: Option<String>,
    /// Event names; `None` subscribes to `All`.
    pub events: Option<Vec<String>>,
    /// Defaults to enabled.
    pub enabled: Option<bool>,
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<(), WagateError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| WagateError::Validation(format!("url is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WagateError::Validation(format!(
            "url scheme must be http or https, got `{}`",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(WagateError::Validation("url must include a host".to_string()));
    }
    Ok(())
}

pub fn validate_secret(secret: &str) -> Result<(), WagateError> {
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(WagateError::Validation(format!(
            "secret must be at least {MIN_SECRET_LEN} characters"
        )));
    }
    Ok(())
}

/// Check url, secret and event names, returning the parsed subscription.
pub fn validate_input(input: &WebhookInput) -> Result<EventSubscription, WagateError> {
    validate_url(&input.url)?;
    if let Some(secret) = input.secret.as_deref().filter(|s| !s.is_empty()) {
        validate_secret(secret)?;
    }
    match &input.events {
        Some(names) => EventSubscription::parse(names),
        None => Ok(EventSubscription::All),
    }
}

/// CRUD over webhook rows with validation.
///
/// Every successful write is broadcast as a [`WebhookChange`].
#[derive(Clone)]
pub struct WebhookRegistry {
    store: Arc<dyn WebhookStore>,
    changes: broadcast::Sender<WebhookChange>,
    timeout: Duration,
}

impl WebhookRegistry {
    pub fn new(store: Arc<dyn WebhookStore>, timeout: Duration) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            store,
            changes,
            timeout,
        }
    }

    pub fn store(&self) -> Arc<dyn WebhookStore> {
        self.store.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WebhookChange> {
        self.changes.subscribe()
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<WebhookRecord>, WagateError> {
        self.bounded(self.store.get_webhook(session_id)).await
    }

    pub async fn list(&self) -> Result<Vec<WebhookRecord>, WagateError> {
        self.bounded(self.store.list_webhooks()).await
    }

    /// Validate and store the session's webhook, replacing any existing one.
    pub async fn put(
        &self,
        session_id: &str,
        input: WebhookInput,
    ) -> Result<WebhookRecord, WagateError> {
        let events = validate_input(&input)?;
        let secret = input.secret.filter(|s| !s.is_empty());

        let now = now_timestamp();
        let record = WebhookRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            url: input.url,
            secret,
            events,
            enabled: input.enabled.unwrap_or(true),
            created_at: now.clone(),
            updated_at: now,
        };
        let stored = self.bounded(self.store.upsert_webhook(&record)).await?;
        info!(session_id, webhook_id = %stored.id, url = %stored.url, "webhook registered");
        self.notify(WebhookChange::Upserted(stored.clone()));
        Ok(stored)
    }

    /// Returns `true` when a webhook was removed.
    pub async fn delete(&self, session_id: &str) -> Result<bool, WagateError> {
        let removed = self.bounded(self.store.delete_webhook(session_id)).await?;
        if removed {
            info!(session_id, "webhook removed");
            self.notify(WebhookChange::Removed {
                session_id: session_id.to_string(),
            });
        }
        Ok(removed)
    }

    fn notify(&self, change: WebhookChange) {
        if self.changes.send(change).is_err() {
            debug!("no webhook change subscribers");
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, WagateError>>,
    ) -> Result<T, WagateError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| WagateError::Timeout {
                duration: self.timeout,
            })?
    }
}
