// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook dispatcher.
//!
//! The runtime hands every event to [`WebhookDispatcher::publish`], which
//! only enqueues: each session has one worker task fed by a bounded queue,
//! so deliveries for a session leave in emission order and a slow subscriber
//! never blocks the runtime. When a queue is full the newest event is
//! dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wagate_config::model::WebhookConfig;
use wagate_core::metrics;
use wagate_core::{EventEnvelope, EventSink, EventType, WagateError, WebhookRecord, WebhookStore};

use crate::registry::{WebhookChange, WebhookRegistry};
use crate::retry::RetryPolicy;
use crate::signing::sign;

pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const EVENT_ID_HEADER: &str = "X-Event-Id";
pub const EVENT_TYPE_HEADER: &str = "X-Event-Type";
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Dispatcher tuning, resolved from `[webhook]`.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Receives every event of sessions without a webhook row, unsigned.
    pub global_url: Option<String>,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Bound on webhook row lookups.
    pub lookup_timeout: Duration,
}

impl DispatcherSettings {
    pub fn from_config(config: &WebhookConfig, lookup_timeout: Duration) -> Self {
        Self {
            global_url: config.global_url.clone().filter(|u| !u.is_empty()),
            queue_capacity: config.queue_capacity.max(1),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base: Duration::from_millis(config.retry_base_ms),
                jitter: Duration::from_millis(config.retry_jitter_ms),
            },
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            lookup_timeout,
        }
    }
}

/// Where one event goes.
#[derive(Debug, Clone, PartialEq)]
struct Target {
    url: String,
    secret: Option<String>,
}

struct Inner {
    store: Arc<dyn WebhookStore>,
    /// `None` caches the absence of a row.
    cache: RwLock<HashMap<String, Option<WebhookRecord>>>,
    workers: DashMap<String, mpsc::Sender<EventEnvelope>>,
    client: reqwest::Client,
    settings: DispatcherSettings,
    tracker: TaskTracker,
    cancel: CancellationToken,
    closed: AtomicBool,
}

/// Per-session webhook delivery with HMAC signing and bounded retry.
#[derive(Clone)]
pub struct WebhookDispatcher {
    inner: Arc<Inner>,
}

impl WebhookDispatcher {
    /// Build a dispatcher reading rows through `registry` and following its
    /// change notifications.
    pub fn new(
        registry: &WebhookRegistry,
        settings: DispatcherSettings,
    ) -> Result<Self, WagateError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| WagateError::Internal(format!("failed to build webhook HTTP client: {e}")))?;

        let inner = Arc::new(Inner {
            store: registry.store(),
            cache: RwLock::new(HashMap::new()),
            workers: DashMap::new(),
            client,
            settings,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });
        tokio::spawn(follow_changes(inner.clone(), registry.subscribe()));
        info!(
            global_url = inner.settings.global_url.is_some(),
            queue_capacity = inner.settings.queue_capacity,
            max_retries = inner.settings.retry.max_retries,
            "webhook dispatcher started"
        );
        Ok(Self { inner })
    }

    /// Number of sessions with a running delivery worker.
    pub fn worker_count(&self) -> usize {
        self.inner.workers.len()
    }

    /// Stop accepting events and wait up to `budget` for queued deliveries.
    /// Retries still pending afterwards are abandoned.
    pub async fn drain(&self, budget: Duration) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(workers = self.inner.workers.len(), "draining webhook queues");
        self.inner.workers.clear();
        self.inner.tracker.close();
        if tokio::time::timeout(budget, self.inner.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                budget_secs = budget.as_secs(),
                "webhook queues not drained in time, abandoning pending deliveries"
            );
        }
        self.inner.cancel.cancel();
    }
}

impl EventSink for WebhookDispatcher {
    fn publish(&self, envelope: EventEnvelope) {
        self.inner.enqueue(envelope);
    }

    fn forget_session(&self, session_id: &str) {
        self.inner.workers.remove(session_id);
        self.inner.cache_mut().remove(session_id);
        debug!(session_id, "webhook worker released");
    }
}

impl Inner {
    fn cache_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Option<WebhookRecord>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self, session_id: &str) -> Option<Option<WebhookRecord>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn enqueue(self: &Arc<Self>, envelope: EventEnvelope) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(session_id = %envelope.session_id, event_id = %envelope.event_id, "dispatcher closed, dropping event");
            metrics::record_webhook_dropped("closed");
            return;
        }

        let sender = self
            .workers
            .entry(envelope.session_id.clone())
            .or_insert_with(|| self.spawn_worker(&envelope.session_id))
            .clone();

        match sender.try_send(envelope) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                warn!(
                    session_id = %envelope.session_id,
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    "webhook queue full, dropping event"
                );
                metrics::record_webhook_dropped("queue_full");
            }
            Err(mpsc::error::TrySendError::Closed(envelope)) => {
                debug!(session_id = %envelope.session_id, "webhook worker gone, dropping event");
                metrics::record_webhook_dropped("closed");
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, session_id: &str) -> mpsc::Sender<EventEnvelope> {
        let (tx, rx) = mpsc::channel(self.settings.queue_capacity);
        self.tracker
            .spawn(run_worker(self.clone(), session_id.to_string(), rx));
        debug!(session_id, "webhook worker started");
        tx
    }

    /// Resolve the delivery target for one event, or `None` to drop it.
    async fn resolve(&self, session_id: &str, event_type: EventType) -> Option<Target> {
        let row = match self.cached(session_id) {
            Some(row) => row,
            None => {
                let lookup = tokio::time::timeout(
                    self.settings.lookup_timeout,
                    self.store.get_webhook(session_id),
                )
                .await;
                match lookup {
                    Ok(Ok(row)) => self
                        .cache_mut()
                        .entry(session_id.to_string())
                        .or_insert(row)
                        .clone(),
                    Ok(Err(e)) => {
                        warn!(session_id, error = %e, "webhook lookup failed");
                        None
                    }
                    Err(_) => {
                        warn!(session_id, "webhook lookup timed out");
                        None
                    }
                }
            }
        };

        match row {
            Some(webhook) if webhook.wants(event_type) => Some(Target {
                url: webhook.url,
                secret: webhook.secret,
            }),
            Some(_) => None,
            None => self.settings.global_url.clone().map(|url| Target { url, secret: None }),
        }
    }

    async fn deliver(&self, target: &Target, envelope: &EventEnvelope) {
        let body = match serde_json::to_vec(envelope) {
            Ok(body) => body,
            Err(e) => {
                error!(event_id = %envelope.event_id, error = %e, "failed to serialize webhook envelope");
                return;
            }
        };
        let signature = match target.secret.as_deref().map(|s| sign(s, &body)).transpose() {
            Ok(signature) => signature,
            Err(e) => {
                error!(event_id = %envelope.event_id, error = %e, "failed to sign webhook body");
                return;
            }
        };

        let policy = self.settings.retry;
        for attempt in 0..=policy.max_retries {
            if attempt > 0 {
                let delay = policy.delay(attempt - 1);
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = self.cancel.cancelled() => {
                        warn!(event_id = %envelope.event_id, "dispatcher stopped, abandoning retries");
                        metrics::record_webhook_delivery("failed");
                        return;
                    }
                }
            }

            let outcome = tokio::select! {
                outcome = self.post(target, envelope, &body, signature.as_deref()) => outcome,
                () = self.cancel.cancelled() => {
                    warn!(event_id = %envelope.event_id, "dispatcher stopped during delivery");
                    metrics::record_webhook_delivery("failed");
                    return;
                }
            };
            match outcome {
                Ok(()) => {
                    metrics::record_webhook_delivery("delivered");
                    debug!(
                        session_id = %envelope.session_id,
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        attempt = attempt + 1,
                        "webhook delivered"
                    );
                    return;
                }
                Err(reason) if attempt < policy.max_retries => {
                    metrics::record_webhook_delivery("retry");
                    warn!(
                        session_id = %envelope.session_id,
                        event_id = %envelope.event_id,
                        attempt = attempt + 1,
                        reason = %reason,
                        "webhook delivery failed, retrying"
                    );
                }
                Err(reason) => {
                    metrics::record_webhook_delivery("failed");
                    error!(
                        session_id = %envelope.session_id,
                        event_id = %envelope.event_id,
                        attempts = attempt + 1,
                        reason = %reason,
                        "webhook delivery failed, dropping event"
                    );
                }
            }
        }
    }

    async fn post(
        &self,
        target: &Target,
        envelope: &EventEnvelope,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), String> {
        let mut request = self
            .client
            .post(&target.url)
            .header(CONTENT_TYPE, "application/json")
            .header(EVENT_ID_HEADER, &envelope.event_id)
            .header(EVENT_TYPE_HEADER, envelope.event_type.to_string())
            .header(SESSION_ID_HEADER, &envelope.session_id)
            .body(body.to_vec());
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }

    fn apply_change(&self, change: WebhookChange) {
        let mut cache = self.cache_mut();
        match change {
            WebhookChange::Upserted(record) => {
                cache.insert(record.session_id.clone(), Some(record));
            }
            WebhookChange::Removed { session_id } => {
                cache.insert(session_id, None);
            }
        }
    }
}

async fn run_worker(inner: Arc<Inner>, session_id: String, mut queue: mpsc::Receiver<EventEnvelope>) {
    while let Some(envelope) = queue.recv().await {
        if inner.cancel.is_cancelled() {
            break;
        }
        if let Some(target) = inner.resolve(&session_id, envelope.event_type).await {
            inner.deliver(&target, &envelope).await;
        }
    }
    debug!(session_id = %session_id, "webhook worker stopped");
}

async fn follow_changes(inner: Arc<Inner>, mut changes: broadcast::Receiver<WebhookChange>) {
    loop {
        tokio::select! {
            () = inner.cancel.cancelled() => break,
            change = changes.recv() => match change {
                Ok(change) => {
                    debug!(session_id = change.session_id(), "webhook cache updated");
                    inner.apply_change(change);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "webhook change notifications lagged, clearing cache");
                    inner.cache_mut().clear();
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
