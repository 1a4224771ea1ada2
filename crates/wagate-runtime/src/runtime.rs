// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session registry and its public command surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, oneshot};
use tracing::{debug, info, warn};
use wagate_core::metrics;
use wagate_core::types::validate_session_name;
use wagate_core::{
    ChatAddress, DeviceKeystore, EventSink, GroupCommand, GroupOutcome, MessageBody, MessageLedger,
    Page, ProxyConfig, QrState, RemoteClientFactory, SendReceipt, SessionRecord, SessionSnapshot,
    SessionStatus, SessionStore, WagateError,
};

use crate::command::{Command, Reply};
use crate::deadline::with_deadline;
use crate::settings::RuntimeSettings;
use crate::supervisor::{SessionChannels, SessionHandle, Supervisor};

/// Collaborators the runtime is wired with.
#[derive(Clone)]
pub struct RuntimeDeps {
    pub sessions: Arc<dyn SessionStore>,
    pub keystore: Arc<dyn DeviceKeystore>,
    pub ledger: Arc<dyn MessageLedger>,
    pub factory: Arc<dyn RemoteClientFactory>,
    pub sink: Arc<dyn EventSink>,
}

/// Session totals reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    pub total: u64,
    pub live: usize,
    pub connected: usize,
}

/// In-memory registry of session supervisors.
///
/// Lookups take the read lock; spawning and removing supervisors take the
/// write lock. The lock is never held across a supervisor round-trip.
pub struct SessionRuntime {
    pub(crate) deps: RuntimeDeps,
    pub(crate) settings: Arc<RuntimeSettings>,
    registry: RwLock<HashMap<String, SessionHandle>>,
    accepting: AtomicBool,
}

impl SessionRuntime {
    pub fn new(deps: RuntimeDeps, settings: RuntimeSettings) -> Self {
        info!(backend = deps.factory.name(), "session runtime created");
        Self {
            deps,
            settings: Arc::new(settings),
            registry: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
        }
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Whether new commands are accepted (false once shutdown began).
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Create a new, unpaired session. No remote client is constructed.
    pub async fn create(
        &self,
        name: &str,
        proxy: Option<ProxyConfig>,
    ) -> Result<SessionSnapshot, WagateError> {
        self.check_accepting()?;
        validate_session_name(name)?;
        if let Some(proxy) = &proxy {
            proxy.validate()?;
        }

        let record = SessionRecord::new(name, proxy);
        self.store(self.deps.sessions.insert_session(&record)).await?;
        info!(session_id = %record.id, name = %record.name, "session created");

        let channels = self.register(record).await;
        let snapshot = channels.snapshot.borrow().clone();
        Ok(snapshot)
    }

    pub async fn get(&self, id: &str) -> Result<SessionSnapshot, WagateError> {
        if let Some(channels) = self.running(id).await {
            return Ok(channels.snapshot.borrow().clone());
        }
        let record = self.load(id).await?;
        Ok(SessionSnapshot::new(record))
    }

    /// One page of sessions plus the total row count.
    pub async fn list(&self, page: Page) -> Result<(Vec<SessionSnapshot>, u64), WagateError> {
        let rows = self.store(self.deps.sessions.list_sessions(page)).await?;
        let total = self.store(self.deps.sessions.count_sessions()).await?;
        let registry = self.registry.read().await;
        let snapshots = rows
            .into_iter()
            .map(|record| match registry.get(&record.id) {
                Some(handle) if handle.is_running() => handle.snapshot(),
                _ => SessionSnapshot::new(record),
            })
            .collect();
        Ok((snapshots, total))
    }

    pub async fn connect(&self, id: &str) -> Result<SessionSnapshot, WagateError> {
        let channels = self.channels(id).await?;
        self.request(id, &channels, |reply| Command::Connect { reply })
            .await?;
        let snapshot = channels.snapshot.borrow().clone();
        Ok(snapshot)
    }

    /// Connect, then wait up to `wait` for the session to leave `Connecting`
    /// (a QR was issued, or the device connected).
    pub async fn connect_and_wait(
        &self,
        id: &str,
        wait: Duration,
    ) -> Result<SessionSnapshot, WagateError> {
        let channels = self.channels(id).await?;
        self.request(id, &channels, |reply| Command::Connect { reply })
            .await?;

        let mut snapshot = channels.snapshot.clone();
        let settled = tokio::time::timeout(
            wait,
            snapshot.wait_for(|s| s.status != SessionStatus::Connecting),
        )
        .await
        .is_ok_and(|changed| changed.is_ok());
        if !settled {
            debug!(session_id = id, "session still connecting after wait");
        }
        let current = snapshot.borrow().clone();
        Ok(current)
    }

    pub async fn disconnect(&self, id: &str) -> Result<SessionSnapshot, WagateError> {
        let channels = self.channels(id).await?;
        self.request(id, &channels, |reply| Command::Disconnect { reply })
            .await?;
        let snapshot = channels.snapshot.borrow().clone();
        Ok(snapshot)
    }

    pub async fn logout(&self, id: &str) -> Result<SessionSnapshot, WagateError> {
        let channels = self.channels(id).await?;
        self.request(id, &channels, |reply| Command::Logout { reply })
            .await?;
        let snapshot = channels.snapshot.borrow().clone();
        Ok(snapshot)
    }

    /// Log out best-effort, then remove the row, keystore device and webhook.
    pub async fn delete(&self, id: &str) -> Result<(), WagateError> {
        let channels = self.channels(id).await?;
        self.request(id, &channels, |reply| Command::Delete { reply })
            .await?;

        let mut registry = self.registry.write().await;
        registry.remove(id);
        metrics::set_sessions_live(registry.len());
        Ok(())
    }

    /// Current QR payload. An expired code is still returned while the
    /// session is awaiting a scan.
    pub async fn get_qr(&self, id: &str) -> Result<QrState, WagateError> {
        let snapshot = self.get(id).await?;
        match (snapshot.status, snapshot.qr) {
            (SessionStatus::AwaitingQr, Some(qr)) => Ok(qr),
            (SessionStatus::Connected | SessionStatus::Paired, _) => {
                Err(WagateError::AlreadyConnected {
                    session_id: id.to_string(),
                })
            }
            (status, _) => Err(WagateError::NotAwaitingQr {
                session_id: id.to_string(),
                status: status.to_string(),
            }),
        }
    }

    /// Validate the recipient and hand the body to the session's client.
    pub async fn send(
        &self,
        id: &str,
        to: &str,
        body: MessageBody,
    ) -> Result<SendReceipt, WagateError> {
        self.check_accepting()?;
        let channels = self.live_channels(id).await?;
        let to: ChatAddress = to.parse()?;
        body.validate()?;
        let channels = channels.ok_or_else(|| WagateError::NotConnected {
            session_id: id.to_string(),
        })?;
        self.request(id, &channels, |reply| Command::Send {
            to,
            body: Box::new(body),
            reply,
        })
        .await
    }

    pub async fn group(
        &self,
        id: &str,
        command: GroupCommand,
    ) -> Result<GroupOutcome, WagateError> {
        self.check_accepting()?;
        let channels = self.live_channels(id).await?;
        command.validate()?;
        let channels = channels.ok_or_else(|| WagateError::NotConnected {
            session_id: id.to_string(),
        })?;
        self.request(id, &channels, |reply| Command::Group { command, reply })
            .await
    }

    pub async fn counts(&self) -> Result<SessionCounts, WagateError> {
        let total = self.store(self.deps.sessions.count_sessions()).await?;
        let registry = self.registry.read().await;
        let running: Vec<&SessionHandle> = registry.values().filter(|h| h.is_running()).collect();
        let connected = running
            .iter()
            .filter(|h| h.channels.snapshot.borrow().status == SessionStatus::Connected)
            .count();
        Ok(SessionCounts {
            total,
            live: running.len(),
            connected,
        })
    }

    /// Stop accepting commands and stop every supervisor, keeping devices.
    ///
    /// Waits at most the configured shutdown budget.
    pub async fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            return;
        }
        let handles: Vec<(String, SessionHandle)> = self.registry.write().await.drain().collect();
        info!(sessions = handles.len(), "stopping session supervisors");

        let stops = handles.into_iter().map(|(id, handle)| async move {
            let (tx, rx) = oneshot::channel();
            if handle
                .channels
                .commands
                .send(Command::Shutdown { reply: tx })
                .await
                .is_ok()
            {
                let _ = rx.await;
            }
            if let Err(e) = handle.task.await {
                warn!(session_id = %id, error = %e, "supervisor task failed");
            }
        });
        let budget = self.settings.shutdown_timeout;
        if tokio::time::timeout(budget, futures::future::join_all(stops))
            .await
            .is_err()
        {
            warn!(
                budget_secs = budget.as_secs(),
                "session supervisors did not stop within the shutdown budget"
            );
        }
        metrics::set_sessions_live(0);
        info!("session runtime stopped");
    }

    // --- internals ---

    fn check_accepting(&self) -> Result<(), WagateError> {
        if self.is_accepting() {
            Ok(())
        } else {
            Err(WagateError::ShuttingDown)
        }
    }

    pub(crate) async fn store<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, WagateError>>,
    ) -> Result<T, WagateError> {
        with_deadline(self.settings.storage_timeout, fut).await
    }

    async fn load(&self, id: &str) -> Result<SessionRecord, WagateError> {
        self.store(self.deps.sessions.get_session(id))
            .await?
            .ok_or_else(|| WagateError::session_not_found(id))
    }

    /// Spawn a supervisor for `record` unless one is already registered.
    pub(crate) async fn register(&self, record: SessionRecord) -> SessionChannels {
        let mut registry = self.registry.write().await;
        let id = record.id.clone();
        if registry.get(&id).is_some_and(|h| !h.is_running()) {
            registry.remove(&id);
        }
        let handle = registry
            .entry(id)
            .or_insert_with(|| Supervisor::spawn(record, self.deps.clone(), self.settings.clone()));
        let channels = handle.channels.clone();
        metrics::set_sessions_live(registry.len());
        channels
    }

    /// Channels of the session's supervisor, spawning one from the stored
    /// row when none is running.
    pub(crate) async fn channels(&self, id: &str) -> Result<SessionChannels, WagateError> {
        self.check_accepting()?;
        if let Some(channels) = self.running(id).await {
            return Ok(channels);
        }
        let record = self.load(id).await?;
        Ok(self.register(record).await)
    }

    /// Channels of a running supervisor, or `None` for a stored session
    /// without one (idle, and therefore not connected). Fails `not_found`
    /// for an unknown session.
    async fn live_channels(&self, id: &str) -> Result<Option<SessionChannels>, WagateError> {
        if let Some(channels) = self.running(id).await {
            return Ok(Some(channels));
        }
        self.load(id).await?;
        Ok(None)
    }

    /// Channels of the registered supervisor if its loop is still running.
    /// A handle whose supervisor has exited is pruned from the registry.
    async fn running(&self, id: &str) -> Option<SessionChannels> {
        {
            let registry = self.registry.read().await;
            match registry.get(id) {
                None => return None,
                Some(handle) if handle.is_running() => return Some(handle.channels.clone()),
                Some(_) => {}
            }
        }
        let mut registry = self.registry.write().await;
        if registry.get(id).is_some_and(|h| !h.is_running()) {
            registry.remove(id);
            metrics::set_sessions_live(registry.len());
            warn!(session_id = %id, "pruned stopped session supervisor");
        }
        None
    }

    pub(crate) async fn request<T>(
        &self,
        id: &str,
        channels: &SessionChannels,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, WagateError> {
        let (tx, rx) = oneshot::channel();
        with_deadline(self.settings.command_deadline(), async {
            channels
                .commands
                .send(command(tx))
                .await
                .map_err(|_| WagateError::ShuttingDown)?;
            rx.await.map_err(|_| {
                WagateError::Internal(format!("supervisor for session {id} stopped"))
            })?
        })
        .await
    }
}
