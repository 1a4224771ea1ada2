// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the session runtime over a temp SQLite database
//! and the loopback network, with timings shortened so reconnect and QR
//! expiry tests finish in well under a second.

use std::sync::Arc;
use std::time::Duration;

use wagate_config::model::StorageConfig;
use wagate_core::{EventSink, EventType, SessionSnapshot, SessionStatus, WagateError};
use wagate_remote::{LoopbackFactory, LoopbackNetwork, LoopbackSettings};
use wagate_runtime::{Backoff, RuntimeDeps, RuntimeSettings, SessionRuntime};
use wagate_storage::SqliteStorage;
use wagate_webhook::{DispatcherSettings, WebhookDispatcher, WebhookRegistry};

use crate::recording_sink::RecordingSink;

/// Default wait used by the harness helpers.
pub const WAIT: Duration = Duration::from_secs(5);

/// Runtime settings with millisecond-scale timers.
pub fn fast_settings() -> RuntimeSettings {
    RuntimeSettings {
        connect_timeout: Duration::from_secs(2),
        send_timeout: Duration::from_secs(2),
        storage_timeout: Duration::from_secs(2),
        backoff: Backoff::new(Duration::from_millis(50), Duration::from_millis(400), 0.0),
        qr_grace: Duration::from_millis(200),
        restore_session_timeout: Duration::from_secs(2),
        restore_phase_timeout: Duration::from_secs(5),
        shutdown_timeout: Duration::from_secs(2),
        last_seen_flush: Duration::from_millis(200),
        ..RuntimeSettings::default()
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    settings: RuntimeSettings,
    loopback: LoopbackSettings,
    webhooks: Option<DispatcherSettings>,
    sink: Option<RecordingSink>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: fast_settings(),
            loopback: LoopbackSettings {
                qr_interval: Duration::from_secs(30),
                qr_codes: 3,
                auto_pair: None,
            },
            webhooks: None,
            sink: None,
        }
    }

    /// Adjust the runtime settings.
    pub fn with_settings(mut self, adjust: impl FnOnce(&mut RuntimeSettings)) -> Self {
        adjust(&mut self.settings);
        self
    }

    /// Use these loopback pairing timings.
    pub fn with_loopback(mut self, settings: LoopbackSettings) -> Self {
        self.loopback = settings;
        self
    }

    /// Route events through a real webhook dispatcher as well.
    pub fn with_webhooks(mut self, settings: DispatcherSettings) -> Self {
        self.webhooks = Some(settings);
        self
    }

    /// Record with this sink instead of a plain one.
    pub fn with_sink(mut self, sink: RecordingSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, WagateError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| WagateError::Storage {
            source: Box::new(e),
        })?;
        let storage_config = StorageConfig {
            database_url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            keystore_key: Some("5a".repeat(32)),
            ..StorageConfig::default()
        };
        let storage = Arc::new(SqliteStorage::new(storage_config));
        storage.initialize().await?;

        let registry = WebhookRegistry::new(storage.clone(), self.settings.storage_timeout);
        let dispatcher = match self.webhooks {
            Some(settings) => Some(WebhookDispatcher::new(&registry, settings)?),
            None => None,
        };
        let events = Arc::new(match (self.sink, &dispatcher) {
            (Some(sink), _) => sink,
            (None, Some(dispatcher)) => RecordingSink::tee(Arc::new(dispatcher.clone())),
            (None, None) => RecordingSink::new(),
        });

        let network = LoopbackNetwork::new(self.loopback);
        let deps = RuntimeDeps {
            sessions: storage.clone(),
            keystore: storage.clone(),
            ledger: storage.clone(),
            factory: Arc::new(LoopbackFactory::new(network.clone(), storage.clone())),
            sink: events.clone() as Arc<dyn EventSink>,
        };
        let runtime = Arc::new(SessionRuntime::new(deps.clone(), self.settings.clone()));

        Ok(TestHarness {
            runtime,
            network,
            storage,
            events,
            registry,
            dispatcher,
            deps,
            settings: self.settings,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over temp storage and the loopback network.
pub struct TestHarness {
    pub runtime: Arc<SessionRuntime>,
    /// Controller for the simulated remote network.
    pub network: LoopbackNetwork,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Every event the runtime emitted.
    pub events: Arc<RecordingSink>,
    pub registry: WebhookRegistry,
    pub dispatcher: Option<WebhookDispatcher>,
    deps: RuntimeDeps,
    settings: RuntimeSettings,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default options.
    pub async fn new() -> Result<Self, WagateError> {
        Self::builder().build().await
    }

    /// Simulate a process restart: shut the runtime down and build a fresh
    /// one over the same database and remote network.
    pub async fn restart(&mut self) {
        self.runtime.shutdown().await;
        self.runtime = Arc::new(SessionRuntime::new(self.deps.clone(), self.settings.clone()));
    }

    /// Poll until the session reaches `status`.
    pub async fn wait_for_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<SessionSnapshot, WagateError> {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let snapshot = self.runtime.get(session_id).await?;
            if snapshot.status == status {
                return Ok(snapshot);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(WagateError::Timeout { duration: WAIT });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait for the session's QR, scan it, and wait until connected.
    pub async fn scan_and_connect(&self, session_id: &str) -> Result<SessionSnapshot, WagateError> {
        self.wait_for_status(session_id, SessionStatus::AwaitingQr).await?;
        self.network.scan_qr(session_id).await?;
        self.wait_for_status(session_id, SessionStatus::Connected).await
    }

    /// Create a session and take it through pairing to `Connected`.
    pub async fn paired_session(&self, name: &str) -> Result<SessionSnapshot, WagateError> {
        let created = self.runtime.create(name, None).await?;
        self.runtime.connect(created.id()).await?;
        self.scan_and_connect(created.id()).await
    }

    /// Wait for an event of this type for the session.
    pub async fn expect_event(
        &self,
        session_id: &str,
        event_type: EventType,
    ) -> Result<wagate_core::EventEnvelope, WagateError> {
        self.events
            .wait_for(session_id, event_type, WAIT)
            .await
            .ok_or(WagateError::Timeout { duration: WAIT })
    }
}
