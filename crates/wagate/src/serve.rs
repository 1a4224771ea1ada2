// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wagate serve` command implementation.
//!
//! Opens storage, builds the remote backend, webhook registry and
//! dispatcher, starts the session runtime, restores paired sessions, and
//! serves the REST surface until SIGINT/SIGTERM. Shutdown stops the
//! supervisors first, then drains webhook queues with what remains of the
//! shutdown budget, then checkpoints the database.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wagate_config::WagateConfig;
use wagate_core::{EventSink, WagateError};
use wagate_gateway::{AppState, AuthConfig, HealthState};
use wagate_remote::{LoopbackNetwork, build_backend};
use wagate_runtime::{RuntimeDeps, RuntimeSettings, SessionRuntime, install_signal_handler};
use wagate_storage::SqliteStorage;
use wagate_webhook::{DispatcherSettings, WebhookDispatcher, WebhookRegistry};

use crate::telemetry::{self, MetricsRender};

/// A fully wired gateway, ready to serve.
pub struct Gateway {
    pub runtime: Arc<SessionRuntime>,
    pub dispatcher: WebhookDispatcher,
    pub registry: WebhookRegistry,
    pub storage: Arc<SqliteStorage>,
    /// Controller of the loopback network when that backend is selected.
    pub loopback: Option<LoopbackNetwork>,
    router: Router,
    shutdown_budget: Duration,
}

impl Gateway {
    /// Open storage and wire every component. Nothing is served yet.
    pub async fn assemble(
        config: &WagateConfig,
        metrics: Option<MetricsRender>,
    ) -> Result<Self, WagateError> {
        let api_key = config
            .server
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                WagateError::Config(
                    "server.api_key is not set; refusing to serve without authentication"
                        .to_string(),
                )
            })?;

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;
        info!(
            database = %config.storage.database_path().display(),
            "storage initialized"
        );

        let backend = build_backend(&config.remote, storage.clone());
        let lookup_timeout = config.storage.operation_timeout();
        let registry = WebhookRegistry::new(storage.clone(), lookup_timeout);
        let dispatcher = WebhookDispatcher::new(
            &registry,
            DispatcherSettings::from_config(&config.webhook, lookup_timeout),
        )?;
        if let Some(url) = &config.webhook.global_url {
            info!(url = %url, "global webhook fallback enabled");
        }

        let settings = RuntimeSettings::from_config(&config.runtime, &config.storage);
        let shutdown_budget = settings.shutdown_timeout;
        let deps = RuntimeDeps {
            sessions: storage.clone(),
            keystore: storage.clone(),
            ledger: storage.clone(),
            factory: backend.factory,
            sink: Arc::new(dispatcher.clone()) as Arc<dyn EventSink>,
        };
        let runtime = Arc::new(SessionRuntime::new(deps, settings));

        let mut health = HealthState::new(config.server.environment.clone());
        health.prometheus_render = metrics;
        let state = AppState {
            runtime: runtime.clone(),
            webhooks: registry.clone(),
            auth: AuthConfig::new(Some(api_key)),
            health,
            connect_wait: config.server.connect_wait(),
        };
        let router = wagate_gateway::router(
            state,
            Duration::from_secs(config.server.request_timeout_secs),
        );

        Ok(Self {
            runtime,
            dispatcher,
            registry,
            storage,
            loopback: backend.loopback,
            router,
            shutdown_budget,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Restore paired sessions in the background, serve until `shutdown`
    /// is cancelled, then run the shutdown sequence.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), WagateError> {
        let restorer = self.runtime.clone();
        let restore = tokio::spawn(async move {
            match restorer.restore().await {
                Ok(report) => info!(
                    attempted = report.attempted,
                    connected = report.connected,
                    failed = report.failed,
                    timed_out = report.timed_out,
                    orphans_removed = report.orphans_removed,
                    "session restore finished"
                ),
                Err(e) => error!(error = %e, "session restore failed"),
            }
        });

        let served = wagate_gateway::serve(listener, self.router.clone(), shutdown).await;
        if let Err(e) = &served {
            error!(error = %e, "gateway stopped with an error");
        }

        restore.abort();
        self.shutdown().await;
        served
    }

    /// Stop supervisors, drain webhooks within the remaining budget, and
    /// checkpoint storage.
    pub async fn shutdown(&self) {
        let started = Instant::now();
        info!(budget_secs = self.shutdown_budget.as_secs(), "shutting down");

        self.runtime.shutdown().await;
        let remaining = self.shutdown_budget.saturating_sub(started.elapsed());
        self.dispatcher.drain(remaining).await;

        if let Err(e) = self.storage.close().await {
            warn!(error = %e, "storage close failed");
        }
        info!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "shutdown complete"
        );
    }
}

/// Runs the `wagate serve` command.
pub async fn run_serve(config: WagateConfig) -> Result<(), WagateError> {
    telemetry::init_tracing(&config.logging, &config.remote.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.server.environment,
        "starting wagate serve"
    );

    let metrics = match telemetry::install_metrics() {
        Ok(render) => Some(render),
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    };

    let gateway = Gateway::assemble(&config, metrics).await?;
    let listener = wagate_gateway::bind(&config.server.host, config.server.port).await?;
    let cancel = install_signal_handler();
    gateway.run(listener, cancel).await?;

    info!("wagate serve shutdown complete");
    Ok(())
}
