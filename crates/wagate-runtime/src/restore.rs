// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup restoration of paired sessions.

use std::collections::HashSet;
use std::time::Duration;

use futures::StreamExt as _;
use tracing::{info, warn};
use wagate_core::{SessionRecord, SessionStatus, WagateError};

use crate::command::Command;
use crate::runtime::SessionRuntime;

/// What a restoration pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Paired sessions found at startup.
    pub attempted: usize,
    pub connected: usize,
    /// Sessions that settled in a state other than Connected.
    pub failed: usize,
    /// Sessions moved back to Disconnected after a timeout.
    pub timed_out: usize,
    /// Keystore devices no session referenced.
    pub orphans_removed: usize,
}

enum Outcome {
    Connected,
    Failed,
    TimedOut,
}

impl SessionRuntime {
    /// Remove keystore devices that no session row references.
    pub async fn sweep_orphan_devices(&self) -> Result<usize, WagateError> {
        let devices = self.store(self.deps.keystore.list()).await?;
        if devices.is_empty() {
            return Ok(0);
        }
        let paired = self
            .store(self.deps.sessions.list_paired_sessions())
            .await?;
        let referenced: HashSet<&str> = paired.iter().map(|r| r.device_id.as_str()).collect();

        let mut removed = 0;
        for device_id in devices.iter().filter(|d| !referenced.contains(d.as_str())) {
            match self.store(self.deps.keystore.delete(device_id)).await {
                Ok(true) => {
                    removed += 1;
                    info!(device_id = %device_id, "removed orphaned keystore device");
                }
                Ok(false) => {}
                Err(e) => warn!(device_id = %device_id, error = %e, "failed to remove orphaned device"),
            }
        }
        Ok(removed)
    }

    /// Reconnect every session with a paired device.
    ///
    /// Runs at most `restore_concurrency` connects at a time. A session that
    /// does not settle within the per-session timeout, or is still pending
    /// when the phase timeout elapses, is moved back to Disconnected.
    /// Sessions without a device stay idle.
    pub async fn restore(&self) -> Result<RestoreReport, WagateError> {
        let mut report = RestoreReport::default();
        match self.sweep_orphan_devices().await {
            Ok(removed) => report.orphans_removed = removed,
            Err(e) => warn!(error = %e, "orphaned device sweep failed"),
        }

        let paired = self
            .store(self.deps.sessions.list_paired_sessions())
            .await?;
        report.attempted = paired.len();
        if paired.is_empty() {
            info!("no paired sessions to restore");
            return Ok(report);
        }
        info!(
            sessions = paired.len(),
            concurrency = self.settings.restore_concurrency,
            "restoring paired sessions"
        );

        let ids: Vec<String> = paired.iter().map(|r| r.id.clone()).collect();
        let per_session = self.settings.restore_session_timeout;
        let attempts = futures::stream::iter(paired)
            .map(|record| async move {
                let id = record.id.clone();
                (id, self.restore_one(record, per_session).await)
            })
            .buffer_unordered(self.settings.restore_concurrency)
            .collect::<Vec<_>>();

        match tokio::time::timeout(self.settings.restore_phase_timeout, attempts).await {
            Ok(outcomes) => {
                for (id, outcome) in outcomes {
                    match outcome {
                        Outcome::Connected => report.connected += 1,
                        Outcome::Failed => report.failed += 1,
                        Outcome::TimedOut => {
                            report.timed_out += 1;
                            self.abort_restore(&id).await;
                        }
                    }
                }
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.settings.restore_phase_timeout.as_secs(),
                    "restore phase timed out"
                );
                for id in &ids {
                    match self.get(id).await.map(|s| s.status) {
                        Ok(SessionStatus::Connected) => report.connected += 1,
                        Ok(SessionStatus::Connecting) | Err(_) => {
                            report.timed_out += 1;
                            self.abort_restore(id).await;
                        }
                        Ok(_) => report.failed += 1,
                    }
                }
            }
        }

        info!(
            attempted = report.attempted,
            connected = report.connected,
            failed = report.failed,
            timed_out = report.timed_out,
            "session restore finished"
        );
        Ok(report)
    }

    async fn restore_one(&self, record: SessionRecord, limit: Duration) -> Outcome {
        let id = record.id.clone();
        let channels = self.register(record).await;

        let attempt = async {
            self.request(&id, &channels, |reply| Command::Connect { reply })
                .await?;
            let mut snapshot = channels.snapshot.clone();
            let status = snapshot
                .wait_for(|s| s.status != SessionStatus::Connecting)
                .await
                .map_err(|_| WagateError::Internal("supervisor stopped during restore".into()))?
                .status;
            Ok::<_, WagateError>(status)
        };

        match tokio::time::timeout(limit, attempt).await {
            Ok(Ok(SessionStatus::Connected)) => Outcome::Connected,
            Ok(Ok(status)) => {
                info!(session_id = %id, status = %status, "session did not reconnect");
                Outcome::Failed
            }
            Ok(Err(e)) => {
                warn!(session_id = %id, error = %e, "session restore failed");
                Outcome::Failed
            }
            Err(_) => {
                warn!(session_id = %id, timeout_secs = limit.as_secs(), "session restore timed out");
                Outcome::TimedOut
            }
        }
    }

    async fn abort_restore(&self, id: &str) {
        if let Err(e) = self.disconnect(id).await {
            warn!(session_id = %id, error = %e, "failed to disconnect session after restore timeout");
        }
    }
}
