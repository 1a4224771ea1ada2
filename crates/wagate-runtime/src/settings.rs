// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime timings and limits resolved from configuration.

use std::time::Duration;

use wagate_config::model::{RuntimeConfig, StorageConfig};

use crate::backoff::Backoff;

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub command_buffer: usize,
    pub event_buffer: usize,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    /// Bound on every store call.
    pub storage_timeout: Duration,
    pub auto_reconnect: bool,
    pub backoff: Backoff,
    pub qr_max_attempts: u32,
    /// How long after a QR code expires without a refresh before pairing
    /// is abandoned.
    pub qr_grace: Duration,
    pub restore_concurrency: usize,
    pub restore_session_timeout: Duration,
    pub restore_phase_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub last_seen_flush: Duration,
    pub ledger_enabled: bool,
}

impl RuntimeSettings {
    pub fn from_config(runtime: &RuntimeConfig, storage: &StorageConfig) -> Self {
        Self {
            command_buffer: runtime.command_buffer.max(1),
            event_buffer: runtime.event_buffer.max(1),
            connect_timeout: Duration::from_secs(runtime.connect_timeout_secs),
            send_timeout: Duration::from_secs(runtime.send_timeout_secs),
            storage_timeout: storage.operation_timeout(),
            auto_reconnect: runtime.auto_reconnect,
            backoff: Backoff::new(
                Duration::from_millis(runtime.reconnect_initial_ms),
                Duration::from_millis(runtime.reconnect_max_ms),
                runtime.reconnect_jitter,
            ),
            qr_max_attempts: runtime.qr_max_attempts,
            qr_grace: Duration::from_secs(runtime.qr_grace_secs),
            restore_concurrency: runtime.restore_concurrency.max(1),
            restore_session_timeout: Duration::from_secs(runtime.restore_session_timeout_secs),
            restore_phase_timeout: Duration::from_secs(runtime.restore_phase_timeout_secs),
            shutdown_timeout: Duration::from_secs(runtime.shutdown_timeout_secs),
            last_seen_flush: Duration::from_secs(runtime.last_seen_flush_secs.max(1)),
            ledger_enabled: runtime.ledger_enabled,
        }
    }

    /// Upper bound for one command round-trip through a supervisor.
    pub(crate) fn command_deadline(&self) -> Duration {
        self.connect_timeout.max(self.send_timeout) + self.storage_timeout * 3
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default(), &StorageConfig::default())
    }
}
