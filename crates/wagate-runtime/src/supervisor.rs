// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session supervisor task.
//!
//! Each session runs one [`Supervisor`] that exclusively owns the session's
//! remote client, its in-memory state and its persisted row. Callers talk to
//! it through a bounded command inbox; the remote client talks to it through
//! a bounded event channel. Every state transition and every emitted event
//! happens inside the task's loop, which makes the loop the single
//! serialization point for the session.

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt as _;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use wagate_core::metrics;
use wagate_core::types::{format_timestamp, now_timestamp};
use wagate_core::{
    ChatAddress, ClientOptions, EventEnvelope, EventType, GroupCommand, GroupOutcome, InboundMessage,
    LedgerEntry, MessageBody, QrState, RemoteClient, RemoteEvent, SendReceipt, SessionRecord,
    SessionSnapshot, SessionStatus, WagateError,
};

use crate::command::Command;
use crate::deadline::with_deadline;
use crate::runtime::RuntimeDeps;
use crate::settings::RuntimeSettings;

/// Cloneable endpoints for reaching a running supervisor.
#[derive(Clone)]
pub(crate) struct SessionChannels {
    pub(crate) commands: mpsc::Sender<Command>,
    pub(crate) snapshot: watch::Receiver<SessionSnapshot>,
}

/// A registered supervisor.
pub(crate) struct SessionHandle {
    pub(crate) channels: SessionChannels,
    pub(crate) task: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.channels.snapshot.borrow().clone()
    }

    /// False once the supervisor loop has exited, whether after a delete
    /// whose caller gave up waiting or after a panic.
    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished() && !self.channels.commands.is_closed()
    }
}

pub(crate) struct Supervisor {
    deps: RuntimeDeps,
    settings: Arc<RuntimeSettings>,
    record: SessionRecord,
    status: SessionStatus,
    qr: Option<QrState>,
    last_error: Option<String>,
    client: Option<Box<dyn RemoteClient>>,
    events: Option<mpsc::Receiver<RemoteEvent>>,
    commands: mpsc::Receiver<Command>,
    snapshot: watch::Sender<SessionSnapshot>,
    reconnect_attempt: u32,
    reconnect_at: Option<Instant>,
    qr_attempts: u32,
    qr_deadline: Option<Instant>,
    last_seen_dirty: bool,
}

impl Supervisor {
    /// Start a supervisor for `record` in the `Disconnected` state.
    pub(crate) fn spawn(
        record: SessionRecord,
        deps: RuntimeDeps,
        settings: Arc<RuntimeSettings>,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(settings.command_buffer);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::new(record.clone()));
        let supervisor = Supervisor {
            deps,
            settings,
            record,
            status: SessionStatus::Disconnected,
            qr: None,
            last_error: None,
            client: None,
            events: None,
            commands: command_rx,
            snapshot: snapshot_tx,
            reconnect_attempt: 0,
            reconnect_at: None,
            qr_attempts: 0,
            qr_deadline: None,
            last_seen_dirty: false,
        };
        let task = tokio::spawn(supervisor.run());
        SessionHandle {
            channels: SessionChannels {
                commands: command_tx,
                snapshot: snapshot_rx,
            },
            task,
        }
    }

    async fn run(mut self) {
        debug!(session_id = %self.record.id, "supervisor started");
        let mut flush = tokio::time::interval(self.settings.last_seen_flush);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
        flush.reset();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        self.shutdown().await;
                        break;
                    };
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.dispatch_event(event).await,
                    None => {
                        debug!(session_id = %self.record.id, "remote event channel closed");
                        self.events = None;
                    }
                },
                () = wait_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.reconnect().await;
                }
                () = wait_until(self.qr_deadline) => {
                    self.qr_deadline = None;
                    info!(session_id = %self.record.id, "QR code expired without a scan");
                    self.abandon_pairing().await;
                }
                _ = flush.tick() => self.flush_last_seen().await,
            }
        }
        debug!(session_id = %self.record.id, "supervisor stopped");
    }

    // --- commands ---

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(session_id = %self.record.id, command = command.name(), "handling command");
        match command {
            Command::Connect { reply } => {
                let _ = reply.send(self.connect().await);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(Ok(()));
            }
            Command::Logout { reply } => {
                let _ = reply.send(self.logout().await);
            }
            Command::Send { to, body, reply } => {
                let _ = reply.send(self.send(&to, &body).await);
            }
            Command::Group { command, reply } => {
                let _ = reply.send(self.group(command).await);
            }
            Command::Delete { reply } => match self.delete().await {
                Ok(()) => {
                    let _ = reply.send(Ok(()));
                    return ControlFlow::Break(());
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn connect(&mut self) -> Result<(), WagateError> {
        if matches!(
            self.status,
            SessionStatus::Connecting
                | SessionStatus::AwaitingQr
                | SessionStatus::Paired
                | SessionStatus::Connected
        ) {
            return Ok(());
        }

        self.stop_client().await;
        self.clear_qr();
        self.set_status(SessionStatus::Connecting);
        match self.open_client().await {
            Ok(()) => {
                self.last_error = None;
                self.publish();
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.record.id, error = %e, "connect failed");
                self.stop_client().await;
                self.last_error = Some(e.to_string());
                self.set_status(SessionStatus::Disconnected);
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) {
        let was_live = self.status.is_live();
        self.stop_client().await;
        self.clear_qr();
        self.flush_last_seen().await;
        self.set_status(SessionStatus::Disconnected);
        if was_live {
            info!(session_id = %self.record.id, "session disconnected");
            self.emit(
                EventType::Disconnected,
                json!({ "reason": "user_request", "willReconnect": false }),
            );
        }
    }

    async fn logout(&mut self) -> Result<(), WagateError> {
        if self.status == SessionStatus::LoggedOut && !self.record.is_paired() {
            return Ok(());
        }
        if let Some(client) = &self.client
            && matches!(self.status, SessionStatus::Connected | SessionStatus::Paired)
        {
            with_deadline(self.settings.connect_timeout, client.logout())
                .await
                .inspect_err(|e| {
                    warn!(session_id = %self.record.id, error = %e, "remote logout failed");
                })?;
        }

        self.stop_client().await;
        self.clear_qr();
        self.clear_device().await?;
        self.set_status(SessionStatus::LoggedOut);
        info!(session_id = %self.record.id, "session logged out");
        self.emit(EventType::LoggedOut, json!({ "reason": "user_request" }));
        Ok(())
    }

    async fn send(&self, to: &ChatAddress, body: &MessageBody) -> Result<SendReceipt, WagateError> {
        let client = self.connected_client()?;
        let receipt = with_deadline(self.settings.send_timeout, client.send(to, body)).await?;
        metrics::record_message_sent();
        debug!(
            session_id = %self.record.id,
            to = %to,
            kind = %body.kind(),
            message_id = %receipt.message_id,
            "message sent"
        );

        if self.settings.ledger_enabled {
            let kind = body.kind().to_string();
            let preview = body.preview();
            let entry = LedgerEntry::pending(
                &self.record.id,
                &receipt.message_id,
                &to.to_string(),
                &self.record.device_id,
                true,
                &kind,
                &format_timestamp(receipt.timestamp),
                preview.as_deref(),
            );
            if let Err(e) = self.store(self.deps.ledger.record(&entry)).await {
                warn!(session_id = %self.record.id, error = %e, "failed to record sent message");
            }
        }
        Ok(receipt)
    }

    async fn group(&self, command: GroupCommand) -> Result<GroupOutcome, WagateError> {
        let client = self.connected_client()?;
        let name = command.name();
        let outcome = with_deadline(self.settings.send_timeout, client.group(command)).await;
        if let Err(e) = &outcome {
            debug!(session_id = %self.record.id, operation = name, error = %e, "group operation failed");
        }
        outcome
    }

    async fn delete(&mut self) -> Result<(), WagateError> {
        if let Some(client) = &self.client
            && self.status.is_live()
            && let Err(e) = with_deadline(self.settings.connect_timeout, client.logout()).await
        {
            warn!(session_id = %self.record.id, error = %e, "remote logout failed during delete, continuing");
        }
        self.stop_client().await;

        let removed = self.store(self.deps.sessions.delete_session(&self.record.id)).await?;
        if !removed {
            debug!(session_id = %self.record.id, "session row already removed");
        }
        if self.record.is_paired() {
            let device_id = self.record.device_id.clone();
            self.drop_device(&device_id).await;
        }
        self.deps.sink.forget_session(&self.record.id);
        info!(session_id = %self.record.id, "session deleted");
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.flush_last_seen().await;
        self.stop_client().await;
        debug!(session_id = %self.record.id, "supervisor shut down");
    }

    // --- remote events ---

    async fn dispatch_event(&mut self, event: RemoteEvent) {
        let name = event.name();
        let outcome = AssertUnwindSafe(self.handle_event(event))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            let detail = panic_message(panic.as_ref());
            error!(session_id = %self.record.id, event = name, panic = %detail, "event handler panicked");
            self.last_error = Some(format!("event handler panicked: {detail}"));
            self.publish();
            let reported = std::panic::catch_unwind(AssertUnwindSafe(|| {
                self.emit(
                    EventType::Disconnected,
                    json!({
                        "reason": "handler_panic",
                        "willReconnect": false,
                        "event": name,
                        "error": detail,
                    }),
                );
            }));
            if reported.is_err() {
                error!(session_id = %self.record.id, "event sink panicked while reporting a handler panic");
            }
        }
    }

    async fn handle_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::Qr { code, ttl } => self.on_qr(code, ttl).await,
            RemoteEvent::PairSuccess { device_id } => self.on_pair_success(device_id).await,
            RemoteEvent::Connected => self.on_connected().await,
            RemoteEvent::Disconnected { reason } => self.on_transport_lost(reason).await,
            RemoteEvent::LoggedOut { reason } => self.on_logged_out(reason).await,
            RemoteEvent::Message(message) => self.on_message(message).await,
            RemoteEvent::Other {
                event_type,
                payload,
            } => self.on_passthrough(event_type, payload),
            RemoteEvent::Malformed { detail } => {
                warn!(session_id = %self.record.id, detail = %detail, "dropping malformed remote event");
            }
        }
    }

    async fn on_qr(&mut self, code: String, ttl: Duration) {
        if self.record.is_paired()
            || !matches!(
                self.status,
                SessionStatus::Connecting | SessionStatus::AwaitingQr
            )
        {
            debug!(session_id = %self.record.id, status = %self.status, "ignoring QR outside pairing");
            return;
        }

        self.qr_attempts += 1;
        if self.qr_attempts > self.settings.qr_max_attempts {
            info!(session_id = %self.record.id, attempts = self.qr_attempts, "QR retry budget exhausted");
            self.abandon_pairing().await;
            return;
        }

        let expires_at = chrono::Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        self.qr_deadline = Some(Instant::now() + ttl + self.settings.qr_grace);
        let payload = json!({
            "qrCode": &code,
            "qrCodeExpiresAt": format_timestamp(expires_at),
            "attempt": self.qr_attempts,
        });
        self.qr = Some(QrState {
            code,
            expires_at,
            attempt: self.qr_attempts,
        });
        self.set_status(SessionStatus::AwaitingQr);
        self.emit(EventType::QrCode, payload);
    }

    async fn on_pair_success(&mut self, device_id: String) {
        if device_id.is_empty() {
            warn!(session_id = %self.record.id, "pair success without a device id");
            return;
        }
        let previous = (self.record.is_paired() && self.record.device_id != device_id)
            .then(|| std::mem::take(&mut self.record.device_id));

        self.record.device_id = device_id.clone();
        self.record.updated_at = now_timestamp();
        self.save_or_log().await;
        if let Some(old) = previous {
            info!(session_id = %self.record.id, old_device = %old, "session re-paired, dropping previous device");
            self.drop_device(&old).await;
        }

        self.clear_qr();
        info!(session_id = %self.record.id, device_id = %device_id, "session paired");
        self.set_status(SessionStatus::Paired);
        self.emit(EventType::PairSuccess, json!({ "deviceId": device_id }));

        if self.client.as_ref().is_some_and(|c| c.is_connected()) {
            self.mark_connected().await;
        }
    }

    async fn on_connected(&mut self) {
        match self.status {
            SessionStatus::Connecting | SessionStatus::AwaitingQr | SessionStatus::Paired => {}
            SessionStatus::Connected => return,
            other => {
                debug!(session_id = %self.record.id, status = %other, "ignoring stale connected event");
                return;
            }
        }
        if !self.record.is_paired() {
            let Some(device_id) = self.client.as_ref().and_then(|c| c.device_id()) else {
                warn!(session_id = %self.record.id, "remote reported connected without a paired device");
                return;
            };
            self.record.device_id = device_id;
        }
        self.mark_connected().await;
    }

    async fn mark_connected(&mut self) {
        let at = now_timestamp();
        self.record.connected_at = Some(at.clone());
        self.record.updated_at = at.clone();
        self.reconnect_attempt = 0;
        self.reconnect_at = None;
        self.last_error = None;
        self.clear_qr();
        self.save_or_log().await;

        info!(session_id = %self.record.id, device_id = %self.record.device_id, "session connected");
        self.set_status(SessionStatus::Connected);
        self.emit(
            EventType::Connected,
            json!({ "deviceId": self.record.device_id, "connectedAt": at }),
        );
    }

    async fn on_transport_lost(&mut self, reason: String) {
        match self.status {
            SessionStatus::Connected | SessionStatus::Paired => {
                self.flush_last_seen().await;
                let will_reconnect = self.settings.auto_reconnect
                    && self.record.is_paired()
                    && self.client.is_some();
                warn!(session_id = %self.record.id, reason = %reason, will_reconnect, "transport lost");
                self.last_error = Some(format!("transport lost: {reason}"));
                if will_reconnect {
                    self.set_status(SessionStatus::Connecting);
                    self.schedule_reconnect();
                } else {
                    self.stop_client().await;
                    self.set_status(SessionStatus::Disconnected);
                }
                self.emit(
                    EventType::Disconnected,
                    json!({ "reason": reason, "willReconnect": will_reconnect }),
                );
            }
            SessionStatus::Connecting if self.reconnect_attempt > 0 => {
                debug!(session_id = %self.record.id, reason = %reason, "reconnect attempt dropped");
                if self.reconnect_at.is_none() {
                    self.schedule_reconnect();
                }
            }
            SessionStatus::Connecting | SessionStatus::AwaitingQr => {
                warn!(session_id = %self.record.id, reason = %reason, "transport lost during pairing");
                self.stop_client().await;
                self.clear_qr();
                self.last_error = Some(format!("transport lost: {reason}"));
                self.set_status(SessionStatus::Disconnected);
                self.emit(
                    EventType::Disconnected,
                    json!({ "reason": reason, "willReconnect": false }),
                );
            }
            other => {
                debug!(session_id = %self.record.id, status = %other, "ignoring disconnect event");
            }
        }
    }

    async fn on_logged_out(&mut self, reason: String) {
        if self.status == SessionStatus::LoggedOut && !self.record.is_paired() {
            return;
        }
        warn!(session_id = %self.record.id, reason = %reason, "remote network logged the session out");
        self.stop_client().await;
        self.clear_qr();
        if let Err(e) = self.clear_device().await {
            error!(session_id = %self.record.id, error = %e, "failed to clear device after remote logout");
            self.last_error = Some(e.to_string());
        }
        self.set_status(SessionStatus::LoggedOut);
        self.emit(EventType::LoggedOut, json!({ "reason": reason }));
    }

    async fn on_message(&mut self, message: InboundMessage) {
        self.touch();
        if self.settings.ledger_enabled {
            let entry = LedgerEntry::pending(
                &self.record.id,
                &message.id,
                &message.chat,
                &message.sender,
                message.from_me,
                &message.message_type,
                &message.timestamp,
                message.text.as_deref(),
            );
            match self.store(self.deps.ledger.record(&entry)).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(session_id = %self.record.id, message_id = %message.id, "duplicate inbound message dropped");
                    return;
                }
                Err(e) => {
                    warn!(session_id = %self.record.id, error = %e, "failed to record inbound message");
                }
            }
        }

        let payload = match serde_json::to_value(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(session_id = %self.record.id, error = %e, "dropping unserializable message");
                return;
            }
        };
        metrics::record_inbound_event(EventType::Message);
        self.emit(EventType::Message, payload);
    }

    fn on_passthrough(&mut self, event_type: EventType, payload: serde_json::Value) {
        if event_type.is_lifecycle() {
            warn!(session_id = %self.record.id, event_type = %event_type, "dropping lifecycle event sent as passthrough");
            return;
        }
        self.touch();
        metrics::record_inbound_event(event_type);
        self.emit(event_type, payload);
    }

    // --- timers ---

    fn schedule_reconnect(&mut self) {
        let delay = self.settings.backoff.delay(self.reconnect_attempt);
        self.reconnect_attempt = self.reconnect_attempt.saturating_add(1);
        self.reconnect_at = Some(Instant::now() + delay);
        info!(
            session_id = %self.record.id,
            attempt = self.reconnect_attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
    }

    async fn reconnect(&mut self) {
        if self.status != SessionStatus::Connecting {
            return;
        }
        let result = if let Some(client) = &self.client {
            with_deadline(self.settings.connect_timeout, client.connect()).await
        } else {
            self.open_client().await
        };
        match result {
            Ok(()) => {
                debug!(session_id = %self.record.id, attempt = self.reconnect_attempt, "reconnect attempt started");
            }
            Err(e) => {
                warn!(session_id = %self.record.id, attempt = self.reconnect_attempt, error = %e, "reconnect attempt failed");
                self.last_error = Some(e.to_string());
                self.publish();
                self.schedule_reconnect();
            }
        }
    }

    async fn abandon_pairing(&mut self) {
        self.stop_client().await;
        self.clear_qr();
        self.last_error = Some("QR code was not scanned in time".to_string());
        self.set_status(SessionStatus::Error);
        self.emit(
            EventType::Disconnected,
            json!({ "reason": "qr_timeout", "willReconnect": false }),
        );
    }

    async fn flush_last_seen(&mut self) {
        if !self.last_seen_dirty {
            return;
        }
        self.last_seen_dirty = false;
        self.save_or_log().await;
    }

    // --- helpers ---

    async fn open_client(&mut self) -> Result<(), WagateError> {
        let (events_tx, events_rx) = mpsc::channel(self.settings.event_buffer);
        let options = ClientOptions {
            session_id: self.record.id.clone(),
            device_id: self
                .record
                .is_paired()
                .then(|| self.record.device_id.clone()),
            proxy: self.record.proxy.clone(),
        };
        let factory = self.deps.factory.clone();
        let client = with_deadline(self.settings.connect_timeout, async move {
            let client = factory.create(options, events_tx).await?;
            client.connect().await?;
            Ok(client)
        })
        .await?;

        self.client = Some(client);
        self.events = Some(events_rx);
        Ok(())
    }

    /// Drop the remote client, cancelling any pending timers.
    async fn stop_client(&mut self) {
        self.reconnect_at = None;
        self.reconnect_attempt = 0;
        self.qr_deadline = None;
        if let Some(client) = self.client.take()
            && tokio::time::timeout(self.settings.connect_timeout, client.disconnect())
                .await
                .is_err()
        {
            warn!(session_id = %self.record.id, "remote client did not disconnect in time");
        }
        self.events = None;
    }

    fn connected_client(&self) -> Result<&dyn RemoteClient, WagateError> {
        match &self.client {
            Some(client) if self.status == SessionStatus::Connected => Ok(client.as_ref()),
            _ => Err(WagateError::NotConnected {
                session_id: self.record.id.clone(),
            }),
        }
    }

    /// Clear `device_id` in the row first, then drop the keystore device.
    async fn clear_device(&mut self) -> Result<(), WagateError> {
        if !self.record.is_paired() {
            return Ok(());
        }
        let device_id = std::mem::take(&mut self.record.device_id);
        self.record.updated_at = now_timestamp();
        if let Err(e) = self.save().await {
            self.record.device_id = device_id;
            return Err(e);
        }
        self.drop_device(&device_id).await;
        Ok(())
    }

    async fn drop_device(&self, device_id: &str) {
        match self.store(self.deps.keystore.delete(device_id)).await {
            Ok(true) => debug!(session_id = %self.record.id, device_id, "keystore device removed"),
            Ok(false) => {}
            Err(e) => warn!(
                session_id = %self.record.id,
                device_id,
                error = %e,
                "failed to remove keystore device, startup sweep will retry"
            ),
        }
    }

    fn clear_qr(&mut self) {
        self.qr = None;
        self.qr_attempts = 0;
        self.qr_deadline = None;
    }

    fn touch(&mut self) {
        self.record.last_seen = Some(now_timestamp());
        self.last_seen_dirty = true;
        self.publish();
    }

    async fn store<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, WagateError>>,
    ) -> Result<T, WagateError> {
        with_deadline(self.settings.storage_timeout, fut).await
    }

    async fn save(&self) -> Result<(), WagateError> {
        self.store(self.deps.sessions.save_session(&self.record)).await
    }

    async fn save_or_log(&mut self) {
        if let Err(e) = self.save().await {
            error!(session_id = %self.record.id, error = %e, "failed to persist session row");
            self.last_error = Some(e.to_string());
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            debug!(session_id = %self.record.id, from = %self.status, to = %status, "status transition");
            metrics::record_transition(status);
            self.status = status;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            record: self.record.clone(),
            status: self.status,
            qr: self.qr.clone(),
            last_error: self.last_error.clone(),
        });
    }

    fn emit(&self, event_type: EventType, payload: serde_json::Value) {
        self.deps
            .sink
            .publish(EventEnvelope::new(self.record.id.clone(), event_type, payload));
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<RemoteEvent>>) -> Option<RemoteEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_render() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_none_never_fires() {
        let fired = tokio::time::timeout(Duration::from_secs(3600), wait_until(None)).await;
        assert!(fired.is_err());
        let at = Instant::now() + Duration::from_secs(5);
        tokio::time::timeout(Duration::from_secs(6), wait_until(Some(at)))
            .await
            .unwrap();
    }
}
