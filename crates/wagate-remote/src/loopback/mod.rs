// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic in-process stand-in for the remote network.
//!
//! [`LoopbackNetwork`] is both the shared "server side" every
//! [`LoopbackClient`] talks to and the controller tests and development
//! setups use to drive it: scan QR codes, drop transports, revoke devices,
//! inject inbound events and make connects or sends fail.

mod client;
mod groups;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};
use wagate_config::model::RemoteConfig;
use wagate_core::types::format_timestamp;
use wagate_core::{ChatAddress, GroupInfo, InboundMessage, MessageBody, RemoteEvent, WagateError};

pub use client::{LoopbackClient, LoopbackFactory};
use client::Link;
use groups::GroupDirectory;

/// Timing of the simulated pairing flow.
#[derive(Debug, Clone)]
pub struct LoopbackSettings {
    /// Lifetime of each issued QR code; a new one follows when it lapses.
    pub qr_interval: Duration,
    /// QR codes issued per pairing attempt before the client stops.
    pub qr_codes: u32,
    /// Pair without a scan after this delay.
    pub auto_pair: Option<Duration>,
}

impl LoopbackSettings {
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            qr_interval: Duration::from_secs(config.loopback_qr_interval_secs),
            qr_codes: config.loopback_qr_codes,
            auto_pair: config.loopback_auto_pair_secs.map(Duration::from_secs),
        }
    }
}

impl Default for LoopbackSettings {
    fn default() -> Self {
        Self::from_config(&RemoteConfig::default())
    }
}

/// A message accepted by the loopback network.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub session_id: String,
    pub message_id: String,
    pub to: ChatAddress,
    pub body: MessageBody,
}

#[derive(Default)]
struct NetworkState {
    links: HashMap<String, Arc<Link>>,
    connect_failures: HashMap<String, u32>,
    failing_sends: HashSet<String>,
    failing_logouts: HashSet<String>,
    logout_delays: HashMap<String, Duration>,
    revoked: HashSet<String>,
    sent: Vec<SentMessage>,
    groups: GroupDirectory,
}

struct NetworkInner {
    settings: LoopbackSettings,
    state: Mutex<NetworkState>,
    message_seq: AtomicU64,
}

/// Shared loopback network and its controller. Cheap to clone.
#[derive(Clone)]
pub struct LoopbackNetwork {
    inner: Arc<NetworkInner>,
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl LoopbackNetwork {
    pub fn new(settings: LoopbackSettings) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                settings,
                state: Mutex::new(NetworkState::default()),
                message_seq: AtomicU64::new(1),
            }),
        }
    }

    pub fn settings(&self) -> &LoopbackSettings {
        &self.inner.settings
    }

    // Never held across an await.
    fn state(&self) -> MutexGuard<'_, NetworkState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn link(&self, session_id: &str) -> Result<Arc<Link>, WagateError> {
        self.state()
            .links
            .get(session_id)
            .cloned()
            .ok_or_else(|| WagateError::NotFound {
                entity: "loopback client",
                id: session_id.to_string(),
            })
    }

    pub(crate) fn register(&self, link: Arc<Link>) {
        self.state().links.insert(link.session_id().to_string(), link);
    }

    pub(crate) fn take_connect_failure(&self, session_id: &str) -> bool {
        let mut state = self.state();
        match state.connect_failures.get_mut(session_id) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn sends_fail(&self, session_id: &str) -> bool {
        self.state().failing_sends.contains(session_id)
    }

    pub(crate) fn logouts_fail(&self, session_id: &str) -> bool {
        self.state().failing_logouts.contains(session_id)
    }

    pub(crate) fn logout_delay(&self, session_id: &str) -> Option<Duration> {
        self.state().logout_delays.get(session_id).copied()
    }

    pub(crate) fn is_revoked(&self, device_id: &str) -> bool {
        self.state().revoked.contains(device_id)
    }

    pub(crate) fn revoke(&self, device_id: &str) {
        self.state().revoked.insert(device_id.to_string());
    }

    pub(crate) fn accept_message(
        &self,
        session_id: &str,
        to: &ChatAddress,
        body: &MessageBody,
    ) -> String {
        let seq = self.inner.message_seq.fetch_add(1, Ordering::Relaxed);
        let message_id = format!("3EB0{seq:016X}");
        self.state().sent.push(SentMessage {
            session_id: session_id.to_string(),
            message_id: message_id.clone(),
            to: to.clone(),
            body: body.clone(),
        });
        message_id
    }

    pub(crate) fn run_group_command(
        &self,
        me: &str,
        command: wagate_core::GroupCommand,
    ) -> Result<wagate_core::GroupOutcome, WagateError> {
        self.state().groups.apply(me, command)
    }

    // --- controller ---

    /// Scan the session's current QR code, completing pairing.
    ///
    /// Returns the new device id.
    pub async fn scan_qr(&self, session_id: &str) -> Result<String, WagateError> {
        let link = self.link(session_id)?;
        if !link.awaiting_scan() {
            return Err(WagateError::Validation(format!(
                "session {session_id} is not showing a QR code"
            )));
        }
        link.stop_pairing();
        link.complete_pairing().await
    }

    /// Drop the session's transport as if the network went away.
    pub async fn drop_transport(&self, session_id: &str) -> Result<(), WagateError> {
        let link = self.link(session_id)?;
        if link.mark_disconnected() {
            info!(session_id, "loopback transport dropped");
            link.emit(RemoteEvent::Disconnected {
                reason: "transport_closed".to_string(),
            })
            .await;
        }
        Ok(())
    }

    /// Revoke the session's device from the remote side.
    pub async fn remote_logout(&self, session_id: &str) -> Result<(), WagateError> {
        let link = self.link(session_id)?;
        if let Some(device_id) = link.device_id() {
            self.revoke(&device_id);
        }
        link.stop_pairing();
        link.mark_disconnected();
        info!(session_id, "loopback device revoked remotely");
        link.emit(RemoteEvent::LoggedOut {
            reason: "device_removed".to_string(),
        })
        .await;
        Ok(())
    }

    /// Push an arbitrary event to the session's client.
    pub async fn inject(&self, session_id: &str, event: RemoteEvent) -> Result<(), WagateError> {
        self.link(session_id)?.emit(event).await;
        Ok(())
    }

    /// Deliver an inbound text message to the session.
    pub async fn inject_text(
        &self,
        session_id: &str,
        message_id: &str,
        from: &str,
        text: &str,
    ) -> Result<(), WagateError> {
        let message = InboundMessage {
            id: message_id.to_string(),
            chat: from.to_string(),
            sender: from.to_string(),
            from_me: false,
            message_type: "text".to_string(),
            timestamp: format_timestamp(chrono::Utc::now()),
            text: Some(text.to_string()),
            content: serde_json::json!({ "conversation": text }),
        };
        self.inject(session_id, RemoteEvent::Message(message)).await
    }

    /// Make the next `n` connects of this session fail.
    pub fn fail_next_connects(&self, session_id: &str, n: u32) {
        self.state()
            .connect_failures
            .insert(session_id.to_string(), n);
    }

    pub fn fail_sends(&self, session_id: &str, fail: bool) {
        let mut state = self.state();
        if fail {
            state.failing_sends.insert(session_id.to_string());
        } else {
            state.failing_sends.remove(session_id);
        }
    }

    pub fn fail_logouts(&self, session_id: &str, fail: bool) {
        let mut state = self.state();
        if fail {
            state.failing_logouts.insert(session_id.to_string());
        } else {
            state.failing_logouts.remove(session_id);
        }
    }

    /// Hold every remote logout of this session for `delay`. `None` clears it.
    pub fn stall_logouts(&self, session_id: &str, delay: Option<Duration>) {
        let mut state = self.state();
        match delay {
            Some(delay) => state.logout_delays.insert(session_id.to_string(), delay),
            None => state.logout_delays.remove(session_id),
        };
    }

    /// Messages the session has sent, oldest first.
    pub fn sent_messages(&self, session_id: &str) -> Vec<SentMessage> {
        self.state()
            .sent
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Whether the session's current client holds an open transport.
    pub fn is_connected(&self, session_id: &str) -> bool {
        self.link(session_id).is_ok_and(|l| l.is_connected())
    }

    /// Whether the session's client is waiting for a QR scan.
    pub fn awaiting_scan(&self, session_id: &str) -> bool {
        self.link(session_id).is_ok_and(|l| l.awaiting_scan())
    }

    /// Seed a group, returning its invite code.
    pub fn seed_group(&self, info: GroupInfo) -> String {
        debug!(group = %info.group_jid, "seeding loopback group");
        self.state().groups.insert(info)
    }
}
