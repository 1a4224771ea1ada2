// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loopback client and factory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use wagate_core::types::now_timestamp;
use wagate_core::{
    ChatAddress, ClientOptions, DeviceKeystore, GroupCommand, GroupOutcome, MessageBody,
    RemoteClient, RemoteClientFactory, RemoteEvent, RemoteEventSender, SendReceipt, WagateError,
};

use super::LoopbackNetwork;

/// What the loopback backend keeps in the keystore for a paired device.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceBlob {
    account: String,
    identity: String,
    paired_at: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared between a client and the network controller.
pub(crate) struct Link {
    session_id: String,
    events: RemoteEventSender,
    keystore: Arc<dyn DeviceKeystore>,
    device_id: Mutex<Option<String>>,
    account: Mutex<Option<String>>,
    connected: AtomicBool,
    awaiting_scan: AtomicBool,
    pairing: Mutex<Option<JoinHandle<()>>>,
}

impl Link {
    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn device_id(&self) -> Option<String> {
        lock(&self.device_id).clone()
    }

    fn account(&self) -> Option<String> {
        lock(&self.account).clone()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn awaiting_scan(&self) -> bool {
        self.awaiting_scan.load(Ordering::SeqCst)
    }

    /// Returns whether the transport was up.
    pub(crate) fn mark_disconnected(&self) -> bool {
        self.connected.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn stop_pairing(&self) {
        self.awaiting_scan.store(false, Ordering::SeqCst);
        if let Some(task) = lock(&self.pairing).take() {
            task.abort();
        }
    }

    pub(crate) async fn emit(&self, event: RemoteEvent) {
        let name = event.name();
        if self.events.send(event).await.is_err() {
            debug!(session_id = %self.session_id, event = name, "event receiver gone");
        }
    }

    /// Register a fresh device, persist its blob and bring the transport up.
    pub(crate) async fn complete_pairing(&self) -> Result<String, WagateError> {
        let (device_id, blob) = {
            let mut rng = rand::thread_rng();
            let number: u64 = rng.gen_range(100_000_000_000..1_000_000_000_000);
            let identity: [u8; 32] = rng.r#gen();
            let device_id = format!("{number}.0:{}@s.whatsapp.net", rng.gen_range(1..100u32));
            let blob = DeviceBlob {
                account: format!("{number}@s.whatsapp.net"),
                identity: hex::encode(identity),
                paired_at: now_timestamp(),
            };
            (device_id, blob)
        };
        let bytes = serde_json::to_vec(&blob)
            .map_err(|e| WagateError::Internal(format!("device blob encoding: {e}")))?;
        self.keystore.put(&device_id, &bytes).await?;

        *lock(&self.device_id) = Some(device_id.clone());
        *lock(&self.account) = Some(blob.account);
        self.awaiting_scan.store(false, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        info!(session_id = %self.session_id, device_id = %device_id, "loopback device paired");

        self.emit(RemoteEvent::PairSuccess {
            device_id: device_id.clone(),
        })
        .await;
        self.emit(RemoteEvent::Connected).await;
        Ok(device_id)
    }
}

const FIRST_QR_TTL: Duration = Duration::from_secs(60);

fn qr_payload(session_id: &str, attempt: u32) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("2@{nonce},{session_id},{attempt}")
}

async fn run_pairing(link: Arc<Link>, network: LoopbackNetwork) {
    let settings = network.settings().clone();
    let started = Instant::now();

    for attempt in 1..=settings.qr_codes {
        // The first code of a pairing attempt lives longer than the refreshes.
        let ttl = if attempt == 1 {
            FIRST_QR_TTL.max(settings.qr_interval)
        } else {
            settings.qr_interval
        };
        link.awaiting_scan.store(true, Ordering::SeqCst);
        link.emit(RemoteEvent::Qr {
            code: qr_payload(&link.session_id, attempt),
            ttl,
        })
        .await;

        if let Some(delay) = settings.auto_pair {
            let remaining = delay.saturating_sub(started.elapsed());
            if remaining <= ttl {
                tokio::time::sleep(remaining).await;
                if let Err(e) = link.complete_pairing().await {
                    warn!(session_id = %link.session_id, error = %e, "loopback auto-pair failed");
                }
                return;
            }
        }
        tokio::time::sleep(ttl).await;
    }

    link.awaiting_scan.store(false, Ordering::SeqCst);
    debug!(session_id = %link.session_id, "loopback QR codes exhausted");
}

/// A [`RemoteClient`] connected to a [`LoopbackNetwork`].
pub struct LoopbackClient {
    link: Arc<Link>,
    network: LoopbackNetwork,
}

impl LoopbackClient {
    fn require_connected(&self) -> Result<(), WagateError> {
        if self.link.is_connected() {
            Ok(())
        } else {
            Err(WagateError::NotConnected {
                session_id: self.link.session_id.clone(),
            })
        }
    }

    /// Resume from the keystore. Emits `LoggedOut` when the device is gone.
    async fn resume(&self, device_id: &str) -> Result<(), WagateError> {
        if self.network.is_revoked(device_id) {
            self.link
                .emit(RemoteEvent::LoggedOut {
                    reason: "device_removed".to_string(),
                })
                .await;
            return Ok(());
        }
        let Some(bytes) = self.link.keystore.get(device_id).await? else {
            self.link
                .emit(RemoteEvent::LoggedOut {
                    reason: "device_missing".to_string(),
                })
                .await;
            return Ok(());
        };
        let blob: DeviceBlob = serde_json::from_slice(&bytes).map_err(|e| WagateError::Upstream {
            message: "unreadable device material".to_string(),
            source: Some(Box::new(e)),
        })?;

        *lock(&self.link.account) = Some(blob.account);
        self.link.connected.store(true, Ordering::SeqCst);
        debug!(session_id = %self.link.session_id, device_id, "loopback session resumed");
        self.link.emit(RemoteEvent::Connected).await;
        Ok(())
    }
}

impl Drop for LoopbackClient {
    fn drop(&mut self) {
        self.link.stop_pairing();
    }
}

#[async_trait]
impl RemoteClient for LoopbackClient {
    async fn connect(&self) -> Result<(), WagateError> {
        if self.link.is_connected() || self.link.awaiting_scan() {
            return Ok(());
        }
        if self.network.take_connect_failure(&self.link.session_id) {
            return Err(WagateError::upstream("loopback: connection refused"));
        }

        match self.link.device_id() {
            Some(device_id) => self.resume(&device_id).await,
            None => {
                self.link.awaiting_scan.store(true, Ordering::SeqCst);
                let task = tokio::spawn(run_pairing(self.link.clone(), self.network.clone()));
                if let Some(previous) = lock(&self.link.pairing).replace(task) {
                    previous.abort();
                }
                Ok(())
            }
        }
    }

    async fn disconnect(&self) {
        self.link.stop_pairing();
        self.link.mark_disconnected();
    }

    async fn logout(&self) -> Result<(), WagateError> {
        if let Some(delay) = self.network.logout_delay(&self.link.session_id) {
            tokio::time::sleep(delay).await;
        }
        if self.network.logouts_fail(&self.link.session_id) {
            return Err(WagateError::upstream("loopback: logout rejected"));
        }
        self.link.stop_pairing();
        self.link.mark_disconnected();
        *lock(&self.link.account) = None;

        let device_id = lock(&self.link.device_id).take();
        if let Some(device_id) = device_id {
            self.network.revoke(&device_id);
            if let Err(e) = self.link.keystore.delete(&device_id).await {
                warn!(device_id = %device_id, error = %e, "failed to drop loopback device material");
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn device_id(&self) -> Option<String> {
        self.link.device_id()
    }

    async fn send(&self, to: &ChatAddress, body: &MessageBody) -> Result<SendReceipt, WagateError> {
        self.require_connected()?;
        if self.network.sends_fail(&self.link.session_id) {
            return Err(WagateError::upstream("loopback: send rejected"));
        }
        let message_id = self.network.accept_message(&self.link.session_id, to, body);
        Ok(SendReceipt {
            message_id,
            timestamp: chrono::Utc::now(),
        })
    }

    async fn group(&self, command: GroupCommand) -> Result<GroupOutcome, WagateError> {
        self.require_connected()?;
        let account = self.link.account().ok_or_else(|| WagateError::NotConnected {
            session_id: self.link.session_id.clone(),
        })?;
        self.network.run_group_command(&account, command)
    }
}

/// Creates [`LoopbackClient`]s attached to one shared network.
pub struct LoopbackFactory {
    network: LoopbackNetwork,
    keystore: Arc<dyn DeviceKeystore>,
}

impl LoopbackFactory {
    pub fn new(network: LoopbackNetwork, keystore: Arc<dyn DeviceKeystore>) -> Self {
        Self { network, keystore }
    }

    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }
}

#[async_trait]
impl RemoteClientFactory for LoopbackFactory {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn create(
        &self,
        options: ClientOptions,
        events: RemoteEventSender,
    ) -> Result<Box<dyn RemoteClient>, WagateError> {
        if let Some(proxy) = &options.proxy {
            proxy.validate()?;
            debug!(
                session_id = %options.session_id,
                scheme = %proxy.scheme,
                host = %proxy.host,
                "loopback ignores proxy settings"
            );
        }

        let link = Arc::new(Link {
            session_id: options.session_id,
            events,
            keystore: self.keystore.clone(),
            device_id: Mutex::new(options.device_id.filter(|d| !d.is_empty())),
            account: Mutex::new(None),
            connected: AtomicBool::new(false),
            awaiting_scan: AtomicBool::new(false),
            pairing: Mutex::new(None),
        });
        self.network.register(link.clone());
        Ok(Box::new(LoopbackClient {
            link,
            network: self.network.clone(),
        }))
    }
}
