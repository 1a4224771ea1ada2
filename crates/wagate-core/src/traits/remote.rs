// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The remote protocol capability consumed by the session runtime.

use async_trait::async_trait;

use crate::address::ChatAddress;
use crate::error::WagateError;
use crate::events::RemoteEvent;
use crate::group::{GroupCommand, GroupOutcome};
use crate::message::{MessageBody, SendReceipt};
use crate::types::ProxyConfig;

/// Bounded channel a client pushes its raw events into.
///
/// The receiving end belongs to the session's supervisor; clients never do
/// any processing of their own on event delivery.
pub type RemoteEventSender = tokio::sync::mpsc::Sender<RemoteEvent>;

/// Everything a factory needs to bind a client to one session.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub session_id: String,
    /// Keystore device to resume from; `None` starts a fresh pairing.
    pub device_id: Option<String>,
    pub proxy: Option<ProxyConfig>,
}

/// One authenticated connection to the remote network.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Start the connection. Pairing progress and the eventual
    /// `Connected` are reported through the event channel.
    async fn connect(&self) -> Result<(), WagateError>;

    /// Close the transport, keeping device material.
    async fn disconnect(&self);

    /// Unregister the device on the remote side.
    async fn logout(&self) -> Result<(), WagateError>;

    fn is_connected(&self) -> bool;

    /// Device id once paired.
    fn device_id(&self) -> Option<String>;

    async fn send(&self, to: &ChatAddress, body: &MessageBody)
    -> Result<SendReceipt, WagateError>;

    async fn group(&self, command: GroupCommand) -> Result<GroupOutcome, WagateError>;
}

/// Creates remote clients bound to a keystore device.
#[async_trait]
pub trait RemoteClientFactory: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    async fn create(
        &self,
        options: ClientOptions,
        events: RemoteEventSender,
    ) -> Result<Box<dyn RemoteClient>, WagateError>;
}
