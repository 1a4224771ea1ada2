// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wagate session gateway.
//!
//! This crate provides the error type, domain types and the trait seams
//! (storage, remote client, event sink) shared by every other crate in the
//! workspace.

pub mod address;
pub mod error;
pub mod events;
pub mod group;
pub mod message;
pub mod metrics;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use address::ChatAddress;
pub use error::{ErrorKind, WagateError};
pub use events::{EventEnvelope, EventType, InboundMessage, RemoteEvent};
pub use group::{GroupCommand, GroupInfo, GroupOutcome};
pub use message::{Media, MessageBody, MessageKind, SendReceipt};
pub use types::{
    EventSubscription, LedgerEntry, Page, ProxyConfig, ProxyScheme, QrState, SessionRecord,
    SessionSnapshot, SessionStatus, SyncStatus, WebhookRecord,
};

pub use traits::{
    ClientOptions, DeviceKeystore, EventSink, MessageLedger, RemoteClient, RemoteClientFactory,
    RemoteEventSender, SessionStore, WebhookStore,
};
