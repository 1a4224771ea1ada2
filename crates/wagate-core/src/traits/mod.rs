// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the runtime and its collaborators.
//!
//! Persistence, the remote protocol library and the webhook dispatcher are
//! all reached through these traits so the runtime can be wired with real or
//! in-process implementations.

pub mod remote;
pub mod sink;
pub mod storage;

pub use remote::{ClientOptions, RemoteClient, RemoteClientFactory, RemoteEventSender};
pub use sink::EventSink;
pub use storage::{DeviceKeystore, MessageLedger, SessionStore, WebhookStore};
