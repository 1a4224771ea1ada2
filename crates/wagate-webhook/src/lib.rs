// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook registry and dispatcher for the Wagate gateway.
//!
//! The [`WebhookRegistry`] validates and stores one webhook per session and
//! broadcasts every change. The [`WebhookDispatcher`] implements
//! [`wagate_core::EventSink`]: it signs each envelope with the session's
//! secret and POSTs it with bounded retry.

pub mod dispatcher;
pub mod registry;
pub mod retry;
pub mod signing;

pub use dispatcher::{DispatcherSettings, WebhookDispatcher};
pub use registry::{WebhookChange, WebhookInput, WebhookRegistry, validate_input};
pub use retry::RetryPolicy;
