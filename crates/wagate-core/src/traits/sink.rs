// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound side of the runtime's event stream.

use crate::events::EventEnvelope;

/// Receives every webhookable event the runtime emits.
///
/// `publish` must not block: implementations queue and return.
pub trait EventSink: Send + Sync {
    fn publish(&self, envelope: EventEnvelope);

    /// Release any per-session resources once a session is deleted.
    fn forget_session(&self, _session_id: &str) {}
}
