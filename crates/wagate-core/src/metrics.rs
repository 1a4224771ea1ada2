// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the binary decides which recorder collects
//! them. Without a recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge};

use crate::events::EventType;
use crate::types::SessionStatus;

/// Register all Wagate metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!("wagate_sessions_live", "Sessions with a running supervisor");
    describe_counter!(
        "wagate_session_transitions_total",
        "Session status transitions, by target status"
    );
    describe_counter!("wagate_messages_sent_total", "Messages accepted by the remote network");
    describe_counter!(
        "wagate_inbound_events_total",
        "Inbound remote events, by event type"
    );
    describe_counter!(
        "wagate_webhook_deliveries_total",
        "Webhook delivery attempts, by outcome"
    );
    describe_counter!(
        "wagate_webhook_dropped_total",
        "Webhook events dropped before delivery, by reason"
    );
}

pub fn set_sessions_live(count: usize) {
    metrics::gauge!("wagate_sessions_live").set(count as f64);
}

pub fn record_transition(to: SessionStatus) {
    metrics::counter!("wagate_session_transitions_total", "to" => to.to_string()).increment(1);
}

pub fn record_message_sent() {
    metrics::counter!("wagate_messages_sent_total").increment(1);
}

pub fn record_inbound_event(event_type: EventType) {
    metrics::counter!("wagate_inbound_events_total", "type" => event_type.to_string())
        .increment(1);
}

/// `outcome` is one of `delivered`, `retry`, `failed`.
pub fn record_webhook_delivery(outcome: &'static str) {
    metrics::counter!("wagate_webhook_deliveries_total", "outcome" => outcome).increment(1);
}

/// `reason` is one of `queue_full`, `closed`.
pub fn record_webhook_dropped(reason: &'static str) {
    metrics::counter!("wagate_webhook_dropped_total", "reason" => reason).increment(1);
}
