// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event types flowing from remote clients through the runtime to webhooks.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Event categories delivered to webhook subscribers.
///
/// The subscription wildcard `All` is deliberately not a variant: it never
/// appears in an envelope.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum EventType {
    Message,
    MessageRevoked,
    MessageReaction,
    Receipt,
    Connected,
    Disconnected,
    #[serde(rename = "QRCode")]
    #[strum(serialize = "QRCode")]
    QrCode,
    PairSuccess,
    LoggedOut,
    Presence,
    ChatPresence,
    GroupInfo,
    JoinedGroup,
    CallOffer,
    NewsletterJoin,
}

impl EventType {
    /// Lifecycle events are produced by the supervisor itself rather than
    /// passed through from the remote network.
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            EventType::Connected
                | EventType::Disconnected
                | EventType::QrCode
                | EventType::PairSuccess
                | EventType::LoggedOut
        )
    }
}

/// Format an instant as RFC 3339 with nanosecond precision.
pub fn format_occurred_at(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// The canonical webhook body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: String,
    pub session_id: String,
    pub event_type: EventType,
    pub occurred_at: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build an envelope stamped with a fresh id and the current time.
    pub fn new(session_id: impl Into<String>, event_type: EventType, payload: serde_json::Value) -> Self {
        Self::at(session_id, event_type, payload, chrono::Utc::now())
    }

    pub fn at(
        session_id: impl Into<String>,
        event_type: EventType,
        payload: serde_json::Value,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            event_type,
            occurred_at: format_occurred_at(occurred_at),
            payload,
        }
    }
}

/// An inbound chat message as reported by the remote network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    pub chat: String,
    pub sender: String,
    #[serde(default)]
    pub from_me: bool,
    /// Message kind, e.g. `text` or `image`.
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Any further structured content, passed through to subscribers.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub content: serde_json::Value,
}

/// Raw events pushed by a remote client into its session's supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// A pairing code was issued; it stays valid for `ttl`.
    Qr { code: String, ttl: Duration },
    /// The QR code was scanned and the device registered.
    PairSuccess { device_id: String },
    /// The authenticated transport is up.
    Connected,
    /// The transport dropped without an explicit disconnect.
    Disconnected { reason: String },
    /// The remote network revoked the device.
    LoggedOut { reason: String },
    Message(InboundMessage),
    /// Any other inbound protocol event, passed through to subscribers.
    Other {
        event_type: EventType,
        payload: serde_json::Value,
    },
    /// The client received something it could not decode.
    Malformed { detail: String },
}

impl RemoteEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteEvent::Qr { .. } => "qr",
            RemoteEvent::PairSuccess { .. } => "pair_success",
            RemoteEvent::Connected => "connected",
            RemoteEvent::Disconnected { .. } => "disconnected",
            RemoteEvent::LoggedOut { .. } => "logged_out",
            RemoteEvent::Message(_) => "message",
            RemoteEvent::Other { .. } => "other",
            RemoteEvent::Malformed { .. } => "malformed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn fifteen_event_types_round_trip_through_strings() {
        let all: Vec<EventType> = EventType::iter().collect();
        assert_eq!(all.len(), 15);
        for t in all {
            let parsed: EventType = t.to_string().parse().unwrap();
            assert_eq!(parsed, t);
        }
        assert!("All".parse::<EventType>().is_err());
    }

    #[test]
    fn qr_code_uses_wire_name() {
        assert_eq!(EventType::QrCode.to_string(), "QRCode");
        assert_eq!(
            serde_json::to_value(EventType::QrCode).unwrap(),
            serde_json::json!("QRCode")
        );
    }

    #[test]
    fn envelope_is_camel_case() {
        let env = EventEnvelope::new("s1", EventType::Message, serde_json::json!({"a": 1}));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["sessionId"], "s1");
        assert_eq!(v["eventType"], "Message");
        assert!(v["eventId"].as_str().unwrap().len() == 36);
        let occurred = v["occurredAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(occurred).is_ok());
        assert_eq!(v["payload"]["a"], 1);
    }

    #[test]
    fn inbound_message_payload_shape() {
        let msg = InboundMessage {
            id: "M1".into(),
            chat: "1@s.whatsapp.net".into(),
            sender: "1@s.whatsapp.net".into(),
            from_me: false,
            message_type: "text".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            text: Some("hello".into()),
            content: serde_json::Value::Null,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "text");
        assert_eq!(v["fromMe"], false);
        assert!(v.get("content").is_none());
    }
}
