// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink that records envelopes for assertions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use wagate_core::{EventEnvelope, EventSink, EventType};

#[derive(Default)]
struct Recorded {
    events: Vec<EventEnvelope>,
    forgotten: Vec<String>,
}

/// Captures every published envelope, optionally forwarding to another sink.
#[derive(Default)]
pub struct RecordingSink {
    recorded: Mutex<Recorded>,
    notify: Notify,
    forward: Option<Arc<dyn EventSink>>,
    panic_on: Option<EventType>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record, then hand each envelope on to `next`.
    pub fn tee(next: Arc<dyn EventSink>) -> Self {
        Self {
            forward: Some(next),
            ..Self::default()
        }
    }

    /// Panic whenever an event of this type is published. The envelope is
    /// recorded first.
    pub fn panicking_on(event_type: EventType) -> Self {
        Self {
            panic_on: Some(event_type),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything published so far, in order.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.lock().events.clone()
    }

    pub fn events_for(&self, session_id: &str) -> Vec<EventEnvelope> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Event types published for one session, in order.
    pub fn types_for(&self, session_id: &str) -> Vec<EventType> {
        self.events_for(session_id)
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    pub fn count(&self, session_id: &str, event_type: EventType) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| e.session_id == session_id && e.event_type == event_type)
            .count()
    }

    /// Sessions passed to `forget_session`.
    pub fn forgotten(&self) -> Vec<String> {
        self.lock().forgotten.clone()
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }

    /// Wait until `n` events of this type were published for the session,
    /// returning the `n`-th.
    pub async fn wait_for_nth(
        &self,
        session_id: &str,
        event_type: EventType,
        n: usize,
        limit: Duration,
    ) -> Option<EventEnvelope> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let found = self
                .lock()
                .events
                .iter()
                .filter(|e| e.session_id == session_id && e.event_type == event_type)
                .nth(n.saturating_sub(1))
                .cloned();
            if found.is_some() {
                return found;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Wait for the first event of this type for the session.
    pub async fn wait_for(
        &self,
        session_id: &str,
        event_type: EventType,
        limit: Duration,
    ) -> Option<EventEnvelope> {
        self.wait_for_nth(session_id, event_type, 1, limit).await
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, envelope: EventEnvelope) {
        let event_type = envelope.event_type;
        let session_id = envelope.session_id.clone();
        self.lock().events.push(envelope.clone());
        self.notify.notify_waiters();
        if let Some(next) = &self.forward {
            next.publish(envelope);
        }
        if self.panic_on == Some(event_type) {
            panic!("recording sink asked to panic on {event_type} for {session_id}");
        }
    }

    fn forget_session(&self, session_id: &str) {
        self.lock().forgotten.push(session_id.to_string());
        if let Some(next) = &self.forward {
            next.forget_session(session_id);
        }
    }
}
