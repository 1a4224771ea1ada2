// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle against the loopback network.

use std::time::Duration;

use serde_json::json;
use wagate_core::message::TextBody;
use wagate_core::{
    DeviceKeystore, EventType, GroupCommand, GroupOutcome, MessageBody, RemoteEvent,
    SessionStatus, SessionStore, WagateError, WebhookStore,
};
use wagate_test_utils::{RecordingSink, TestHarness};

const WAIT: Duration = Duration::from_secs(5);

fn text(body: &str) -> MessageBody {
    MessageBody::Text(TextBody {
        text: body.to_string(),
    })
}

#[tokio::test]
async fn create_validates_and_rejects_duplicates() {
    let h = TestHarness::new().await.unwrap();

    let created = h.runtime.create("sales-bot", None).await.unwrap();
    assert_eq!(created.status, SessionStatus::Disconnected);
    assert!(created.record.device_id.is_empty());
    assert!(h.events.events().is_empty());

    let dup = h.runtime.create("sales-bot", None).await.unwrap_err();
    assert!(matches!(dup, WagateError::AlreadyExists { .. }));

    let bad = h.runtime.create(" padded", None).await.unwrap_err();
    assert!(matches!(bad, WagateError::Validation(_)));

    let missing = h.runtime.get("no-such-session").await.unwrap_err();
    assert!(matches!(missing, WagateError::NotFound { .. }));
}

#[tokio::test]
async fn pairing_emits_qr_then_pair_success_then_connected() {
    let h = TestHarness::new().await.unwrap();
    let id = h.runtime.create("alpha", None).await.unwrap().record.id;

    let snapshot = h.runtime.connect_and_wait(&id, WAIT).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::AwaitingQr);

    let qr = h.runtime.get_qr(&id).await.unwrap();
    assert_eq!(qr.attempt, 1);
    assert!(qr.expires_at - chrono::Utc::now() >= chrono::Duration::seconds(30));

    let event = h.expect_event(&id, EventType::QrCode).await.unwrap();
    assert_eq!(event.payload["qrCode"], json!(qr.code));
    assert_eq!(event.payload["attempt"], json!(1));

    let device_id = h.network.scan_qr(&id).await.unwrap();
    let connected = h.wait_for_status(&id, SessionStatus::Connected).await.unwrap();
    assert_eq!(connected.record.device_id, device_id);
    assert!(connected.record.connected_at.is_some());
    assert!(connected.qr.is_none());

    h.expect_event(&id, EventType::Connected).await.unwrap();
    assert_eq!(
        h.events.types_for(&id),
        vec![EventType::QrCode, EventType::PairSuccess, EventType::Connected]
    );

    let row = h.storage.get_session(&id).await.unwrap().unwrap();
    assert_eq!(row.device_id, device_id);
    assert!(h.storage.get(&device_id).await.unwrap().is_some());

    let err = h.runtime.get_qr(&id).await.unwrap_err();
    assert!(matches!(err, WagateError::AlreadyConnected { .. }));
}

#[tokio::test]
async fn paired_session_reconnects_without_qr() {
    let h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    let down = h.runtime.disconnect(&id).await.unwrap();
    assert_eq!(down.status, SessionStatus::Disconnected);
    assert!(!down.record.device_id.is_empty());
    let event = h.expect_event(&id, EventType::Disconnected).await.unwrap();
    assert_eq!(event.payload["reason"], json!("user_request"));
    assert_eq!(event.payload["willReconnect"], json!(false));

    h.runtime.connect(&id).await.unwrap();
    h.wait_for_status(&id, SessionStatus::Connected).await.unwrap();
    assert_eq!(h.events.count(&id, EventType::QrCode), 1);
    assert!(
        h.events
            .wait_for_nth(&id, EventType::Connected, 2, WAIT)
            .await
            .is_some()
    );

    // Connecting a connected session is a no-op.
    let again = h.runtime.connect(&id).await.unwrap();
    assert_eq!(again.status, SessionStatus::Connected);
}

#[tokio::test]
async fn logout_forgets_the_device() {
    let h = TestHarness::new().await.unwrap();
    let paired = h.paired_session("alpha").await.unwrap();
    let id = paired.record.id.clone();
    let device_id = paired.record.device_id.clone();

    let out = h.runtime.logout(&id).await.unwrap();
    assert_eq!(out.status, SessionStatus::LoggedOut);
    assert!(out.record.device_id.is_empty());
    let event = h.expect_event(&id, EventType::LoggedOut).await.unwrap();
    assert_eq!(event.payload["reason"], json!("user_request"));

    assert!(h.storage.get(&device_id).await.unwrap().is_none());
    assert!(
        h.storage
            .get_session(&id)
            .await
            .unwrap()
            .unwrap()
            .device_id
            .is_empty()
    );

    // A second logout is a no-op.
    h.runtime.logout(&id).await.unwrap();
    assert_eq!(h.events.count(&id, EventType::LoggedOut), 1);

    let again = h.runtime.connect_and_wait(&id, WAIT).await.unwrap();
    assert_eq!(again.status, SessionStatus::AwaitingQr);
}

#[tokio::test]
async fn failed_remote_logout_keeps_the_session() {
    let h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    h.network.fail_logouts(&id, true);
    assert!(h.runtime.logout(&id).await.is_err());
    let snapshot = h.runtime.get(&id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Connected);
    assert!(!snapshot.record.device_id.is_empty());
}

#[tokio::test]
async fn delete_cascades_to_device_and_webhook() {
    let h = TestHarness::new().await.unwrap();
    let paired = h.paired_session("alpha").await.unwrap();
    let id = paired.record.id.clone();
    h.registry
        .put(
            &id,
            wagate_webhook::WebhookInput {
                url: "https://hooks.example.com/wa".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    h.runtime.delete(&id).await.unwrap();

    assert!(matches!(
        h.runtime.get(&id).await.unwrap_err(),
        WagateError::NotFound { .. }
    ));
    assert!(h.storage.get(&paired.record.device_id).await.unwrap().is_none());
    assert!(h.storage.get_webhook(&id).await.unwrap().is_none());
    assert_eq!(h.events.forgotten(), vec![id.clone()]);
    assert!(matches!(
        h.runtime.delete(&id).await.unwrap_err(),
        WagateError::NotFound { .. }
    ));
}

#[tokio::test]
async fn delete_completing_after_caller_timeout_is_not_served_stale() {
    let h = TestHarness::builder()
        .with_settings(|s| {
            s.connect_timeout = Duration::from_millis(300);
            s.send_timeout = Duration::from_millis(300);
            s.storage_timeout = Duration::from_millis(100);
        })
        .build()
        .await
        .unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;
    h.network.stall_logouts(&id, Some(Duration::from_secs(5)));

    // Two stalled logouts queue ahead of the delete.
    let mut queued = Vec::new();
    for _ in 0..2 {
        let runtime = h.runtime.clone();
        let id = id.clone();
        queued.push(tokio::spawn(async move { runtime.logout(&id).await }));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let err = h.runtime.delete(&id).await.unwrap_err();
    assert!(matches!(err, WagateError::Timeout { .. }), "{err:?}");
    for task in queued {
        assert!(task.await.unwrap().is_err());
    }

    let deadline = tokio::time::Instant::now() + WAIT;
    let last = loop {
        let result = h.runtime.get(&id).await;
        if matches!(result, Err(WagateError::NotFound { .. }))
            || tokio::time::Instant::now() >= deadline
        {
            break result;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert!(matches!(last, Err(WagateError::NotFound { .. })), "{last:?}");
    assert!(h.storage.get_session(&id).await.unwrap().is_none());

    let (sessions, total) = h.runtime.list(Default::default()).await.unwrap();
    assert_eq!(total, 0);
    assert!(sessions.is_empty());
    assert_eq!(h.runtime.counts().await.unwrap().live, 0);
    assert!(matches!(
        h.runtime.connect(&id).await.unwrap_err(),
        WagateError::NotFound { .. }
    ));
}

#[tokio::test]
async fn send_requires_a_connected_session() {
    let h = TestHarness::new().await.unwrap();
    let idle = h.runtime.create("idle", None).await.unwrap().record.id;
    let err = h.runtime.send(&idle, "5511999999999", text("hi")).await.unwrap_err();
    assert!(matches!(err, WagateError::NotConnected { .. }));

    let id = h.paired_session("alpha").await.unwrap().record.id;
    let receipt = h
        .runtime
        .send(&id, "+5511999999999", text("hello"))
        .await
        .unwrap();
    assert!(!receipt.message_id.is_empty());

    let sent = h.network.sent_messages(&id);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.to_string(), "5511999999999@s.whatsapp.net");

    let bad = h.runtime.send(&id, "not-a-number", text("x")).await.unwrap_err();
    assert!(matches!(bad, WagateError::InvalidRecipient(_)));
    let unknown = h
        .runtime
        .send("no-such-session", "not-a-number", text("x"))
        .await
        .unwrap_err();
    assert!(matches!(unknown, WagateError::NotFound { .. }));
    let idle_bad = h.runtime.send(&idle, "not-a-number", text("x")).await.unwrap_err();
    assert!(matches!(idle_bad, WagateError::InvalidRecipient(_)));
    let empty = h.runtime.send(&id, "5511999999999", text("  ")).await.unwrap_err();
    assert!(matches!(empty, WagateError::Validation(_)));

    h.network.fail_sends(&id, true);
    let upstream = h.runtime.send(&id, "5511999999999", text("x")).await.unwrap_err();
    assert!(matches!(upstream, WagateError::Upstream { .. }));
}

#[tokio::test]
async fn group_commands_reach_the_client() {
    let h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    let outcome = h
        .runtime
        .group(
            &id,
            GroupCommand::Create {
                name: "Ops".into(),
                participants: vec!["5511988887777".parse().unwrap()],
            },
        )
        .await
        .unwrap();
    let GroupOutcome::Info(info) = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(info.name, "Ops");

    let GroupOutcome::Groups(groups) = h.runtime.group(&id, GroupCommand::List).await.unwrap()
    else {
        panic!("expected a group list");
    };
    assert_eq!(groups.len(), 1);
}

#[tokio::test]
async fn dropped_transport_reconnects_with_backoff() {
    let h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    h.network.fail_next_connects(&id, 2);
    h.network.drop_transport(&id).await.unwrap();

    let event = h.expect_event(&id, EventType::Disconnected).await.unwrap();
    assert_eq!(event.payload["willReconnect"], json!(true));
    assert!(
        h.events
            .wait_for_nth(&id, EventType::Connected, 2, WAIT)
            .await
            .is_some()
    );
    let snapshot = h.wait_for_status(&id, SessionStatus::Connected).await.unwrap();
    assert!(snapshot.last_error.is_none());
    assert_eq!(h.events.count(&id, EventType::QrCode), 1);
}

#[tokio::test]
async fn no_reconnect_when_disabled() {
    let h = TestHarness::builder()
        .with_settings(|s| s.auto_reconnect = false)
        .build()
        .await
        .unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    h.network.drop_transport(&id).await.unwrap();
    let event = h.expect_event(&id, EventType::Disconnected).await.unwrap();
    assert_eq!(event.payload["willReconnect"], json!(false));
    h.wait_for_status(&id, SessionStatus::Disconnected).await.unwrap();
}

#[tokio::test]
async fn remote_logout_clears_the_device() {
    let h = TestHarness::new().await.unwrap();
    let paired = h.paired_session("alpha").await.unwrap();
    let id = paired.record.id.clone();

    h.network.remote_logout(&id).await.unwrap();
    let snapshot = h.wait_for_status(&id, SessionStatus::LoggedOut).await.unwrap();
    assert!(snapshot.record.device_id.is_empty());
    let event = h.expect_event(&id, EventType::LoggedOut).await.unwrap();
    assert_eq!(event.payload["reason"], json!("device_removed"));
    assert!(h.storage.get(&paired.record.device_id).await.unwrap().is_none());
}

#[tokio::test]
async fn unscanned_qr_moves_session_to_error() {
    let h = TestHarness::new().await.unwrap();
    let id = h.runtime.create("alpha", None).await.unwrap().record.id;
    h.runtime.connect_and_wait(&id, WAIT).await.unwrap();

    h.network
        .inject(
            &id,
            RemoteEvent::Qr {
                code: "2@short-lived".into(),
                ttl: Duration::from_millis(50),
            },
        )
        .await
        .unwrap();

    let snapshot = h.wait_for_status(&id, SessionStatus::Error).await.unwrap();
    assert!(snapshot.qr.is_none());
    assert!(snapshot.last_error.is_some());
    let event = h.expect_event(&id, EventType::Disconnected).await.unwrap();
    assert_eq!(event.payload["reason"], json!("qr_timeout"));
    assert!(!h.network.awaiting_scan(&id));

    // Error is recoverable with a fresh connect.
    let again = h.runtime.connect_and_wait(&id, WAIT).await.unwrap();
    assert_eq!(again.status, SessionStatus::AwaitingQr);
    assert_eq!(h.runtime.get_qr(&id).await.unwrap().attempt, 1);
}

#[tokio::test]
async fn qr_attempt_budget_is_enforced() {
    let h = TestHarness::builder()
        .with_settings(|s| s.qr_max_attempts = 1)
        .build()
        .await
        .unwrap();
    let id = h.runtime.create("alpha", None).await.unwrap().record.id;
    h.runtime.connect_and_wait(&id, WAIT).await.unwrap();

    h.network
        .inject(
            &id,
            RemoteEvent::Qr {
                code: "2@second".into(),
                ttl: Duration::from_secs(20),
            },
        )
        .await
        .unwrap();
    h.wait_for_status(&id, SessionStatus::Error).await.unwrap();
    assert_eq!(h.events.count(&id, EventType::QrCode), 1);
}

#[tokio::test]
async fn duplicate_inbound_message_is_dispatched_once() {
    let h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    for _ in 0..2 {
        h.network
            .inject_text(&id, "3EB0C767D26A", "5511977776666@s.whatsapp.net", "hi")
            .await
            .unwrap();
    }
    h.network
        .inject_text(&id, "3EB0C767D26B", "5511977776666@s.whatsapp.net", "again")
        .await
        .unwrap();

    let second = h
        .events
        .wait_for_nth(&id, EventType::Message, 2, WAIT)
        .await
        .unwrap();
    assert_eq!(second.payload["id"], json!("3EB0C767D26B"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.events.count(&id, EventType::Message), 2);
    assert!(h.runtime.get(&id).await.unwrap().record.last_seen.is_some());
}

#[tokio::test]
async fn passthrough_events_are_forwarded() {
    let h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    h.network
        .inject(
            &id,
            RemoteEvent::Other {
                event_type: EventType::Presence,
                payload: json!({ "from": "5511977776666@s.whatsapp.net", "unavailable": false }),
            },
        )
        .await
        .unwrap();
    h.network
        .inject(
            &id,
            RemoteEvent::Other {
                event_type: EventType::LoggedOut,
                payload: json!({}),
            },
        )
        .await
        .unwrap();
    h.network
        .inject(
            &id,
            RemoteEvent::Malformed {
                detail: "truncated frame".into(),
            },
        )
        .await
        .unwrap();

    h.expect_event(&id, EventType::Presence).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.events.count(&id, EventType::LoggedOut), 0);
    assert_eq!(h.runtime.get(&id).await.unwrap().status, SessionStatus::Connected);
}

#[tokio::test]
async fn panicking_sink_does_not_kill_the_session() {
    let h = TestHarness::builder()
        .with_sink(RecordingSink::panicking_on(EventType::Message))
        .build()
        .await
        .unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    h.network
        .inject_text(&id, "M1", "5511977776666@s.whatsapp.net", "boom")
        .await
        .unwrap();
    h.expect_event(&id, EventType::Message).await.unwrap();

    let deadline = tokio::time::Instant::now() + WAIT;
    let snapshot = loop {
        let snapshot = h.runtime.get(&id).await.unwrap();
        if snapshot.last_error.is_some() || tokio::time::Instant::now() >= deadline {
            break snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert!(snapshot.last_error.unwrap().contains("panicked"));
    assert_eq!(snapshot.status, SessionStatus::Connected);

    let reported = h.expect_event(&id, EventType::Disconnected).await.unwrap();
    assert_eq!(reported.payload["reason"], "handler_panic");
    assert_eq!(reported.payload["willReconnect"], false);
    let types = h.events.types_for(&id);
    let message_at = types.iter().position(|t| *t == EventType::Message).unwrap();
    assert_eq!(types[message_at + 1], EventType::Disconnected);

    h.runtime.send(&id, "5511999999999", text("still here")).await.unwrap();
}

#[tokio::test]
async fn restore_reconnects_paired_sessions_after_restart() {
    let mut h = TestHarness::new().await.unwrap();
    let paired = h.paired_session("alpha").await.unwrap().record.id;
    let idle = h.runtime.create("beta", None).await.unwrap().record.id;
    h.storage.put("orphan-device", b"stale").await.unwrap();

    h.restart().await;
    h.events.clear();
    let report = h.runtime.restore().await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.connected, 1);
    assert_eq!(report.orphans_removed, 1);

    assert_eq!(h.runtime.get(&paired).await.unwrap().status, SessionStatus::Connected);
    assert_eq!(h.runtime.get(&idle).await.unwrap().status, SessionStatus::Disconnected);
    assert_eq!(h.events.types_for(&paired), vec![EventType::Connected]);
    assert!(h.storage.get("orphan-device").await.unwrap().is_none());
}

#[tokio::test]
async fn restore_with_missing_device_logs_out() {
    let mut h = TestHarness::new().await.unwrap();
    let paired = h.paired_session("alpha").await.unwrap();
    let id = paired.record.id.clone();

    h.restart().await;
    h.storage.delete(&paired.record.device_id).await.unwrap();
    let report = h.runtime.restore().await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed, 1);

    let snapshot = h.wait_for_status(&id, SessionStatus::LoggedOut).await.unwrap();
    assert!(snapshot.record.device_id.is_empty());
}

#[tokio::test]
async fn restore_gives_up_on_unreachable_sessions() {
    let mut h = TestHarness::new().await.unwrap();
    let id = h.paired_session("alpha").await.unwrap().record.id;

    h.restart().await;
    h.network.fail_next_connects(&id, 1);
    let report = h.runtime.restore().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.runtime.get(&id).await.unwrap().status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn list_and_counts_reflect_live_sessions() {
    let h = TestHarness::new().await.unwrap();
    let a = h.paired_session("alpha").await.unwrap().record.id;
    h.runtime.create("beta", None).await.unwrap();
    h.runtime.create("gamma", None).await.unwrap();

    let (page, total) = h.runtime.list(wagate_core::Page::new(2, 0)).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);

    let counts = h.runtime.counts().await.unwrap();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.connected, 1);
    assert_eq!(
        page.iter().find(|s| s.record.id == a).map(|s| s.status),
        Some(SessionStatus::Connected)
    );
}

#[tokio::test]
async fn shutdown_stops_accepting_and_keeps_devices() {
    let h = TestHarness::new().await.unwrap();
    let paired = h.paired_session("alpha").await.unwrap();

    h.runtime.shutdown().await;
    assert!(!h.runtime.is_accepting());
    assert!(matches!(
        h.runtime.create("late", None).await.unwrap_err(),
        WagateError::ShuttingDown
    ));
    assert!(h.storage.get(&paired.record.device_id).await.unwrap().is_some());
    assert!(!h.network.is_connected(&paired.record.id));
}
