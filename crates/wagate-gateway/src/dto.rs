// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response bodies of the REST surface (camelCase JSON).

use serde::{Deserialize, Serialize};
use wagate_core::types::format_timestamp;
use wagate_core::{
    GroupInfo, ProxyConfig, SessionSnapshot, SessionStatus, WebhookRecord,
};
use wagate_core::group::ParticipantChange;
use wagate_webhook::WebhookInput;

/// Session snapshot as returned by the session routes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub name: String,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// Proxy settings with the password reduced to a flag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyView {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub has_password: bool,
}

impl From<&ProxyConfig> for ProxyView {
    fn from(proxy: &ProxyConfig) -> Self {
        Self {
            scheme: proxy.scheme.to_string(),
            host: proxy.host.clone(),
            port: proxy.port,
            username: proxy.username.clone(),
            has_password: proxy.password.is_some(),
        }
    }
}

impl SessionView {
    /// View without QR fields.
    pub fn without_qr(snapshot: &SessionSnapshot) -> Self {
        let record = &snapshot.record;
        Self {
            session_id: record.id.clone(),
            name: record.name.clone(),
            status: snapshot.status,
            device_id: Some(record.device_id.clone()).filter(|d| !d.is_empty()),
            proxy: record.proxy.as_ref().map(ProxyView::from),
            qr_code: None,
            qr_code_expires_at: None,
            last_error: snapshot.last_error.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
            connected_at: record.connected_at.clone(),
            last_seen: record.last_seen.clone(),
        }
    }

    /// View including the current QR while the session awaits a scan.
    pub fn with_qr(snapshot: &SessionSnapshot) -> Self {
        let mut view = Self::without_qr(snapshot);
        if snapshot.status == SessionStatus::AwaitingQr
            && let Some(qr) = &snapshot.qr
        {
            view.qr_code = Some(qr.code.clone());
            view.qr_code_expires_at = Some(format_timestamp(qr.expires_at));
        }
        view
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub session_id: String,
    pub status: String,
    pub message: String,
}

impl ActionResponse {
    pub fn new(session_id: &str, status: impl ToString, message: impl Into<String>) -> Self {
        Self {
            success: true,
            session_id: session_id.to_string(),
            status: status.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionView>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrView {
    pub qr_code: String,
    pub qr_code_base64: String,
    pub expires_at: String,
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSessionRequest {
    pub name: String,
    #[serde(default)]
    pub settings: Option<SessionSettings>,
    #[serde(default)]
    pub qr_code: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionSettings {
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Body of `PUT /sessions/{id}/webhook` and `settings.webhook`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebhookRequest {
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl From<WebhookRequest> for WebhookInput {
    fn from(req: WebhookRequest) -> Self {
        WebhookInput {
            url: req.url,
            secret: req.secret,
            events: req.events,
            enabled: req.enabled,
        }
    }
}

/// Stored webhook; the secret itself is never returned.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookView {
    pub id: String,
    pub session_id: String,
    pub url: String,
    pub has_secret: bool,
    pub events: Vec<String>,
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&WebhookRecord> for WebhookView {
    fn from(record: &WebhookRecord) -> Self {
        Self {
            id: record.id.clone(),
            session_id: record.session_id.clone(),
            url: record.url.clone(),
            has_secret: record.secret.is_some(),
            events: record.events.to_names(),
            enabled: record.enabled,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub message_id: String,
    pub status: &'static str,
    pub sent_at: String,
}

// Group bodies.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupQuery {
    pub group_jid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    pub group_jid: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteCode {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsRequest {
    pub group_jid: String,
    pub participants: Vec<String>,
    pub action: wagate_core::group::ParticipantAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameRequest {
    pub group_jid: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRequest {
    pub group_jid: String,
    pub topic: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRequest {
    pub group_jid: String,
    pub image: wagate_core::Media,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedRequest {
    pub group_jid: String,
    pub locked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceRequest {
    pub group_jid: String,
    pub announce: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisappearingRequest {
    pub group_jid: String,
    pub duration: u32,
}

#[derive(Debug, Serialize)]
pub struct GroupList {
    pub groups: Vec<GroupInfo>,
}

#[derive(Debug, Serialize)]
pub struct InviteLink {
    pub link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedGroup {
    pub group_jid: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResults {
    pub participants: Vec<ParticipantChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureSet {
    pub picture_id: String,
}
