// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::warn;
use wagate_core::types::format_timestamp;
use wagate_core::{Page, SessionStatus, WagateError};
use wagate_webhook::{WebhookInput, validate_input};

use super::ApiResult;
use crate::dto::{
    ActionResponse, CreateSessionRequest, ListQuery, QrView, SessionListResponse, SessionView,
};
use crate::extract::{ApiJson, ApiQuery};
use crate::qr::svg_data_url;
use crate::server::AppState;

/// POST /sessions/create
pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let settings = req.settings.unwrap_or_default();
    let webhook = settings.webhook.map(WebhookInput::from);
    if let Some(input) = &webhook {
        validate_input(input)?;
    }

    let mut snapshot = state.runtime.create(&req.name, settings.proxy).await?;
    let id = snapshot.id().to_string();

    if let Some(input) = webhook
        && let Err(e) = state.webhooks.put(&id, input).await
    {
        if let Err(cleanup) = state.runtime.delete(&id).await {
            warn!(session_id = %id, error = %cleanup, "rollback of partially created session failed");
        }
        return Err(e.into());
    }

    if req.qr_code {
        match state.runtime.connect_and_wait(&id, state.connect_wait).await {
            Ok(connected) => snapshot = connected,
            Err(e) => {
                warn!(session_id = %id, error = %e, "connect after create failed");
                snapshot = state.runtime.get(&id).await?;
            }
        }
    }

    Ok((StatusCode::CREATED, Json(SessionView::with_qr(&snapshot))))
}

/// GET /sessions/list
pub async fn list_sessions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<SessionListResponse>> {
    if query.limit == 0 || query.limit > Page::MAX_LIMIT {
        return Err(WagateError::Validation(format!(
            "limit must be between 1 and {}",
            Page::MAX_LIMIT
        ))
        .into());
    }
    let (snapshots, total) = state
        .runtime
        .list(Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(SessionListResponse {
        sessions: snapshots.iter().map(SessionView::without_qr).collect(),
        total,
    }))
}

/// GET /sessions/{id}/info
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let snapshot = state.runtime.get(&id).await?;
    Ok(Json(SessionView::without_qr(&snapshot)))
}

/// POST /sessions/{id}/connect
pub async fn connect_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let snapshot = state
        .runtime
        .connect_and_wait(&id, state.connect_wait)
        .await?;
    Ok(Json(SessionView::with_qr(&snapshot)))
}

/// POST /sessions/{id}/disconnect
pub async fn disconnect_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let snapshot = state.runtime.disconnect(&id).await?;
    Ok(Json(ActionResponse::new(
        &id,
        snapshot.status,
        "session disconnected",
    )))
}

/// POST /sessions/{id}/logout
pub async fn logout_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let snapshot = state.runtime.logout(&id).await?;
    Ok(Json(ActionResponse::new(
        &id,
        snapshot.status,
        "session logged out",
    )))
}

/// DELETE /sessions/{id}/delete
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    state.runtime.delete(&id).await?;
    Ok(Json(ActionResponse::new(&id, "Deleted", "session deleted")))
}

/// GET /sessions/{id}/qr
pub async fn get_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QrView>> {
    let qr = state.runtime.get_qr(&id).await?;
    Ok(Json(QrView {
        qr_code_base64: svg_data_url(&qr.code)?,
        qr_code: qr.code,
        expires_at: format_timestamp(qr.expires_at),
        status: SessionStatus::AwaitingQr,
    }))
}
