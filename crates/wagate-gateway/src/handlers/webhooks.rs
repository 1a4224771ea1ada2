// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session webhook routes.

use axum::Json;
use axum::extract::{Path, State};
use wagate_core::WagateError;

use super::ApiResult;
use crate::dto::{ActionResponse, WebhookRequest, WebhookView};
use crate::extract::ApiJson;
use crate::server::AppState;

fn webhook_not_found(id: &str) -> WagateError {
    WagateError::NotFound {
        entity: "webhook",
        id: id.to_string(),
    }
}

/// GET /sessions/{id}/webhook
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WebhookView>> {
    let record = state
        .webhooks
        .get(&id)
        .await?
        .ok_or_else(|| webhook_not_found(&id))?;
    Ok(Json(WebhookView::from(&record)))
}

/// PUT /sessions/{id}/webhook
pub async fn put_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<WebhookRequest>,
) -> ApiResult<Json<WebhookView>> {
    let record = state.webhooks.put(&id, req.into()).await?;
    Ok(Json(WebhookView::from(&record)))
}

/// DELETE /sessions/{id}/webhook
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    if !state.webhooks.delete(&id).await? {
        return Err(webhook_not_found(&id).into());
    }
    Ok(Json(ActionResponse::new(&id, "Deleted", "webhook removed")))
}
