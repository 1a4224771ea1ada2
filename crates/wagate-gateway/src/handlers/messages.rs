// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message route. The path names the kind; the body carries the
//! recipient and the kind's fields.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;
use wagate_core::types::format_timestamp;
use wagate_core::{MessageBody, MessageKind, WagateError};

use super::ApiResult;
use crate::dto::SendResponse;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::server::AppState;

/// POST /sessions/{id}/send/message/{kind}
///
/// The body is `{"to": "<address>", ...}` plus the fields of `kind`.
pub async fn send_message(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<SendResponse>> {
    let kind: MessageKind = kind
        .parse()
        .map_err(|_| ApiError::not_found(format!("unknown message kind `{kind}`")))?;

    let Value::Object(mut fields) = body else {
        return Err(WagateError::Validation("body must be a JSON object".to_string()).into());
    };
    let to = match fields.remove("to") {
        Some(Value::String(to)) => to,
        _ => {
            return Err(WagateError::Validation("to is required".to_string()).into());
        }
    };

    let message = MessageBody::from_fields(kind, Value::Object(fields))?;
    let receipt = state.runtime.send(&id, &to, message).await?;
    Ok(Json(SendResponse {
        message_id: receipt.message_id,
        status: "sent",
        sent_at: format_timestamp(receipt.timestamp),
    }))
}
