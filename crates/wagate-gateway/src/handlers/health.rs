// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unauthenticated identity, health and metrics routes.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionTotals>,
}

#[derive(Debug, Serialize)]
pub struct SessionTotals {
    pub total: u64,
    pub connected: usize,
}

/// GET /
pub async fn get_root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        name: "wagate",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.health.environment.clone(),
    })
}

/// GET /health
///
/// 503 while shutting down or when the session store does not answer.
pub async fn get_health(State(state): State<AppState>) -> Response {
    let uptime_secs = state.health.start_time.elapsed().as_secs();
    let version = env!("CARGO_PKG_VERSION");

    if !state.runtime.is_accepting() {
        let body = HealthResponse {
            status: "shutting_down",
            version,
            uptime_secs,
            sessions: None,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }

    match state.runtime.counts().await {
        Ok(counts) => Json(HealthResponse {
            status: "ok",
            version,
            uptime_secs,
            sessions: Some(SessionTotals {
                total: counts.total,
                connected: counts.connected,
            }),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not read session counts");
            let body = HealthResponse {
                status: "degraded",
                version,
                uptime_secs,
                sessions: None,
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}
