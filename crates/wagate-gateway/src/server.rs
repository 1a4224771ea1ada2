// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use wagate_core::WagateError;
use wagate_runtime::SessionRuntime;
use wagate_webhook::WebhookRegistry;

use crate::auth::{AuthConfig, auth_middleware};
use crate::error::ApiError;
use crate::handlers::{groups, health, messages, sessions, webhooks};

/// State for the unauthenticated `/`, `/health` and `/metrics` routes.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Deployment label reported by `/`.
    pub environment: String,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            environment: environment.into(),
            prometheus_render: None,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SessionRuntime>,
    pub webhooks: WebhookRegistry,
    pub auth: AuthConfig,
    pub health: HealthState,
    /// How long `POST /connect` waits for a QR or a connection.
    pub connect_wait: Duration,
}

/// Build the full router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let public_routes = Router::new()
        .route("/", get(health::get_root))
        .route("/health", get(health::get_health))
        .route("/metrics", get(health::get_metrics));

    let api_routes = Router::new()
        .route("/sessions/create", post(sessions::create_session))
        .route("/sessions/list", get(sessions::list_sessions))
        .route("/sessions/{id}/info", get(sessions::get_session))
        .route("/sessions/{id}/connect", post(sessions::connect_session))
        .route("/sessions/{id}/disconnect", post(sessions::disconnect_session))
        .route("/sessions/{id}/logout", post(sessions::logout_session))
        .route("/sessions/{id}/delete", delete(sessions::delete_session))
        .route("/sessions/{id}/qr", get(sessions::get_qr))
        .route(
            "/sessions/{id}/webhook",
            get(webhooks::get_webhook)
                .put(webhooks::put_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route(
            "/sessions/{id}/send/message/{kind}",
            post(messages::send_message),
        )
        .route("/sessions/{id}/groups/list", get(groups::list_groups))
        .route("/sessions/{id}/groups/info", get(groups::group_info))
        .route("/sessions/{id}/groups/invite-info", post(groups::invite_info))
        .route(
            "/sessions/{id}/groups/invite-link",
            get(groups::get_invite_link).delete(groups::revoke_invite_link),
        )
        .route("/sessions/{id}/groups/join", post(groups::join_group))
        .route("/sessions/{id}/groups/create", post(groups::create_group))
        .route("/sessions/{id}/groups/leave", post(groups::leave_group))
        .route(
            "/sessions/{id}/groups/participants",
            post(groups::update_participants),
        )
        .route("/sessions/{id}/groups/name", post(groups::set_name))
        .route("/sessions/{id}/groups/topic", post(groups::set_topic))
        .route("/sessions/{id}/groups/photo", post(groups::set_photo))
        .route(
            "/sessions/{id}/groups/settings/locked",
            post(groups::set_locked),
        )
        .route(
            "/sessions/{id}/groups/settings/announce",
            post(groups::set_announce),
        )
        .route(
            "/sessions/{id}/groups/settings/disappearing",
            post(groups::set_disappearing),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .fallback(fallback)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn fallback() -> ApiError {
    ApiError::not_found("no such route")
}

/// Bind the listener, surfacing address errors as configuration errors.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, WagateError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| WagateError::Config(format!("failed to bind gateway to {addr}: {e}")))
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), WagateError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "gateway listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| WagateError::Internal(format!("gateway server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_is_clone() {
        let state = HealthState::new("test");
        let cloned = state.clone();
        assert_eq!(cloned.environment, "test");
        assert!(cloned.prometheus_render.is_none());
    }

    #[tokio::test]
    async fn bind_reports_bad_address() {
        let err = bind("not a host", 0).await.unwrap_err();
        assert!(matches!(err, WagateError::Config(_)));
    }
}
