// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key authentication.
//!
//! The key is accepted either as the whole `Authorization` header value
//! (optionally with a `Bearer ` prefix) or in `X-API-Key`; a request passes
//! when either header carries it. When no key is configured every request
//! is rejected (fail-closed).

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AuthConfig {
    pub api_key: Option<SecretString>,
}

impl AuthConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(SecretString::from),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Keys presented by the client: the `Authorization` value (without any
/// `Bearer ` prefix) followed by `X-API-Key`.
fn presented_keys(headers: &HeaderMap) -> Vec<&str> {
    let from_authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));
    let from_api_key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    from_authorization.into_iter().chain(from_api_key).collect()
}

fn key_matches(presented: &str, expected: &SecretString) -> bool {
    presented
        .as_bytes()
        .ct_eq(expected.expose_secret().as_bytes())
        .into()
}

pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &auth.api_key else {
        tracing::error!("gateway has no API key configured, rejecting request");
        return Err(ApiError::unauthorized("API key not configured"));
    };
    let presented = presented_keys(request.headers());
    if presented.is_empty() {
        return Err(ApiError::unauthorized(
            "missing API key: send Authorization or X-API-Key",
        ));
    }
    // No short-circuit: every candidate is compared.
    let matched = presented
        .iter()
        .fold(false, |acc, key| key_matches(key, expected) | acc);
    if matched {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "rejected request with wrong API key");
        Err(ApiError::unauthorized("invalid API key"))
    }
}
