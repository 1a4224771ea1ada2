// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST gateway for the Wagate session runtime.
//!
//! Every route except `/`, `/health` and `/metrics` requires the configured
//! API key. Handlers are thin: they decode the request, call the
//! [`wagate_runtime::SessionRuntime`] or [`wagate_webhook::WebhookRegistry`],
//! and map [`wagate_core::WagateError`] kinds to HTTP statuses.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod qr;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{AppState, HealthState, bind, router, serve};
