// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers, one module per route family.

pub mod groups;
pub mod health;
pub mod messages;
pub mod sessions;
pub mod webhooks;

use crate::error::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;
