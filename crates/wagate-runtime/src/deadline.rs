// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::future::Future;
use std::time::Duration;

use wagate_core::WagateError;

/// Run `fut`, failing with [`WagateError::Timeout`] once `limit` elapses.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, WagateError>
where
    F: Future<Output = Result<T, WagateError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| WagateError::Timeout { duration: limit })?
}
