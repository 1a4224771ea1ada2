// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Wagate session gateway.

use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Wagate components.
#[derive(Debug, Error)]
pub enum WagateError {
    /// Request shape or argument constraints violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A session, webhook, group or other entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniquely-named entity already exists.
    #[error("{entity} already exists: {name}")]
    AlreadyExists { entity: &'static str, name: String },

    /// The operation requires a Connected session.
    #[error("session {session_id} is not connected")]
    NotConnected { session_id: String },

    /// QR requested for a session that is already paired and connected.
    #[error("session {session_id} is already connected")]
    AlreadyConnected { session_id: String },

    /// QR requested while the session is not waiting for a scan.
    #[error("session {session_id} is not awaiting a QR scan (status {status})")]
    NotAwaitingQr { session_id: String, status: String },

    /// The chat address could not be parsed into an accepted form.
    #[error("invalid recipient `{0}`")]
    InvalidRecipient(String),

    /// The remote client returned an error.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The runtime stopped accepting commands.
    #[error("runtime is shutting down")]
    ShuttingDown,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable, transport-independent error category.
///
/// The REST layer maps each kind to an HTTP status; the string form is the
/// `error` code in response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    InvalidRecipient,
    NotFound,
    AlreadyExists,
    NotConnected,
    AlreadyConnected,
    NotAwaitingQr,
    UpstreamError,
    Timeout,
    Unavailable,
    InternalError,
    Unauthorized,
}

impl WagateError {
    /// Shorthand for an upstream error without a source.
    pub fn upstream(message: impl Into<String>) -> Self {
        WagateError::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a missing session.
    pub fn session_not_found(id: impl Into<String>) -> Self {
        WagateError::NotFound {
            entity: "session",
            id: id.into(),
        }
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WagateError::Validation(_) | WagateError::Config(_) => ErrorKind::ValidationError,
            WagateError::InvalidRecipient(_) => ErrorKind::InvalidRecipient,
            WagateError::NotFound { .. } => ErrorKind::NotFound,
            WagateError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            WagateError::NotConnected { .. } => ErrorKind::NotConnected,
            WagateError::AlreadyConnected { .. } => ErrorKind::AlreadyConnected,
            WagateError::NotAwaitingQr { .. } => ErrorKind::NotAwaitingQr,
            WagateError::Upstream { .. } => ErrorKind::UpstreamError,
            WagateError::Timeout { .. } => ErrorKind::Timeout,
            WagateError::ShuttingDown => ErrorKind::Unavailable,
            WagateError::Storage { .. } | WagateError::Internal(_) => ErrorKind::InternalError,
        }
    }
}
