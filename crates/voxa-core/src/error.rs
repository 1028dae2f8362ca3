// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Voxa character backend.
//!
//! One taxonomy is shared by every crate in the workspace. Provider
//! adapters translate transport-level failures into it; the turn
//! orchestrator recovers locally from `Moderation`, `Limit`, and
//! `DeadlineExceeded` while everything else propagates to the caller.

use thiserror::Error;

/// The primary error type used across all Voxa crates.
#[derive(Debug, Error)]
pub enum VoxaError {
    /// Caller is not authenticated or the upstream rejected our credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Wallet balance is insufficient to admit or charge the turn.
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// A document, entry, or archive does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A blob that was previously stored has vanished.
    #[error("gone: {0}")]
    Gone(String),

    /// Malformed input; `src` tags which field or stage rejected it.
    #[error("bad request ({src}): {message}")]
    BadRequest { src: String, message: String },

    /// Create collided with an existing document.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Input was well-formed but cannot be processed.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// A store invariant was violated; never retried silently.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Transient upstream failure (connect error, 429, 5xx).
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider cap was hit (request too large, answer too long).
    #[error("limit exceeded: {0}")]
    Limit(String),

    /// Moderation triggered; carries the localized reason string.
    #[error("moderation triggered: {0}")]
    Moderation(String),

    /// The per-turn deadline elapsed.
    #[error("deadline exceeded after {duration:?}")]
    DeadlineExceeded { duration: std::time::Duration },

    /// The caller cancelled the operation.
    #[error("operation canceled")]
    Canceled,

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VoxaError {
    /// Shorthand for a [`VoxaError::BadRequest`] with a source tag.
    pub fn bad_request(src: impl Into<String>, message: impl Into<String>) -> Self {
        VoxaError::BadRequest {
            src: src.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`VoxaError::Connection`] without a source error.
    pub fn connection(message: impl Into<String>) -> Self {
        VoxaError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Stable machine-readable code, used by the gateway error body.
    pub fn code(&self) -> &'static str {
        match self {
            VoxaError::Unauthorized(_) => "unauthorized",
            VoxaError::PaymentRequired(_) => "payment_required",
            VoxaError::NotFound(_) => "not_found",
            VoxaError::Gone(_) => "gone",
            VoxaError::BadRequest { .. } => "bad_request",
            VoxaError::AlreadyExists(_) => "already_exists",
            VoxaError::Unprocessable(_) => "unprocessable",
            VoxaError::Consistency(_) => "consistency",
            VoxaError::Connection { .. } => "connection",
            VoxaError::Limit(_) => "limit",
            VoxaError::Moderation(_) => "moderation",
            VoxaError::DeadlineExceeded { .. } => "deadline_exceeded",
            VoxaError::Canceled => "canceled",
            VoxaError::Config(_) => "config",
            VoxaError::Internal(_) => "internal",
        }
    }

    /// True for failures the turn orchestrator converts into a canned
    /// spoken response instead of surfacing to the client.
    pub fn is_recoverable_in_turn(&self) -> bool {
        matches!(
            self,
            VoxaError::Moderation(_) | VoxaError::Limit(_) | VoxaError::DeadlineExceeded { .. }
        )
    }
}
