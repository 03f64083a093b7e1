// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Relay streaming layer.

use thiserror::Error;

/// The primary error type used across all Relay adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Storage backend errors (event log, job store, conversation store).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failure reported by the external generation service.
    #[error("generation error: {message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A job, conversation, or other keyed record does not exist (or has expired).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A stream cursor could not be parsed.
    #[error("invalid cursor `{0}`")]
    InvalidCursor(String),

    /// The request conflicts with the current state of a job.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The generation call stopped because its abort signal was raised.
    #[error("generation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for a storage error built from a plain message.
    pub fn storage(message: impl Into<String>) -> Self {
        let message: String = message.into();
        RelayError::Storage {
            source: message.into(),
        }
    }

    /// Shorthand for a generation error without an underlying source.
    pub fn generation(message: impl Into<String>) -> Self {
        RelayError::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error represents a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RelayError::Cancelled)
    }
}
