//! Error types shared across Automix crates.

use serde::{Deserialize, Serialize};

/// Message returned to callers for any internal failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate mix";

/// Top-level error type for mix generation.
#[derive(Debug, thiserror::Error)]
pub enum AutomixError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("I/O failure while {context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to probe duration of track {track_index}: {message}")]
    ProbeFailure { track_index: usize, message: String },

    #[error("Render failed: {engine_message}")]
    RenderFailure { engine_message: String },

    #[error("Audio engine unavailable: {message}")]
    EngineUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using AutomixError.
pub type AutomixResult<T> = Result<T, AutomixError>;

/// Who is responsible for a failure, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself was malformed.
    ClientInput,
    /// Something failed on our side (filesystem, engine, ...).
    Internal,
}

/// Caller-visible failure. Carries no engine diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureResponse {
    /// HTTP-style status code (400 or 500).
    pub status: u16,
    /// Generic error message.
    pub error: String,
}

impl AutomixError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoFailure {
            context: context.into(),
            source,
        }
    }

    pub fn probe(track_index: usize, msg: impl Into<String>) -> Self {
        Self::ProbeFailure {
            track_index,
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::RenderFailure {
            engine_message: msg.into(),
        }
    }

    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::ClientInput,
            _ => ErrorKind::Internal,
        }
    }

    /// Collapse this error into the response shown to the caller.
    ///
    /// Invalid requests keep their message; everything else becomes the
    /// generic failure so engine and filesystem details stay in the logs.
    pub fn to_response(&self) -> FailureResponse {
        match self {
            Self::InvalidRequest { message } => FailureResponse {
                status: 400,
                error: message.clone(),
            },
            _ => FailureResponse {
                status: 500,
                error: GENERIC_FAILURE_MESSAGE.to_string(),
            },
        }
    }
}
