//! Error types surfaced through effect callbacks.

use thiserror::Error;

/// Failures produced by the effect boundary itself rather than by the
/// task being run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// The task panicked while being started or polled.
    #[error("Task '{label}' panicked: {message}")]
    Panicked { label: String, message: String },

    /// The descriptor was built without something runnable behind it.
    #[error("Task '{label}' is not invocable: {reason}")]
    NotInvocable { label: String, reason: String },
}

/// Errors returned by the API client.
///
/// Cloneable and comparable so it can live inside a model as
/// `RemoteData::Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 401 or 403.
    #[error("Unauthorized ({status})")]
    Unauthorized { status: u16 },

    /// Connection, TLS or timeout failure before a response arrived.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body was not the expected JSON shape.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// No API client was wired into the effect handlers.
    #[error("API client not configured")]
    NotConfigured,

    #[error(transparent)]
    Effect(#[from] EffectError),
}

impl ApiError {
    /// HTTP status carried by the error, if there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } | ApiError::Unauthorized { status } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-readable kind, used in logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Status { .. } => "status",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Transport(_) => "transport",
            ApiError::Decode(_) => "decode",
            ApiError::NotConfigured => "not_configured",
            ApiError::Effect(_) => "effect",
        }
    }

    /// Classify a response status. Success codes are not errors.
    pub fn from_status(status: u16, message: impl Into<String>) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(ApiError::Unauthorized { status }),
            _ => Some(ApiError::Status {
                status,
                message: message.into(),
            }),
        }
    }
}
