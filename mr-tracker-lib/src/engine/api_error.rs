//! Typed failures of a single remote call.

use core::fmt::{Display, Formatter};
use core::time::Duration;

/// Why a GitLab API call did not produce a usable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The token was rejected (401 or 403). Never retried.
    Auth { status: u16 },

    /// The requested resource does not exist (404).
    NotFound,

    /// Network failure, 429 or 5xx that persisted through every retry.
    Transient(String),

    /// The body was not JSON, had an unexpected shape, or the status was not interpretable.
    Malformed(String),

    /// Every attempt exceeded the per-call timeout.
    Timeout(Duration),
}

impl ApiError {
    /// Short, stable label for this failure class.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::NotFound => "not found",
            Self::Transient(_) => "transient",
            Self::Malformed(_) => "malformed response",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Auth { status } => write!(f, "authentication failed (HTTP {status}); check that the token is valid and has the 'api' scope"),
            Self::NotFound => write!(f, "resource not found (HTTP 404)"),
            Self::Transient(reason) => write!(f, "transient failure after retries: {reason}"),
            Self::Malformed(reason) => write!(f, "malformed response: {reason}"),
            Self::Timeout(limit) => write!(f, "request timed out after {}ms", limit.as_millis()),
        }
    }
}

impl core::error::Error for ApiError {}
