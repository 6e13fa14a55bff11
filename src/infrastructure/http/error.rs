//! Error types for external service calls.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the HTTP resilience layer.
///
/// # Retry decision
/// - Transient (retried with backoff): 429, 500, 502, 503, 504, timeouts,
///   network errors.
/// - Permanent (surfaced immediately): other statuses, circuit-open,
///   configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} request timed out after {}s", timeout.as_secs())]
    Timeout { service: String, timeout: Duration },

    #[error("{service} network error: {message}")]
    Network { service: String, message: String },

    #[error("circuit open for {service}; retry in {}s", remaining.as_secs())]
    CircuitOpen { service: String, remaining: Duration },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    /// Whether a bounded retry with backoff is worthwhile.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::CircuitOpen { .. } | Self::InvalidConfig(_) => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Remaining cool-down for circuit-open errors.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }
}
