use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification of extraction/generation backend failures.
///
/// Callers use this to decide whether retrying the stage makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamReason {
    /// Connection refused/reset, DNS failure.
    Network,
    /// The backend did not answer within the configured bound.
    Timeout,
    /// Non-success HTTP status that is neither 429 nor 5xx.
    HttpStatus,
    /// 429 or quota exhaustion.
    RateLimited,
    /// 5xx from the backend.
    ServerError,
    /// The backend answered, but with something unusable (empty, not JSON, ...).
    MalformedResponse,
    /// The website was fetched but carries nothing we can build a profile from.
    UnusableContent,
    /// The circuit breaker rejected the call without contacting the backend.
    CircuitOpen,
    /// The process stopped while the stage was in flight.
    Interrupted,
    /// The stage task itself failed (panic, join error).
    Internal,
}

impl UpstreamReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamReason::Network => "network",
            UpstreamReason::Timeout => "timeout",
            UpstreamReason::HttpStatus => "http_status",
            UpstreamReason::RateLimited => "rate_limited",
            UpstreamReason::ServerError => "server_error",
            UpstreamReason::MalformedResponse => "malformed_response",
            UpstreamReason::UnusableContent => "unusable_content",
            UpstreamReason::CircuitOpen => "circuit_open",
            UpstreamReason::Interrupted => "interrupted",
            UpstreamReason::Internal => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            UpstreamReason::MalformedResponse
                | UpstreamReason::UnusableContent
                | UpstreamReason::Internal
        )
    }
}

impl fmt::Display for UpstreamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UpstreamReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network" => Ok(UpstreamReason::Network),
            "timeout" => Ok(UpstreamReason::Timeout),
            "http_status" => Ok(UpstreamReason::HttpStatus),
            "rate_limited" => Ok(UpstreamReason::RateLimited),
            "server_error" => Ok(UpstreamReason::ServerError),
            "malformed_response" => Ok(UpstreamReason::MalformedResponse),
            "unusable_content" => Ok(UpstreamReason::UnusableContent),
            "circuit_open" => Ok(UpstreamReason::CircuitOpen),
            "interrupted" => Ok(UpstreamReason::Interrupted),
            "internal" => Ok(UpstreamReason::Internal),
            _ => Err(format!("Unknown upstream reason: {s}")),
        }
    }
}

/// Application-wide error types for Brandkit.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied something we cannot accept (URL, output type, language, format).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A stage was invoked out of order (generate before scan, export before generate).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// A scan is already in flight for the project.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Extraction or generation backend failed.
    #[error("Upstream failure ({reason}): {message}")]
    Upstream {
        reason: UpstreamReason,
        message: String,
    },

    /// An output could not be embedded in the requested document format.
    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(reason: UpstreamReason, message: impl Into<String>) -> Self {
        AppError::Upstream {
            reason,
            message: message.into(),
        }
    }

    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::PreconditionFailed(_) => "precondition_failed",
            AppError::Conflict(_) => "conflict",
            AppError::Upstream { .. } => "upstream_failure",
            AppError::RenderFailure(_) => "render_failure",
            AppError::SerializationError(_) => "serialization_error",
            AppError::DatabaseError(_) => "database_error",
            AppError::ConfigError(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn upstream_reason(&self) -> Option<UpstreamReason> {
        match self {
            AppError::Upstream { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns true if this error is transient and the stage is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Upstream { reason, .. } => reason.is_retryable(),
            AppError::Conflict(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error should count against the circuit breaker.
    pub fn should_trip_circuit(&self) -> bool {
        matches!(
            self.upstream_reason(),
            Some(
                UpstreamReason::Network
                    | UpstreamReason::Timeout
                    | UpstreamReason::RateLimited
                    | UpstreamReason::ServerError
            )
        )
    }
}
