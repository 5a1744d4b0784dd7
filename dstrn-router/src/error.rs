//! Error types for router operations
//!
//! Only caller mistakes and calls on a torn-down router are errors. A path
//! that matches nothing, a hook that cancels a navigation or a history API
//! that is missing are ordinary outcomes and never surface here.
//!
//! # Error Codes
//!
//! Error codes are represented by the [`RouterErrorCode`] enum. When
//! serialized, codes are converted to SCREAMING_SNAKE_CASE strings.
//!
//! # Example
//! ```rust,ignore
//! use dstrn_router::{RouterError, RouterErrorCode};
//!
//! let error = RouterError::new(RouterErrorCode::InvalidPattern, "unbalanced group");
//! let error = RouterError::invalid_pattern("(users"); // Convenience method
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Type-safe error codes for router operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouterErrorCode {
    // Caller errors
    /// A route pattern or raw expression could not be compiled
    InvalidPattern,
    /// The router configuration failed validation
    InvalidConfig,
    /// JSON serialization/deserialization failed
    SerializationError,

    // Lifecycle errors
    /// The router was destroyed and accepts no further work
    Destroyed,

    // Host errors
    /// The history backend rejected an update
    HistoryError,
    /// An unexpected internal error occurred
    InternalError,
}

impl RouterErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::Destroyed => "DESTROYED",
            Self::HistoryError => "HISTORY_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern | Self::InvalidConfig | Self::SerializationError
        )
    }

    /// Returns true if the error originates in the router or its host.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::HistoryError | Self::InternalError)
    }
}

impl fmt::Display for RouterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Router error with type-safe code and message.
///
/// # Example
/// ```rust,ignore
/// use dstrn_router::{RouterError, RouterErrorCode};
///
/// let error = RouterError::new(RouterErrorCode::HistoryError, "pushState rejected")
///     .with_details(serde_json::json!({"url": "/users/1"}))
///     .with_cause("quota exceeded");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct RouterError {
    /// Type-safe error code
    pub code: RouterErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (JSON value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Optional cause for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl RouterError {
    /// Create a new error with code and message.
    pub fn new(code: RouterErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            cause: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Add a cause string for debugging.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    // Convenience constructors

    /// Create an INVALID_PATTERN error for the given pattern source.
    pub fn invalid_pattern(pattern: &str) -> Self {
        Self::new(
            RouterErrorCode::InvalidPattern,
            format!("Route pattern '{}' could not be compiled", pattern),
        )
    }

    /// Create an INVALID_CONFIG error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::InvalidConfig, message)
    }

    /// Create a DESTROYED error.
    pub fn destroyed() -> Self {
        Self::new(
            RouterErrorCode::Destroyed,
            "Router has been destroyed and accepts no further navigation",
        )
    }

    /// Create a HISTORY_ERROR error.
    pub fn history(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::HistoryError, message)
    }

    /// Create a SERIALIZATION_ERROR error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::SerializationError, message)
    }

    /// Create an INTERNAL_ERROR error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::InternalError, message)
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<regex::Error> for RouterError {
    fn from(err: regex::Error) -> Self {
        Self::new(RouterErrorCode::InvalidPattern, "Route pattern could not be compiled")
            .with_cause(err.to_string())
    }
}

/// Result type alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
