//! Error types for stevedore
//!
//! Errors carry the action or operation they relate to so the message shown to
//! an operator points at the offending Deploy action without extra context.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for stevedore operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user configuration. Raised before any cluster mutation.
    #[error("configuration error in {action}: {message}")]
    Configuration {
        /// Deploy action whose spec is invalid
        action: String,
        /// Description of what's invalid
        message: String,
    },

    /// Refusal to proceed with a deployment (e.g. production selector drift)
    #[error("deployment error for {action}: {message}")]
    Deployment {
        /// Deploy action being deployed
        action: String,
        /// Description of why the deployment was refused
        message: String,
    },

    /// Internal invariant violated. Indicates a bug, never bad input.
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Where the invariant was checked (e.g. "deployment-strategy")
        context: String,
        /// Description of what went wrong
        message: String,
    },

    /// Failure reported by a cluster-facing collaborator
    #[error("cluster error during {operation}: {message}")]
    Cluster {
        /// Operation that failed (apply, delete, wait, ...)
        operation: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a configuration error for the given action
    pub fn configuration(action: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Configuration {
            action: action.into(),
            message: msg.into(),
        }
    }

    /// Create a deployment error for the given action
    pub fn deployment(action: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Deployment {
            action: action.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create a cluster error for the given operation
    pub fn cluster(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Cluster {
            operation: operation.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only collaborator failures are retryable; the engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cluster { .. })
    }

    /// Whether this error came from user configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
