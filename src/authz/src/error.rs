//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// The engine never recovers from these locally; they surface to the
/// facade caller, which treats any of them as Deny for request-blocking
/// decisions (fail closed) while keeping the kind available for
/// diagnostics.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Referenced user, team, or policy does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind ("user", "team", "organization", "policy")
        kind: &'static str,
        /// The missing identifier
        id: String,
    },

    /// Dangling attachment or malformed hierarchy path
    ///
    /// A data-integrity violation, never caused by a single request.
    /// Fatal to the request it occurs in and worth alerting on.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// Persistence collaborator failed or timed out (transient)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Pattern string rejected by the segment grammar
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

impl AuthzError {
    /// Shorthand for a `NotFound` error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
