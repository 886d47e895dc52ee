//! Client error types

use crate::identity::IdentityError;
use tally_types::{ErrorCode, Identity};
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Anonymous context not bootstrapped yet; retry after `bootstrap`
    #[error("Service not ready: anonymous context has not been bootstrapped")]
    ServiceNotReady,

    /// Identity-scoped call attempted without a signed-in identity
    #[error("Authentication required: sign in to use {capability}")]
    AuthenticationRequired {
        /// Capability that was refused
        capability: &'static str,
    },

    /// Counter already at its maximum value
    #[error("Counter overflow: {0}")]
    CounterOverflow(String),

    /// Daemon counter store is quarantined
    #[error("Counter state unavailable: {0}")]
    StateUnavailable(String),

    /// Upstream language model failure, passed through as-is
    #[error("{0}")]
    Upstream(String),

    /// Any other error response from the daemon
    #[error("Request rejected: {status} {code} - {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error code from the response body
        code: ErrorCode,
        /// Error message
        message: String,
    },

    /// Identity provider failure
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// A sign-out arrived while this sign-in was still in flight
    #[error("Sign-in superseded by a sign-out issued while it was in flight")]
    SignInSuperseded,

    /// Daemon credited a scoped call to an identity other than the agent's
    #[error("Owner mismatch: daemon attributed the call to {actual}, expected {expected}")]
    OwnerMismatch {
        /// Identity the agent is bound to
        expected: Identity,
        /// Identity named in the response
        actual: Identity,
    },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::ServiceNotReady | ClientError::StateUnavailable(_) | ClientError::Http(_)
        )
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
