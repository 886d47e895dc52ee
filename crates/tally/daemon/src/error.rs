//! Error types for tally-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tally_store::StoreError;
use tally_types::{ErrorCode, ErrorResponse, Identity};
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Store error at a lifecycle boundary
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Signed-request headers present but unacceptable
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Counter already at its maximum value
    #[error("Counter overflow for {0}")]
    CounterOverflow(Identity),

    /// Counter store quarantined after a corrupt snapshot
    #[error("Counter state unavailable: {0}")]
    StateUnavailable(String),

    /// Upstream language model failure, passed through as-is
    #[error("{0}")]
    Upstream(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
            ApiError::InvalidSignature(_) => (StatusCode::UNAUTHORIZED, ErrorCode::InvalidSignature),
            ApiError::CounterOverflow(_) => (StatusCode::CONFLICT, ErrorCode::CounterOverflow),
            ApiError::StateUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::StateUnavailable)
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamLlm),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CounterOverflow { owner } => ApiError::CounterOverflow(owner),
            StoreError::CorruptState(reason) => ApiError::StateUnavailable(reason),
            StoreError::Serialization(reason) => ApiError::Internal(reason),
            StoreError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::warn!(code = %code, error = %self, "request failed");
        } else {
            tracing::debug!(code = %code, error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("test".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );

        assert_eq!(
            ApiError::InvalidSignature("test".to_string())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );

        assert_eq!(
            ApiError::CounterOverflow(Identity::anonymous())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );

        assert_eq!(
            ApiError::Upstream("model offline".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_store_errors_propagate_unchanged() {
        let owner = Identity::self_authenticating(&[3u8; 32]);
        let err = ApiError::from(StoreError::CounterOverflow {
            owner: owner.clone(),
        });
        assert!(matches!(err, ApiError::CounterOverflow(ref o) if *o == owner));

        let err = ApiError::from(StoreError::CorruptState("digest".to_string()));
        assert_eq!(err.status_and_code().1, ErrorCode::StateUnavailable);
    }

    #[test]
    fn test_upstream_message_is_opaque() {
        let err = ApiError::Upstream("ollama error 500: boom".to_string());
        assert_eq!(err.to_string(), "ollama error 500: boom");
    }
}
