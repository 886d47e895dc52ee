//! API request handlers

mod counter;
mod greet;
mod health;
mod llm;

pub use counter::*;
pub use greet::*;
pub use health::*;
pub use llm::*;

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;

/// Malformed JSON bodies surface as `BAD_REQUEST` in the standard error shape.
pub(crate) fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}
