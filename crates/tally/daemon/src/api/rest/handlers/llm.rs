//! Language model passthrough handlers

use super::bad_body;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tally_types::{ChatRequest, LlmResponse, PromptRequest};

pub async fn send_prompt(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResult<Json<LlmResponse>> {
    let Json(request) = payload.map_err(bad_body)?;
    let response = state
        .llm
        .prompt(&request.prompt)
        .await
        .map_err(|e| ApiError::Upstream(e.0))?;

    Ok(Json(LlmResponse { response }))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<LlmResponse>> {
    let Json(request) = payload.map_err(bad_body)?;
    tracing::debug!(turns = request.messages.len(), "forwarding chat");

    let response = state
        .llm
        .chat(&request.messages)
        .await
        .map_err(|e| ApiError::Upstream(e.0))?;

    Ok(Json(LlmResponse { response }))
}
