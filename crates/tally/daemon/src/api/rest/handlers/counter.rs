//! Identity-scoped counter handlers
//!
//! The owner of every counter touched here is the [`Caller`] derived by the
//! authentication middleware. Request bodies carry values, never identities.

use super::bad_body;
use crate::api::rest::caller::Caller;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tally_types::{CounterResponse, SetCounterRequest};

pub async fn read_counter(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> ApiResult<Json<CounterResponse>> {
    let value = state.counters.read(&owner).await?;
    Ok(Json(CounterResponse { owner, value }))
}

pub async fn increment_counter(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> ApiResult<Json<CounterResponse>> {
    let value = state.counters.increment(&owner).await?;
    tracing::info!(owner = %owner, value, "counter incremented");
    Ok(Json(CounterResponse { owner, value }))
}

pub async fn set_counter(
    State(state): State<AppState>,
    Caller(owner): Caller,
    payload: Result<Json<SetCounterRequest>, JsonRejection>,
) -> ApiResult<Json<CounterResponse>> {
    let Json(request) = payload.map_err(bad_body)?;
    let value = state.counters.set(&owner, request.value).await?;
    tracing::info!(owner = %owner, value, "counter set");
    Ok(Json(CounterResponse { owner, value }))
}
