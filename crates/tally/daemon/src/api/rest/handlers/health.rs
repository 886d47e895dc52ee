//! Health and identity handlers

use crate::api::rest::caller::Caller;
use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use tally_types::{HealthResponse, StoreStatus, WhoAmIResponse};

/// Health check endpoint
///
/// Reports `degraded` while the counter store is quarantined; public
/// capabilities keep working in that state.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.counters.status().await;
    let status = match store {
        StoreStatus::Ready => "healthy",
        StoreStatus::Quarantined => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        store,
    })
}

/// Echo the identity the daemon derived for this request.
pub async fn whoami(Caller(identity): Caller) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        anonymous: identity.is_anonymous(),
        identity,
    })
}
