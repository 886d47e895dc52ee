//! API Router configuration

use super::caller::authenticate;
use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tally_types::capability::paths;
use tally_types::API_PREFIX;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main API router
///
/// Every API route runs behind the caller middleware, so a request with bad
/// signature headers is refused before any handler sees it.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Health and identity
        .route(paths::HEALTH, get(handlers::health_check))
        .route(paths::WHOAMI, get(handlers::whoami))
        // Public capabilities
        .route(paths::GREET, post(handlers::greet))
        .route(paths::LLM_PROMPT, post(handlers::send_prompt))
        .route(paths::LLM_CHAT, post(handlers::chat))
        // Identity-scoped capabilities
        .route(
            paths::COUNTER,
            get(handlers::read_counter).put(handlers::set_counter),
        )
        .route(paths::COUNTER_INCREMENT, post(handlers::increment_counter))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let router = Router::new()
        .nest(API_PREFIX, api_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    let router = if config.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
