//! Greeting handler

use super::bad_body;
use crate::error::ApiResult;
use axum::{extract::rejection::JsonRejection, Json};
use tally_types::{GreetRequest, GreetResponse};

pub async fn greet(
    payload: Result<Json<GreetRequest>, JsonRejection>,
) -> ApiResult<Json<GreetResponse>> {
    let Json(request) = payload.map_err(bad_body)?;
    Ok(Json(GreetResponse {
        message: greeting(&request.name),
    }))
}

pub(crate) fn greeting(name: &str) -> String {
    let name = name.trim();
    let name = if name.is_empty() { "World" } else { name };
    format!("Hello, {}!", name)
}
