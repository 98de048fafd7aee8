pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Builds the full application router: API routes plus the OpenAPI
/// document endpoint.
pub fn app(state: Arc<AppState>) -> Router {
    handlers::api_router(state).route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}
