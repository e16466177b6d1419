//! Folio API - HTTP server for the portfolio assistant
//!
//! Endpoints:
//! - `POST /api/chat` answers questions about the site owner
//! - `GET /api/photography` lists the photo gallery
//! - `GET /health` and `GET /api-docs/openapi.json`
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::get,
    Json, Router,
};
use folio_core::AppConfig;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    info(title = "Folio API", description = "Ask-about-me assistant and photo gallery"),
    paths(
        handlers::chat::chat_handler,
        handlers::photography::list_photos,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::chat::ChatRequest,
        handlers::chat::ChatMessageBody,
        handlers::chat::ChatResponse,
        handlers::chat::TokenCounts,
        handlers::photography::PhotoList,
        handlers::health::HealthResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "chat", description = "Retrieval-augmented chat"),
        (name = "photography", description = "Photo gallery"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// CORS policy for browser clients on any origin
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body_size = state.config.server.max_body_size;
    let cors_enabled = state.config.server.cors_enabled;

    let router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}

/// Router over default configuration without a chat credential
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(AppState::new(AppConfig::default())))
}
