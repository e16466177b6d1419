//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{chat, photography};
use crate::state::AppState;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create `/api` routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/chat",
            post(chat::chat_handler).options(|| async { StatusCode::OK }),
        )
        .route("/photography", get(photography::list_photos))
}
