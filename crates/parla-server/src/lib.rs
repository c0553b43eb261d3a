//! Parla server - the chat route and its supporting endpoints

pub mod api;
pub mod config;

use api::{chat::chat, models::list_models, state::AppState, welcome::*};
use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

/// Build the application router around shared state
pub fn build_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/api/welcome", get(welcome))
        .route("/api/models", get(list_models))
        .route("/api/chat", post(chat))
        .layer(cors)
        .with_state(state)
}
