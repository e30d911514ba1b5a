use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::handlers::{
    dashboard_stats, delete_url, health_check, link_analytics, list_urls, session_info,
    shorten_url, AppState,
};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/urls/shorten", post(shorten_url))
        .route("/urls", get(list_urls))
        .route("/urls/{id}/analytics", get(link_analytics))
        .route("/urls/{id}", delete(delete_url))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/session/anonymous", get(session_info))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
