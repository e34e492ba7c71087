use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{ai, health, overview};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/overview", overview::router())
        .nest("/api/ai", ai::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
