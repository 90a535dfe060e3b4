use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Account routes -- registration and bearer-token issuance
    let auth_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout));

    // Telegram routes -- all bearer-protected, keyed by ?phone=
    let telegram_routes = Router::new()
        .route("/connect", post(handlers::connect))
        .route("/login", post(handlers::telegram_login))
        .route("/chats", get(handlers::chats))
        .route("/messages", get(handlers::messages))
        .route("/logout", post(handlers::telegram_logout));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/telegram", telegram_routes)
        .route("/healthz", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
