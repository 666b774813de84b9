pub mod auth;
pub mod chat;
pub mod dev;
pub mod upload;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the bearer-token middleware). `state` is needed to wire
/// up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health));

    let mut protected = Router::new()
        .route("/chat", post(chat::chat))
        .route("/session/:session_id", axum::routing::delete(chat::clear_session))
        .route("/upload-async", post(upload::upload_async))
        .route("/upload-status/:session_id", get(upload::upload_status));

    if state.config.server.dev_mode {
        protected = protected.route("/dev/seed-session", post(dev::seed_session));
    }

    let protected = protected.route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public.merge(protected).layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}
