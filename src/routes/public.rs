use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without any credential.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; never touches the page registry.
        .route("/health", get(|| async { "ok" }))
        // GET /navigation
        // Menu for the session's audience. Visibility is filtered here,
        // access itself is still decided by the page gate.
        .route("/navigation", get(handlers::get_navigation))
}
