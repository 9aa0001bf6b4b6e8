use crate::{AppState, handlers, page_gate};
use axum::{Router, middleware, routing::get};

/// Pages Router Module
///
/// Catch-all for portal pages. More specific routes (health, navigation, API,
/// docs) are matched first; everything else is a page request.
///
/// The gate runs as a route layer so denied requests never reach the handler and
/// always answer the same generic 404, whatever the internal reason.
pub fn page_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::serve_page))
        .route("/{*path}", get(handlers::serve_page))
        .route_layer(middleware::from_fn_with_state(state, page_gate))
}
