use crate::{
    AppState,
    error::json_error,
    guard::{ADMIN_ROLES, MEMBER_ROLES, role_guard},
    handlers,
};
use axum::{Router, http::StatusCode, middleware, routing::get};

/// API Router Module
///
/// Nested under `/api`. Each group declares its required roles in code and is
/// wrapped by `role_guard`: shared secret, declared roles, origin, then role match.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        // GET /api/admin/pages
        .route("/admin/pages", get(handlers::get_admin_pages))
        // GET /api/admin/navigation
        .route("/admin/navigation", get(handlers::get_admin_navigation))
        // GET /api/access/{*path}
        // Diagnostics: what would the page gate decide for these roles?
        .route("/access/{*path}", get(handlers::check_page_access))
        .route_layer(middleware::from_fn_with_state(
            state.guard_state(ADMIN_ROLES),
            role_guard,
        ));

    let members = Router::new()
        // GET /api/pages/visible
        .route("/pages/visible", get(handlers::get_visible_pages))
        .route_layer(middleware::from_fn_with_state(
            state.guard_state(MEMBER_ROLES),
            role_guard,
        ));

    Router::new()
        .merge(admin)
        .merge(members)
        .fallback(|| async { json_error(StatusCode::NOT_FOUND, "not_found") })
}
