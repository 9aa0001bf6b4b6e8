use crate::{
    AppState,
    auth::{CallerContext, RoleSet, roles_satisfy},
    engine::{AccessDecision, PageCaller},
    error::{RegistryError, json_error},
    models::{AccessReport, Audience, CustomPage, Menu, NavigationConfig, PageView},
    navigation,
};
use axum::{
    Json,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// upstream_unavailable
///
/// Listing endpoints cannot fall back to a partial answer; a registry failure
/// is reported as a bad gateway without detail.
fn upstream_unavailable(operation: &'static str, error: RegistryError) -> Response {
    tracing::error!(operation, error = %error, "page registry unavailable");
    json_error(StatusCode::BAD_GATEWAY, "upstream_unavailable")
}

// --- Page Handlers ---

/// serve_page
///
/// [Page Route] Terminal handler behind the page gate. Returns the resolved page
/// descriptor for the rendering service. A request only gets here once the gate
/// has stored an allowing `AccessDecision` in the request extensions.
#[utoipa::path(
    get,
    path = "/{path}",
    params(("path" = String, Path, description = "Page path")),
    responses(
        (status = 200, description = "Page may be rendered", body = PageView),
        (status = 404, description = "Unknown or not accessible")
    )
)]
pub async fn serve_page(request: Request) -> Response {
    match request
        .extensions()
        .get::<AccessDecision>()
        .and_then(AccessDecision::page_view)
    {
        Some(view) => Json(view).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "not_found"),
    }
}

/// get_navigation
///
/// [Public Route] Menu for the caller's audience: members when a session is
/// present, guests otherwise.
#[utoipa::path(
    get,
    path = "/navigation",
    responses(
        (status = 200, description = "Menu", body = Menu),
        (status = 502, description = "Page registry unavailable")
    )
)]
pub async fn get_navigation(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Menu>, Response> {
    // Step 1: Only a verified session makes the caller a member.
    let (audience, roles) = match caller.session_roles() {
        Some(roles) => (Audience::Member, roles.clone()),
        None => (Audience::Guest, RoleSet::new()),
    };

    // Step 2: Both listings are required; no partial menus.
    let pages = state
        .registry
        .list_custom_pages(&roles)
        .await
        .map_err(|e| upstream_unavailable("list_custom_pages", e))?;
    let entries = state
        .registry
        .list_navigation_entries(&roles)
        .await
        .map_err(|e| upstream_unavailable("list_navigation_entries", e))?;

    // Step 3: Filter, nest and sort for the audience.
    let caller_roles = caller.session_roles();
    Ok(Json(navigation::build_menu(
        &pages,
        &entries,
        audience,
        caller_roles,
    )))
}

// --- Guarded API Handlers ---

/// get_admin_pages
///
/// [Admin API] Every custom page the registry holds, active or not.
#[utoipa::path(
    get,
    path = "/api/admin/pages",
    responses(
        (status = 200, description = "All custom pages", body = [CustomPage]),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Role or origin rejected")
    )
)]
pub async fn get_admin_pages(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomPage>>, Response> {
    let roles = caller.declared_roles.unwrap_or_default();
    state
        .registry
        .list_custom_pages(&roles)
        .await
        .map(Json)
        .map_err(|e| upstream_unavailable("list_custom_pages", e))
}

/// get_admin_navigation
///
/// [Admin API] Every navigation entry, including system items and inactive ones.
#[utoipa::path(
    get,
    path = "/api/admin/navigation",
    responses(
        (status = 200, description = "All navigation entries", body = [NavigationConfig]),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Role or origin rejected")
    )
)]
pub async fn get_admin_navigation(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<NavigationConfig>>, Response> {
    let roles = caller.declared_roles.unwrap_or_default();
    state
        .registry
        .list_navigation_entries(&roles)
        .await
        .map(Json)
        .map_err(|e| upstream_unavailable("list_navigation_entries", e))
}

/// get_visible_pages
///
/// [Member API] Active custom pages the declared roles can open.
#[utoipa::path(
    get,
    path = "/api/pages/visible",
    responses(
        (status = 200, description = "Reachable custom pages", body = [CustomPage]),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Role or origin rejected")
    )
)]
pub async fn get_visible_pages(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomPage>>, Response> {
    let roles = caller.declared_roles.unwrap_or_default();
    let pages = state
        .registry
        .list_custom_pages(&roles)
        .await
        .map_err(|e| upstream_unavailable("list_custom_pages", e))?;

    // The registry may return inactive or restricted pages; only reachable ones are listed.
    let visible = pages
        .into_iter()
        .filter(|page| page.is_active && roles_satisfy(Some(&roles), &page.required_role_set()))
        .collect();
    Ok(Json(visible))
}

/// check_page_access
///
/// [Admin API] Runs the page gate for `path` as a signed-in member holding the
/// declared roles and reports the verdict with its internal reason.
#[utoipa::path(
    get,
    path = "/api/access/{path}",
    params(("path" = String, Path, description = "Page path to evaluate")),
    responses(
        (status = 200, description = "Decision", body = AccessReport),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Role or origin rejected")
    )
)]
pub async fn check_page_access(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Json<AccessReport> {
    // Evaluated as a member: declared roles stand in for a session.
    let page_caller = PageCaller::member(caller.declared_roles.unwrap_or_default());
    let decision = state.engine.decide(&path, &page_caller).await;

    Json(AccessReport {
        page_key: decision.page_key,
        outcome: decision.outcome.as_str().to_string(),
        category: decision.category,
        reason: decision.reason.map(|r| r.audit_reason().to_string()),
    })
}
