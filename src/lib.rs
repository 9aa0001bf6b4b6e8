use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core.
pub mod auth;
pub mod engine;
pub mod guard;
pub mod origin;
pub mod resolver;

// Collaborator plumbing and supporting services.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod registry;

pub mod routes;
use routes::{api, pages, public};

use auth::CallerContext;
use engine::PageCaller;
use error::json_error;
use guard::{EndpointGuard, GuardState};

// --- Public Re-exports ---

pub use config::{AccessPolicy, AppConfig};
pub use engine::{AccessDecision, AccessEngine, Outcome};
pub use registry::{HttpPageRegistry, InMemoryPageRegistry, PageRegistry, RegistryState};

/// ApiDoc
///
/// OpenAPI document for the portal gate, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::serve_page, handlers::get_navigation, handlers::get_admin_pages,
        handlers::get_admin_navigation, handlers::get_visible_pages, handlers::check_page_access
    ),
    components(
        schemas(
            models::CustomPage, models::NavigationConfig, models::NavigationType,
            models::PageView, models::PageCategory, models::Menu, models::MenuItem,
            models::AccessReport, models::Audience,
        )
    ),
    tags(
        (name = "konsortium-portal", description = "Portal page and API access gate")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: configuration, the
/// page registry handle and the access engine built on top of it.
#[derive(Clone)]
pub struct AppState {
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Policy Layer: Shared secret, trusted origins, public pages and bypass
    /// prefixes, derived once from `config`.
    pub policy: Arc<AccessPolicy>,
    /// Registry Layer: Abstracts page and navigation lookups (in-memory seed or
    /// the remote content service).
    pub registry: RegistryState,
    /// Decision Layer: The page access engine over `policy` and `registry`.
    pub engine: AccessEngine,
}

impl AppState {
    /// Builds the policy and engine from the configuration and a registry.
    pub fn new(config: AppConfig, registry: RegistryState) -> Self {
        let policy = Arc::new(config.policy());
        let engine = AccessEngine::new(policy.clone(), registry.clone());
        Self {
            config,
            policy,
            registry,
            engine,
        }
    }

    /// Middleware state for a group of endpoints requiring any of `roles`.
    pub fn guard_state(&self, roles: &[&str]) -> GuardState {
        GuardState {
            config: self.config.clone(),
            guard: EndpointGuard::new(self.policy.clone(), roles),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for RegistryState {
    fn from_ref(app_state: &AppState) -> RegistryState {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for AccessEngine {
    fn from_ref(app_state: &AppState) -> AccessEngine {
        app_state.engine.clone()
    }
}

/// page_gate
///
/// Middleware in front of every portal page. Asks the `AccessEngine` for a
/// decision using the session identity; allowed requests continue with the
/// decision attached, every denial becomes the same 404 so an anonymous caller
/// cannot tell a missing page from a protected one.
async fn page_gate(
    State(state): State<AppState>,
    caller: CallerContext,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let decision = state.engine.decide(&path, &PageCaller::from(&caller)).await;

    if !decision.is_allowed() {
        return json_error(StatusCode::NOT_FOUND, "not_found");
    }

    request.extensions_mut().insert(decision);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, scoped middleware and shared state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration: only the trusted origins may make browser calls.
    let allowed_origins: Vec<HeaderValue> = state
        .policy
        .origins
        .origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly: gates are scoped per route group, not global.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public: no gate.
        .merge(public::public_routes())
        // API: shared secret + static roles, per route group.
        .nest("/api", api::api_routes(&state))
        // Pages: everything else, behind the page gate.
        .merge(pages::page_routes(state.clone()))
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every request lacking one.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with its ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (Applied last, so preflights never reach the gates)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, correlated by the generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
