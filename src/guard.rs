use axum::{
    extract::{FromRef, OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::{
    auth::{CallerContext, RoleSet, roles_satisfy, verify_api_key},
    config::{AccessPolicy, AppConfig},
    engine::Outcome,
    error::AccessError,
    origin::OriginTrust,
};

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_BOARD: &str = "Styrelse";
pub const ROLE_MEMBER: &str = "Medlem";

/// Roles allowed on operator endpoints.
pub const ADMIN_ROLES: &[&str] = &[ROLE_ADMIN];
/// Roles allowed on member-facing API endpoints.
pub const MEMBER_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_BOARD, ROLE_MEMBER];

/// EndpointGuard
///
/// Machine-to-machine gate for API endpoints whose required roles are fixed in code.
///
/// Checks run in this order and the first failure wins:
/// 1. shared secret (an unconfigured server reports 500 before anything else);
/// 2. a declared role list is present;
/// 3. the declared origin, if any, is trusted;
/// 4. at least one declared role matches the endpoint's roles.
#[derive(Clone, Debug)]
pub struct EndpointGuard {
    policy: Arc<AccessPolicy>,
    required: RoleSet,
}

impl EndpointGuard {
    pub fn new(policy: Arc<AccessPolicy>, required: &[&str]) -> Self {
        Self {
            policy,
            required: required.iter().collect(),
        }
    }

    pub fn required_roles(&self) -> &RoleSet {
        &self.required
    }

    pub fn check(&self, caller: &CallerContext) -> Result<(), AccessError> {
        verify_api_key(caller.api_key.as_deref(), &self.policy.api_key).into_result()?;

        let Some(declared) = caller.declared_roles.as_ref() else {
            return Err(AccessError::RoleMismatch);
        };

        if let (OriginTrust::Untrusted, Some(origin)) = (
            self.policy.origins.check(caller.origin.as_deref()),
            caller.origin.as_ref(),
        ) {
            return Err(AccessError::OriginUntrusted(origin.clone()));
        }

        if roles_satisfy(Some(declared), &self.required) {
            Ok(())
        } else {
            Err(AccessError::RoleMismatch)
        }
    }

    /// authorize
    ///
    /// `check` plus the audit trail. Every denial is logged with the path, the
    /// remote address and both role sets.
    pub fn authorize(&self, path: &str, caller: &CallerContext) -> Result<(), AccessError> {
        let result = self.check(caller);

        if let Err(e) = &result {
            let declared = caller
                .declared_roles
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();

            match e {
                AccessError::Configuration => tracing::error!(
                    target: "audit",
                    path,
                    remote = %caller.remote(),
                    reason = e.audit_reason(),
                    declared_roles = %declared,
                    required_roles = %self.required,
                    "shared secret is not configured; rejecting guarded request"
                ),
                AccessError::OriginUntrusted(origin) => tracing::warn!(
                    target: "audit",
                    path,
                    remote = %caller.remote(),
                    origin = %origin,
                    declared_roles = %declared,
                    required_roles = %self.required,
                    "suspicious request from untrusted origin"
                ),
                other => tracing::warn!(
                    target: "audit",
                    path,
                    remote = %caller.remote(),
                    outcome = Outcome::from(other).as_str(),
                    reason = other.audit_reason(),
                    declared_roles = %declared,
                    required_roles = %self.required,
                    "guarded request denied"
                ),
            }
        }

        result
    }
}

/// GuardState
///
/// Middleware state: the guard for one group of routes plus the configuration
/// the `CallerContext` extractor needs.
#[derive(Clone)]
pub struct GuardState {
    pub config: AppConfig,
    pub guard: EndpointGuard,
}

impl FromRef<GuardState> for AppConfig {
    fn from_ref(state: &GuardState) -> AppConfig {
        state.config.clone()
    }
}

/// role_guard
///
/// Axum middleware wrapping `EndpointGuard::authorize`. Denials never reach the handler.
pub async fn role_guard(
    State(state): State<GuardState>,
    caller: CallerContext,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    match state.guard.authorize(&path, &caller) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
