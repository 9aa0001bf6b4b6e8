use serde::Serialize;
use std::sync::Arc;

use crate::{
    auth::{CallerContext, RoleSet, roles_satisfy},
    config::{AccessPolicy, normalize_path_key},
    error::{AccessError, RegistryError},
    models::{PageCategory, PageView},
    registry::RegistryState,
    resolver::{PageResolver, Resolution, ResolvedPage, default_chain},
};

/// Outcome
///
/// The single allow/deny verdict for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    /// Not arbitrated here; a downstream component owns the response.
    AllowPassthrough,
    DenyUnauthenticated,
    DenyForbidden,
    DenyUnknown,
}

impl Outcome {
    pub fn is_allowed(self) -> bool {
        matches!(self, Outcome::Allow | Outcome::AllowPassthrough)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::AllowPassthrough => "allow_passthrough",
            Outcome::DenyUnauthenticated => "deny_unauthenticated",
            Outcome::DenyForbidden => "deny_forbidden",
            Outcome::DenyUnknown => "deny_unknown",
        }
    }
}

impl From<&AccessError> for Outcome {
    fn from(error: &AccessError) -> Self {
        match error {
            AccessError::CredentialMissing | AccessError::CredentialInvalid => {
                Outcome::DenyUnauthenticated
            }
            AccessError::OriginUntrusted(_)
            | AccessError::RoleMismatch
            | AccessError::ResourceForbidden => Outcome::DenyForbidden,
            AccessError::Configuration
            | AccessError::ResourceInactive
            | AccessError::ResourceNotFound
            | AccessError::UpstreamTransport(_) => Outcome::DenyUnknown,
        }
    }
}

/// AccessDecision
///
/// The engine's output. `reason` keeps the internal cause for audit; callers
/// only ever see `outcome` mapped to a generic response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub outcome: Outcome,
    pub page_key: String,
    pub category: PageCategory,
    pub reason: Option<AccessError>,
    /// Display name of the resolved page, when one was resolved.
    pub title: Option<String>,
}

impl AccessDecision {
    fn allow(page_key: String, category: PageCategory, title: Option<String>) -> Self {
        Self {
            outcome: Outcome::Allow,
            page_key,
            category,
            reason: None,
            title,
        }
    }

    fn passthrough(page_key: String, category: PageCategory) -> Self {
        Self {
            outcome: Outcome::AllowPassthrough,
            page_key,
            category,
            reason: None,
            title: None,
        }
    }

    fn deny(
        outcome: Outcome,
        page_key: String,
        category: PageCategory,
        reason: AccessError,
    ) -> Self {
        Self {
            outcome,
            page_key,
            category,
            reason: Some(reason),
            title: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome.is_allowed()
    }

    /// The view handed to rendering; `None` for denials.
    pub fn page_view(&self) -> Option<PageView> {
        self.is_allowed().then(|| PageView {
            page_key: self.page_key.clone(),
            category: self.category,
            passthrough: self.outcome == Outcome::AllowPassthrough,
            title: self.title.clone(),
        })
    }
}

/// PageCaller
///
/// The human side of a page request: whether a session exists and which role
/// claims it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCaller {
    pub authenticated: bool,
    pub roles: RoleSet,
}

impl PageCaller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn member(roles: RoleSet) -> Self {
        Self {
            authenticated: true,
            roles,
        }
    }
}

impl From<&CallerContext> for PageCaller {
    fn from(caller: &CallerContext) -> Self {
        match &caller.session {
            Some(session) => PageCaller::member(session.roles.clone()),
            None => PageCaller::anonymous(),
        }
    }
}

/// AccessEngine
///
/// Page-routing decision pipeline. Holds only immutable configuration and the
/// resolver chain, so one instance is shared by every request without locking.
///
/// Order of evaluation, first terminal state wins:
/// 1. bypassed keys pass through untouched;
/// 2. public pages are allowed;
/// 3. each resolver in the chain is asked in turn (custom pages, then navigation);
/// 4. an unknown key passes through for members and is denied for anonymous callers.
///
/// Any lookup failure or timeout ends the walk with `DenyUnknown`.
#[derive(Clone)]
pub struct AccessEngine {
    policy: Arc<AccessPolicy>,
    resolvers: Vec<Arc<dyn PageResolver>>,
}

impl AccessEngine {
    pub fn new(policy: Arc<AccessPolicy>, registry: RegistryState) -> Self {
        Self::with_resolvers(policy, default_chain(registry))
    }

    pub fn with_resolvers(policy: Arc<AccessPolicy>, resolvers: Vec<Arc<dyn PageResolver>>) -> Self {
        Self { policy, resolvers }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// decide
    ///
    /// Evaluates one request path and writes the audit line for the result.
    pub async fn decide(&self, path: &str, caller: &PageCaller) -> AccessDecision {
        let key = normalize_path_key(path);
        let decision = self.evaluate(key, caller).await;
        audit(&decision, caller);
        decision
    }

    async fn evaluate(&self, key: String, caller: &PageCaller) -> AccessDecision {
        if self.policy.is_bypassed(&key) {
            return AccessDecision::passthrough(key, PageCategory::Bypassed);
        }

        if self.policy.is_public_page(&key) {
            return AccessDecision::allow(key, PageCategory::Public, None);
        }

        for resolver in &self.resolvers {
            let category = resolver.category();
            match self.lookup(resolver.as_ref(), &key, &caller.roles).await {
                Resolution::NotFound => continue,
                Resolution::Found(page) => return judge(key, page, caller),
                Resolution::Forbidden => {
                    return AccessDecision::deny(
                        Outcome::DenyForbidden,
                        key,
                        category,
                        AccessError::ResourceForbidden,
                    );
                }
                Resolution::Error(e) => {
                    tracing::error!(
                        page_key = %key,
                        category = ?category,
                        error = %e,
                        "page registry lookup failed, denying"
                    );
                    return AccessDecision::deny(
                        Outcome::DenyUnknown,
                        key,
                        category,
                        AccessError::UpstreamTransport(e.to_string()),
                    );
                }
            }
        }

        if caller.authenticated {
            AccessDecision::passthrough(key, PageCategory::Unknown)
        } else {
            AccessDecision::deny(
                Outcome::DenyUnknown,
                key,
                PageCategory::Unknown,
                AccessError::ResourceNotFound,
            )
        }
    }

    /// Runs one resolver under the configured lookup timeout.
    async fn lookup(&self, resolver: &dyn PageResolver, key: &str, roles: &RoleSet) -> Resolution {
        let timeout = self.policy.lookup_timeout;
        match tokio::time::timeout(timeout, resolver.resolve(key, roles)).await {
            Ok(resolution) => resolution,
            Err(_) => Resolution::Error(RegistryError::Timeout(timeout.as_millis())),
        }
    }
}

/// Applies the per-category rules to a resolved page.
fn judge(key: String, page: ResolvedPage, caller: &PageCaller) -> AccessDecision {
    match page {
        ResolvedPage::Custom(page) => {
            // Inactive pages are reported exactly like missing ones.
            if !page.is_active {
                return AccessDecision::deny(
                    Outcome::DenyUnknown,
                    key,
                    PageCategory::Custom,
                    AccessError::ResourceInactive,
                );
            }

            let required = page.required_role_set();
            if required.is_empty() {
                return AccessDecision::allow(key, PageCategory::Custom, Some(page.display_name));
            }

            if !caller.authenticated {
                return AccessDecision::deny(
                    Outcome::DenyForbidden,
                    key,
                    PageCategory::Custom,
                    AccessError::CredentialMissing,
                );
            }

            if roles_satisfy(Some(&caller.roles), &required) {
                AccessDecision::allow(key, PageCategory::Custom, Some(page.display_name))
            } else {
                AccessDecision::deny(
                    Outcome::DenyForbidden,
                    key,
                    PageCategory::Custom,
                    AccessError::RoleMismatch,
                )
            }
        }
        // Role filtering for navigation entries happens in the registry at lookup time.
        ResolvedPage::Navigation(entry) => {
            if entry.is_active {
                AccessDecision::allow(key, PageCategory::Navigation, Some(entry.display_name))
            } else {
                AccessDecision::deny(
                    Outcome::DenyUnknown,
                    key,
                    PageCategory::Navigation,
                    AccessError::ResourceInactive,
                )
            }
        }
    }
}

fn audit(decision: &AccessDecision, caller: &PageCaller) {
    match &decision.reason {
        None => tracing::debug!(
            target: "audit",
            page_key = %decision.page_key,
            category = ?decision.category,
            outcome = ?decision.outcome,
            "page access allowed"
        ),
        Some(reason) => tracing::warn!(
            target: "audit",
            page_key = %decision.page_key,
            category = ?decision.category,
            outcome = ?decision.outcome,
            reason = reason.audit_reason(),
            authenticated = caller.authenticated,
            roles = %caller.roles,
            "page access denied"
        ),
    }
}
