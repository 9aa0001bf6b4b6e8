use std::{collections::BTreeSet, convert::Infallible, fmt, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{config::AppConfig, error::AccessError};

/// Header carrying the machine-to-machine shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the caller-declared, comma-separated role list.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

// --- Shared Secret ---

/// SecretCheck
///
/// Outcome of comparing a caller-declared shared secret with the configured one.
/// `Missing` and `Invalid` are kept apart for audit, but both deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretCheck {
    Valid,
    Missing,
    Invalid,
    /// The server has no expected value. Always a server-side error, never an allow.
    NotConfigured,
}

impl SecretCheck {
    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            SecretCheck::Valid => Ok(()),
            SecretCheck::Missing => Err(AccessError::CredentialMissing),
            SecretCheck::Invalid => Err(AccessError::CredentialInvalid),
            SecretCheck::NotConfigured => Err(AccessError::Configuration),
        }
    }
}

/// verify_api_key
///
/// Validates the declared secret against the expected one.
///
/// The configuration check runs first so a misconfigured server reports itself
/// as such regardless of what the caller sent.
pub fn verify_api_key(provided: Option<&str>, expected: &str) -> SecretCheck {
    if expected.trim().is_empty() {
        return SecretCheck::NotConfigured;
    }

    let Some(provided) = provided.filter(|value| !value.trim().is_empty()) else {
        return SecretCheck::Missing;
    };

    if secrets_match(provided.as_bytes(), expected.as_bytes()) {
        SecretCheck::Valid
    } else {
        SecretCheck::Invalid
    }
}

/// secrets_match
///
/// Fixed-time equality. Both inputs are first reduced to SHA-256 digests so the
/// constant-time comparison always runs over 32 bytes, independent of the input
/// lengths and of where the first differing byte sits.
pub fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    let provided = Sha256::digest(provided);
    let expected = Sha256::digest(expected);
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

// --- Roles ---

/// RoleSet
///
/// A parsed, normalized set of role names. Membership is case-insensitive:
/// every name is trimmed and lowercased once, at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    roles: BTreeSet<String>,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated declaration such as `"Admin, Medlem"`.
    /// Blank entries are dropped.
    pub fn parse(declared: &str) -> Self {
        declared.split(',').collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(&role.trim().to_lowercase())
    }

    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.roles.intersection(&other.roles).next().is_some()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let roles = iter
            .into_iter()
            .map(|role| role.as_ref().trim().to_lowercase())
            .filter(|role| !role.is_empty())
            .collect();
        Self { roles }
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.roles.iter().cloned().collect::<Vec<_>>().join(",");
        f.write_str(&joined)
    }
}

/// roles_satisfy
///
/// Any-of role matching. An empty required set is public and always matches;
/// otherwise the caller must have declared roles and share at least one with
/// the required set.
pub fn roles_satisfy(declared: Option<&RoleSet>, required: &RoleSet) -> bool {
    if required.is_empty() {
        return true;
    }
    match declared {
        Some(declared) => declared.intersects(required),
        None => false,
    }
}

// --- Session Identity ---

/// Claims
///
/// Payload of the session JWT issued by the portal's login flow.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the member's identity.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    /// Role claims attached to the session. Absent means an authenticated member without roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// SessionUser
///
/// The authenticated human behind a request, resolved from the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub roles: RoleSet,
}

/// decode_session
///
/// Resolves the session from a `Bearer` token. Any failure yields an anonymous
/// caller rather than a rejection: page routing decides what anonymity means.
pub fn decode_session(headers: &HeaderMap, jwt_secret: &str) -> Option<SessionUser> {
    if jwt_secret.is_empty() {
        return None;
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .strip_prefix("Bearer ")?
        .trim();

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(SessionUser {
            id: data.claims.sub,
            roles: data.claims.roles.iter().collect(),
        }),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                _ => tracing::debug!(error = %e, "session token rejected"),
            }
            None
        }
    }
}

// --- Request Extraction ---

/// CallerContext
///
/// Every trust signal a request carries, gathered once per request.
/// Extraction never fails: absent signals are recorded as `None` and it is up
/// to the engine or the guard to decide what that absence means.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub api_key: Option<String>,
    /// `X-User-Roles`; `None` when the header is absent or blank.
    pub declared_roles: Option<RoleSet>,
    pub origin: Option<String>,
    pub session: Option<SessionUser>,
    pub remote_addr: Option<SocketAddr>,
}

impl CallerContext {
    pub fn from_parts(parts: &Parts, config: &AppConfig) -> Self {
        let headers = &parts.headers;

        let api_key = header_str(headers, API_KEY_HEADER).map(str::to_string);
        let declared_roles = header_str(headers, USER_ROLES_HEADER)
            .map(RoleSet::parse)
            .filter(|roles| !roles.is_empty());
        let origin = header_str(headers, header::ORIGIN.as_str())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            api_key,
            declared_roles,
            origin,
            session: decode_session(headers, &config.jwt_secret),
            remote_addr,
        }
    }

    pub fn session_roles(&self) -> Option<&RoleSet> {
        self.session.as_ref().map(|session| &session.roles)
    }

    /// Remote address formatted for audit lines.
    pub fn remote(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(CallerContext::from_parts(parts, &config))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
