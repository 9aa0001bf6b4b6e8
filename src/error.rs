use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AccessError
///
/// The denial taxonomy shared by the page-routing engine and the endpoint guard.
/// Every variant carries its own audit meaning, but callers only ever see the
/// collapsed `status()` / `reason_code()` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The shared secret is not configured on this server.
    #[error("shared secret is not configured")]
    Configuration,
    #[error("credential missing")]
    CredentialMissing,
    #[error("credential invalid")]
    CredentialInvalid,
    #[error("origin '{0}' is not trusted")]
    OriginUntrusted(String),
    #[error("caller roles do not satisfy the required roles")]
    RoleMismatch,
    #[error("resource is inactive")]
    ResourceInactive,
    #[error("resource not found")]
    ResourceNotFound,
    /// The owning collaborator denied the lookup under its own authorization.
    #[error("resource lookup forbidden by upstream")]
    ResourceForbidden,
    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),
}

impl AccessError {
    /// status
    ///
    /// The HTTP-level signal returned to the caller. Only the guard-facing
    /// variants are distinguished; everything about a specific page collapses
    /// to 404 so existence cannot be probed.
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            AccessError::CredentialMissing | AccessError::CredentialInvalid => {
                StatusCode::UNAUTHORIZED
            }
            AccessError::OriginUntrusted(_) | AccessError::RoleMismatch => StatusCode::FORBIDDEN,
            AccessError::ResourceInactive
            | AccessError::ResourceNotFound
            | AccessError::ResourceForbidden
            | AccessError::UpstreamTransport(_) => StatusCode::NOT_FOUND,
        }
    }

    /// reason_code
    ///
    /// Minimal machine-readable code placed in the response body.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AccessError::Configuration => "server_misconfigured",
            AccessError::CredentialMissing => "api_key_missing",
            AccessError::CredentialInvalid => "api_key_invalid",
            AccessError::OriginUntrusted(_) | AccessError::RoleMismatch => "forbidden",
            AccessError::ResourceInactive
            | AccessError::ResourceNotFound
            | AccessError::ResourceForbidden
            | AccessError::UpstreamTransport(_) => "not_found",
        }
    }

    /// Internal audit label; never sent to the caller.
    pub fn audit_reason(&self) -> &'static str {
        match self {
            AccessError::Configuration => "configuration_error",
            AccessError::CredentialMissing => "credential_missing",
            AccessError::CredentialInvalid => "credential_invalid",
            AccessError::OriginUntrusted(_) => "origin_untrusted",
            AccessError::RoleMismatch => "role_mismatch",
            AccessError::ResourceInactive => "resource_inactive",
            AccessError::ResourceNotFound => "resource_not_found",
            AccessError::ResourceForbidden => "resource_forbidden",
            AccessError::UpstreamTransport(_) => "upstream_transport_error",
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.reason_code())
    }
}

/// json_error
///
/// Builds the `{"error": code}` body used for every denial.
pub fn json_error(status: StatusCode, code: &'static str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

/// RegistryError
///
/// Transport-level failures talking to the page registry collaborator.
/// The engine treats all of them as a fail-closed `DenyUnknown`.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("request to page registry failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("page registry lookup timed out after {0} ms")]
    Timeout(u128),
    #[error("page registry returned unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("could not decode page registry response: {0}")]
    Decode(String),
    #[error("invalid page registry url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageKeyError {
    #[error("page key must not be empty")]
    Empty,
    #[error("page key '{0}' may only contain lowercase letters, digits and hyphens")]
    InvalidCharacters(String),
    #[error("page key '{0}' must not start or end with a hyphen")]
    EdgeHyphen(String),
    #[error("page key '{0}' is already registered")]
    Duplicate(String),
}

/// Failures loading the in-memory registry seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("could not read registry seed: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry seed is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    PageKey(#[from] PageKeyError),
}
