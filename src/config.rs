use std::{collections::HashSet, env, time::Duration};

use crate::origin::OriginPolicy;

/// Page keys reachable without authentication or a registry lookup.
pub const DEFAULT_PUBLIC_PAGES: &[&str] = &[
    "",
    "hem",
    "omkonsortiet",
    "kontakt",
    "nyheter",
    "faq",
    "integritetspolicy",
    "accessdenied",
    "notfound",
    "error",
];

/// First path segments owned by other guards (assets, auth flow, admin, API, docs).
pub const DEFAULT_BYPASS_PREFIXES: &[&str] = &[
    "health",
    "_framework",
    "_content",
    "_blazor",
    "static",
    "css",
    "js",
    "lib",
    "images",
    "favicon",
    "account",
    "authentication",
    "login",
    "logout",
    "admin",
    "api",
    "swagger-ui",
    "api-docs",
];

/// Path segment used by real-time transport negotiation; always bypassed.
pub const NEGOTIATE_SEGMENT: &str = "negotiate";

const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const LOCAL_JWT_SECRET: &str = "konsortium-local-session-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// never re-read per request; handlers pull it out of `AppState` via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and secret strictness.
    pub env: Env,
    // Expected value of `X-API-Key`. Empty means misconfigured: every guarded call answers 500.
    pub api_key: String,
    // HMAC secret used to validate session JWTs.
    pub jwt_secret: String,
    // Origins allowed to declare themselves via the `Origin` header.
    pub trusted_origins: Vec<String>,
    pub public_pages: Vec<String>,
    pub bypass_prefixes: Vec<String>,
    // Base URL of the content service that owns pages and navigation entries.
    pub content_api_url: Option<String>,
    // JSON seed for the in-memory registry when no content service is configured.
    pub page_registry_file: Option<String>,
    // Upper bound for every single registry lookup.
    pub registry_timeout: Duration,
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: pretty logs and relaxed secrets locally,
/// JSON logs and mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_key: "local-portal-api-key".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            trusted_origins: vec!["http://localhost:3000".to_string()],
            public_pages: to_owned_list(DEFAULT_PUBLIC_PAGES),
            bypass_prefixes: to_owned_list(DEFAULT_BYPASS_PREFIXES),
            content_api_url: None,
            page_registry_file: None,
            registry_timeout: Duration::from_millis(DEFAULT_REGISTRY_TIMEOUT_MS),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `SESSION_JWT_SECRET` is missing. A missing
    /// `PORTAL_API_KEY` does not panic: the guard reports it per request as a
    /// server misconfiguration instead.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("SESSION_JWT_SECRET")
                .expect("FATAL: SESSION_JWT_SECRET must be set in production."),
            Env::Local => {
                env::var("SESSION_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string())
            }
        };

        let registry_timeout = env::var("REGISTRY_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_REGISTRY_TIMEOUT_MS));

        Self {
            env,
            api_key: env::var("PORTAL_API_KEY").unwrap_or_default(),
            jwt_secret,
            trusted_origins: list_var("TRUSTED_ORIGINS").unwrap_or_default(),
            public_pages: list_var("PUBLIC_PAGES")
                .unwrap_or_else(|| to_owned_list(DEFAULT_PUBLIC_PAGES)),
            bypass_prefixes: list_var("BYPASS_PREFIXES")
                .unwrap_or_else(|| to_owned_list(DEFAULT_BYPASS_PREFIXES)),
            content_api_url: non_empty_var("CONTENT_API_URL"),
            page_registry_file: non_empty_var("PAGE_REGISTRY_FILE"),
            registry_timeout,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        }
    }

    /// The immutable subset handed to the access engine and the endpoint guard.
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy {
            api_key: self.api_key.clone(),
            origins: OriginPolicy::new(self.trusted_origins.iter().cloned()),
            public_pages: self
                .public_pages
                .iter()
                .map(|page| normalize_path_key(page))
                .collect(),
            bypass_prefixes: self
                .bypass_prefixes
                .iter()
                .map(|prefix| normalize_path_key(prefix))
                .filter(|prefix| !prefix.is_empty())
                .collect(),
            lookup_timeout: self.registry_timeout,
        }
    }
}

/// AccessPolicy
///
/// Read-only authorization configuration, constructed once and shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AccessPolicy {
    pub api_key: String,
    pub origins: OriginPolicy,
    pub public_pages: HashSet<String>,
    pub bypass_prefixes: Vec<String>,
    pub lookup_timeout: Duration,
}

impl AccessPolicy {
    pub fn is_public_page(&self, key: &str) -> bool {
        self.public_pages.contains(key)
    }

    /// is_bypassed
    ///
    /// True for keys owned by other guards: a bypassed first segment, anything
    /// containing a dot (static files), or a `negotiate` segment anywhere.
    pub fn is_bypassed(&self, key: &str) -> bool {
        if key.contains('.') {
            return true;
        }
        if key.split('/').any(|segment| segment == NEGOTIATE_SEGMENT) {
            return true;
        }
        let first = key.split('/').next().unwrap_or_default();
        self.bypass_prefixes.iter().any(|prefix| prefix == first)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AppConfig::default().policy()
    }
}

/// normalize_path_key
///
/// Turns a request path into a registry key. The path is percent-decoded once,
/// empty and `.` segments are dropped, `..` removes the previous segment, and
/// the result is lowercased, so every spelling of a page's path yields one key.
pub fn normalize_path_key(path: &str) -> String {
    let bytes = urlencoding::decode_binary(path.trim().as_bytes());
    let decoded = String::from_utf8_lossy(&bytes);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    segments.join("/").to_lowercase()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Comma-separated list variable. Unset or blank yields `None` so defaults apply.
fn list_var(name: &str) -> Option<Vec<String>> {
    let raw = non_empty_var(name)?;
    Some(
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    )
}
