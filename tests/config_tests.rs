use konsortium_portal::{
    AppConfig,
    config::{DEFAULT_BYPASS_PREFIXES, Env, normalize_path_key},
    origin::DEFAULT_TRUSTED_ORIGIN,
};
use serial_test::serial;
use std::{env, panic, time::Duration};

const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "PORTAL_API_KEY",
    "SESSION_JWT_SECRET",
    "TRUSTED_ORIGINS",
    "PUBLIC_PAGES",
    "BYPASS_PREFIXES",
    "CONTENT_API_URL",
    "PAGE_REGISTRY_FILE",
    "REGISTRY_TIMEOUT_MS",
    "BIND_ADDR",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` on a clean configuration environment and restores every
/// configuration variable afterwards, even if the test panics.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_production_requires_session_secret() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("PORTAL_API_KEY", "prod-key");
            }
            // SESSION_JWT_SECRET is missing
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic on a missing session secret"
    );
}

#[test]
#[serial]
fn test_missing_api_key_is_not_fatal() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("SESSION_JWT_SECRET", "prod-session-secret");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert!(config.api_key.is_empty());
}

#[test]
#[serial]
fn test_local_env_defaults() {
    let config = run_with_env(AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.jwt_secret, AppConfig::default().jwt_secret);
    assert_eq!(config.registry_timeout, Duration::from_millis(5_000));
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert!(config.content_api_url.is_none());
    assert_eq!(config.bypass_prefixes.len(), DEFAULT_BYPASS_PREFIXES.len());

    // No trusted origins configured: the policy falls back to the default.
    let policy = config.policy();
    assert_eq!(policy.origins.origins(), &[DEFAULT_TRUSTED_ORIGIN.to_string()]);
    assert!(policy.is_public_page("omkonsortiet"));
    assert!(policy.is_public_page(""));
}

#[test]
#[serial]
fn test_lists_and_overrides_are_parsed() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("PORTAL_API_KEY", "local-key");
            env::set_var(
                "TRUSTED_ORIGINS",
                "https://portal.example.se, ,https://admin.example.se",
            );
            env::set_var("PUBLIC_PAGES", "/Start,Kontakt");
            env::set_var("BYPASS_PREFIXES", "assets");
            env::set_var("CONTENT_API_URL", "  http://content:8080  ");
            env::set_var("REGISTRY_TIMEOUT_MS", "750");
        }
        AppConfig::load()
    });

    assert_eq!(config.api_key, "local-key");
    assert_eq!(
        config.trusted_origins,
        vec!["https://portal.example.se", "https://admin.example.se"]
    );
    assert_eq!(config.content_api_url.as_deref(), Some("http://content:8080"));
    assert_eq!(config.registry_timeout, Duration::from_millis(750));

    let policy = config.policy();
    assert!(policy.is_public_page("start"));
    assert!(policy.is_public_page("kontakt"));
    assert!(!policy.is_public_page("omkonsortiet"));
    assert!(policy.is_bypassed("assets/logo"));
    assert!(!policy.is_bypassed("api/news"));
    // Dotted and negotiate paths are always bypassed.
    assert!(policy.is_bypassed("logo.svg"));
    assert!(policy.is_bypassed("hubs/chat/negotiate"));
}

#[test]
#[serial]
fn test_unparseable_timeout_falls_back_to_default() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("REGISTRY_TIMEOUT_MS", "soon");
        }
        AppConfig::load()
    });

    assert_eq!(config.registry_timeout, Duration::from_millis(5_000));
}

#[test]
fn test_path_keys_are_canonical() {
    let cases = [
        ("/", ""),
        ("", ""),
        ("/omkonsortiet", "omkonsortiet"),
        ("/OmKonsortiet/", "omkonsortiet"),
        ("///nyheter//2024///", "nyheter/2024"),
        ("/styrelsen%2Dprotokoll", "styrelsen-protokoll"),
        ("/a%2Fb", "a/b"),
        ("/evenemang/./../kontakt", "kontakt"),
        ("/../../kontakt", "kontakt"),
        ("  /faq  ", "faq"),
        ("/favicon.ico", "favicon.ico"),
    ];
    for (path, expected) in cases {
        assert_eq!(normalize_path_key(path), expected, "{path}");
    }
}
