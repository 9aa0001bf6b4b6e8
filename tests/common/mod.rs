#![allow(dead_code)]

use std::{sync::Arc, time::SystemTime};

use axum::{
    body::Body,
    http::{Request, Response},
};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use konsortium_portal::{
    AppConfig, AppState, InMemoryPageRegistry, RegistryState,
    auth::Claims,
    create_router,
    models::{CustomPage, NavigationConfig, NavigationType},
};
use uuid::Uuid;

pub const TEST_API_KEY: &str = "test-portal-api-key";
pub const TRUSTED_ORIGIN: &str = "https://portal.example.se";
pub const TEST_USER_ID: Uuid = Uuid::from_u128(7);

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.api_key = TEST_API_KEY.to_string();
    config.trusted_origins = vec![TRUSTED_ORIGIN.to_string()];
    config
}

pub fn custom_page(key: &str, active: bool, roles: &[&str]) -> CustomPage {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    CustomPage {
        page_key: key.to_string(),
        title: format!("Title of {key}"),
        display_name: format!("Display {key}"),
        is_active: active,
        show_in_navigation: true,
        navigation_type: NavigationType::Main,
        parent_page_key: None,
        sort_order: 0,
        created_at: created,
        updated_at: created,
        created_by: "admin@example.se".to_string(),
        required_roles: roles.iter().map(|role| role.to_string()).collect(),
    }
}

pub fn nav_entry(key: &str, active: bool) -> NavigationConfig {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    NavigationConfig {
        page_key: key.to_string(),
        display_name: format!("Nav {key}"),
        item_type: "page".to_string(),
        sort_order: 0,
        guest_sort_order: None,
        member_sort_order: None,
        is_visible_to_guests: true,
        is_visible_to_members: true,
        is_active: active,
        is_system_item: false,
        required_roles: None,
        created_at: created,
        updated_at: created,
    }
}

/// Registry used by most scenarios: the board minutes page plus a few navigation entries.
pub fn portal_registry() -> InMemoryPageRegistry {
    InMemoryPageRegistry::new()
        .with_custom_page(custom_page("styrelsen-protokoll", true, &["Styrelse"]))
        .unwrap()
        .with_custom_page(custom_page("gammal-sida", false, &[]))
        .unwrap()
        .with_custom_page(custom_page("evenemang", true, &[]))
        .unwrap()
        .with_navigation_entry(nav_entry("dokument", true))
        .unwrap()
        .with_navigation_entry(nav_entry("arkiv", false))
        .unwrap()
}

pub fn app_state(registry: InMemoryPageRegistry) -> AppState {
    AppState::new(test_config(), Arc::new(registry) as RegistryState)
}

pub fn app(registry: InMemoryPageRegistry) -> axum::Router {
    create_router(app_state(registry))
}

/// Signed session token for the default test secret.
pub fn session_token(roles: &[&str]) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = Claims {
        sub: TEST_USER_ID,
        iat: now as usize,
        exp: (now + 3600) as usize,
        roles: roles.iter().map(|role| role.to_string()).collect(),
    };

    let key = EncodingKey::from_secret(test_config().jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn empty(builder: axum::http::request::Builder) -> Request<Body> {
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
