mod common;

use axum::http::StatusCode;
use common::{app, body_json, empty, get, portal_registry, session_token};
use tower::ServiceExt;

fn with_session(uri: &str, roles: &[&str]) -> axum::http::request::Builder {
    get(uri).header("authorization", format!("Bearer {}", session_token(roles)))
}

// --- Public and Bypassed ---

#[tokio::test]
async fn test_health_check() {
    let response = app(portal_registry())
        .oneshot(empty(get("/health")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_public_page_served_to_anonymous_caller() {
    let response = app(portal_registry())
        .oneshot(empty(get("/omkonsortiet")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pageKey"], "omkonsortiet");
    assert_eq!(body["category"], "public");
    assert_eq!(body["passthrough"], false);
}

#[tokio::test]
async fn test_root_is_public() {
    let response = app(portal_registry())
        .oneshot(empty(get("/")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["pageKey"], "");
}

#[tokio::test]
async fn test_static_asset_is_passed_through() {
    let response = app(portal_registry())
        .oneshot(empty(get("/css/site.css")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["category"], "bypassed");
    assert_eq!(body["passthrough"], true);
}

// --- Denials Look Alike ---

#[tokio::test]
async fn test_inactive_and_unknown_pages_are_indistinguishable() {
    let router = app(portal_registry());

    let inactive = router
        .clone()
        .oneshot(empty(get("/gammal-sida")))
        .await
        .unwrap();
    let unknown = router
        .clone()
        .oneshot(empty(get("/finns-inte")))
        .await
        .unwrap();
    let protected = router
        .oneshot(empty(get("/styrelsen-protokoll")))
        .await
        .unwrap();

    assert_eq!(inactive.status(), StatusCode::NOT_FOUND);
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(protected.status(), StatusCode::NOT_FOUND);

    let inactive = body_json(inactive).await;
    assert_eq!(inactive, body_json(unknown).await);
    assert_eq!(inactive, body_json(protected).await);
    assert_eq!(inactive["error"], "not_found");
}

// --- Session Callers ---

#[tokio::test]
async fn test_board_page_denied_to_plain_member() {
    let response = app(portal_registry())
        .oneshot(empty(with_session("/styrelsen-protokoll", &["Medlem"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_board_page_served_to_board_member() {
    let response = app(portal_registry())
        .oneshot(empty(with_session("/styrelsen-protokoll", &["Styrelse"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["category"], "custom");
    assert_eq!(body["title"], "Display styrelsen-protokoll");
}

#[tokio::test]
async fn test_unknown_page_passes_through_for_session() {
    let response = app(portal_registry())
        .oneshot(empty(with_session("/min-profil", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["category"], "unknown");
    assert_eq!(body["passthrough"], true);
}

#[tokio::test]
async fn test_invalid_session_token_is_anonymous() {
    let response = app(portal_registry())
        .oneshot(empty(
            get("/min-profil").header("authorization", "Bearer not-a-jwt"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_declared_roles_header_does_not_unlock_pages() {
    // Page routing trusts only the session, never X-User-Roles.
    let response = app(portal_registry())
        .oneshot(empty(
            get("/styrelsen-protokoll").header("x-user-roles", "Styrelse"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_path_spellings_cannot_skip_role_check() {
    let router = app(portal_registry());

    for path in [
        "/styrelsen-protokoll/",
        "/styrelsen%2Dprotokoll",
        "/Styrelsen%2dProtokoll/",
        "/evenemang/../styrelsen-protokoll",
        "/./styrelsen-protokoll",
        "/styrelsen-protokoll%20",
    ] {
        let response = router
            .clone()
            .oneshot(empty(with_session(path, &["Medlem"])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_padded_path_resolves_to_the_same_page() {
    let response = app(portal_registry())
        .oneshot(empty(with_session("/styrelsen-protokoll/", &["Styrelse"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pageKey"], "styrelsen-protokoll");
    assert_eq!(body["category"], "custom");
    assert_eq!(body["passthrough"], false);
}

// --- Navigation Menu ---

#[tokio::test]
async fn test_guest_navigation_hides_restricted_pages() {
    let response = app(portal_registry())
        .oneshot(empty(get("/navigation")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let keys: Vec<&str> = body["main"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["pageKey"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["dokument", "evenemang"]);
    assert!(body["footer"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_member_navigation_includes_role_pages() {
    let response = app(portal_registry())
        .oneshot(empty(with_session("/navigation", &["styrelse"])))
        .await
        .unwrap();

    let body = body_json(response).await;
    let keys: Vec<&str> = body["main"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["pageKey"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["dokument", "evenemang", "styrelsen-protokoll"]);
    assert_eq!(body["main"][2]["href"], "/styrelsen-protokoll");
}

// --- Correlation ---

#[tokio::test]
async fn test_request_id_is_propagated() {
    let response = app(portal_registry())
        .oneshot(empty(get("/omkonsortiet").header("x-request-id", "req-42")))
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-42"
    );
}
