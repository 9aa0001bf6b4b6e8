mod common;

use common::{custom_page, nav_entry};
use konsortium_portal::{
    InMemoryPageRegistry, PageRegistry,
    auth::RoleSet,
    error::{PageKeyError, SeedError},
    models::validate_page_key,
    registry::Lookup,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_page_key_slug_rules() {
    assert_eq!(validate_page_key("styrelsen-protokoll-2024"), Ok(()));
    assert_eq!(validate_page_key(""), Err(PageKeyError::Empty));
    assert!(matches!(
        validate_page_key("Styrelsen"),
        Err(PageKeyError::InvalidCharacters(_))
    ));
    assert!(matches!(
        validate_page_key("om oss"),
        Err(PageKeyError::InvalidCharacters(_))
    ));
    assert!(matches!(
        validate_page_key("nyheter/2024"),
        Err(PageKeyError::InvalidCharacters(_))
    ));
    assert!(matches!(
        validate_page_key("-utkast"),
        Err(PageKeyError::EdgeHyphen(_))
    ));
}

#[test]
fn test_duplicate_and_invalid_keys_are_rejected() {
    let registry = InMemoryPageRegistry::new()
        .with_custom_page(custom_page("evenemang", true, &[]))
        .unwrap();

    assert_eq!(
        registry
            .clone()
            .with_custom_page(custom_page("evenemang", false, &[]))
            .err(),
        Some(PageKeyError::Duplicate("evenemang".to_string()))
    );
    assert!(matches!(
        registry.with_custom_page(custom_page("Evenemang_2", true, &[])),
        Err(PageKeyError::InvalidCharacters(_))
    ));

    let duplicate_nav = InMemoryPageRegistry::new()
        .with_navigation_entry(nav_entry("Dokument", true))
        .unwrap()
        .with_navigation_entry(nav_entry("dokument", true));
    assert!(matches!(duplicate_nav, Err(PageKeyError::Duplicate(_))));
}

#[tokio::test]
async fn test_navigation_lookup_applies_required_roles() {
    let mut entry = nav_entry("medlemsregister", true);
    entry.required_roles = Some(" ".to_string());
    let mut restricted = nav_entry("ekonomi", true);
    restricted.required_roles = Some("Styrelse".to_string());

    let registry = InMemoryPageRegistry::new()
        .with_navigation_entry(entry)
        .unwrap()
        .with_navigation_entry(restricted)
        .unwrap();

    // Blank requirement: no restriction.
    assert!(matches!(
        registry
            .get_navigation_entry("medlemsregister", &RoleSet::new())
            .await
            .unwrap(),
        Lookup::Found(_)
    ));
    assert_eq!(
        registry
            .get_navigation_entry("ekonomi", &RoleSet::parse("Medlem"))
            .await
            .unwrap(),
        Lookup::Forbidden
    );
    assert!(matches!(
        registry
            .get_navigation_entry("ekonomi", &RoleSet::parse("styrelse"))
            .await
            .unwrap(),
        Lookup::Found(_)
    ));
    assert_eq!(
        registry
            .get_navigation_entry("saknas", &RoleSet::new())
            .await
            .unwrap(),
        Lookup::NotFound
    );
}

#[tokio::test]
async fn test_seed_file_is_loaded() {
    let seed = json!({
        "customPages": [{
            "pageKey": "styrelsen-protokoll",
            "title": "Protokoll",
            "displayName": "Styrelsens protokoll",
            "isActive": true,
            "showInNavigation": true,
            "navigationType": "dropdown",
            "createdAt": "2024-03-01T12:00:00Z",
            "updatedAt": "2024-03-01T12:00:00Z",
            "requiredRoles": ["Styrelse"]
        }],
        "navigation": [{
            "pageKey": "dokument",
            "displayName": "Dokument",
            "isVisibleToGuests": true,
            "isVisibleToMembers": true,
            "isActive": true,
            "createdAt": "2024-03-01T12:00:00Z",
            "updatedAt": "2024-03-01T12:00:00Z"
        }]
    });
    let path = std::env::temp_dir().join(format!("portal-seed-{}.json", Uuid::new_v4()));
    std::fs::write(&path, seed.to_string()).unwrap();

    let registry = InMemoryPageRegistry::from_seed_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let pages = registry.list_custom_pages(&RoleSet::new()).await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].required_roles, vec!["Styrelse"]);
    assert!(pages[0].parent_page_key.is_none());

    let entries = registry
        .list_navigation_entries(&RoleSet::new())
        .await
        .unwrap();
    assert_eq!(entries[0].sort_order, 0);
    assert!(!entries[0].is_system_item);
}

#[test]
fn test_seed_file_errors() {
    let missing = std::env::temp_dir().join(format!("portal-seed-{}.json", Uuid::new_v4()));
    assert!(matches!(
        InMemoryPageRegistry::from_seed_file(&missing),
        Err(SeedError::Io(_))
    ));

    let garbled = std::env::temp_dir().join(format!("portal-seed-{}.json", Uuid::new_v4()));
    std::fs::write(&garbled, "{ not json").unwrap();
    let result = InMemoryPageRegistry::from_seed_file(&garbled);
    std::fs::remove_file(&garbled).unwrap();
    assert!(matches!(result, Err(SeedError::Json(_))));
}
