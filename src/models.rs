use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{auth::RoleSet, error::PageKeyError};

// --- Registry Schemas (owned by the content service) ---

/// NavigationType
///
/// Where a custom page is placed in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NavigationType {
    #[default]
    Main,
    Dropdown,
    Footer,
    Hidden,
}

/// CustomPage
///
/// An operator-defined page descriptor as returned by the content service.
/// `parent_page_key` forms a tree that is not enforced anywhere: it may dangle
/// or even loop, and consumers must tolerate both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomPage {
    pub page_key: String,
    pub title: String,
    pub display_name: String,
    pub is_active: bool,
    pub show_in_navigation: bool,
    #[serde(default)]
    pub navigation_type: NavigationType,
    #[serde(default)]
    pub parent_page_key: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    /// Any-of semantics; empty means public to anyone reaching the resolver.
    #[serde(default)]
    pub required_roles: Vec<String>,
}

impl CustomPage {
    pub fn required_role_set(&self) -> RoleSet {
        self.required_roles.iter().collect()
    }
}

/// NavigationConfig
///
/// Page-routing entry for the built-in (non-custom) pages. Visibility flags are
/// independent of `required_roles`: an entry may be listed for guests while
/// still being role-restricted by the content service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NavigationConfig {
    pub page_key: String,
    pub display_name: String,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub guest_sort_order: Option<i32>,
    #[serde(default)]
    pub member_sort_order: Option<i32>,
    pub is_visible_to_guests: bool,
    pub is_visible_to_members: bool,
    pub is_active: bool,
    #[serde(default)]
    pub is_system_item: bool,
    /// Comma-separated. Blank or absent means no restriction.
    #[serde(default)]
    pub required_roles: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl NavigationConfig {
    pub fn required_role_set(&self) -> RoleSet {
        self.required_roles
            .as_deref()
            .map(RoleSet::parse)
            .unwrap_or_default()
    }

    pub fn is_visible_to(&self, audience: Audience) -> bool {
        match audience {
            Audience::Guest => self.is_visible_to_guests,
            Audience::Member => self.is_visible_to_members,
        }
    }

    /// The audience-specific override, falling back to the shared sort order.
    pub fn sort_order_for(&self, audience: Audience) -> i32 {
        let specific = match audience {
            Audience::Guest => self.guest_sort_order,
            Audience::Member => self.member_sort_order,
        };
        specific.unwrap_or(self.sort_order)
    }
}

/// Audience
///
/// Who the menu is being built for: anonymous visitors or signed-in members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Audience {
    Guest,
    Member,
}

/// validate_page_key
///
/// Page keys are slugs: lowercase ASCII letters, digits and inner hyphens.
pub fn validate_page_key(key: &str) -> Result<(), PageKeyError> {
    if key.is_empty() {
        return Err(PageKeyError::Empty);
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(PageKeyError::InvalidCharacters(key.to_string()));
    }
    if key.starts_with('-') || key.ends_with('-') {
        return Err(PageKeyError::EdgeHyphen(key.to_string()));
    }
    Ok(())
}

// --- Output Schemas ---

/// PageCategory
///
/// Which tier of the resolution pipeline settled a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PageCategory {
    Bypassed,
    Public,
    Custom,
    Navigation,
    Unknown,
}

/// PageView
///
/// Handed to the rendering service once the page gate has allowed a request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageView {
    pub page_key: String,
    pub category: PageCategory,
    /// True when the gate did not arbitrate and rendering owns the outcome (e.g. its own 404).
    pub passthrough: bool,
    pub title: Option<String>,
}

/// MenuItem
///
/// One rendered menu entry; custom pages may nest children through their parent key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MenuItem {
    pub page_key: String,
    pub display_name: String,
    pub href: String,
    pub sort_order: i32,
    #[schema(no_recursion)]
    pub children: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Menu {
    pub main: Vec<MenuItem>,
    pub footer: Vec<MenuItem>,
}

/// AccessReport
///
/// Operator diagnostics: the engine's verdict for a path under a given role set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccessReport {
    pub page_key: String,
    pub outcome: String,
    pub category: PageCategory,
    pub reason: Option<String>,
}
