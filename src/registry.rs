use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};

use crate::{
    auth::{API_KEY_HEADER, RoleSet, USER_ROLES_HEADER, roles_satisfy},
    error::{PageKeyError, RegistryError, SeedError},
    models::{CustomPage, NavigationConfig, validate_page_key},
};

/// Lookup
///
/// A successful round-trip to the page registry. Transport problems are not a
/// `Lookup`; they surface as `RegistryError` so they can never be mistaken for
/// a real answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// The registry itself refused the caller under its own authorization rules.
    Forbidden,
}

/// PageRegistry Trait
///
/// Contract with the content service that owns custom pages and navigation entries.
/// `roles` are the caller's roles, forwarded so the registry can apply its own
/// authorization (navigation entries are role-filtered there, not here).
#[async_trait]
pub trait PageRegistry: Send + Sync {
    async fn get_custom_page(
        &self,
        key: &str,
        roles: &RoleSet,
    ) -> Result<Lookup<CustomPage>, RegistryError>;

    async fn get_navigation_entry(
        &self,
        key: &str,
        roles: &RoleSet,
    ) -> Result<Lookup<NavigationConfig>, RegistryError>;

    async fn list_custom_pages(&self, roles: &RoleSet) -> Result<Vec<CustomPage>, RegistryError>;

    async fn list_navigation_entries(
        &self,
        roles: &RoleSet,
    ) -> Result<Vec<NavigationConfig>, RegistryError>;
}

/// RegistryState
///
/// Shared handle to whichever registry implementation the process was started with.
pub type RegistryState = Arc<dyn PageRegistry>;

// --- HTTP Implementation ---

/// HttpPageRegistry
///
/// Talks to the content service over HTTP. Every request carries the service's
/// shared secret and is bounded by the client timeout; nothing is retried.
#[derive(Clone)]
pub struct HttpPageRegistry {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpPageRegistry {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let base_url =
            Url::parse(base_url).map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RegistryError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: Url,
        roles: &RoleSet,
    ) -> Result<Lookup<T>, RegistryError> {
        let mut request = self.client.get(url).header(API_KEY_HEADER, &self.api_key);
        if !roles.is_empty() {
            request = request.header(USER_ROLES_HEADER, roles.to_string());
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<T>()
                    .await
                    .map_err(|e| RegistryError::Decode(e.to_string()))?;
                Ok(Lookup::Found(body))
            }
            StatusCode::NOT_FOUND => Ok(Lookup::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(Lookup::Forbidden),
            other => Err(RegistryError::UnexpectedStatus(other.as_u16())),
        }
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        url: Url,
        roles: &RoleSet,
    ) -> Result<Vec<T>, RegistryError> {
        match self.fetch::<Vec<T>>(url, roles).await? {
            Lookup::Found(items) => Ok(items),
            Lookup::NotFound => Ok(Vec::new()),
            Lookup::Forbidden => Err(RegistryError::UnexpectedStatus(
                StatusCode::FORBIDDEN.as_u16(),
            )),
        }
    }
}

#[async_trait]
impl PageRegistry for HttpPageRegistry {
    async fn get_custom_page(
        &self,
        key: &str,
        roles: &RoleSet,
    ) -> Result<Lookup<CustomPage>, RegistryError> {
        let url = self.endpoint(&["api", "custompages", key])?;
        self.fetch(url, roles).await
    }

    async fn get_navigation_entry(
        &self,
        key: &str,
        roles: &RoleSet,
    ) -> Result<Lookup<NavigationConfig>, RegistryError> {
        let url = self.endpoint(&["api", "navigationconfig", key])?;
        self.fetch(url, roles).await
    }

    async fn list_custom_pages(&self, roles: &RoleSet) -> Result<Vec<CustomPage>, RegistryError> {
        let url = self.endpoint(&["api", "custompages"])?;
        self.fetch_list(url, roles).await
    }

    async fn list_navigation_entries(
        &self,
        roles: &RoleSet,
    ) -> Result<Vec<NavigationConfig>, RegistryError> {
        let url = self.endpoint(&["api", "navigationconfig"])?;
        self.fetch_list(url, roles).await
    }
}

// --- In-Memory Implementation ---

/// RegistrySeed
///
/// On-disk shape of the local registry file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySeed {
    #[serde(default)]
    pub custom_pages: Vec<CustomPage>,
    #[serde(default)]
    pub navigation: Vec<NavigationConfig>,
}

/// InMemoryPageRegistry
///
/// Stand-in for the content service, used for local development and tests.
/// It is filled before being shared and is read-only afterwards.
///
/// Mirrors the content service's own rule for navigation entries: a lookup
/// by a caller lacking the entry's required roles answers `Forbidden`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPageRegistry {
    custom_pages: BTreeMap<String, CustomPage>,
    navigation: BTreeMap<String, NavigationConfig>,
}

impl InMemoryPageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: RegistrySeed) -> Result<Self, PageKeyError> {
        let mut registry = Self::new();
        for page in seed.custom_pages {
            registry.insert_custom_page(page)?;
        }
        for entry in seed.navigation {
            registry.insert_navigation_entry(entry)?;
        }
        Ok(registry)
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        let seed: RegistrySeed = serde_json::from_str(&raw)?;
        Ok(Self::from_seed(seed)?)
    }

    /// Registers a custom page. Keys must be valid slugs and unique.
    pub fn insert_custom_page(&mut self, page: CustomPage) -> Result<(), PageKeyError> {
        validate_page_key(&page.page_key)?;
        if self.custom_pages.contains_key(&page.page_key) {
            return Err(PageKeyError::Duplicate(page.page_key));
        }
        self.custom_pages.insert(page.page_key.clone(), page);
        Ok(())
    }

    pub fn insert_navigation_entry(&mut self, entry: NavigationConfig) -> Result<(), PageKeyError> {
        let key = entry.page_key.to_lowercase();
        if self.navigation.contains_key(&key) {
            return Err(PageKeyError::Duplicate(key));
        }
        self.navigation.insert(key, entry);
        Ok(())
    }

    pub fn with_custom_page(mut self, page: CustomPage) -> Result<Self, PageKeyError> {
        self.insert_custom_page(page)?;
        Ok(self)
    }

    pub fn with_navigation_entry(mut self, entry: NavigationConfig) -> Result<Self, PageKeyError> {
        self.insert_navigation_entry(entry)?;
        Ok(self)
    }
}

#[async_trait]
impl PageRegistry for InMemoryPageRegistry {
    async fn get_custom_page(
        &self,
        key: &str,
        _roles: &RoleSet,
    ) -> Result<Lookup<CustomPage>, RegistryError> {
        Ok(match self.custom_pages.get(key) {
            Some(page) => Lookup::Found(page.clone()),
            None => Lookup::NotFound,
        })
    }

    async fn get_navigation_entry(
        &self,
        key: &str,
        roles: &RoleSet,
    ) -> Result<Lookup<NavigationConfig>, RegistryError> {
        let Some(entry) = self.navigation.get(key) else {
            return Ok(Lookup::NotFound);
        };
        if !roles_satisfy(Some(roles), &entry.required_role_set()) {
            return Ok(Lookup::Forbidden);
        }
        Ok(Lookup::Found(entry.clone()))
    }

    async fn list_custom_pages(&self, _roles: &RoleSet) -> Result<Vec<CustomPage>, RegistryError> {
        Ok(self.custom_pages.values().cloned().collect())
    }

    async fn list_navigation_entries(
        &self,
        _roles: &RoleSet,
    ) -> Result<Vec<NavigationConfig>, RegistryError> {
        Ok(self.navigation.values().cloned().collect())
    }
}
