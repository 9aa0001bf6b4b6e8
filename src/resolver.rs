use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    auth::RoleSet,
    error::RegistryError,
    models::{CustomPage, NavigationConfig, PageCategory},
    registry::{Lookup, RegistryState},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedPage {
    Custom(CustomPage),
    Navigation(NavigationConfig),
}

/// Resolution
///
/// What one tier of the chain knows about a key. `NotFound` is the only answer
/// that lets the engine move on to the next tier.
#[derive(Debug)]
pub enum Resolution {
    Found(ResolvedPage),
    NotFound,
    Forbidden,
    Error(RegistryError),
}

impl<T: Into<ResolvedPage>> From<Result<Lookup<T>, RegistryError>> for Resolution {
    fn from(result: Result<Lookup<T>, RegistryError>) -> Self {
        match result {
            Ok(Lookup::Found(page)) => Resolution::Found(page.into()),
            Ok(Lookup::NotFound) => Resolution::NotFound,
            Ok(Lookup::Forbidden) => Resolution::Forbidden,
            Err(e) => Resolution::Error(e),
        }
    }
}

impl From<CustomPage> for ResolvedPage {
    fn from(page: CustomPage) -> Self {
        ResolvedPage::Custom(page)
    }
}

impl From<NavigationConfig> for ResolvedPage {
    fn from(entry: NavigationConfig) -> Self {
        ResolvedPage::Navigation(entry)
    }
}

/// PageResolver
///
/// One tier of the page resolution chain. The engine walks resolvers in order
/// and stops at the first answer other than `NotFound`, so a new resource
/// category is a new implementation, not a new branch in the engine.
#[async_trait]
pub trait PageResolver: Send + Sync {
    fn category(&self) -> PageCategory;

    async fn resolve(&self, key: &str, roles: &RoleSet) -> Resolution;
}

pub struct CustomPageResolver {
    registry: RegistryState,
}

impl CustomPageResolver {
    pub fn new(registry: RegistryState) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl PageResolver for CustomPageResolver {
    fn category(&self) -> PageCategory {
        PageCategory::Custom
    }

    async fn resolve(&self, key: &str, roles: &RoleSet) -> Resolution {
        self.registry.get_custom_page(key, roles).await.into()
    }
}

pub struct NavigationResolver {
    registry: RegistryState,
}

impl NavigationResolver {
    pub fn new(registry: RegistryState) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl PageResolver for NavigationResolver {
    fn category(&self) -> PageCategory {
        PageCategory::Navigation
    }

    async fn resolve(&self, key: &str, roles: &RoleSet) -> Resolution {
        self.registry.get_navigation_entry(key, roles).await.into()
    }
}

/// Custom pages first, navigation entries second.
pub fn default_chain(registry: RegistryState) -> Vec<Arc<dyn PageResolver>> {
    vec![
        Arc::new(CustomPageResolver::new(registry.clone())),
        Arc::new(NavigationResolver::new(registry)),
    ]
}
