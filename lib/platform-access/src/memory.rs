//! In-memory [`DataStore`] for development and tests.

use async_trait::async_trait;
use rootcause::prelude::Report;
use tokio::sync::RwLock;
use uuid::Uuid;
use vantage_core::{MappingId, OrganizationId};

use crate::error::StoreError;
use crate::mapping::{Mapping, MappingRequest};
use crate::store::{DataStore, MappingsStore, OrganizationsStore, UsersStore};
use crate::user::{Organization, User, UserQuery};

/// A store holding everything in process memory.
///
/// Mappings keep insertion order, which is the order the resolver applies them.
#[derive(Debug)]
pub struct MemoryStore {
    default_organization: OrganizationId,
    organizations: RwLock<Vec<Organization>>,
    users: RwLock<Vec<User>>,
    mappings: RwLock<Vec<Mapping>>,
}

impl MemoryStore {
    /// Creates a store whose default organization is `default_organization`.
    #[must_use]
    pub fn new(default_organization: Organization) -> Self {
        Self {
            default_organization: default_organization.id.clone(),
            organizations: RwLock::new(vec![default_organization]),
            users: RwLock::new(Vec::new()),
            mappings: RwLock::new(Vec::new()),
        }
    }

    /// Adds an organization, replacing any with the same ID.
    #[must_use]
    pub fn with_organization(mut self, organization: Organization) -> Self {
        let organizations = self.organizations.get_mut();
        organizations.retain(|org| org.id != organization.id);
        organizations.push(organization);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.users.get_mut().push(user);
        self
    }

    #[must_use]
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.get_mut().push(mapping);
        self
    }
}

#[async_trait]
impl OrganizationsStore for MemoryStore {
    async fn find(&self, id: &OrganizationId) -> Result<Option<Organization>, Report<StoreError>> {
        Ok(self
            .organizations
            .read()
            .await
            .iter()
            .find(|org| &org.id == id)
            .cloned())
    }

    async fn default_organization(&self) -> Result<Organization, Report<StoreError>> {
        OrganizationsStore::get(self, &self.default_organization).await
    }
}

#[async_trait]
impl UsersStore for MemoryStore {
    async fn find(&self, query: &UserQuery) -> Result<Option<User>, Report<StoreError>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| query.matches(user))
            .cloned())
    }
}

#[async_trait]
impl MappingsStore for MemoryStore {
    async fn all(&self) -> Result<Vec<Mapping>, Report<StoreError>> {
        Ok(self.mappings.read().await.clone())
    }

    async fn add(&self, request: MappingRequest) -> Result<Mapping, Report<StoreError>> {
        let mapping = request.into_mapping(Uuid::new_v4().to_string());
        self.mappings.write().await.push(mapping.clone());
        Ok(mapping)
    }

    async fn update(&self, mapping: Mapping) -> Result<bool, Report<StoreError>> {
        let mut mappings = self.mappings.write().await;
        match mappings.iter_mut().find(|m| m.id == mapping.id) {
            Some(existing) => {
                *existing = mapping;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: &MappingId) -> Result<bool, Report<StoreError>> {
        let mut mappings = self.mappings.write().await;
        let before = mappings.len();
        mappings.retain(|m| &m.id != id);
        Ok(mappings.len() != before)
    }
}

impl DataStore for MemoryStore {
    fn organizations(&self) -> &dyn OrganizationsStore {
        self
    }

    fn users(&self) -> &dyn UsersStore {
        self
    }

    fn mappings(&self) -> &dyn MappingsStore {
        self
    }
}
