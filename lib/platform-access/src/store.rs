//! Contracts for the persistence layer.
//!
//! The auth core reads organizations and users and manages mappings. The
//! storage engine behind these traits lives elsewhere.

use async_trait::async_trait;
use rootcause::prelude::Report;
use vantage_core::{MappingId, OrganizationId};

use crate::error::StoreError;
use crate::mapping::{Mapping, MappingRequest};
use crate::user::{Organization, User, UserQuery};

/// Organization lookups.
#[async_trait]
pub trait OrganizationsStore: Send + Sync {
    /// Retrieves the organization with ID `id`, if any.
    async fn find(&self, id: &OrganizationId) -> Result<Option<Organization>, Report<StoreError>>;

    /// Retrieves an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no organization has that ID.
    async fn get(&self, id: &OrganizationId) -> Result<Organization, Report<StoreError>> {
        self.find(id).await?.ok_or_else(|| {
            StoreError::NotFound {
                kind: "organization",
                key: id.to_string(),
            }
            .into()
        })
    }

    /// Retrieves the default organization, which always exists.
    async fn default_organization(&self) -> Result<Organization, Report<StoreError>>;
}

/// User lookups.
#[async_trait]
pub trait UsersStore: Send + Sync {
    /// Retrieves the user matching `query`, if any.
    async fn find(&self, query: &UserQuery) -> Result<Option<User>, Report<StoreError>>;

    /// Retrieves the user matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no user matches.
    async fn get(&self, query: &UserQuery) -> Result<User, Report<StoreError>> {
        self.find(query).await?.ok_or_else(|| {
            StoreError::NotFound {
                kind: "user",
                key: format!("{}/{}/{}", query.provider, query.scheme, query.name),
            }
            .into()
        })
    }
}

/// Mapping storage.
#[async_trait]
pub trait MappingsStore: Send + Sync {
    /// Returns every mapping in store order.
    async fn all(&self) -> Result<Vec<Mapping>, Report<StoreError>>;

    /// Stores a new mapping built from `request`, assigning it an ID.
    async fn add(&self, request: MappingRequest) -> Result<Mapping, Report<StoreError>>;

    /// Replaces the mapping with the same ID. Returns false if there is none.
    async fn update(&self, mapping: Mapping) -> Result<bool, Report<StoreError>>;

    /// Deletes the mapping with ID `id`. Returns false if there is none.
    async fn remove(&self, id: &MappingId) -> Result<bool, Report<StoreError>>;
}

/// Aggregate access to the stores the auth core reads.
pub trait DataStore: Send + Sync {
    fn organizations(&self) -> &dyn OrganizationsStore;
    fn users(&self) -> &dyn UsersStore;
    fn mappings(&self) -> &dyn MappingsStore;
}
