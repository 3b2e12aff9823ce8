//! Mappings from provider claims to organization role grants.
//!
//! A mapping says "principals from this provider, authenticated with this
//! scheme, in this provider group, get the default role of this
//! organization". Any of provider, scheme and group may be the wildcard.

use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use vantage_core::{MappingId, OrganizationId};

use crate::error::{AuthorizationError, StoreError};
use crate::principal::Principal;
use crate::role::Role;
use crate::store::DataStore;
use crate::user::OAUTH2_SCHEME;

/// Matches any provider, scheme or provider group.
pub const MAPPING_WILDCARD: &str = "*";

/// Provider name whose groups can grant superadmin.
pub const AUTH0_PROVIDER: &str = "auth0";

/// A stored mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: MappingId,
    #[serde(rename = "organizationId")]
    pub organization: OrganizationId,
    pub provider: String,
    pub scheme: String,
    #[serde(rename = "providerOrganization")]
    pub provider_organization: String,
}

impl Mapping {
    /// A mapping that matches every principal.
    #[must_use]
    pub fn wildcard(id: impl Into<MappingId>, organization: impl Into<OrganizationId>) -> Self {
        Self {
            id: id.into(),
            organization: organization.into(),
            provider: MAPPING_WILDCARD.to_string(),
            scheme: MAPPING_WILDCARD.to_string(),
            provider_organization: MAPPING_WILDCARD.to_string(),
        }
    }

    /// Returns true if this mapping applies to `principal`.
    #[must_use]
    pub fn applies_to(&self, principal: &Principal) -> bool {
        apply_mapping(self, principal)
    }
}

/// Returns true if `mapping` applies to `principal`.
#[must_use]
pub fn apply_mapping(mapping: &Mapping, principal: &Principal) -> bool {
    if mapping.provider != MAPPING_WILDCARD && mapping.provider != principal.issuer {
        return false;
    }
    if mapping.scheme != MAPPING_WILDCARD && mapping.scheme != OAUTH2_SCHEME {
        return false;
    }
    mapping.provider_organization == MAPPING_WILDCARD
        || principal.in_group(&mapping.provider_organization)
}

/// Body of a create or update mapping request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRequest {
    #[serde(default, rename = "organizationId")]
    pub organization: OrganizationId,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default, rename = "providerOrganization")]
    pub provider_organization: String,
}

impl MappingRequest {
    /// Checks that the request names a provider, scheme and group.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::Validation`] naming the first missing field.
    pub fn validate(&self) -> Result<(), Report<AuthorizationError>> {
        let missing = if self.provider.is_empty() {
            Some("provider")
        } else if self.scheme.is_empty() {
            Some("scheme")
        } else if self.provider_organization.is_empty() {
            Some("group")
        } else {
            None
        };

        match missing {
            Some(field) => Err(AuthorizationError::Validation {
                reason: format!("mapping must specify {field}"),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Turns a validated request into a mapping with the given ID.
    #[must_use]
    pub fn into_mapping(self, id: impl Into<MappingId>) -> Mapping {
        Mapping {
            id: id.into(),
            organization: self.organization,
            provider: self.provider,
            scheme: self.scheme,
            provider_organization: self.provider_organization,
        }
    }
}

/// Resolves principals into role grants using the stored mappings.
#[derive(Clone)]
pub struct MappingResolver {
    store: Arc<dyn DataStore>,
    super_admin_group: String,
}

impl MappingResolver {
    /// Creates a resolver. An empty `super_admin_group` never grants superadmin.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, super_admin_group: impl Into<String>) -> Self {
        Self {
            store,
            super_admin_group: super_admin_group.into(),
        }
    }

    /// Grants the default role of every organization a matching mapping names.
    ///
    /// Mappings are applied in store order and the first match per
    /// organization wins. Mappings naming an organization that cannot be
    /// loaded are skipped.
    ///
    /// # Errors
    ///
    /// Fails only if the mappings themselves cannot be listed.
    pub async fn map_principal_to_roles(
        &self,
        principal: &Principal,
    ) -> Result<Vec<Role>, Report<StoreError>> {
        let mappings = self.store.mappings().all().await?;
        let mut roles: Vec<Role> = Vec::new();

        for mapping in mappings.iter().filter(|m| m.applies_to(principal)) {
            let organization = match self.store.organizations().get(&mapping.organization).await {
                Ok(organization) => organization,
                Err(e) => {
                    debug!(mapping = %mapping.id, error = %e, "skipping mapping to unknown organization");
                    continue;
                }
            };
            if roles.iter().any(|role| role.organization == organization.id) {
                continue;
            }
            roles.push(Role::new(organization.id, organization.default_role));
        }

        Ok(roles)
    }

    /// Returns true if the principal's provider groups grant superadmin.
    #[must_use]
    pub fn map_principal_to_super_admin(&self, principal: &Principal) -> bool {
        principal.issuer == AUTH0_PROVIDER && principal.in_group(&self.super_admin_group)
    }
}
