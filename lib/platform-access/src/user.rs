//! Users, organizations and the queries used to find them.
//!
//! A user is identified by the triple (name, provider, scheme): the subject
//! and issuer of the principal that authenticated, plus the auth scheme.

use serde::{Deserialize, Serialize};
use vantage_core::{OrganizationId, UserId};

use crate::principal::Principal;
use crate::role::{Role, RoleName};

/// The only authentication scheme users are looked up under.
pub const OAUTH2_SCHEME: &str = "oauth2";

/// A dashboard user and the roles granted to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub provider: String,
    pub scheme: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, rename = "superAdmin")]
    pub super_admin: bool,
}

impl User {
    /// Creates an OAuth2 user with no roles.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: UserId::default(),
            name: name.into(),
            provider: provider.into(),
            scheme: OAUTH2_SCHEME.to_string(),
            roles: Vec::new(),
            super_admin: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<UserId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    #[must_use]
    pub fn with_super_admin(mut self, super_admin: bool) -> Self {
        self.super_admin = super_admin;
        self
    }

    /// Returns the roles this user holds in `organization`.
    ///
    /// A consistent record yields at most one.
    #[must_use]
    pub fn roles_in(&self, organization: &OrganizationId) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|role| &role.organization == organization)
            .collect()
    }

    /// Returns a copy of the user whose roles are narrowed to `organization`.
    #[must_use]
    pub fn scoped_to(&self, organization: &OrganizationId) -> Self {
        Self {
            roles: self.roles_in(organization).into_iter().cloned().collect(),
            ..self.clone()
        }
    }
}

/// An organization; every resource access is scoped by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(rename = "defaultRole")]
    pub default_role: RoleName,
    #[serde(default)]
    pub public: bool,
}

impl Organization {
    #[must_use]
    pub fn new(id: impl Into<OrganizationId>, name: impl Into<String>, default_role: RoleName) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_role,
            public: false,
        }
    }

    #[must_use]
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }
}

/// Lookup key for a user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub name: String,
    pub provider: String,
    pub scheme: String,
}

impl UserQuery {
    /// The OAuth2 user a principal authenticates as.
    #[must_use]
    pub fn for_principal(principal: &Principal) -> Self {
        Self {
            name: principal.subject.clone(),
            provider: principal.issuer.clone(),
            scheme: OAUTH2_SCHEME.to_string(),
        }
    }

    /// Returns true if `user` is the record this query names.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        user.name == self.name && user.provider == self.provider && user.scheme == self.scheme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_uses_oauth2_scheme() {
        let user = User::new("billysteve", "google");
        assert_eq!(user.scheme, OAUTH2_SCHEME);
        assert!(user.roles.is_empty());
        assert!(!user.super_admin);
    }

    #[test]
    fn roles_in_filters_by_organization() {
        let user = User::new("billysteve", "google")
            .with_role(Role::new("1337", RoleName::Admin))
            .with_role(Role::new("default", RoleName::Viewer));
        let roles = user.roles_in(&OrganizationId::new("1337"));
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, RoleName::Admin);
        assert!(user.roles_in(&OrganizationId::new("other")).is_empty());
    }

    #[test]
    fn scoped_user_keeps_identity() {
        let user = User::new("billysteve", "google")
            .with_id(7)
            .with_role(Role::new("1337", RoleName::Admin))
            .with_role(Role::new("default", RoleName::Viewer));
        let scoped = user.scoped_to(&OrganizationId::new("default"));
        assert_eq!(scoped.id, UserId::new(7));
        assert_eq!(scoped.roles, vec![Role::new("default", RoleName::Viewer)]);
    }

    #[test]
    fn query_for_principal_matches_user() {
        let principal = Principal::new("billysteve").with_issuer("google");
        let query = UserQuery::for_principal(&principal);
        assert!(query.matches(&User::new("billysteve", "google")));
        assert!(!query.matches(&User::new("billysteve", "github")));

        let mut other_scheme = User::new("billysteve", "google");
        other_scheme.scheme = "basic".to_string();
        assert!(!query.matches(&other_scheme));
    }

    #[test]
    fn organization_serializes_default_role() {
        let org = Organization::new("default", "Default", RoleName::Member);
        let json = serde_json::to_value(&org).expect("serialize");
        assert_eq!(json["defaultRole"], "member");
        assert_eq!(json["public"], false);
    }
}
