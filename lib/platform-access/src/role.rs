//! Organization-scoped roles and the privilege hierarchy.
//!
//! Roles are ordered `Member < Reader < Viewer < Editor < Admin`. Superadmin
//! is not part of the hierarchy: it is a flag on the user record and can only
//! be required, never held as a role row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vantage_core::OrganizationId;

use crate::error::AuthorizationError;
use crate::user::User;

/// Name of an organization role, in ascending order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Member,
    Reader,
    Viewer,
    Editor,
    Admin,
}

impl RoleName {
    /// Every role, lowest privilege first.
    pub const ALL: [Self; 5] = [
        Self::Member,
        Self::Reader,
        Self::Viewer,
        Self::Editor,
        Self::Admin,
    ];

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Reader => "reader",
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = AuthorizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AuthorizationError::Validation {
                reason: format!("unknown role '{s}'"),
            })
    }
}

/// A role held by a user within one organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub organization: OrganizationId,
    pub name: RoleName,
}

impl Role {
    #[must_use]
    pub fn new(organization: impl Into<OrganizationId>, name: RoleName) -> Self {
        Self {
            organization: organization.into(),
            name,
        }
    }
}

/// The privilege a route demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    /// Any role at or above this one in the hierarchy.
    Role(RoleName),
    /// Only the user-level superadmin flag satisfies this.
    SuperAdmin,
}

impl fmt::Display for RequiredRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(name) => name.fmt(f),
            Self::SuperAdmin => f.write_str("superadmin"),
        }
    }
}

impl FromStr for RequiredRole {
    type Err = AuthorizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "superadmin" {
            return Ok(Self::SuperAdmin);
        }
        s.parse().map(Self::Role)
    }
}

impl From<RoleName> for RequiredRole {
    fn from(name: RoleName) -> Self {
        Self::Role(name)
    }
}

/// Returns true if any role the user holds meets `required`.
///
/// Callers narrow `user.roles` to the organization being accessed first.
/// [`RequiredRole::SuperAdmin`] is never satisfied here, whatever the roles
/// or the superadmin flag say.
#[must_use]
pub fn has_authorized_role(user: &User, required: RequiredRole) -> bool {
    match required {
        RequiredRole::SuperAdmin => false,
        RequiredRole::Role(minimum) => user.roles.iter().any(|role| role.name >= minimum),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(role: RoleName) -> User {
        User::new("billysteve", "google").with_role(Role::new("1337", role))
    }

    #[test]
    fn hierarchy_is_ordered() {
        assert!(RoleName::Member < RoleName::Reader);
        assert!(RoleName::Reader < RoleName::Viewer);
        assert!(RoleName::Viewer < RoleName::Editor);
        assert!(RoleName::Editor < RoleName::Admin);
    }

    #[test]
    fn held_role_satisfies_itself_and_below() {
        for held in RoleName::ALL {
            let user = user_with(held);
            for required in RoleName::ALL {
                assert_eq!(
                    has_authorized_role(&user, required.into()),
                    held >= required,
                    "held {held}, required {required}"
                );
            }
        }
    }

    #[test]
    fn superadmin_is_never_satisfied_by_roles() {
        let mut user = user_with(RoleName::Admin);
        user.super_admin = true;
        assert!(!has_authorized_role(&user, RequiredRole::SuperAdmin));
    }

    #[test]
    fn user_without_roles_is_not_authorized() {
        let user = User::new("nobody", "github");
        assert!(!has_authorized_role(&user, RoleName::Member.into()));
    }

    #[test]
    fn required_role_parses_names() {
        assert_eq!(
            "viewer".parse::<RequiredRole>().expect("parse"),
            RequiredRole::Role(RoleName::Viewer)
        );
        assert_eq!(
            "superadmin".parse::<RequiredRole>().expect("parse"),
            RequiredRole::SuperAdmin
        );
        assert!("owner".parse::<RequiredRole>().is_err());
    }

    #[test]
    fn role_name_serializes_lowercase() {
        let json = serde_json::to_string(&Role::new("default", RoleName::Editor)).expect("serialize");
        assert_eq!(json, r#"{"organization":"default","name":"editor"}"#);
    }
}
