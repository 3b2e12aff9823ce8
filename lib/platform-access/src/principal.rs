//! The authenticated identity carried through a request.

use serde::{Deserialize, Serialize};
use vantage_core::OrganizationId;

/// An authenticated identity.
///
/// Principals are never persisted. They live inside signed tokens (session
/// cookies, OAuth state) and in request extensions once validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identifier assigned by the issuer (e.g. an email address or user path).
    pub subject: String,
    /// Name of the provider that authenticated the subject.
    pub issuer: String,
    /// Organization the principal is currently acting in. Empty means the default.
    pub organization: OrganizationId,
    /// Comma-separated provider groups.
    pub group: String,
}

impl Principal {
    /// Creates a principal with only a subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the organization.
    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<OrganizationId>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Sets the comma-separated group list.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Iterates the non-empty entries of the group list.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.group.split(',').filter(|g| !g.is_empty())
    }

    /// Returns true if `group` is one of the principal's groups.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        !group.is_empty() && self.groups().any(|g| g == group)
    }

    /// A principal is usable for user lookup only with both subject and issuer.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.subject.is_empty() && !self.issuer.is_empty()
    }
}
