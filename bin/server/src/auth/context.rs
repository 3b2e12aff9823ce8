//! Typed request extensions set by the authorization middleware.
//!
//! Each concern has its own type, so downstream handlers read exactly the
//! value they need and nothing can collide with another crate's extension.

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;
use std::convert::Infallible;
use vantage_core::OrganizationId;
use vantage_platform_access::{Principal, RoleName, User};

/// Organization the request acts in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationContext(pub OrganizationId);

/// Role the request acts with inside its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleContext(pub RoleName);

/// Present when the request has unfiltered access to the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerContext;

/// Present when the request was made by a superadmin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperAdminContext;

/// The stored user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext(pub User);

/// Everything the middleware learned about a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Option<Principal>,
    pub organization: Option<OrganizationId>,
    pub role: Option<RoleName>,
    pub server: bool,
    pub super_admin: bool,
    pub user: Option<User>,
}

impl AuthContext {
    #[must_use]
    pub fn from_extensions(extensions: &Extensions) -> Self {
        Self {
            principal: extensions.get::<Principal>().cloned(),
            organization: extensions
                .get::<OrganizationContext>()
                .map(|org| org.0.clone()),
            role: extensions.get::<RoleContext>().map(|role| role.0),
            server: extensions.get::<ServerContext>().is_some(),
            super_admin: extensions.get::<SuperAdminContext>().is_some(),
            user: extensions.get::<UserContext>().map(|user| user.0.clone()),
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_extensions_give_empty_context() {
        assert_eq!(AuthContext::from_extensions(&Extensions::new()), AuthContext::default());
    }

    #[test]
    fn each_extension_is_read_back() {
        let mut extensions = Extensions::new();
        extensions.insert(Principal::new("billysteve").with_issuer("google"));
        extensions.insert(OrganizationContext(OrganizationId::new("1337")));
        extensions.insert(RoleContext(RoleName::Editor));
        extensions.insert(ServerContext);

        let context = AuthContext::from_extensions(&extensions);
        assert_eq!(context.principal.map(|p| p.subject), Some("billysteve".to_string()));
        assert_eq!(context.organization, Some(OrganizationId::new("1337")));
        assert_eq!(context.role, Some(RoleName::Editor));
        assert!(context.server);
        assert!(!context.super_admin);
        assert!(context.user.is_none());
    }
}
