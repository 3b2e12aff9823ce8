//! Authentication and authorization for the vantage server.
//!
//! This module provides:
//! - The OAuth browser flow (`AuthMux`) and its CSRF/PKCE code exchanges
//! - Cookie-backed sessions carrying signed principals
//! - Middleware resolving principals into organization-scoped roles
//!
//! # Authorization Model
//!
//! A session cookie only proves who the caller is. Which organization they
//! act in and with which role is decided per request by
//! [`middleware::authorized_user`], from the stored user record. Users with
//! the superadmin flag act as admins in any organization, and requests signed
//! over the current superadmin challenge bypass sessions altogether.

pub mod context;
pub mod cookie;
pub mod exchange;
pub mod middleware;
pub mod provider;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{
    AuthContext, OrganizationContext, RoleContext, ServerContext, SuperAdminContext, UserContext,
};
pub use cookie::{Authenticator, CookieAuthenticator};
pub use exchange::{CodeExchange, CodeExchangeCsrf, CodeExchangePkce, new_code_exchange};
pub use middleware::{RoleGuard, authorized_token, authorized_user, raw_store_access};
pub use provider::{Provider, ProviderConfig, ProviderToken};
pub use routes::AuthMux;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Method, Uri};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use vantage_platform_access::{DataStore, MappingResolver, RequiredRole, SuperAdminChallenge};

/// Shared state of the authorization middleware and API handlers.
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<dyn Authenticator>,
    pub challenge: Arc<SuperAdminChallenge>,
    pub resolver: MappingResolver,
    /// When false every request acts as an admin of the default organization.
    pub use_auth: bool,
    /// How long a superadmin challenge stays current.
    pub nonce_expiration: Duration,
}

impl AuthState {
    /// Returns middleware state requiring `required` for [`authorized_user`].
    #[must_use]
    pub fn guard(&self, required: impl Into<RequiredRole>) -> RoleGuard {
        RoleGuard::new(self.clone(), required)
    }
}

/// Request attributes attached to every auth log line.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub remote_addr: String,
    pub method: Method,
    pub url: Uri,
}

impl<S> FromRequestParts<S> for RequestInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |info| info.0.to_string());
        Ok(Self {
            remote_addr,
            method: parts.method.clone(),
            url: parts.uri.clone(),
        })
    }
}
