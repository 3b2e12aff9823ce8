//! Authorization middleware for Axum routes.
//!
//! [`authorized_token`] turns a session cookie into a [`Principal`] request
//! extension. [`authorized_user`] then resolves that principal into an
//! organization and role, refusing requests whose role is too low.
//! [`raw_store_access`] gates routes that bypass organization scoping.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{debug, error};
use vantage_platform_access::{
    AuthorizationError, Principal, RequiredRole, RoleName, SuperAdminChallenge, UserQuery,
    has_authorized_role,
};

use super::context::{
    OrganizationContext, RoleContext, ServerContext, SuperAdminContext, UserContext,
};
use super::{AuthState, RequestInfo};
use crate::error::ApiError;

/// Middleware state for [`authorized_user`].
#[derive(Clone)]
pub struct RoleGuard {
    state: AuthState,
    required: RequiredRole,
}

impl RoleGuard {
    #[must_use]
    pub fn new(state: AuthState, required: impl Into<RequiredRole>) -> Self {
        Self {
            state,
            required: required.into(),
        }
    }
}

fn has_valid_signature(challenge: &SuperAdminChallenge, headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| challenge.valid_signature(value))
}

/// Validates the session cookie and refreshes it.
///
/// The refreshed cookie is only sent when the handler did not set cookies of
/// its own. Requests signed over the current superadmin challenge pass straight
/// through. Everything else needs a valid session, and any failure answers
/// 403 without saying which check failed.
pub async fn authorized_token(
    State(state): State<AuthState>,
    jar: CookieJar,
    info: RequestInfo,
    mut request: Request,
    next: Next,
) -> Response {
    if has_valid_signature(&state.challenge, request.headers()) {
        return next.run(request).await;
    }
    if !state.use_auth {
        return next.run(request).await;
    }

    let principal = match state.auth.validate(&jar) {
        Ok(principal) => principal,
        Err(e) => {
            error!(
                component = "token_auth",
                remote_addr = %info.remote_addr,
                method = %info.method,
                url = %info.url,
                error = %e,
                "invalid principal"
            );
            return ApiError::forbidden().into_response();
        }
    };

    let jar = match state.auth.extend(jar, &principal) {
        Ok(jar) => jar,
        Err(e) => {
            error!(
                component = "token_auth",
                remote_addr = %info.remote_addr,
                method = %info.method,
                url = %info.url,
                error = %e,
                "unable to extend principal"
            );
            return ApiError::forbidden().into_response();
        }
    };

    request.extensions_mut().insert(principal);
    let response = next.run(request).await;
    // A handler that sets cookies has re-issued the session itself.
    if response.headers().contains_key(SET_COOKIE) {
        return response;
    }
    (jar, response).into_response()
}

/// Requires the caller to hold at least the guard's role in its organization.
pub async fn authorized_user(
    State(guard): State<RoleGuard>,
    info: RequestInfo,
    mut request: Request,
    next: Next,
) -> Response {
    let state = &guard.state;
    let store = state.store.as_ref();

    let default_org = match store.organizations().default_organization().await {
        Ok(org) => org,
        Err(e) => {
            error!(
                component = "role_auth",
                remote_addr = %info.remote_addr,
                method = %info.method,
                url = %info.url,
                error = %e,
                "failed to retrieve the default organization"
            );
            return ApiError::forbidden().into_response();
        }
    };

    if has_valid_signature(&state.challenge, request.headers()) || !state.use_auth {
        let extensions = request.extensions_mut();
        extensions.insert(OrganizationContext(default_org.id));
        extensions.insert(RoleContext(RoleName::Admin));
        extensions.insert(ServerContext);
        return next.run(request).await;
    }

    let Some(mut principal) = request
        .extensions()
        .get::<Principal>()
        .filter(|p| p.is_valid())
        .cloned()
    else {
        error!(
            component = "role_auth",
            remote_addr = %info.remote_addr,
            method = %info.method,
            url = %info.url,
            "failed to retrieve principal from request"
        );
        return ApiError::forbidden().into_response();
    };

    if principal.organization.is_empty() {
        principal.organization = default_org.id;
    }
    let organization = principal.organization.clone();

    if let Err(e) = store.organizations().get(&organization).await {
        error!(
            component = "role_auth",
            remote_addr = %info.remote_addr,
            method = %info.method,
            url = %info.url,
            organization = %organization,
            error = %e,
            "failed to retrieve organization from organizations store"
        );
        return ApiError::forbidden().into_response();
    }

    let user = match store.users().get(&UserQuery::for_principal(&principal)).await {
        Ok(user) => user,
        Err(e) => {
            error!(
                component = "role_auth",
                remote_addr = %info.remote_addr,
                method = %info.method,
                url = %info.url,
                error = %e,
                "failed to retrieve user"
            );
            return ApiError::forbidden().into_response();
        }
    };

    if user.super_admin {
        let extensions = request.extensions_mut();
        extensions.insert(OrganizationContext(organization));
        extensions.insert(RoleContext(RoleName::Admin));
        extensions.insert(SuperAdminContext);
        extensions.insert(UserContext(user));
        return next.run(request).await;
    }

    let scoped = user.scoped_to(&organization);
    if scoped.roles.len() > 1 {
        let inconsistency = AuthorizationError::ConfigurationInconsistency {
            user_id: user.id,
            organization: organization.clone(),
            role_count: scoped.roles.len(),
        };
        error!(
            component = "role_auth",
            remote_addr = %info.remote_addr,
            method = %info.method,
            url = %info.url,
            user = ?user,
            "{inconsistency}"
        );
        return ApiError::internal().into_response();
    }

    let Some(role) = scoped
        .roles
        .first()
        .map(|role| role.name)
        .filter(|_| has_authorized_role(&scoped, guard.required))
    else {
        debug!(
            component = "role_auth",
            user = %user.name,
            organization = %organization,
            required = %guard.required,
            "user lacks required role"
        );
        return ApiError::forbidden().into_response();
    };

    let extensions = request.extensions_mut();
    extensions.insert(OrganizationContext(organization));
    extensions.insert(RoleContext(role));
    extensions.insert(UserContext(user));
    next.run(request).await
}

/// Lets requests with server context through and promotes superadmins to it.
pub async fn raw_store_access(info: RequestInfo, mut request: Request, next: Next) -> Response {
    if request.extensions().get::<ServerContext>().is_some() {
        return next.run(request).await;
    }

    if request.extensions().get::<SuperAdminContext>().is_none() {
        error!(
            component = "raw_store",
            remote_addr = %info.remote_addr,
            method = %info.method,
            url = %info.url,
            "user making request is not a superadmin"
        );
        return ApiError::forbidden().into_response();
    }

    request.extensions_mut().insert(ServerContext);
    next.run(request).await
}
