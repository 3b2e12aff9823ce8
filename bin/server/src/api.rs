//! JSON API routes backed by the auth core.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use axum_extra::extract::CookieJar;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use vantage_core::{MappingId, OrganizationId};
use vantage_platform_access::{
    Mapping, MappingRequest, Organization, Principal, RequiredRole, Role, User, UserQuery,
};

use crate::auth::{AuthContext, AuthState, authorized_token, authorized_user, raw_store_access};
use crate::error::ApiError;

/// Prefix of every API route.
pub const API_PREFIX: &str = "/chronograf/v1";

const PRIVATE_ORGANIZATION: &str =
    "This organization is private. To gain access, you must be explicitly added by an administrator.";

/// Builds the API router.
///
/// The nonce is public. Every other route requires a session (or a signed
/// challenge) and the mappings routes additionally require a superadmin.
pub fn router(state: AuthState) -> Router {
    let superadmin = Router::new()
        .route(
            &format!("{API_PREFIX}/mappings"),
            get(mappings).post(new_mapping),
        )
        .route(
            &format!("{API_PREFIX}/mappings/{{id}}"),
            put(update_mapping).delete(remove_mapping),
        )
        .route_layer(from_fn(raw_store_access))
        .route_layer(from_fn_with_state(
            state.guard(RequiredRole::SuperAdmin),
            authorized_user,
        ));

    let protected = Router::new()
        .route(&format!("{API_PREFIX}/me"), get(me).put(update_me))
        .merge(superadmin)
        .route_layer(from_fn_with_state(state.clone(), authorized_token));

    Router::new()
        .route(&format!("{API_PREFIX}/nonce"), get(nonce))
        .merge(protected)
        .with_state(state)
}

/// Returns the current superadmin challenge as plain text.
pub async fn nonce(State(state): State<AuthState>) -> Response {
    let challenge = state.challenge.current();
    let lifetime = TimeDelta::from_std(state.nonce_expiration).unwrap_or(TimeDelta::zero());
    let expires = (challenge.issued_at + lifetime)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    (
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (header::EXPIRES, expires),
        ],
        challenge.message,
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct SelfLinks {
    #[serde(rename = "self")]
    self_link: String,
}

/// Body of the `me` route.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    user: Option<User>,
    links: SelfLinks,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    organizations: Vec<Organization>,
    #[serde(rename = "currentOrganization", skip_serializing_if = "Option::is_none")]
    current_organization: Option<Organization>,
}

impl MeResponse {
    fn new(user: Option<User>) -> Self {
        let name = user
            .as_ref()
            .map_or_else(|| "me".to_string(), |user| user.id.to_string());
        Self {
            user,
            links: SelfLinks {
                self_link: format!("{API_PREFIX}/users/{name}"),
            },
            organizations: Vec::new(),
            current_organization: None,
        }
    }
}

fn store_failure(what: &str, e: &impl std::fmt::Display) -> ApiError {
    error!(component = "me", error = %e, "failed to retrieve {what}");
    ApiError::internal()
}

/// Describes the caller: their user record, current organization and the
/// organizations they belong to.
///
/// A principal without a stored user gets a provisional record built from
/// the mappings when the default organization is public. The provisional
/// record is not saved.
pub async fn me(
    State(state): State<AuthState>,
    context: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    if !state.use_auth {
        return Ok(Json(MeResponse::new(None)));
    }

    let Some(principal) = context.principal.filter(Principal::is_valid) else {
        return Err(ApiError::unprocessable("token not found"));
    };

    describe(&state, principal).await.map(Json)
}

async fn describe(state: &AuthState, mut principal: Principal) -> Result<MeResponse, ApiError> {
    let store = state.store.as_ref();
    let default_org = store
        .organizations()
        .default_organization()
        .await
        .map_err(|e| store_failure("default organization", &e))?;
    if principal.organization.is_empty() {
        principal.organization = default_org.id.clone();
    }

    let user = store
        .users()
        .find(&UserQuery::for_principal(&principal))
        .await
        .map_err(|e| store_failure("user", &e))?;

    let mut user = match user {
        Some(user) => {
            if !default_org.public && user.roles.is_empty() {
                return Err(ApiError::forbidden_with(PRIVATE_ORGANIZATION));
            }
            user
        }
        None if !default_org.public => {
            return Err(ApiError::forbidden_with(PRIVATE_ORGANIZATION));
        }
        None => provisional_user(state, &principal).await?,
    };

    let current = store
        .organizations()
        .find(&principal.organization)
        .await
        .map_err(|e| store_failure("current organization", &e))?
        .ok_or_else(|| ApiError::forbidden_with("user's current organization was not found"))?;

    if user.roles_in(&default_org.id).is_empty() {
        user.roles
            .push(Role::new(default_org.id.clone(), default_org.default_role));
    }

    let mut organizations = Vec::with_capacity(user.roles.len());
    for role in &user.roles {
        match store.organizations().get(&role.organization).await {
            Ok(org) => organizations.push(org),
            Err(e) => {
                debug!(
                    component = "me",
                    organization = %role.organization,
                    error = %e,
                    "skipping unknown organization"
                );
            }
        }
    }
    organizations.sort_by(|a, b| a.id.cmp(&b.id));
    organizations.dedup_by(|a, b| a.id == b.id);

    let mut response = MeResponse::new(Some(user));
    response.organizations = organizations;
    response.current_organization = Some(current);
    Ok(response)
}

/// Body of a `me` update.
#[derive(Debug, Deserialize)]
pub struct MeRequest {
    #[serde(default)]
    pub organization: OrganizationId,
}

/// Switches the caller's current organization.
///
/// The caller must already belong to the organization (superadmins belong to
/// every organization). The session is re-issued with the new organization
/// and the response is the same as [`me`].
pub async fn update_me(
    State(state): State<AuthState>,
    context: AuthContext,
    jar: CookieJar,
    Json(request): Json<MeRequest>,
) -> Result<(CookieJar, Json<MeResponse>), ApiError> {
    let Some(mut principal) = context.principal.filter(Principal::is_valid) else {
        return Err(ApiError::forbidden_with("invalid principal"));
    };
    if request.organization.is_empty() {
        return Err(ApiError::unprocessable("organization is required"));
    }

    let store = state.store.as_ref();
    let organization = store
        .organizations()
        .find(&request.organization)
        .await
        .map_err(|e| store_failure("organization", &e))?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("organization '{}' not found", request.organization),
            )
        })?;

    let member = store
        .users()
        .find(&UserQuery::for_principal(&principal))
        .await
        .map_err(|e| store_failure("user", &e))?
        .is_some_and(|user| user.super_admin || !user.roles_in(&organization.id).is_empty());
    if !member {
        return Err(ApiError::forbidden_with("user not found"));
    }

    principal.organization = organization.id;
    let jar = state.auth.authorize(jar, &principal).map_err(|e| {
        error!(component = "me", error = %e, "unable to re-issue session");
        ApiError::internal()
    })?;
    info!(
        component = "me",
        subject = %principal.subject,
        organization = %principal.organization,
        "switched current organization"
    );

    let response = describe(&state, principal).await?;
    Ok((jar, Json(response)))
}

async fn provisional_user(state: &AuthState, principal: &Principal) -> Result<User, ApiError> {
    let roles = state
        .resolver
        .map_principal_to_roles(principal)
        .await
        .map_err(|e| store_failure("mappings", &e))?;

    let mut user = User::new(principal.subject.clone(), principal.issuer.clone())
        .with_super_admin(state.resolver.map_principal_to_super_admin(principal));
    user.roles = roles;
    Ok(user)
}

/// A mapping with its `self` link.
#[derive(Debug, Serialize)]
pub struct MappingResponse {
    links: SelfLinks,
    #[serde(flatten)]
    mapping: Mapping,
}

impl MappingResponse {
    fn new(mapping: Mapping) -> Self {
        Self {
            links: SelfLinks {
                self_link: format!("{API_PREFIX}/mappings/{}", mapping.id),
            },
            mapping,
        }
    }

    fn located(self, status: StatusCode) -> Response {
        let location = self.links.self_link.clone();
        (status, [(header::LOCATION, location)], Json(self)).into_response()
    }
}

/// Body of the mappings route.
#[derive(Debug, Serialize)]
pub struct MappingsResponse {
    links: SelfLinks,
    mappings: Vec<MappingResponse>,
}

/// Lists every mapping.
pub async fn mappings(State(state): State<AuthState>) -> Result<Json<MappingsResponse>, ApiError> {
    let mappings = state.store.mappings().all().await.map_err(|e| {
        error!(component = "mappings", error = %e, "failed to retrieve mappings");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to retrieve mappings from database",
        )
    })?;

    Ok(Json(MappingsResponse {
        links: SelfLinks {
            self_link: format!("{API_PREFIX}/mappings"),
        },
        mappings: mappings.into_iter().map(MappingResponse::new).collect(),
    }))
}

fn mapping_failure(action: &str, e: &impl std::fmt::Display) -> ApiError {
    error!(component = "mappings", error = %e, "failed to {action} mapping");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("failed to {action} mapping in database"),
    )
}

/// Checks a mapping request and that the organization it names exists.
async fn validated(state: &AuthState, request: &MappingRequest) -> Result<(), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::unprocessable(e.current_context().to_string()))?;

    let organization = state
        .store
        .organizations()
        .find(&request.organization)
        .await
        .map_err(|e| store_failure("organization", &e))?;
    match organization {
        Some(_) => Ok(()),
        None => Err(ApiError::unprocessable("organization does not exist")),
    }
}

/// Creates a mapping.
pub async fn new_mapping(
    State(state): State<AuthState>,
    Json(request): Json<MappingRequest>,
) -> Result<Response, ApiError> {
    validated(&state, &request).await?;

    let mapping = state
        .store
        .mappings()
        .add(request)
        .await
        .map_err(|e| mapping_failure("add", &e))?;
    Ok(MappingResponse::new(mapping).located(StatusCode::CREATED))
}

/// Replaces the mapping named in the path.
pub async fn update_mapping(
    State(state): State<AuthState>,
    Path(id): Path<String>,
    Json(request): Json<MappingRequest>,
) -> Result<Response, ApiError> {
    validated(&state, &request).await?;

    let mapping = request.into_mapping(id);
    let updated = state
        .store
        .mappings()
        .update(mapping.clone())
        .await
        .map_err(|e| mapping_failure("update", &e))?;
    if !updated {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "mapping not found"));
    }
    Ok(MappingResponse::new(mapping).located(StatusCode::OK))
}

/// Deletes the mapping named in the path.
pub async fn remove_mapping(
    State(state): State<AuthState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .store
        .mappings()
        .remove(&MappingId::new(id))
        .await
        .map_err(|e| mapping_failure("remove", &e))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "mapping not found"))
    }
}
