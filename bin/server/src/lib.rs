//! HTTP server for the vantage monitoring dashboard.
//!
//! This crate wires the auth core into Axum: OAuth login routes per
//! provider, session cookies, the authorization middleware and the small
//! JSON API that depends on them.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use axum::Router;
use rootcause::prelude::Report;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use vantage_platform_access::{
    DataStore, JwtTokens, MappingResolver, SuperAdminChallenge, load_public_key, parse_public_key,
};

use crate::auth::{
    AuthMux, AuthState, Authenticator, CookieAuthenticator, Provider, new_code_exchange,
};
use crate::config::{AuthConfig, ServerConfig};
use crate::error::{ExchangeError, StartupError};

/// Builds the shared auth state from configuration.
///
/// # Errors
///
/// Fails if auth is enabled without a token secret, or if a configured
/// superadmin public key cannot be loaded.
pub fn build_state(
    config: &ServerConfig,
    store: Arc<dyn DataStore>,
) -> Result<AuthState, Report<StartupError>> {
    if config.auth.enabled && config.auth.token_secret.is_empty() {
        return Err(StartupError::Configuration {
            details: "a token secret is required when auth is enabled".to_string(),
        }
        .into());
    }

    let superadmin = &config.superadmin;
    let public_key = match (&superadmin.public_key_file, &superadmin.public_key) {
        (Some(path), _) => Some(load_public_key(path).map_err(|e| StartupError::PublicKey {
            details: e.to_string(),
        })?),
        (None, Some(pem)) => Some(parse_public_key(pem).map_err(|e| StartupError::PublicKey {
            details: e.to_string(),
        })?),
        (None, None) => None,
    };
    if public_key.is_none() {
        info!("no superadmin public key configured; signed requests are disabled");
    }

    let authenticator = CookieAuthenticator::new(
        config.auth.cookie_name.clone(),
        config.auth.lifespan(),
        JwtTokens::new(config.auth.token_secret.clone()),
    );

    Ok(AuthState {
        store: Arc::clone(&store),
        auth: Arc::new(authenticator),
        challenge: Arc::new(SuperAdminChallenge::new(public_key)),
        resolver: MappingResolver::new(store, superadmin.auth0_group.clone()),
        use_auth: config.auth.enabled,
        nonce_expiration: superadmin.nonce_expiration(),
    })
}

/// Builds the OAuth flow for `provider`, sharing the session authenticator.
///
/// # Errors
///
/// Fails if the provider HTTP client cannot be built.
pub fn auth_mux(
    config: &AuthConfig,
    provider: Arc<dyn Provider>,
    auth: Arc<dyn Authenticator>,
) -> Result<AuthMux, Report<ExchangeError>> {
    let exchange = new_code_exchange(config.use_pkce, &config.token_secret);
    Ok(
        AuthMux::new(provider, auth, exchange, config.provider_timeout())?
            .with_login_hint(config.login_hint.clone())
            .with_redirects(config.success_url.clone(), config.failure_url.clone()),
    )
}

/// Assembles the full application router.
pub fn app(state: AuthState, muxes: Vec<AuthMux>) -> Router {
    if state.use_auth && muxes.is_empty() {
        warn!("auth is enabled but no OAuth providers are registered");
    }

    muxes
        .into_iter()
        .fold(api::router(state), |router, mux| {
            info!(provider = mux.provider().name(), "registered OAuth provider");
            router.merge(auth::routes::routes(Arc::new(mux)))
        })
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{StaticProvider, default_org};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use std::io::Write;
    use tower::ServiceExt;
    use vantage_platform_access::MemoryStore;

    fn config(enabled: bool) -> ServerConfig {
        let mut config = ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            auth: AuthConfig::default(),
            superadmin: Default::default(),
        };
        config.auth.enabled = enabled;
        config.auth.token_secret = "secret".to_string();
        config
    }

    fn store() -> Arc<dyn DataStore> {
        Arc::new(MemoryStore::new(default_org()))
    }

    #[test]
    fn enabled_auth_needs_a_secret() {
        let mut config = config(true);
        config.auth.token_secret.clear();
        let err = build_state(&config, store()).err().expect("missing secret");
        assert!(err.to_string().contains("token secret is required"));
    }

    #[test]
    fn without_a_key_signatures_are_disabled() {
        let state = build_state(&config(true), store()).expect("state");
        assert!(!state.challenge.is_enabled());
        assert!(state.use_auth);
    }

    #[test]
    fn key_file_takes_precedence() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(include_bytes!("../../../lib/platform-access/testdata/superadmin_public.pem"))
            .expect("write key");

        let mut config = config(true);
        config.superadmin.public_key = Some("not a key".to_string());
        config.superadmin.public_key_file = Some(file.path().to_path_buf());
        let state = build_state(&config, store()).expect("state");
        assert!(state.challenge.is_enabled());
    }

    #[test]
    fn unparsable_key_is_a_startup_error() {
        let mut config = config(true);
        config.superadmin.public_key = Some("not a key".to_string());
        let err = build_state(&config, store()).err().expect("bad key");
        assert!(err.to_string().contains("unable to load superadmin public key"));
    }

    #[tokio::test]
    async fn app_serves_provider_and_api_routes() {
        let config = config(true);
        let state = build_state(&config, store()).expect("state");
        let mux = auth_mux(
            &config.auth,
            Arc::new(StaticProvider::new("http://127.0.0.1:9/token")),
            Arc::clone(&state.auth),
        )
        .expect("mux");
        let app = app(state, vec![mux]);

        let login = app
            .clone()
            .oneshot(Request::get("/oauth/example/login").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(login.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = login.headers()[header::LOCATION].to_str().expect("location");
        assert!(location.contains("code_challenge="));

        let nonce = app
            .oneshot(Request::get("/chronograf/v1/nonce").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(nonce.status(), StatusCode::OK);
    }
}
