//! Browser-facing OAuth login, callback and logout.
//!
//! Every transition answers with a 307 redirect. Failures never reach the
//! browser as detail: they are logged here and the browser is sent to the
//! failure URL.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use vantage_platform_access::Principal;

use super::RequestInfo;
use super::cookie::Authenticator;
use super::exchange::CodeExchange;
use super::provider::Provider;
use crate::error::ExchangeError;

/// Orchestrates the OAuth flow for one provider.
pub struct AuthMux {
    provider: Arc<dyn Provider>,
    auth: Arc<dyn Authenticator>,
    exchange: Arc<dyn CodeExchange>,
    http: reqwest::Client,
    login_hint: Option<String>,
    success_url: String,
    failure_url: String,
}

impl AuthMux {
    /// Creates a mux whose provider calls give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Configuration`] if the HTTP client cannot be built.
    pub fn new(
        provider: Arc<dyn Provider>,
        auth: Arc<dyn Authenticator>,
        exchange: Arc<dyn CodeExchange>,
        timeout: Duration,
    ) -> Result<Self, Report<ExchangeError>> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Configuration {
                details: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            provider,
            auth,
            exchange,
            http,
            login_hint: None,
            success_url: "/".to_string(),
            failure_url: "/login".to_string(),
        })
    }

    #[must_use]
    pub fn with_login_hint(mut self, login_hint: Option<String>) -> Self {
        self.login_hint = login_hint.filter(|hint| !hint.is_empty());
        self
    }

    /// Sets where the browser lands after a completed or failed flow.
    #[must_use]
    pub fn with_redirects(
        mut self,
        success_url: impl Into<String>,
        failure_url: impl Into<String>,
    ) -> Self {
        self.success_url = success_url.into();
        self.failure_url = failure_url.into();
        self
    }

    #[must_use]
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &dyn Authenticator {
        self.auth.as_ref()
    }

    /// Client used for every call to the provider.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn login_hint(&self) -> Option<&str> {
        self.login_hint.as_deref()
    }

    fn failure(&self) -> Redirect {
        Redirect::temporary(&self.failure_url)
    }

    fn success(&self) -> Redirect {
        Redirect::temporary(&self.success_url)
    }
}

/// Builds the `/oauth/{provider}/...` routes.
pub fn routes(mux: Arc<AuthMux>) -> Router {
    let prefix = format!("/oauth/{}", mux.provider().name());
    Router::new()
        .route(&format!("{prefix}/login"), get(login))
        .route(&format!("{prefix}/callback"), get(callback))
        .route(&format!("{prefix}/logout"), get(logout))
        .with_state(mux)
}

/// Query parameters the provider sends back.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    state: String,
    #[serde(default)]
    code: String,
}

/// Redirects to the provider's authorization URL.
pub async fn login(State(mux): State<Arc<AuthMux>>, request: RequestInfo) -> Response {
    match mux.exchange.auth_code_url(&mux) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            error!(
                component = "auth",
                remote_addr = %request.remote_addr,
                method = %request.method,
                url = %request.url,
                error = %e,
                "unable to build authorization URL"
            );
            mux.failure().into_response()
        }
    }
}

/// Completes the flow and sets the session cookie.
pub async fn callback(
    State(mux): State<Arc<AuthMux>>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
    request: RequestInfo,
) -> Response {
    let provider = mux.provider();

    let token = match mux
        .exchange
        .exchange_code_for_token(&query.state, &query.code, &mux)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            error!(
                component = "auth",
                remote_addr = %request.remote_addr,
                method = %request.method,
                url = %request.url,
                error = %e,
                "unable to exchange code for token"
            );
            return mux.failure().into_response();
        }
    };

    let id = match provider.principal_id(mux.http(), &token).await {
        Ok(id) => id,
        Err(e) => {
            error!(
                component = "auth",
                remote_addr = %request.remote_addr,
                method = %request.method,
                url = %request.url,
                error = %e,
                "unable to get principal identifier"
            );
            return mux.failure().into_response();
        }
    };

    let group = match provider.group(mux.http(), &token).await {
        Ok(group) => group,
        Err(e) => {
            error!(
                component = "auth",
                remote_addr = %request.remote_addr,
                method = %request.method,
                url = %request.url,
                error = %e,
                "unable to get OAuth group"
            );
            return mux.failure().into_response();
        }
    };

    let principal = Principal::new(id)
        .with_issuer(provider.name())
        .with_group(group);

    match mux.auth().authorize(jar, &principal) {
        Ok(jar) => {
            info!(
                component = "auth",
                remote_addr = %request.remote_addr,
                user = %principal.subject,
                issuer = %principal.issuer,
                "user authenticated"
            );
            (jar, mux.success()).into_response()
        }
        Err(e) => {
            error!(
                component = "auth",
                remote_addr = %request.remote_addr,
                method = %request.method,
                url = %request.url,
                error = %e,
                "unable to set session cookie"
            );
            mux.failure().into_response()
        }
    }
}

/// Expires the session cookie.
pub async fn logout(State(mux): State<Arc<AuthMux>>, jar: CookieJar) -> Response {
    (mux.auth().expire(jar), mux.success()).into_response()
}
