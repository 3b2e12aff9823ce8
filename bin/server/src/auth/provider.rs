//! The OAuth provider capability.
//!
//! Concrete providers (GitHub, Google, Auth0, generic OIDC) plug in by
//! implementing [`Provider`]. The auth flow itself never depends on which
//! provider it is talking to.

use async_trait::async_trait;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
};
use rootcause::prelude::Report;

use crate::error::{ExchangeError, ProviderError};

/// Token response returned by a provider's token endpoint.
pub type ProviderToken = BasicTokenResponse;

/// An OAuth client with authorization and token endpoints set.
pub type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Endpoints and credentials of an OAuth provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Builds the OAuth client for these endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Configuration`] if any URL is invalid.
    pub fn oauth_client(&self) -> Result<ConfiguredClient, Report<ExchangeError>> {
        let auth_url = AuthUrl::new(self.auth_url.clone()).map_err(|e| {
            ExchangeError::Configuration {
                details: format!("invalid auth URL: {e}"),
            }
        })?;
        let token_url = TokenUrl::new(self.token_url.clone()).map_err(|e| {
            ExchangeError::Configuration {
                details: format!("invalid token URL: {e}"),
            }
        })?;
        let redirect_url = RedirectUrl::new(self.redirect_url.clone()).map_err(|e| {
            ExchangeError::Configuration {
                details: format!("invalid redirect URL: {e}"),
            }
        })?;

        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url))
    }
}

/// An OAuth identity provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name, used in routes and as the principal's issuer.
    fn name(&self) -> &str;

    /// Endpoints and credentials.
    fn config(&self) -> &ProviderConfig;

    /// Looks up the identifier of the user the token belongs to.
    async fn principal_id(
        &self,
        http: &reqwest::Client,
        token: &ProviderToken,
    ) -> Result<String, Report<ProviderError>>;

    /// Looks up the user's comma-separated provider groups.
    async fn group(
        &self,
        _http: &reqwest::Client,
        _token: &ProviderToken,
    ) -> Result<String, Report<ProviderError>> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            client_id: "client".to_string(),
            client_secret: "shhh".to_string(),
            auth_url: "https://provider.example/authorize".to_string(),
            token_url: "https://provider.example/token".to_string(),
            redirect_url: "https://vantage.example/oauth/example/callback".to_string(),
            scopes: vec!["openid".to_string()],
        }
    }

    #[test]
    fn valid_config_builds_client() {
        assert!(config().oauth_client().is_ok());
    }

    #[test]
    fn invalid_url_is_a_configuration_error() {
        let mut bad = config();
        bad.token_url = "not a url".to_string();
        let err = bad.oauth_client().expect_err("invalid");
        assert!(err.to_string().contains("invalid token URL"));
    }

    #[test]
    fn debug_output_hides_secret() {
        assert!(!format!("{:?}", config()).contains("shhh"));
    }
}
