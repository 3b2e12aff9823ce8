//! Authorization URL generation and code exchange.
//!
//! The OAuth `state` parameter is a signed token that lives for ten minutes,
//! so any server sharing the signing secret can validate a callback without
//! remembering anything about the login that started it. State tokens are
//! not single use: a state is accepted on every presentation until it
//! expires.
//!
//! The PKCE variant additionally carries the encrypted code verifier as the
//! state's subject.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, Scope};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::instrument;
use vantage_platform_access::{
    PkceCipher, Principal, STATE_LIFESPAN, Token, random_bytes, random_string,
};

use super::provider::ProviderToken;
use super::routes::AuthMux;
use crate::error::ExchangeError;

/// Random bytes behind a CSRF state subject or PKCE verifier.
const STATE_ENTROPY_BYTES: usize = 32;

/// Builds authorization URLs and redeems authorization codes.
#[async_trait]
pub trait CodeExchange: Send + Sync {
    /// Returns the provider URL to send the browser to.
    fn auth_code_url(&self, mux: &AuthMux) -> Result<String, Report<ExchangeError>>;

    /// Validates `state` and trades `code` for a provider token.
    async fn exchange_code_for_token(
        &self,
        state: &str,
        code: &str,
        mux: &AuthMux,
    ) -> Result<ProviderToken, Report<ExchangeError>>;
}

/// Returns the PKCE exchange when `use_pkce` is set, otherwise the plain CSRF one.
#[must_use]
pub fn new_code_exchange(use_pkce: bool, secret: &str) -> Arc<dyn CodeExchange> {
    if use_pkce {
        Arc::new(CodeExchangePkce::new(secret))
    } else {
        Arc::new(CodeExchangeCsrf)
    }
}

/// Protects the flow with a signed random state only.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeExchangeCsrf;

/// Protects the flow with a signed state and a PKCE verifier.
#[derive(Debug, Clone)]
pub struct CodeExchangePkce {
    cipher: PkceCipher,
}

impl CodeExchangePkce {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            cipher: PkceCipher::new(secret),
        }
    }

    /// Encrypts a raw code verifier for embedding in state.
    ///
    /// # Errors
    ///
    /// Fails if the random source or cipher fails.
    pub fn encrypt(&self, verifier: &[u8]) -> Result<String, Report<ExchangeError>> {
        Ok(self
            .cipher
            .encrypt(verifier)
            .map_err(|e| ExchangeError::StateCreation {
                details: e.to_string(),
            })?)
    }

    /// Recovers a raw code verifier from state.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidState`] if the value does not decrypt.
    pub fn decrypt(&self, encrypted: &str) -> Result<Vec<u8>, Report<ExchangeError>> {
        Ok(self
            .cipher
            .decrypt(encrypted)
            .map_err(|e| ExchangeError::InvalidState {
                reason: e.to_string(),
            })?)
    }
}

#[async_trait]
impl CodeExchange for CodeExchangeCsrf {
    #[instrument(skip_all, fields(provider = mux.provider().name()))]
    fn auth_code_url(&self, mux: &AuthMux) -> Result<String, Report<ExchangeError>> {
        let csrf = random_string(STATE_ENTROPY_BYTES).map_err(|e| ExchangeError::StateCreation {
            details: e.to_string(),
        })?;
        let state = state_token(mux, csrf)?;
        authorization_url(mux, state, None)
    }

    #[instrument(skip_all, fields(provider = mux.provider().name()))]
    async fn exchange_code_for_token(
        &self,
        state: &str,
        code: &str,
        mux: &AuthMux,
    ) -> Result<ProviderToken, Report<ExchangeError>> {
        valid_state(mux, state)?;
        redeem_code(mux, code, None).await
    }
}

#[async_trait]
impl CodeExchange for CodeExchangePkce {
    #[instrument(skip_all, fields(provider = mux.provider().name()))]
    fn auth_code_url(&self, mux: &AuthMux) -> Result<String, Report<ExchangeError>> {
        let verifier = random_bytes(STATE_ENTROPY_BYTES).map_err(|e| {
            ExchangeError::StateCreation {
                details: e.to_string(),
            }
        })?;
        let encrypted = self.encrypt(&verifier)?;
        let state = state_token(mux, encrypted)?;

        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            URL_SAFE_NO_PAD.encode(&verifier),
        ));
        authorization_url(mux, state, Some(challenge))
    }

    #[instrument(skip_all, fields(provider = mux.provider().name()))]
    async fn exchange_code_for_token(
        &self,
        state: &str,
        code: &str,
        mux: &AuthMux,
    ) -> Result<ProviderToken, Report<ExchangeError>> {
        let state = valid_state(mux, state)?;
        let verifier = self.decrypt(&state.subject)?;
        let verifier = PkceCodeVerifier::new(URL_SAFE_NO_PAD.encode(verifier));
        redeem_code(mux, code, Some(verifier)).await
    }
}

fn state_token(mux: &AuthMux, subject: String) -> Result<Token, Report<ExchangeError>> {
    mux.auth()
        .serialize(&Principal::new(subject), STATE_LIFESPAN)
        .map_err(|e| {
            ExchangeError::StateCreation {
                details: e.to_string(),
            }
            .into()
        })
}

fn valid_state(mux: &AuthMux, state: &str) -> Result<Principal, Report<ExchangeError>> {
    mux.auth()
        .valid_authorization(state, STATE_LIFESPAN)
        .map_err(|e| {
            ExchangeError::InvalidState {
                reason: e.to_string(),
            }
            .into()
        })
}

fn authorization_url(
    mux: &AuthMux,
    state: Token,
    challenge: Option<PkceCodeChallenge>,
) -> Result<String, Report<ExchangeError>> {
    let config = mux.provider().config();
    let client = config.oauth_client()?;

    let mut request = client
        .authorize_url(move || CsrfToken::new(state.into_string()))
        .add_scopes(config.scopes.iter().cloned().map(Scope::new))
        .add_extra_param("access_type", "online");
    if let Some(hint) = mux.login_hint() {
        request = request.add_extra_param("login_hint", hint);
    }
    if let Some(challenge) = challenge {
        request = request.set_pkce_challenge(challenge);
    }

    let (url, _) = request.url();
    Ok(url.to_string())
}

async fn redeem_code(
    mux: &AuthMux,
    code: &str,
    verifier: Option<PkceCodeVerifier>,
) -> Result<ProviderToken, Report<ExchangeError>> {
    let client = mux.provider().config().oauth_client()?;

    let mut request = client.exchange_code(AuthorizationCode::new(code.to_string()));
    if let Some(verifier) = verifier {
        request = request.set_pkce_verifier(verifier);
    }

    request.request_async(mux.http()).await.map_err(|e| {
        ExchangeError::TokenExchange {
            details: e.to_string(),
        }
        .into()
    })
}
