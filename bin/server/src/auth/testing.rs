//! Fixtures shared by the auth tests.

use async_trait::async_trait;
use axum::{Form, Json, Router, extract::State, routing::post};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::DateTime;
use rootcause::prelude::Report;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use vantage_core::{Clock, fixed_clock};
use vantage_platform_access::{
    JwtTokens, MappingResolver, MemoryStore, Organization, RoleName, SuperAdminChallenge, User,
    parse_public_key,
};

use super::cookie::CookieAuthenticator;
use super::exchange::CodeExchangePkce;
use super::provider::{Provider, ProviderConfig, ProviderToken};
use super::routes::AuthMux;
use super::AuthState;
use crate::error::ProviderError;

const PRIVATE_KEY_PEM: &str =
    include_str!("../../../../lib/platform-access/testdata/superadmin_private.pem");
const PUBLIC_KEY_PEM: &str =
    include_str!("../../../../lib/platform-access/testdata/superadmin_public.pem");

/// A provider answering every identity lookup with fixed values.
pub struct StaticProvider {
    config: ProviderConfig,
}

impl StaticProvider {
    pub const PRINCIPAL_ID: &'static str = "billysteve@example.com";
    pub const GROUP: &'static str = "dashboards,oncall";

    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            config: ProviderConfig {
                client_id: "client".to_string(),
                client_secret: "shhh".to_string(),
                auth_url: "https://provider.example/authorize".to_string(),
                token_url: token_url.into(),
                redirect_url: "https://vantage.example/oauth/example/callback".to_string(),
                scopes: vec!["openid".to_string(), "email".to_string()],
            },
        }
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn name(&self) -> &str {
        "example"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn principal_id(
        &self,
        _http: &reqwest::Client,
        _token: &ProviderToken,
    ) -> Result<String, Report<ProviderError>> {
        Ok(Self::PRINCIPAL_ID.to_string())
    }

    async fn group(
        &self,
        _http: &reqwest::Client,
        _token: &ProviderToken,
    ) -> Result<String, Report<ProviderError>> {
        Ok(Self::GROUP.to_string())
    }
}

type Forms = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// A local OAuth token endpoint recording every form it receives.
pub struct FakeTokenEndpoint {
    token_url: String,
    forms: Forms,
}

impl FakeTokenEndpoint {
    pub async fn start() -> Self {
        let forms = Forms::default();
        let app = Router::new()
            .route("/token", post(issue_token))
            .with_state(Arc::clone(&forms));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind token endpoint");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve token endpoint");
        });

        Self {
            token_url: format!("http://{addr}/token"),
            forms,
        }
    }

    pub async fn last_form(&self) -> HashMap<String, String> {
        self.forms
            .lock()
            .await
            .last()
            .cloned()
            .expect("token endpoint was called")
    }
}

async fn issue_token(
    State(forms): State<Forms>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    forms.lock().await.push(form);
    Json(serde_json::json!({
        "access_token": "provider-access-token",
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
}

pub fn clock_at(seconds: i64) -> Clock {
    fixed_clock(DateTime::from_timestamp(seconds, 0).expect("timestamp"))
}

pub fn authenticator_at(seconds: i64) -> CookieAuthenticator {
    CookieAuthenticator::new(
        "session",
        Duration::from_secs(3600),
        JwtTokens::new("secret").with_clock(clock_at(seconds)),
    )
}

fn mux(seconds: i64, token_url: &str) -> AuthMux {
    AuthMux::new(
        Arc::new(StaticProvider::new(token_url)),
        Arc::new(authenticator_at(seconds)),
        Arc::new(CodeExchangePkce::new("secret")),
        Duration::from_secs(5),
    )
    .expect("mux")
}

/// A mux whose provider token endpoint refuses connections.
pub fn mux_at(seconds: i64) -> AuthMux {
    mux(seconds, "http://127.0.0.1:9/token")
}

pub fn mux_with_endpoint(seconds: i64, endpoint: &FakeTokenEndpoint) -> AuthMux {
    mux(seconds, &endpoint.token_url)
}

pub fn default_org() -> Organization {
    Organization::new("default", "Default", RoleName::Member)
}

pub fn billysteve() -> User {
    User::new("billysteve", "google").with_id(1_u64)
}

/// Auth state over `store`, optionally trusting the test superadmin key.
pub fn auth_state(store: MemoryStore, use_auth: bool, superadmin: bool) -> AuthState {
    let public_key = superadmin.then(|| parse_public_key(PUBLIC_KEY_PEM).expect("public key"));
    let store: Arc<MemoryStore> = Arc::new(store);
    AuthState {
        store: store.clone(),
        auth: Arc::new(CookieAuthenticator::new(
            "session",
            Duration::from_secs(3600),
            JwtTokens::new("secret"),
        )),
        challenge: Arc::new(SuperAdminChallenge::new(public_key)),
        resolver: MappingResolver::new(store, "superadmins"),
        use_auth,
        nonce_expiration: Duration::from_secs(600),
    }
}

/// Signs `message` with the test superadmin key, base64 encoded.
pub fn sign_challenge(message: &str) -> String {
    let key = RsaPrivateKey::from_pkcs1_pem(PRIVATE_KEY_PEM).expect("private key");
    let signature = SigningKey::<Sha256>::new(key).sign(message.as_bytes());
    STANDARD.encode(signature.to_bytes())
}
