//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, using `__` as
//! the nesting separator (e.g. `AUTH__TOKEN_SECRET`, `SUPERADMIN__AUTH0_GROUP`).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Session and OAuth configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Static signature channel configuration.
    #[serde(default)]
    pub superadmin: SuperAdminConfig,
}

/// Session and OAuth configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Whether requests must carry an authenticated principal.
    #[serde(default)]
    pub enabled: bool,

    /// HS256 secret for session and state tokens.
    #[serde(default)]
    pub token_secret: String,

    /// Session lifetime in seconds. Zero means sessions never expire.
    #[serde(default = "default_lifespan_seconds")]
    pub lifespan_seconds: u64,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Use PKCE on top of the signed state parameter.
    #[serde(default = "default_use_pkce")]
    pub use_pkce: bool,

    /// Passed to providers as `login_hint` when set.
    #[serde(default)]
    pub login_hint: Option<String>,

    /// Redirect target after login or logout.
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Redirect target when the OAuth flow fails.
    #[serde(default = "default_failure_url")]
    pub failure_url: String,

    /// Timeout for calls to the OAuth provider.
    #[serde(default = "default_provider_timeout_seconds")]
    pub provider_timeout_seconds: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("token_secret", &"<redacted>")
            .field("lifespan_seconds", &self.lifespan_seconds)
            .field("cookie_name", &self.cookie_name)
            .field("use_pkce", &self.use_pkce)
            .field("login_hint", &self.login_hint)
            .field("success_url", &self.success_url)
            .field("failure_url", &self.failure_url)
            .field("provider_timeout_seconds", &self.provider_timeout_seconds)
            .finish()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn lifespan(&self) -> Duration {
        Duration::from_secs(self.lifespan_seconds)
    }

    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_seconds)
    }
}

/// Static signature channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SuperAdminConfig {
    /// Inline PEM public key.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Path to a PEM public key. Takes precedence over `public_key`.
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,

    /// How often the signed challenge rotates.
    #[serde(default = "default_nonce_expiration_seconds")]
    pub nonce_expiration_seconds: u64,

    /// Auth0 group whose members are superadmins.
    #[serde(default)]
    pub auth0_group: String,
}

impl SuperAdminConfig {
    #[must_use]
    pub fn nonce_expiration(&self) -> Duration {
        Duration::from_secs(self.nonce_expiration_seconds)
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_lifespan_seconds() -> u64 {
    720 * 60 * 60
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_use_pkce() -> bool {
    true
}

fn default_success_url() -> String {
    "/".to_string()
}

fn default_failure_url() -> String {
    "/login".to_string()
}

fn default_provider_timeout_seconds() -> u64 {
    10
}

fn default_nonce_expiration_seconds() -> u64 {
    600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_secret: String::new(),
            lifespan_seconds: default_lifespan_seconds(),
            cookie_name: default_cookie_name(),
            use_pkce: default_use_pkce(),
            login_hint: None,
            success_url: default_success_url(),
            failure_url: default_failure_url(),
            provider_timeout_seconds: default_provider_timeout_seconds(),
        }
    }
}

impl Default for SuperAdminConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            public_key_file: None,
            nonce_expiration_seconds: default_nonce_expiration_seconds(),
            auth0_group: String::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true)
                .source(Some(vars)),
        )
        .expect("config loads")
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);
        assert_eq!(config.bind_address, "127.0.0.1:8888");
        assert!(!config.auth.enabled);
        assert_eq!(config.auth.lifespan(), Duration::from_secs(720 * 3600));
        assert_eq!(config.auth.cookie_name, "session");
        assert!(config.auth.use_pkce);
        assert_eq!(config.auth.success_url, "/");
        assert_eq!(config.auth.failure_url, "/login");
        assert_eq!(config.auth.provider_timeout(), Duration::from_secs(10));
        assert_eq!(config.superadmin.nonce_expiration(), Duration::from_secs(600));
        assert!(config.superadmin.public_key_file.is_none());
    }

    #[test]
    fn nested_keys_override_defaults() {
        let config = load(&[
            ("AUTH__ENABLED", "true"),
            ("AUTH__TOKEN_SECRET", "hunter2"),
            ("AUTH__LIFESPAN_SECONDS", "0"),
            ("AUTH__USE_PKCE", "false"),
            ("SUPERADMIN__AUTH0_GROUP", "admins"),
        ]);
        assert!(config.auth.enabled);
        assert_eq!(config.auth.token_secret, "hunter2");
        assert_eq!(config.auth.lifespan(), Duration::ZERO);
        assert!(!config.auth.use_pkce);
        assert_eq!(config.superadmin.auth0_group, "admins");
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = AuthConfig {
            token_secret: "hunter2".to_string(),
            ..AuthConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
