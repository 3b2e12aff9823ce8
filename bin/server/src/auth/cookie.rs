//! Session cookies carrying signed principals.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use rootcause::prelude::Report;
use std::time::Duration;
use time::OffsetDateTime;
use vantage_platform_access::{AuthenticationError, JwtTokens, Principal, Token, Tokenizer};

/// Value written over an expired session cookie.
const EXPIRED_COOKIE_VALUE: &str = "none";

/// Lifespan used when sessions are configured never to expire.
const UNBOUNDED_LIFESPAN: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Issues, validates and expires browser sessions.
pub trait Authenticator: Send + Sync {
    /// Returns the principal in the session cookie.
    ///
    /// # Errors
    ///
    /// Fails if the cookie is missing or its token does not validate.
    fn validate(&self, jar: &CookieJar) -> Result<Principal, Report<AuthenticationError>>;

    /// Adds a fresh session cookie for `principal`.
    ///
    /// # Errors
    ///
    /// Fails if the token cannot be created.
    fn authorize(
        &self,
        jar: CookieJar,
        principal: &Principal,
    ) -> Result<CookieJar, Report<AuthenticationError>>;

    /// Re-issues the session cookie so an active session does not lapse.
    ///
    /// # Errors
    ///
    /// Fails if the token cannot be created.
    fn extend(
        &self,
        jar: CookieJar,
        principal: &Principal,
    ) -> Result<CookieJar, Report<AuthenticationError>>;

    /// Overwrites the session cookie with one that has already expired.
    fn expire(&self, jar: CookieJar) -> CookieJar;

    /// Signs `principal` for use outside the session cookie.
    ///
    /// # Errors
    ///
    /// Fails if the token cannot be created.
    fn serialize(
        &self,
        principal: &Principal,
        lifespan: Duration,
    ) -> Result<Token, Report<AuthenticationError>>;

    /// Validates a token produced by [`Authenticator::serialize`].
    ///
    /// # Errors
    ///
    /// Fails for any invalid, expired or mis-scoped token.
    fn valid_authorization(
        &self,
        token: &str,
        lifespan: Duration,
    ) -> Result<Principal, Report<AuthenticationError>>;
}

/// Cookie-backed [`Authenticator`].
#[derive(Debug, Clone)]
pub struct CookieAuthenticator {
    name: String,
    lifespan: Duration,
    tokens: JwtTokens,
}

impl CookieAuthenticator {
    /// Creates an authenticator. A zero `lifespan` issues sessions that
    /// effectively never expire.
    #[must_use]
    pub fn new(name: impl Into<String>, lifespan: Duration, tokens: JwtTokens) -> Self {
        Self {
            name: name.into(),
            lifespan: if lifespan.is_zero() {
                UNBOUNDED_LIFESPAN
            } else {
                lifespan
            },
            tokens,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    /// The token service behind the session cookie.
    #[must_use]
    pub fn tokens(&self) -> &JwtTokens {
        &self.tokens
    }

    fn expires_at(&self) -> Result<OffsetDateTime, Report<AuthenticationError>> {
        let now = (self.tokens.clock())().timestamp();
        let expires = i64::try_from(self.lifespan.as_secs())
            .ok()
            .and_then(|seconds| now.checked_add(seconds))
            .ok_or_else(|| AuthenticationError::InvalidToken {
                reason: "cookie expiry out of range".to_string(),
            })?;
        Ok(OffsetDateTime::from_unix_timestamp(expires).map_err(|e| {
            AuthenticationError::InvalidToken {
                reason: e.to_string(),
            }
        })?)
    }
}

impl Authenticator for CookieAuthenticator {
    fn validate(&self, jar: &CookieJar) -> Result<Principal, Report<AuthenticationError>> {
        let cookie = jar.get(&self.name).ok_or_else(|| AuthenticationError::MissingCookie {
            name: self.name.clone(),
        })?;
        self.tokens
            .validate(&Token::new(cookie.value()), self.lifespan)
    }

    fn authorize(
        &self,
        jar: CookieJar,
        principal: &Principal,
    ) -> Result<CookieJar, Report<AuthenticationError>> {
        let token = self.tokens.create(principal, self.lifespan)?;
        let cookie = Cookie::build((self.name.clone(), token.into_string()))
            .http_only(true)
            .path("/")
            .expires(self.expires_at()?);
        Ok(jar.add(cookie))
    }

    fn extend(
        &self,
        jar: CookieJar,
        principal: &Principal,
    ) -> Result<CookieJar, Report<AuthenticationError>> {
        self.authorize(jar, principal)
    }

    fn expire(&self, jar: CookieJar) -> CookieJar {
        let cookie = Cookie::build((self.name.clone(), EXPIRED_COOKIE_VALUE))
            .http_only(true)
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH);
        jar.add(cookie)
    }

    fn serialize(
        &self,
        principal: &Principal,
        lifespan: Duration,
    ) -> Result<Token, Report<AuthenticationError>> {
        self.tokens.create(principal, lifespan)
    }

    fn valid_authorization(
        &self,
        token: &str,
        lifespan: Duration,
    ) -> Result<Principal, Report<AuthenticationError>> {
        self.tokens.validate(&Token::new(token), lifespan)
    }
}
