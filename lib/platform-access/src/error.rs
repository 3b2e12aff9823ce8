//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: identity could not be established (token, cookie, state)
//! - `AuthorizationError`: identity is known but access is refused or inconsistent
//! - `StoreError`: a collaborator store failed or had no matching record
//!
//! Display strings are for operators. Client-facing translation happens at the
//! HTTP layer, which never echoes these details back on security paths.

use std::fmt;
use vantage_core::{OrganizationId, UserId};

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The token is not a well-formed compact JWS.
    InvalidToken { reason: String },
    /// The token carries an empty subject.
    MissingSubject,
    /// The current time is after the token's expiry.
    TokenExpired,
    /// The current time is before the token's not-before.
    TokenNotYetValid,
    /// The token header names an algorithm other than HS256.
    UnexpectedSigningMethod { algorithm: String },
    /// The HMAC signature does not match.
    InvalidSignature,
    /// The token lifetime differs from the lifetime the caller expects.
    LifespanMismatch { expected_seconds: i64, actual_seconds: i64 },
    /// No session cookie was presented.
    MissingCookie { name: String },
    /// The operating system random source failed.
    RandomSource { reason: String },
    /// Encrypting or decrypting state material failed.
    Cipher { reason: String },
    /// The configured superadmin public key could not be parsed.
    InvalidPublicKey { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::MissingSubject => write!(f, "claim has no subject"),
            Self::TokenExpired => write!(f, "Token is expired"),
            Self::TokenNotYetValid => write!(f, "Token used before issued"),
            Self::UnexpectedSigningMethod { algorithm } => {
                write!(f, "unexpected signing method: {algorithm}")
            }
            Self::InvalidSignature => write!(f, "signature is invalid"),
            Self::LifespanMismatch {
                expected_seconds,
                actual_seconds,
            } => write!(
                f,
                "claims duration is different from auth lifespan: expected {expected_seconds}s, got {actual_seconds}s"
            ),
            Self::MissingCookie { name } => write!(f, "cookie '{name}' not present"),
            Self::RandomSource { reason } => write!(f, "random source failed: {reason}"),
            Self::Cipher { reason } => write!(f, "cipher failure: {reason}"),
            Self::InvalidPublicKey { reason } => write!(f, "invalid public key: {reason}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The principal may not perform the request. Rendered to clients generically.
    NotAuthorized { reason: String },
    /// A mapping, organization or role request is malformed.
    Validation { reason: String },
    /// A user holds more than one role in the same organization.
    ConfigurationInconsistency {
        user_id: UserId,
        organization: OrganizationId,
        role_count: usize,
    },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthorized { reason } => write!(f, "not authorized: {reason}"),
            Self::Validation { reason } => write!(f, "{reason}"),
            Self::ConfigurationInconsistency {
                user_id,
                organization,
                role_count,
            } => write!(
                f,
                "user {user_id} has {role_count} roles in organization {organization}; exactly one is allowed"
            ),
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors from the collaborator stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record matched the query.
    NotFound { kind: &'static str, key: String },
    /// The backing store failed.
    Backend { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, key } => write!(f, "{kind} '{key}' not found"),
            Self::Backend { details } => write!(f, "store error: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}
