//! Domain error types for server operations.
//!
//! `ExchangeError` and `ProviderError` stay inside the browser OAuth flow,
//! which only ever answers with a redirect. `ApiError` is the JSON body every
//! other route returns.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Message returned for every authorization failure.
pub const NOT_AUTHORIZED: &str = "User is not authorized";

/// Errors from the OAuth code exchange.
#[derive(Debug)]
pub enum ExchangeError {
    /// The `state` parameter failed validation or decryption.
    InvalidState { reason: String },
    /// The provider endpoints are misconfigured.
    Configuration { details: String },
    /// The provider rejected the code or could not be reached.
    TokenExchange { details: String },
    /// Minting state material failed.
    StateCreation { details: String },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { reason } => write!(f, "invalid OAuth state received: {reason}"),
            Self::Configuration { details } => write!(f, "invalid provider configuration: {details}"),
            Self::TokenExchange { details } => write!(f, "unable to exchange code for token: {details}"),
            Self::StateCreation { details } => write!(f, "unable to create OAuth state: {details}"),
        }
    }
}

impl std::error::Error for ExchangeError {}

/// Errors from provider identity lookups.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider API call failed.
    Request { details: String },
    /// The provider answered with something unusable.
    InvalidResponse { details: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { details } => write!(f, "provider request failed: {details}"),
            Self::InvalidResponse { details } => write!(f, "invalid provider response: {details}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration is missing or inconsistent.
    Configuration { details: String },
    /// The superadmin public key could not be loaded.
    PublicKey { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "invalid configuration: {details}"),
            Self::PublicKey { details } => write!(f, "unable to load superadmin public key: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// A JSON error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    message: &'a str,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 403 with the generic message; the caller logs the real reason.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, NOT_AUTHORIZED)
    }

    /// 403 with a message that is safe to show.
    #[must_use]
    pub fn forbidden_with(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 422 for malformed requests.
    #[must_use]
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// 500 asking an operator to check the logs.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "please have administrator check logs and report error",
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.status.as_u16(),
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
