//! The rotating challenge behind the static superadmin signature channel.
//!
//! Internal tooling holding the superadmin private key signs the current
//! challenge message and presents
//! `Authorization: CHRONOGRAF-SHA256 <base64(signature)>`. A background task
//! replaces the message on a fixed period so captured signatures go stale.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha2::Sha256;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use vantage_core::{Clock, system_clock};

use crate::error::AuthenticationError;

/// Scheme prefix of the superadmin `Authorization` header.
pub const SIGNATURE_SCHEME: &str = "CHRONOGRAF-SHA256";

/// One challenge message and when it was minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            message: Uuid::new_v4().to_string(),
            issued_at: now,
        }
    }
}

/// Holds the current challenge and verifies signatures over it.
///
/// Request handlers read concurrently while the rotation task writes; the
/// message and its timestamp always change together.
pub struct SuperAdminChallenge {
    current: RwLock<Challenge>,
    verifying_key: Option<VerifyingKey<Sha256>>,
    now: Clock,
}

impl std::fmt::Debug for SuperAdminChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperAdminChallenge")
            .field("current", &self.current())
            .field("enabled", &self.verifying_key.is_some())
            .finish_non_exhaustive()
    }
}

impl SuperAdminChallenge {
    /// Creates a challenge service. Without a public key no signature is ever valid.
    #[must_use]
    pub fn new(public_key: Option<RsaPublicKey>) -> Self {
        Self::with_clock(public_key, system_clock())
    }

    #[must_use]
    pub fn with_clock(public_key: Option<RsaPublicKey>, now: Clock) -> Self {
        let current = Challenge::fresh(now());
        Self {
            current: RwLock::new(current),
            verifying_key: public_key.map(VerifyingKey::new),
            now,
        }
    }

    /// Returns a snapshot of the current challenge.
    #[must_use]
    pub fn current(&self) -> Challenge {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the challenge with a fresh message.
    pub fn rotate(&self) {
        let next = Challenge::fresh((self.now)());
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Returns true if the superadmin channel is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.verifying_key.is_some()
    }

    /// Verifies an `Authorization` header value against the current challenge.
    #[must_use]
    pub fn valid_signature(&self, header: &str) -> bool {
        let Some(key) = &self.verifying_key else {
            return false;
        };
        if header.is_empty() {
            return false;
        }

        let encoded = header
            .strip_prefix(SIGNATURE_SCHEME)
            .unwrap_or(header)
            .trim();
        let Ok(raw) = STANDARD.decode(encoded) else {
            debug!("failed to base64 decode signature");
            return false;
        };
        let Ok(signature) = Signature::try_from(raw.as_slice()) else {
            debug!("malformed signature");
            return false;
        };

        let message = self.current().message;
        match key.verify(message.as_bytes(), &signature) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "failed to verify signature");
                false
            }
        }
    }

    /// Rotates the challenge every `period` until `shutdown` resolves.
    pub async fn run_rotation(
        self: Arc<Self>,
        period: Duration,
        shutdown: impl Future<Output = ()> + Send,
    ) {
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.rotate();
                    debug!("rotated superadmin challenge");
                }
                () = &mut shutdown => {
                    info!("superadmin challenge rotation stopped");
                    return;
                }
            }
        }
    }
}

/// Parses a PEM RSA public key in PKCS#1 (`RSA PUBLIC KEY`) or SPKI (`PUBLIC KEY`) form.
///
/// # Errors
///
/// Returns [`AuthenticationError::InvalidPublicKey`] if neither form parses.
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey, Report<AuthenticationError>> {
    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|e| {
            AuthenticationError::InvalidPublicKey {
                reason: e.to_string(),
            }
            .into()
        })
}

/// Reads and parses a PEM RSA public key file.
///
/// # Errors
///
/// Returns [`AuthenticationError::InvalidPublicKey`] if the file cannot be
/// read or does not hold a public key.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, Report<AuthenticationError>> {
    let pem = std::fs::read_to_string(path).map_err(|e| AuthenticationError::InvalidPublicKey {
        reason: format!("{}: {e}", path.display()),
    })?;
    parse_public_key(&pem)
}
