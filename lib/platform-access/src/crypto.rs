//! Randomness and the cipher that hides PKCE verifiers inside OAuth state.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rootcause::prelude::Report;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::AuthenticationError;

const NONCE_LEN: usize = 12;

/// Fills a buffer of `len` bytes from the operating system CSPRNG.
///
/// # Errors
///
/// Returns [`AuthenticationError::RandomSource`] if the OS source fails.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, Report<AuthenticationError>> {
    let mut buf = vec![0u8; len];
    getrandom::fill(&mut buf).map_err(|e| AuthenticationError::RandomSource {
        reason: e.to_string(),
    })?;
    Ok(buf)
}

/// Returns `len` random bytes encoded as unpadded base64url.
///
/// # Errors
///
/// Returns [`AuthenticationError::RandomSource`] if the OS source fails.
pub fn random_string(len: usize) -> Result<String, Report<AuthenticationError>> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes(len)?))
}

/// AES-256-GCM keyed by the SHA-256 digest of a shared secret.
///
/// Ciphertexts are `nonce || sealed` encoded as unpadded base64url, so any
/// server holding the secret can open state minted by any other.
#[derive(Clone)]
pub struct PkceCipher {
    key: [u8; 32],
}

impl fmt::Debug for PkceCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceCipher").finish_non_exhaustive()
    }
}

impl PkceCipher {
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: Sha256::digest(secret.as_ref()).into(),
        }
    }

    fn aead(&self) -> Result<Aes256Gcm, Report<AuthenticationError>> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| {
            AuthenticationError::Cipher {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Encrypts `plain` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Fails if the random source or the cipher fails.
    pub fn encrypt(&self, plain: &[u8]) -> Result<String, Report<AuthenticationError>> {
        let nonce = random_bytes(NONCE_LEN)?;
        let sealed = self
            .aead()?
            .encrypt(Nonce::from_slice(&nonce), plain)
            .map_err(|_| AuthenticationError::Cipher {
                reason: "encryption failed".to_string(),
            })?;

        let mut out = nonce;
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Opens a value produced by [`PkceCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Fails on malformed input, a different secret, or tampering.
    pub fn decrypt(&self, encrypted: &str) -> Result<Vec<u8>, Report<AuthenticationError>> {
        let raw = URL_SAFE_NO_PAD
            .decode(encrypted)
            .map_err(|e| AuthenticationError::Cipher {
                reason: e.to_string(),
            })?;
        if raw.len() <= NONCE_LEN {
            return Err(AuthenticationError::Cipher {
                reason: "malformed encrypted data".to_string(),
            }
            .into());
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .aead()?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| AuthenticationError::Cipher {
                reason: "message authentication failed".to_string(),
            })?;
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_strings_differ() {
        let a = random_string(32).expect("random");
        let b = random_string(32).expect("random");
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn round_trip_under_fixed_secret() {
        let cipher = PkceCipher::new("secret");
        let plain = "it is a secret message";
        let encrypted = cipher.encrypt(plain.as_bytes()).expect("encrypt");
        assert_ne!(encrypted, plain);
        let decrypted = cipher.decrypt(&encrypted).expect("decrypt");
        assert_eq!(decrypted, plain.as_bytes());
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let cipher = PkceCipher::new("secret");
        let a = cipher.encrypt(b"verifier").expect("encrypt");
        let b = cipher.encrypt(b"verifier").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_with_other_secret_fails() {
        let encrypted = PkceCipher::new("secret").encrypt(b"verifier").expect("encrypt");
        let err = PkceCipher::new("other").decrypt(&encrypted).expect_err("wrong key");
        assert!(err.to_string().contains("cipher failure"));
    }

    #[test]
    fn short_or_garbled_input_fails() {
        let cipher = PkceCipher::new("secret");
        assert!(cipher.decrypt("").is_err());
        assert!(cipher.decrypt("AAAA").is_err());
        assert!(cipher.decrypt("!!not base64!!").is_err());
    }

    #[test]
    fn verifier_encodes_to_pkce_minimum_length() {
        let verifier = random_bytes(32).expect("random");
        let cipher = PkceCipher::new("secret");
        let decrypted = cipher
            .decrypt(&cipher.encrypt(&verifier).expect("encrypt"))
            .expect("decrypt");
        assert!(URL_SAFE_NO_PAD.encode(decrypted).len() >= 43);
    }
}
