//! Tamper-evident encoding of [`AuthenticationProperties`] into the `state`
//! query parameter.

use crate::error::{GoToAuthError, GoToAuthResult};
use crate::properties::AuthenticationProperties;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use rand::{RngCore, thread_rng};
use sha2::{Digest, Sha256};
use tracing::debug;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Protects and unprotects the property bag round-tripped through the provider.
pub trait StateDataFormat: Send + Sync {
    fn protect(&self, properties: &AuthenticationProperties) -> GoToAuthResult<String>;

    /// Returns `None` for absent, malformed or tampered state. Never errors.
    fn unprotect(&self, protected: &str) -> Option<AuthenticationProperties>;
}

/// XChaCha20-Poly1305 sealed state bound to a purpose string.
///
/// Layout before base64url: `nonce (24) || ciphertext || tag (16)`. The
/// purpose is authenticated as associated data, so state sealed for one
/// handler does not open under another purpose even with the same key.
pub struct SealedStateFormat {
    cipher: XChaCha20Poly1305,
    purpose: Vec<u8>,
}

impl SealedStateFormat {
    /// Derive the key from a host-supplied secret with SHA-256.
    pub fn from_secret(secret: &str, purpose: impl Into<String>) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        Self::with_key(digest.as_slice(), purpose)
    }

    /// Use a freshly generated key that lives as long as the process.
    pub fn random(purpose: impl Into<String>) -> Self {
        let mut key = [0u8; 32];
        thread_rng().fill_bytes(&mut key);
        Self::with_key(&key, purpose)
    }

    fn with_key(key: &[u8], purpose: impl Into<String>) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
            purpose: purpose.into().into_bytes(),
        }
    }

    /// The purpose string used by a handler with the given authentication type.
    pub fn purpose_for(authentication_type: &str) -> String {
        format!("ras-identity-goto/state/{authentication_type}/v1")
    }
}

impl StateDataFormat for SealedStateFormat {
    fn protect(&self, properties: &AuthenticationProperties) -> GoToAuthResult<String> {
        let plaintext = serde_json::to_vec(properties)?;
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: &self.purpose,
                },
            )
            .map_err(|e| GoToAuthError::StateProtection(e.to_string()))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    fn unprotect(&self, protected: &str) -> Option<AuthenticationProperties> {
        let raw = match URL_SAFE_NO_PAD.decode(protected.trim()) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("State is not valid base64url: {}", e);
                return None;
            }
        };

        if raw.len() < NONCE_LEN + TAG_LEN {
            debug!("State is too short to contain a sealed payload");
            return None;
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: &self.purpose,
                },
            )
            .ok()?;

        match serde_json::from_slice(&plaintext) {
            Ok(properties) => Some(properties),
            Err(e) => {
                debug!("Authenticated state did not contain properties: {}", e);
                None
            }
        }
    }
}
