//! Secret encryption for the guardrail file
//!
//! Routing secrets are stored as `enc:v1:<base64(nonce || ciphertext)>` using
//! ChaCha20-Poly1305. The 256-bit key is the SHA-256 digest of a configured
//! passphrase. A fresh random nonce is drawn for every encryption.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::application::ports::outbound::GuardrailError;

pub const ENCRYPTED_PREFIX: &str = "enc:v1:";

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENCRYPTED_PREFIX)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key))
    }

    /// Encrypt a plaintext secret
    ///
    /// Only values this cipher can already open pass through untouched. A plaintext
    /// that merely starts with the marker is encrypted like any other secret.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, GuardrailError> {
        if Self::is_encrypted(plaintext) && self.decrypt(plaintext).is_ok() {
            return Ok(plaintext.to_string());
        }

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| GuardrailError::Encryption("Failed to encrypt secret".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(blob)))
    }

    /// Decrypt a marked secret; unmarked values are returned as they are
    pub fn decrypt(&self, value: &str) -> Result<String, GuardrailError> {
        let Some(encoded) = value.strip_prefix(ENCRYPTED_PREFIX) else {
            return Ok(value.to_string());
        };

        let blob = STANDARD
            .decode(encoded)
            .map_err(|e| GuardrailError::Encryption(format!("Invalid secret encoding: {}", e)))?;
        if blob.len() <= NONCE_LEN {
            return Err(GuardrailError::Encryption("Encrypted secret is truncated".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                GuardrailError::Encryption("Failed to decrypt secret (wrong key?)".to_string())
            })?;
        String::from_utf8(plaintext)
            .map_err(|_| GuardrailError::Encryption("Decrypted secret is not UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = SecretCipher::from_passphrase("local-dev");
        let encrypted = cipher.encrypt("sk-live-abcdef").unwrap();

        assert!(SecretCipher::is_encrypted(&encrypted));
        assert!(!encrypted.contains("sk-live"));
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "sk-live-abcdef");
    }

    #[test]
    fn test_nonce_differs_per_encryption() {
        let cipher = SecretCipher::from_passphrase("local-dev");
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn test_already_encrypted_passes_through() {
        let cipher = SecretCipher::from_passphrase("local-dev");
        let encrypted = cipher.encrypt("secret").unwrap();
        assert_eq!(cipher.encrypt(&encrypted).unwrap(), encrypted);
        assert_eq!(cipher.decrypt("plain").unwrap(), "plain");
    }

    #[test]
    fn test_marker_lookalike_plaintext_is_encrypted() {
        let cipher = SecretCipher::from_passphrase("local-dev");
        let lookalike = "enc:v1:operator-chosen-secret";
        let encrypted = cipher.encrypt(lookalike).unwrap();

        assert_ne!(encrypted, lookalike);
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), lookalike);
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = SecretCipher::from_passphrase("one").encrypt("secret").unwrap();
        let result = SecretCipher::from_passphrase("two").decrypt(&encrypted);
        assert!(matches!(result, Err(GuardrailError::Encryption(_))));
    }
}
