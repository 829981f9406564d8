//! `XChaCha20-Poly1305` encryption for stored registry passwords.
//!
//! Encrypted values are written as `{<base64>}` where the base64 payload is
//! `[nonce (24 bytes)][ciphertext + auth tag]`.

use std::path::Path;

use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{AuthError, DecryptError, Result};

/// Size of the XChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Size of the encryption key in bytes.
pub const KEY_SIZE: usize = 32;

/// Encryption key with secure memory handling.
///
/// The key bytes are wrapped in [`Zeroizing`] so they are zeroed from memory
/// when dropped.
#[derive(Clone)]
pub struct EncryptionKey {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

impl EncryptionKey {
    /// Generates a random 32-byte encryption key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key_bytes = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng.fill_bytes(key_bytes.as_mut());
        Self { key: key_bytes }
    }

    /// Creates an encryption key from raw bytes.
    ///
    /// # Errors
    /// Returns `DecryptError::InvalidKey` if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, DecryptError> {
        if bytes.len() != KEY_SIZE {
            return Err(DecryptError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut key_bytes = Zeroizing::new([0u8; KEY_SIZE]);
        key_bytes.copy_from_slice(bytes);
        Ok(Self { key: key_bytes })
    }

    /// Parses a key from its standard base64 form.
    pub fn from_base64(encoded: &str) -> std::result::Result<Self, DecryptError> {
        let bytes = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| DecryptError::InvalidKey(format!("key is not valid base64: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Loads a base64 key from a file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            AuthError::LoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?);

        Self::from_base64(&contents).map_err(|e| AuthError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Returns the key in standard base64 form.
    ///
    /// Use with caution - only for persisting the key securely.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.key.as_ref())
    }

    fn cipher(&self) -> std::result::Result<XChaCha20Poly1305, DecryptError> {
        XChaCha20Poly1305::new_from_slice(self.key.as_ref())
            .map_err(|e| DecryptError::InvalidKey(format!("failed to create cipher: {e}")))
    }

    /// Encrypts plaintext, returning `[nonce][ciphertext + tag]`.
    pub fn encrypt(&self, plaintext: &[u8]) -> std::result::Result<Vec<u8>, DecryptError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| DecryptError::Failed("encryption failed".to_string()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypts data produced by [`Self::encrypt`].
    ///
    /// # Errors
    /// Returns `DecryptError::Malformed` if the data is shorter than a nonce and
    /// `DecryptError::Failed` if decryption or authentication fails.
    pub fn decrypt(&self, data: &[u8]) -> std::result::Result<Zeroizing<Vec<u8>>, DecryptError> {
        if data.len() < NONCE_SIZE {
            return Err(DecryptError::Malformed(format!(
                "expected at least {NONCE_SIZE} bytes for nonce, got {}",
                data.len()
            )));
        }

        let cipher = self.cipher()?;
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = XNonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| DecryptError::Failed("authentication tag mismatch".to_string()))
    }

    /// Encrypts a password into its `{...}` wrapped textual form.
    pub fn encrypt_value(&self, plaintext: &str) -> std::result::Result<String, DecryptError> {
        let data = self.encrypt(plaintext.as_bytes())?;
        Ok(format!(
            "{{{}}}",
            base64::engine::general_purpose::STANDARD.encode(data)
        ))
    }

    /// Decrypts a `{...}` wrapped value back into plaintext.
    pub fn decrypt_value(&self, wrapped: &str) -> std::result::Result<String, DecryptError> {
        let payload = unwrap_encrypted(wrapped)
            .ok_or_else(|| DecryptError::Malformed("value is not wrapped in braces".to_string()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| DecryptError::Malformed("payload is not valid base64".to_string()))?;

        let plaintext = self.decrypt(&data)?;
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| DecryptError::Failed("plaintext is not valid UTF-8".to_string()))
    }
}

/// Returns the payload of a `{...}` wrapped value, or `None` if the value is
/// not wrapped.
pub fn unwrap_encrypted(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();
        assert_ne!(key.to_base64(), key2.to_base64());
    }

    #[test]
    fn test_from_bytes_invalid_length() {
        assert!(EncryptionKey::from_bytes(&[0u8; 16]).is_err());
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_err());
        assert!(EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn test_encrypt_decrypt_value() {
        let key = EncryptionKey::generate();
        let wrapped = key.encrypt_value("s3cret").unwrap();

        assert!(wrapped.starts_with('{') && wrapped.ends_with('}'));
        assert!(!wrapped.contains("s3cret"));
        assert_eq!(key.decrypt_value(&wrapped).unwrap(), "s3cret");
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let key = EncryptionKey::generate();
        let other = EncryptionKey::generate();
        let wrapped = key.encrypt_value("s3cret").unwrap();

        let err = other.decrypt_value(&wrapped).unwrap_err();
        assert!(matches!(err, DecryptError::Failed(_)));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[test]
    fn test_decrypt_malformed() {
        let key = EncryptionKey::generate();
        assert!(matches!(
            key.decrypt_value("plain"),
            Err(DecryptError::Malformed(_))
        ));
        assert!(matches!(
            key.decrypt_value("{not base64!}"),
            Err(DecryptError::Malformed(_))
        ));
        assert!(matches!(
            key.decrypt_value("{AAAA}"),
            Err(DecryptError::Malformed(_))
        ));
    }

    #[test]
    fn test_key_base64_roundtrip_through_file() {
        let key = EncryptionKey::generate();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key");
        std::fs::write(&path, format!("{}\n", key.to_base64())).unwrap();

        let loaded = EncryptionKey::load_from_path(&path).unwrap();
        let wrapped = key.encrypt_value("pw").unwrap();
        assert_eq!(loaded.decrypt_value(&wrapped).unwrap(), "pw");
    }

    #[test]
    fn test_unwrap_encrypted() {
        assert_eq!(unwrap_encrypted("{abc}"), Some("abc"));
        assert_eq!(unwrap_encrypted("  {abc} "), Some("abc"));
        assert_eq!(unwrap_encrypted("abc"), None);
        assert_eq!(unwrap_encrypted("{abc"), None);
    }
}
