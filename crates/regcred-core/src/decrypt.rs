//! Password decryption capability
//!
//! Sources hand every raw password value to a [`Decryptor`] exactly once.
//! Usernames, emails and auth tokens are never decrypted.

use tokio_util::sync::CancellationToken;

use crate::encryption::{unwrap_encrypted, EncryptionKey};
use crate::error::DecryptError;

/// Turns a stored secret into plaintext.
///
/// Implementations may block (for example on an external unwrap call). Any
/// closure `Fn(&str) -> Result<String, DecryptError>` is a decryptor.
pub trait Decryptor: Send + Sync {
    /// Decrypt a raw secret value.
    fn decrypt(&self, secret: &str) -> Result<String, DecryptError>;

    /// Decrypt with a cancellation token.
    ///
    /// The default checks the token once before delegating to
    /// [`Decryptor::decrypt`]. Long-running implementations should override
    /// this and poll the token while they work.
    fn decrypt_with_cancel(
        &self,
        secret: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DecryptError> {
        if cancel.is_cancelled() {
            return Err(DecryptError::Cancelled);
        }
        self.decrypt(secret)
    }
}

impl<F> Decryptor for F
where
    F: Fn(&str) -> Result<String, DecryptError> + Send + Sync,
{
    fn decrypt(&self, secret: &str) -> Result<String, DecryptError> {
        self(secret)
    }
}

/// Decryptor that returns every value unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDecryptor;

impl Decryptor for IdentityDecryptor {
    fn decrypt(&self, secret: &str) -> Result<String, DecryptError> {
        Ok(secret.to_string())
    }
}

/// Decrypts `{...}` wrapped values with an [`EncryptionKey`].
///
/// Values that are not wrapped in braces are plaintext and pass through.
#[derive(Debug, Clone)]
pub struct KeyDecryptor {
    key: EncryptionKey,
}

impl KeyDecryptor {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl Decryptor for KeyDecryptor {
    fn decrypt(&self, secret: &str) -> Result<String, DecryptError> {
        if unwrap_encrypted(secret).is_none() {
            return Ok(secret.to_string());
        }
        self.key.decrypt_value(secret)
    }
}

/// Binds a decryptor to a cancellation token.
///
/// Sources only see a plain `&dyn Decryptor`; this adapter is how the
/// resolver threads its token through to the caller's decryptor. A token
/// cancelled while decryption was in flight still fails the call.
pub(crate) struct Cancellable<'a> {
    inner: &'a dyn Decryptor,
    cancel: &'a CancellationToken,
}

impl<'a> Cancellable<'a> {
    pub(crate) fn new(inner: &'a dyn Decryptor, cancel: &'a CancellationToken) -> Self {
        Self { inner, cancel }
    }
}

impl Decryptor for Cancellable<'_> {
    fn decrypt(&self, secret: &str) -> Result<String, DecryptError> {
        let plaintext = self.inner.decrypt_with_cancel(secret, self.cancel)?;
        if self.cancel.is_cancelled() {
            return Err(DecryptError::Cancelled);
        }
        Ok(plaintext)
    }
}
