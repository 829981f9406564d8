//! Error types for credential resolution
//!
//! Error messages may name a source id, a username or a file path, but never a
//! password, an auth token or any other secret material.

use std::path::PathBuf;
use thiserror::Error;

/// Credential resolution errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// A source found a username but no password to go with it
    #[error("source '{source_id}': no password provided for username {username}")]
    MissingPassword { source_id: String, username: String },

    /// Any other inconsistent or invalid configuration
    #[error("source '{source_id}': {reason}")]
    Config { source_id: String, reason: String },

    /// The decryptor rejected a password value
    #[error("source '{source_id}': failed to decrypt password: {reason}")]
    Decryption {
        source_id: String,
        #[source]
        reason: DecryptError,
    },

    /// Resolution was cancelled through its cancellation token
    #[error("credential resolution cancelled")]
    Cancelled,

    /// Failed to read or parse a configuration file
    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
}

impl AuthError {
    /// Create a configuration error attributed to a source
    pub fn config(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a decryptor failure, keeping cancellation distinguishable
    pub fn decryption(source_id: impl Into<String>, reason: DecryptError) -> Self {
        match reason {
            DecryptError::Cancelled => Self::Cancelled,
            reason => Self::Decryption {
                source_id: source_id.into(),
                reason,
            },
        }
    }

    /// Whether this error is a configuration problem rather than a decryption
    /// or cancellation failure
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingPassword { .. } | Self::Config { .. } | Self::LoadFailed { .. }
        )
    }
}

/// Decryptor failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// The value is not in the expected encrypted format
    #[error("malformed encrypted value: {0}")]
    Malformed(String),

    /// The value could not be decrypted or failed authentication
    #[error("decryption failed: {0}")]
    Failed(String),

    /// The key material is unusable
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Decryption was cancelled before it completed
    #[error("decryption cancelled")]
    Cancelled,
}

/// Result type alias for credential resolution
pub type Result<T, E = AuthError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_password_display() {
        let err = AuthError::MissingPassword {
            source_id: "sysprops".to_string(),
            username: "bot".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bot"));
        assert!(msg.contains("sysprops"));
        assert!(err.is_config());
    }

    #[test]
    fn test_cancelled_decryption_maps_to_cancelled() {
        let err = AuthError::decryption("env", DecryptError::Cancelled);
        assert!(matches!(err, AuthError::Cancelled));

        let err = AuthError::decryption("env", DecryptError::Failed("bad tag".to_string()));
        assert!(matches!(err, AuthError::Decryption { .. }));
        assert!(!err.is_config());
    }
}
