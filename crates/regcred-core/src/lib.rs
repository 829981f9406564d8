//! regcred core
//!
//! Resolves container registry credentials for push and pull operations from
//! an ordered list of sources, decrypting stored passwords and rejecting
//! inconsistent input before anything reaches a registry client.
//!
//! ## Features
//!
//! - `oci` - Conversion into `oci_client::secrets::RegistryAuth` (default)

pub mod auth;
pub mod config;
pub mod decrypt;
pub mod encryption;
pub mod error;

#[cfg(feature = "oci")]
pub mod oci;

pub use auth::*;
pub use config::*;
pub use decrypt::{Decryptor, IdentityDecryptor, KeyDecryptor};
pub use encryption::EncryptionKey;
pub use error::*;

// Re-export so callers can thread cancellation without a direct dependency
pub use tokio_util::sync::CancellationToken;
