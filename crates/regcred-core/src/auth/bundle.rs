//! Resolved registry credentials

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;

use crate::decrypt::Decryptor;
use crate::error::DecryptError;

/// Immutable set of resolved registry credentials.
///
/// The password is always plaintext (already decrypted). Password and auth
/// token are held as [`SecretString`] and redacted from `Debug` output.
#[derive(Clone)]
pub struct CredentialBundle {
    username: Option<String>,
    password: Option<SecretString>,
    email: Option<String>,
    auth: Option<SecretString>,
}

impl CredentialBundle {
    /// Bundle from already-plaintext fields
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        email: Option<String>,
        auth: Option<String>,
    ) -> Self {
        Self {
            username,
            password: password.map(SecretString::from),
            email,
            auth: auth.map(SecretString::from),
        }
    }

    /// Convenience constructor for a username/password pair
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(Some(username.into()), Some(password.into()), None, None)
    }

    pub fn builder<'a>() -> CredentialBundleBuilder<'a> {
        CredentialBundleBuilder::default()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The decrypted password.
    ///
    /// Only call this where the value is actually handed to a transport.
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret())
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The pre-encoded auth token exactly as the source supplied it
    pub fn auth(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.expose_secret())
    }

    /// Token for `Authorization: Basic` style handshakes.
    ///
    /// A passthrough `auth` value is returned verbatim. Otherwise the token is
    /// synthesized as `base64(username:password)` when both are present.
    pub fn auth_token(&self) -> Option<String> {
        if let Some(auth) = self.auth() {
            return Some(auth.to_string());
        }

        match (self.username(), self.password()) {
            (Some(username), Some(password)) => Some(
                base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}")),
            ),
            _ => None,
        }
    }

    /// Value for the Docker `X-Registry-Auth` header: URL-safe base64 of a JSON
    /// object holding the present fields.
    pub fn to_header_value(&self) -> String {
        #[derive(Serialize)]
        struct Header<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            username: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            password: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            email: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            auth: Option<&'a str>,
        }

        let header = Header {
            username: self.username(),
            password: self.password(),
            email: self.email(),
            auth: self.auth(),
        };

        // A struct of optional strings always serializes
        let json = serde_json::to_vec(&header).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE.encode(json)
    }
}

impl PartialEq for CredentialBundle {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password() == other.password()
            && self.email == other.email
            && self.auth() == other.auth()
    }
}

impl Eq for CredentialBundle {}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email)
            .field("auth", &self.auth.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

enum PendingPassword<'a> {
    Plain(String),
    Encrypted {
        raw: String,
        decryptor: &'a dyn Decryptor,
    },
}

/// Accumulates credential fields and produces a [`CredentialBundle`].
///
/// An encrypted password is only decrypted in [`build`](Self::build), so a
/// decryptor failure surfaces there and nowhere else.
#[derive(Default)]
pub struct CredentialBundleBuilder<'a> {
    username: Option<String>,
    password: Option<PendingPassword<'a>>,
    email: Option<String>,
    auth: Option<String>,
}

impl<'a> CredentialBundleBuilder<'a> {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set a raw password to be decrypted with `decryptor` at build time
    pub fn password(mut self, raw: impl Into<String>, decryptor: &'a dyn Decryptor) -> Self {
        self.password = Some(PendingPassword::Encrypted {
            raw: raw.into(),
            decryptor,
        });
        self
    }

    /// Set a password that is already plaintext
    pub fn plain_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(PendingPassword::Plain(password.into()));
        self
    }

    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn auth(mut self, auth: Option<String>) -> Self {
        self.auth = auth;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.auth.is_none()
    }

    /// Build the bundle, or `None` if no field was set.
    ///
    /// # Errors
    /// Returns the decryptor's error if the password could not be decrypted.
    pub fn build(self) -> Result<Option<CredentialBundle>, DecryptError> {
        if self.is_empty() {
            return Ok(None);
        }

        let password = match self.password {
            Some(PendingPassword::Plain(password)) => Some(password),
            Some(PendingPassword::Encrypted { raw, decryptor }) => Some(decryptor.decrypt(&raw)?),
            None => None,
        };

        Ok(Some(CredentialBundle::new(
            self.username,
            password,
            self.email,
            self.auth,
        )))
    }
}
