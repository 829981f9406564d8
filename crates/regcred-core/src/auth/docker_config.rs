//! Docker config.json credentials
//!
//! Parses the `auths` section of the config file written by `docker login`
//! and other container tools, typically at `~/.docker/config.json`.
//! Credential helpers (`credsStore`, `credHelpers`) are not consulted.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::bundle::CredentialBundle;
use super::properties::Kind;
use super::source::CredentialSource;
use crate::decrypt::Decryptor;
use crate::error::{AuthError, Result};

/// Parsed Docker config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfigAuth {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

/// Authentication entry in Docker config
#[derive(Clone, Default, Deserialize)]
struct AuthEntry {
    /// Base64-encoded "username:password"
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
    email: Option<String>,
}

impl std::fmt::Debug for AuthEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEntry")
            .field("username", &self.username)
            .field("has_auth", &self.auth.is_some())
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

impl DockerConfigAuth {
    /// Load Docker config from the default location (~/.docker/config.json)
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path()?;
        Self::load_from_path(&path)
    }

    /// Load Docker config from a specific path; a missing file is empty
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no Docker config found");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| AuthError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::parse(&contents).map_err(|reason| AuthError::LoadFailed {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(contents).map_err(|e| format!("invalid Docker config: {e}"))
    }

    fn entry(&self, registry: &str) -> Option<&AuthEntry> {
        let registry = if registry.is_empty() {
            "docker.io"
        } else {
            registry
        };

        // Try exact match first
        if let Some(entry) = self.auths.get(registry) {
            return Some(entry);
        }

        let https_registry = format!("https://{}", registry);
        if let Some(entry) = self.auths.get(&https_registry) {
            return Some(entry);
        }

        if registry == "docker.io" || registry == "registry-1.docker.io" {
            return self.auths.get("https://index.docker.io/v1/");
        }

        None
    }

    /// Get (username, password) for a registry hostname
    pub fn get_credentials(&self, registry: &str) -> Option<(String, String)> {
        match Self::split_entry(self.entry(registry)?) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }

    /// Username and raw password of an entry, decoding `auth` when the plain
    /// fields are absent
    ///
    /// An explicit username without a password takes the password from a
    /// decodable `auth` value.
    fn split_entry(entry: &AuthEntry) -> (Option<String>, Option<String>) {
        let username = non_blank(&entry.username);
        let password = non_blank(&entry.password);
        let decoded = non_blank(&entry.auth)
            .as_deref()
            .and_then(Self::decode_auth);

        match (username, password, decoded) {
            (Some(username), Some(password), _) => (Some(username), Some(password)),
            (Some(username), None, Some((_, decoded_password))) => {
                (Some(username), Some(decoded_password))
            }
            (Some(username), None, None) => (Some(username), None),
            (None, _, Some((username, password))) => (Some(username), Some(password)),
            (None, password, None) => (None, password),
        }
    }

    /// Decode base64-encoded "username:password" auth string
    fn decode_auth(auth: &str) -> Option<(String, String)> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(auth.trim())
            .ok()?;

        let decoded_str = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded_str.split_once(':')?;

        if username.is_empty() {
            return None;
        }
        Some((username.to_string(), password.to_string()))
    }

    fn default_config_path() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os("DOCKER_CONFIG") {
            return Ok(PathBuf::from(dir).join("config.json"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| AuthError::config(DockerConfigSource::ID, "cannot determine home directory"))?;

        Ok(home.join(".docker").join("config.json"))
    }

    /// Get all configured registry keys
    pub fn registries(&self) -> Vec<String> {
        self.auths.keys().cloned().collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// Credential source backed by a Docker config file loaded once.
#[derive(Debug, Clone, Default)]
pub struct DockerConfigSource {
    config: DockerConfigAuth,
}

impl DockerConfigSource {
    pub const ID: &'static str = "docker";

    pub fn new(config: DockerConfigAuth) -> Self {
        Self { config }
    }

    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => DockerConfigAuth::load_from_path(path)?,
            None => DockerConfigAuth::load()?,
        };
        Ok(Self::new(config))
    }
}

impl CredentialSource for DockerConfigSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn create(
        &self,
        kind: Kind,
        _user: Option<&str>,
        registry: &str,
        decryptor: &dyn Decryptor,
    ) -> Result<Option<CredentialBundle>> {
        let Some(entry) = self.config.entry(registry) else {
            return Ok(None);
        };

        let (username, password) = DockerConfigAuth::split_entry(entry);
        let Some(username) = username else {
            return Ok(None);
        };
        let Some(password) = password else {
            return Err(AuthError::MissingPassword {
                source_id: Self::ID.to_string(),
                username,
            });
        };

        tracing::debug!(
            source = Self::ID,
            kind = %kind,
            registry = registry,
            has_auth = entry.auth.is_some(),
            "credentials from Docker config"
        );

        CredentialBundle::builder()
            .username(username)
            .password(password, decryptor)
            .email(non_blank(&entry.email))
            .auth(non_blank(&entry.auth))
            .build()
            .map_err(|e| AuthError::decryption(Self::ID, e))
    }
}
