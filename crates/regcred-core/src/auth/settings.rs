//! Per-registry server credentials from configuration

use serde::{Deserialize, Serialize};
use std::fmt;

use super::bundle::CredentialBundle;
use super::properties::Kind;
use super::source::CredentialSource;
use crate::decrypt::Decryptor;
use crate::error::{AuthError, Result};

/// Credentials configured for one registry
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServerEntry {
    /// Registry hostname (e.g., "docker.io", "ghcr.io")
    pub registry: String,

    #[serde(default)]
    pub username: Option<String>,

    /// Raw password, decrypted at resolution time
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Pre-encoded auth token, passed through verbatim
    #[serde(default)]
    pub auth: Option<String>,

    /// Restrict the entry to one kind; applies to both when unset
    #[serde(default)]
    pub kind: Option<Kind>,
}

impl fmt::Debug for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEntry")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email)
            .field("auth", &self.auth.as_ref().map(|_| "[REDACTED]"))
            .field("kind", &self.kind)
            .finish()
    }
}

impl ServerEntry {
    fn has_credentials(&self) -> bool {
        non_blank(&self.username).is_some()
            || non_blank(&self.password).is_some()
            || non_blank(&self.auth).is_some()
    }
}

/// Canonical form of a registry name for matching.
///
/// Strips the scheme, any trailing slash and a Docker Hub `/v1/` path, and
/// folds the Docker Hub aliases into `docker.io`.
pub fn normalize_registry(registry: &str) -> String {
    let trimmed = registry.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme
        .trim_end_matches('/')
        .trim_end_matches("/v1")
        .trim_end_matches('/')
        .to_ascii_lowercase();

    match host.as_str() {
        "" | "index.docker.io" | "registry-1.docker.io" | "registry.hub.docker.com" => {
            "docker.io".to_string()
        }
        _ => host,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Looks up configured server entries by registry and optional user hint.
#[derive(Debug, Clone, Default)]
pub struct SettingsSource {
    servers: Vec<ServerEntry>,
}

impl SettingsSource {
    pub const ID: &'static str = "settings";

    pub fn new(servers: Vec<ServerEntry>) -> Self {
        Self { servers }
    }

    /// First entry for the registry that holds a username, password or auth
    /// token. Entries carrying only an email never match.
    fn find(&self, kind: Kind, user: Option<&str>, registry: &str) -> Option<&ServerEntry> {
        let wanted = normalize_registry(registry);

        self.servers.iter().find(|server| {
            server.has_credentials()
                && normalize_registry(&server.registry) == wanted
                && server.kind.map_or(true, |k| k == kind)
                && match (user, non_blank(&server.username)) {
                    (Some(hint), Some(username)) => hint == username,
                    _ => true,
                }
        })
    }
}

impl CredentialSource for SettingsSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn create(
        &self,
        kind: Kind,
        user: Option<&str>,
        registry: &str,
        decryptor: &dyn Decryptor,
    ) -> Result<Option<CredentialBundle>> {
        let Some(server) = self.find(kind, user, registry) else {
            return Ok(None);
        };

        let username = non_blank(&server.username);
        let password = non_blank(&server.password);

        if let (Some(username), None) = (username, password) {
            return Err(AuthError::MissingPassword {
                source_id: Self::ID.to_string(),
                username: username.to_string(),
            });
        }

        tracing::debug!(
            source = Self::ID,
            kind = %kind,
            registry = registry,
            server = %server.registry,
            "credentials from settings"
        );

        let mut builder = CredentialBundle::builder()
            .email(non_blank(&server.email).map(str::to_string))
            .auth(non_blank(&server.auth).map(str::to_string));
        if let Some(username) = username {
            builder = builder.username(username);
        }
        if let Some(password) = password {
            builder = builder.password(password, decryptor);
        }

        builder
            .build()
            .map_err(|e| AuthError::decryption(Self::ID, e))
    }
}
