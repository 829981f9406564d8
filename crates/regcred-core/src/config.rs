//! Configuration structures for credential resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::auth::env::DEFAULT_ENV_PREFIX;
use crate::auth::{DockerConfigSource, EnvironmentSource, PropertiesSource, PropertyBag, ServerEntry, SettingsSource};
use crate::error::{AuthError, Result};

/// Credential sources that can be enabled in configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Build-wide property bag
    Sysprops,
    /// Environment variables
    Env,
    /// Per-registry server entries
    Settings,
    /// Docker config.json
    Docker,
}

impl SourceKind {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Sysprops => PropertiesSource::ID,
            Self::Env => EnvironmentSource::ID,
            Self::Settings => SettingsSource::ID,
            Self::Docker => DockerConfigSource::ID,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Registry credential configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    /// Enabled sources in priority order (first match wins)
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceKind>,

    /// Optional prefix for property keys (`<prefix>.<kind>.<field>`)
    #[serde(default)]
    pub property_prefix: Option<String>,

    /// Prefix for environment variable names
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// Properties for the `sysprops` source
    #[serde(default)]
    pub properties: PropertyBag,

    /// Server entries for the `settings` source
    #[serde(default)]
    pub servers: Vec<ServerEntry>,

    /// Custom path to Docker config.json (if not using default)
    #[serde(default)]
    pub docker_config_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            property_prefix: None,
            env_prefix: default_env_prefix(),
            properties: PropertyBag::default(),
            servers: Vec::new(),
            docker_config_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_sources() -> Vec<SourceKind> {
    vec![
        SourceKind::Sysprops,
        SourceKind::Env,
        SourceKind::Settings,
        SourceKind::Docker,
    ]
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

impl AuthConfig {
    /// Load configuration from a YAML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuthError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents).map_err(|reason| AuthError::LoadFailed {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, String> {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(
            config.sources,
            vec![
                SourceKind::Sysprops,
                SourceKind::Env,
                SourceKind::Settings,
                SourceKind::Docker
            ]
        );
        assert_eq!(config.env_prefix, "REGISTRY");
        assert_eq!(config.logging.level, "info");
        assert_eq!(AuthConfig::from_yaml("{}").unwrap(), config);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
sources: [settings, docker]
property_prefix: docker
properties:
  push.username: bot
servers:
  - registry: ghcr.io
    username: bot
    password: "{AAAA}"
    kind: push
docker_config_path: /tmp/docker.json
logging:
  level: debug
  format: json
"#;

        let config = AuthConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sources, vec![SourceKind::Settings, SourceKind::Docker]);
        assert_eq!(config.property_prefix.as_deref(), Some("docker"));
        assert_eq!(config.properties.get("push.username"), Some("bot"));
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].kind, Some(crate::auth::Kind::Push));
        assert_eq!(config.docker_config_path, Some(PathBuf::from("/tmp/docker.json")));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(AuthConfig::from_yaml("sources: [keychain]").is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regcred.yaml");
        std::fs::write(&path, "env_prefix: CI_REGISTRY\n").unwrap();

        let config = AuthConfig::load_from_path(&path).unwrap();
        assert_eq!(config.env_prefix, "CI_REGISTRY");

        let err = AuthConfig::load_from_path(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, AuthError::LoadFailed { .. }));
    }
}
