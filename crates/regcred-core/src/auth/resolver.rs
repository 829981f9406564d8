//! Credential resolver for OCI registries
//!
//! Holds an ordered list of credential sources and returns the first bundle
//! any of them produces. Sources are never merged: the first match overrides
//! everything below it, and any source error aborts the scan.

use std::collections::HashSet;
use std::fmt;
use tokio_util::sync::CancellationToken;

use super::bundle::CredentialBundle;
use super::docker_config::DockerConfigSource;
use super::env::EnvironmentSource;
use super::properties::{FieldExtractor, Kind, PropertyBag};
use super::settings::SettingsSource;
use super::source::CredentialSource;
use super::sysprops::PropertiesSource;
use crate::config::{AuthConfig, SourceKind};
use crate::decrypt::{Cancellable, Decryptor};
use crate::error::{AuthError, Result};

/// Resolves registry credentials across prioritized sources
pub struct Resolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("sources", &self.source_ids())
            .finish()
    }
}

impl Resolver {
    /// Create a resolver; `sources` is in priority order
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Assemble the configured sources in their declared order.
    ///
    /// `overrides` are merged over `config.properties` for the `sysprops`
    /// source. The environment is captured once, here.
    pub fn from_config(config: &AuthConfig, overrides: &PropertyBag) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut sources: Vec<Box<dyn CredentialSource>> = Vec::with_capacity(config.sources.len());

        for kind in &config.sources {
            if !seen.insert(*kind) {
                return Err(AuthError::config(
                    kind.id(),
                    "source is listed more than once",
                ));
            }

            let source: Box<dyn CredentialSource> = match kind {
                SourceKind::Sysprops => Box::new(PropertiesSource::with_extractor(
                    config.properties.clone().merged_with(overrides),
                    FieldExtractor::with_prefix(config.property_prefix.as_deref()),
                )),
                SourceKind::Env => Box::new(EnvironmentSource::from_process_env(&config.env_prefix)),
                SourceKind::Settings => Box::new(SettingsSource::new(config.servers.clone())),
                SourceKind::Docker => Box::new(DockerConfigSource::load(
                    config.docker_config_path.as_deref(),
                )?),
            };
            sources.push(source);
        }

        tracing::debug!(sources = ?config.sources, "credential sources assembled");

        Ok(Self::new(sources))
    }

    /// Source ids in priority order
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Resolve credentials for `registry`.
    ///
    /// Returns `Ok(None)` when every source abstains, leaving it to the caller
    /// whether anonymous access is acceptable.
    pub fn resolve(
        &self,
        kind: Kind,
        user: Option<&str>,
        registry: &str,
        decryptor: &dyn Decryptor,
    ) -> Result<Option<CredentialBundle>> {
        self.resolve_with_cancel(kind, user, registry, decryptor, &CancellationToken::new())
    }

    /// Resolve credentials, aborting with [`AuthError::Cancelled`] once
    /// `cancel` fires.
    ///
    /// The token is checked before each source and passed on to the
    /// decryptor.
    pub fn resolve_with_cancel(
        &self,
        kind: Kind,
        user: Option<&str>,
        registry: &str,
        decryptor: &dyn Decryptor,
        cancel: &CancellationToken,
    ) -> Result<Option<CredentialBundle>> {
        let decryptor = Cancellable::new(decryptor, cancel);

        for source in &self.sources {
            if cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }

            match source.create(kind, user, registry, &decryptor) {
                Ok(Some(bundle)) => {
                    tracing::debug!(
                        source = source.id(),
                        kind = %kind,
                        registry = registry,
                        "registry credentials resolved"
                    );
                    return Ok(Some(bundle));
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(
                        source = source.id(),
                        kind = %kind,
                        registry = registry,
                        error = %e,
                        "credential source failed"
                    );
                    return Err(e);
                }
            }
        }

        tracing::debug!(kind = %kind, registry = registry, "no credentials found");
        Ok(None)
    }

    /// Resolve credentials for the registry an image reference points at
    pub fn resolve_for_image(
        &self,
        kind: Kind,
        user: Option<&str>,
        image: &str,
        decryptor: &dyn Decryptor,
    ) -> Result<Option<CredentialBundle>> {
        let registry = extract_registry(image);
        self.resolve(kind, user, &registry, decryptor)
    }
}

/// Extract registry hostname from image reference
///
/// Examples:
/// - "ubuntu:latest" -> "docker.io"
/// - "ghcr.io/owner/repo:tag" -> "ghcr.io"
/// - "localhost:5000/image" -> "localhost:5000"
pub fn extract_registry(image: &str) -> String {
    // Remove digest if present
    let image_without_digest = image.split('@').next().unwrap_or(image);

    // If there's no '/', it's just an image name, assume Docker Hub
    let Some((first_part, _)) = image_without_digest.split_once('/') else {
        return "docker.io".to_string();
    };

    // A hostname contains '.' or ':' or is 'localhost'
    if first_part.contains('.') || first_part.contains(':') || first_part == "localhost" {
        first_part.to_string()
    } else {
        "docker.io".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decrypt::IdentityDecryptor;
    use crate::error::DecryptError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Source returning a fixed outcome and counting its calls
    struct Fixed {
        id: &'static str,
        outcome: fn() -> Result<Option<CredentialBundle>>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn boxed(
            id: &'static str,
            outcome: fn() -> Result<Option<CredentialBundle>>,
        ) -> (Box<dyn CredentialSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Box::new(Self {
                id,
                outcome,
                calls: calls.clone(),
            });
            (source, calls)
        }
    }

    impl CredentialSource for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn create(
            &self,
            _kind: Kind,
            _user: Option<&str>,
            _registry: &str,
            _decryptor: &dyn Decryptor,
        ) -> Result<Option<CredentialBundle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    #[test]
    fn test_extract_registry() {
        assert_eq!(extract_registry("ubuntu"), "docker.io");
        assert_eq!(extract_registry("ubuntu:latest"), "docker.io");
        assert_eq!(extract_registry("library/ubuntu"), "docker.io");
        assert_eq!(extract_registry("ghcr.io/owner/repo"), "ghcr.io");
        assert_eq!(extract_registry("ghcr.io/owner/repo:tag"), "ghcr.io");
        assert_eq!(extract_registry("localhost:5000/image"), "localhost:5000");
        assert_eq!(
            extract_registry("myregistry.com/path/to/image:v1.0"),
            "myregistry.com"
        );
        assert_eq!(
            extract_registry("ghcr.io/owner/repo@sha256:abcd"),
            "ghcr.io"
        );
    }

    #[test]
    fn test_first_match_wins_without_merging() {
        let (first, _) = Fixed::boxed("first", || {
            Ok(Some(CredentialBundle::new(
                Some("a".to_string()),
                Some("pa".to_string()),
                None,
                None,
            )))
        });
        let (second, second_calls) = Fixed::boxed("second", || {
            Ok(Some(CredentialBundle::new(
                Some("b".to_string()),
                Some("pb".to_string()),
                Some("b@example.com".to_string()),
                Some("tok".to_string()),
            )))
        });

        let resolver = Resolver::new(vec![first, second]);
        let bundle = resolver
            .resolve(Kind::Push, None, "ghcr.io", &IdentityDecryptor)
            .unwrap()
            .unwrap();

        assert_eq!(bundle, CredentialBundle::basic("a", "pa"));
        assert_eq!(bundle.email(), None);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_abstaining_sources_fall_through() {
        let (empty, empty_calls) = Fixed::boxed("empty", || Ok(None));
        let (found, _) = Fixed::boxed("found", || Ok(Some(CredentialBundle::basic("u", "p"))));

        let resolver = Resolver::new(vec![empty, found]);
        let bundle = resolver
            .resolve(Kind::Pull, None, "ghcr.io", &IdentityDecryptor)
            .unwrap();

        assert_eq!(bundle, Some(CredentialBundle::basic("u", "p")));
        assert_eq!(empty_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_abstain_yields_none() {
        let (a, _) = Fixed::boxed("a", || Ok(None));
        let (b, _) = Fixed::boxed("b", || Ok(None));

        let resolver = Resolver::new(vec![a, b]);
        assert!(resolver
            .resolve(Kind::Pull, None, "ghcr.io", &IdentityDecryptor)
            .unwrap()
            .is_none());
        assert!(Resolver::new(Vec::new())
            .resolve(Kind::Pull, None, "ghcr.io", &IdentityDecryptor)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_error_aborts_scan() {
        let (broken, _) = Fixed::boxed("broken", || {
            Err(AuthError::MissingPassword {
                source_id: "broken".to_string(),
                username: "bot".to_string(),
            })
        });
        let (fallback, fallback_calls) =
            Fixed::boxed("fallback", || Ok(Some(CredentialBundle::basic("u", "p"))));

        let resolver = Resolver::new(vec![broken, fallback]);
        let err = resolver
            .resolve(Kind::Push, None, "ghcr.io", &IdentityDecryptor)
            .unwrap_err();

        assert!(matches!(err, AuthError::MissingPassword { .. }));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decryption_error_aborts_scan() {
        let props: PropertyBag = [("username", "bot"), ("password", "x")]
            .into_iter()
            .collect();
        let (fallback, fallback_calls) =
            Fixed::boxed("fallback", || Ok(Some(CredentialBundle::basic("u", "p"))));

        let resolver = Resolver::new(vec![
            Box::new(PropertiesSource::new(props)) as Box<dyn CredentialSource>,
            fallback,
        ]);
        let failing = |_: &str| -> std::result::Result<String, DecryptError> {
            Err(DecryptError::Failed("bad key".to_string()))
        };
        let err = resolver
            .resolve(Kind::Push, None, "ghcr.io", &failing)
            .unwrap_err();

        assert!(matches!(err, AuthError::Decryption { ref source_id, .. } if source_id == "sysprops"));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_before_scan() {
        let (found, calls) = Fixed::boxed("found", || Ok(Some(CredentialBundle::basic("u", "p"))));
        let resolver = Resolver::new(vec![found]);

        let token = CancellationToken::new();
        token.cancel();
        let err = resolver
            .resolve_with_cancel(Kind::Push, None, "ghcr.io", &IdentityDecryptor, &token)
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_during_decryption() {
        let props: PropertyBag = [("username", "bot"), ("password", "pw")].into_iter().collect();
        let resolver = Resolver::new(vec![Box::new(PropertiesSource::new(props))]);

        let token = CancellationToken::new();
        let cancelling = {
            let token = token.clone();
            move |s: &str| -> std::result::Result<String, DecryptError> {
                token.cancel();
                Ok(s.to_string())
            }
        };

        let err = resolver
            .resolve_with_cancel(Kind::Push, None, "ghcr.io", &cancelling, &token)
            .unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
    }

    #[test]
    fn test_resolve_for_image() {
        let resolver = Resolver::new(vec![Box::new(SettingsSource::new(vec![
            crate::auth::ServerEntry {
                registry: "docker.io".to_string(),
                username: Some("hub".to_string()),
                password: Some("hub_pass".to_string()),
                ..Default::default()
            },
        ]))]);

        let bundle = resolver
            .resolve_for_image(Kind::Pull, None, "ubuntu:latest", &IdentityDecryptor)
            .unwrap();
        assert_eq!(bundle, Some(CredentialBundle::basic("hub", "hub_pass")));

        assert!(resolver
            .resolve_for_image(Kind::Pull, None, "ghcr.io/owner/repo", &IdentityDecryptor)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_from_config_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuthConfig {
            sources: vec![SourceKind::Docker, SourceKind::Settings, SourceKind::Sysprops],
            docker_config_path: Some(dir.path().join("config.json")),
            ..Default::default()
        };

        let resolver = Resolver::from_config(&config, &PropertyBag::new()).unwrap();
        assert_eq!(resolver.source_ids(), vec!["docker", "settings", "sysprops"]);
    }

    #[test]
    fn test_from_config_rejects_duplicates() {
        let config = AuthConfig {
            sources: vec![SourceKind::Settings, SourceKind::Settings],
            ..Default::default()
        };

        let err = Resolver::from_config(&config, &PropertyBag::new()).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("settings"));
    }

    #[test]
    fn test_from_config_overrides_properties() {
        let mut properties = PropertyBag::new();
        properties.insert("docker.username", "from_config");
        properties.insert("docker.password", "pw");
        let config = AuthConfig {
            sources: vec![SourceKind::Sysprops],
            property_prefix: Some("docker".to_string()),
            properties,
            ..Default::default()
        };
        let overrides: PropertyBag = [("docker.push.username", "from_cli")].into_iter().collect();

        let resolver = Resolver::from_config(&config, &overrides).unwrap();

        let push = resolver
            .resolve(Kind::Push, None, "ghcr.io", &IdentityDecryptor)
            .unwrap()
            .unwrap();
        assert_eq!(push.username(), Some("from_cli"));

        let pull = resolver
            .resolve(Kind::Pull, None, "ghcr.io", &IdentityDecryptor)
            .unwrap()
            .unwrap();
        assert_eq!(pull.username(), Some("from_config"));
    }
}
