//! Credentials from environment variables
//!
//! `REGISTRY_PUSH_USERNAME` maps to `push.username` and `REGISTRY_USERNAME` to
//! `username` (with the default `REGISTRY` prefix); lookup then follows the
//! same kind-scoped-then-generic rule as the property source. An empty
//! prefix matches the bare names (`USERNAME`, `PUSH_PASSWORD`).

use super::bundle::CredentialBundle;
use super::properties::{Field, FieldExtractor, Kind, PropertyBag};
use super::source::{bundle_from_properties, CredentialSource};
use crate::decrypt::Decryptor;
use crate::error::Result;

/// Default variable name prefix
pub const DEFAULT_ENV_PREFIX: &str = "REGISTRY";

/// Reads a snapshot of environment variables taken at construction.
#[derive(Debug, Clone)]
pub struct EnvironmentSource {
    prefix: String,
    props: PropertyBag,
    extractor: FieldExtractor,
}

impl EnvironmentSource {
    pub const ID: &'static str = "env";

    /// Build from an explicit set of variables
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let prefix = prefix.trim().trim_end_matches('_').to_ascii_uppercase();
        let mut props = PropertyBag::new();

        for (name, value) in vars {
            if let Some(key) = property_key(&prefix, name.as_ref()) {
                props.insert(key, value);
            }
        }

        Self {
            prefix,
            props,
            extractor: FieldExtractor::new(),
        }
    }

    /// Snapshot the current process environment
    pub fn from_process_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Map `<PREFIX>_[<KIND>_]<FIELD>` to its property key
fn property_key(prefix: &str, name: &str) -> Option<String> {
    let rest = if prefix.is_empty() {
        name
    } else {
        name.strip_prefix(prefix)?.strip_prefix('_')?
    };

    for field in Field::all() {
        let upper_field = field.as_str().to_ascii_uppercase();
        if rest == upper_field {
            return Some(field.as_str().to_string());
        }
        for kind in Kind::all() {
            let upper_kind = kind.as_str().to_ascii_uppercase();
            if rest == format!("{upper_kind}_{upper_field}") {
                return Some(format!("{}.{}", kind.as_str(), field.as_str()));
            }
        }
    }

    None
}

impl CredentialSource for EnvironmentSource {
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
        bundle_from_properties(
            Self::ID,
            &self.props,
            &self.extractor,
            kind,
            registry,
            decryptor,
        )
    }
}
