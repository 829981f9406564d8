//! Registry credential resolution
//!
//! Credentials are looked up in an ordered set of sources: a build-wide
//! property bag, environment variables, per-registry server entries and
//! Docker config.json. The first source with credentials wins.

pub mod bundle;
pub mod docker_config;
pub mod env;
pub mod properties;
pub mod resolver;
pub mod settings;
pub mod source;
pub mod sysprops;

pub use bundle::{CredentialBundle, CredentialBundleBuilder};
pub use docker_config::{DockerConfigAuth, DockerConfigSource};
pub use env::EnvironmentSource;
pub use properties::{Field, FieldExtractor, Kind, PropertyBag};
pub use resolver::{extract_registry, Resolver};
pub use settings::{normalize_registry, ServerEntry, SettingsSource};
pub use source::CredentialSource;
pub use sysprops::PropertiesSource;
