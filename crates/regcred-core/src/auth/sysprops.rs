//! Credentials from the build-wide property bag

use super::bundle::CredentialBundle;
use super::properties::{FieldExtractor, Kind, PropertyBag};
use super::source::{bundle_from_properties, CredentialSource};
use crate::decrypt::Decryptor;
use crate::error::Result;

/// Reads `[prefix.]<kind>.<field>` and `[prefix.]<field>` keys from a
/// property bag injected at construction.
#[derive(Debug, Clone)]
pub struct PropertiesSource {
    props: PropertyBag,
    extractor: FieldExtractor,
}

impl PropertiesSource {
    pub const ID: &'static str = "sysprops";

    pub fn new(props: PropertyBag) -> Self {
        Self {
            props,
            extractor: FieldExtractor::new(),
        }
    }

    pub fn with_extractor(props: PropertyBag, extractor: FieldExtractor) -> Self {
        Self { props, extractor }
    }
}

impl CredentialSource for PropertiesSource {
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
