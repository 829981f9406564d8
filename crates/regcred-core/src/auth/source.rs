//! Credential source capability

use super::bundle::CredentialBundle;
use super::properties::{Field, FieldExtractor, Kind, PropertyBag};
use crate::decrypt::Decryptor;
use crate::error::{AuthError, Result};

/// One origin capable of producing registry credentials.
///
/// Implementations are immutable after construction and safe to call from
/// many threads at once.
pub trait CredentialSource: Send + Sync {
    /// Stable identifier, used for diagnostics only
    fn id(&self) -> &str;

    /// Attempt to produce credentials for `registry`.
    ///
    /// Returns `Ok(None)` when this source has nothing to offer and an error
    /// when it holds partial or undecryptable data. `user` is an optional
    /// hint for sources that keep several accounts per registry.
    fn create(
        &self,
        kind: Kind,
        user: Option<&str>,
        registry: &str,
        decryptor: &dyn Decryptor,
    ) -> Result<Option<CredentialBundle>>;
}

/// Build a bundle from a property bag.
///
/// Shared by the sources whose input is a flat key/value view.
pub(crate) fn bundle_from_properties(
    source_id: &str,
    props: &PropertyBag,
    extractor: &FieldExtractor,
    kind: Kind,
    registry: &str,
    decryptor: &dyn Decryptor,
) -> Result<Option<CredentialBundle>> {
    let Some(username) = extractor.extract(props, kind, Field::Username) else {
        return Ok(None);
    };

    let Some(password) = extractor.extract(props, kind, Field::Password) else {
        return Err(AuthError::MissingPassword {
            source_id: source_id.to_string(),
            username,
        });
    };

    let email = extractor.extract(props, kind, Field::Email);
    let auth = extractor.extract(props, kind, Field::Auth);

    tracing::debug!(
        source = source_id,
        kind = %kind,
        registry = registry,
        has_email = email.is_some(),
        has_auth = auth.is_some(),
        "credentials from {source_id} properties"
    );

    CredentialBundle::builder()
        .username(username)
        .password(password, decryptor)
        .email(email)
        .auth(auth)
        .build()
        .map_err(|e| AuthError::decryption(source_id, e))
}
