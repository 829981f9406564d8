//! Hand-off to `oci_client`
//!
//! Turns a resolution result into the auth value the OCI distribution client
//! expects. No bundle means anonymous access.

use base64::Engine;
use oci_client::secrets::RegistryAuth;

use crate::auth::CredentialBundle;

/// Convert an optional bundle into `oci_client` auth.
///
/// Username/password pairs become `Basic`. A bundle holding only an auth
/// token is decoded as `base64(username:password)`; an opaque token that does
/// not decode that way falls back to `Anonymous`.
pub fn to_registry_auth(bundle: Option<&CredentialBundle>) -> RegistryAuth {
    let Some(bundle) = bundle else {
        return RegistryAuth::Anonymous;
    };

    if let (Some(username), Some(password)) = (bundle.username(), bundle.password()) {
        return RegistryAuth::Basic(username.to_string(), password.to_string());
    }

    match bundle.auth().and_then(decode_basic_token) {
        Some((username, password)) => RegistryAuth::Basic(username, password),
        None => {
            tracing::debug!("credential bundle has no usable basic credentials, using anonymous auth");
            RegistryAuth::Anonymous
        }
    }
}

fn decode_basic_token(token: &str) -> Option<(String, String)> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(token.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

impl From<&CredentialBundle> for RegistryAuth {
    fn from(bundle: &CredentialBundle) -> Self {
        to_registry_auth(Some(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_without_bundle() {
        assert!(matches!(to_registry_auth(None), RegistryAuth::Anonymous));
    }

    #[test]
    fn test_basic_auth() {
        let bundle = CredentialBundle::basic("user", "pass");
        match RegistryAuth::from(&bundle) {
            RegistryAuth::Basic(username, password) => {
                assert_eq!(username, "user");
                assert_eq!(password, "pass");
            }
            _ => panic!("Expected Basic auth"),
        }
    }

    #[test]
    fn test_token_only_bundle() {
        let bundle = CredentialBundle::new(None, None, None, Some("dXNlcm5hbWU6cGFzc3dvcmQ=".to_string()));
        match to_registry_auth(Some(&bundle)) {
            RegistryAuth::Basic(username, password) => {
                assert_eq!(username, "username");
                assert_eq!(password, "password");
            }
            _ => panic!("Expected Basic auth from token"),
        }

        let opaque = CredentialBundle::new(None, None, None, Some("opaque-token".to_string()));
        assert!(matches!(
            to_registry_auth(Some(&opaque)),
            RegistryAuth::Anonymous
        ));
    }
}
