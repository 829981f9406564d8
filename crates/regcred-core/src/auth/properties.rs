//! Key/value property bags and kind-scoped field lookup

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Direction of registry traffic a credential applies to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Push,
    Pull,
}

impl Kind {
    /// Lower-case name used in scoped property keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }

    pub fn all() -> [Kind; 2] {
        [Kind::Push, Kind::Pull]
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            other => Err(format!("unknown kind '{other}', expected push or pull")),
        }
    }
}

/// Credential fields recognized in property bags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Password,
    Email,
    Auth,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
            Self::Email => "email",
            Self::Auth => "auth",
        }
    }

    pub fn all() -> [Field; 4] {
        [Field::Username, Field::Password, Field::Email, Field::Auth]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only key/value configuration input
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    entries: BTreeMap<String, String>,
}

impl fmt::Debug for PropertyBag {
    // Values may be passwords, so only keys are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `KEY=VALUE` strings; later pairs override earlier ones.
    ///
    /// Returns the offending input if a pair has no `=` or an empty key.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bag = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            match assignment.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    bag.insert(key.trim(), value);
                }
                _ => {
                    // Only the key part is echoed, the value may be a secret
                    let key = assignment.split('=').next().unwrap_or_default();
                    return Err(format!("expected KEY=VALUE, got '{key}'"));
                }
            }
        }
        Ok(bag)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Entries of `other` take precedence over entries already present
    pub fn merged_with(mut self, other: &PropertyBag) -> Self {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Looks up credential fields with the kind-scoped-then-generic rule.
///
/// For kind `push` and field `password` the keys tried are
/// `[prefix.]push.password` and then `[prefix.]password`. Blank values count
/// as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldExtractor {
    prefix: Option<String>,
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor whose keys all start with `<prefix>.`; a blank prefix means none
    pub fn with_prefix(prefix: Option<impl Into<String>>) -> Self {
        let prefix = prefix
            .map(Into::into)
            .map(|p: String| p.trim().trim_end_matches('.').to_string())
            .filter(|p| !p.is_empty());
        Self { prefix }
    }

    /// The kind-scoped key for a field
    pub fn scoped_key(&self, kind: Kind, field: Field) -> String {
        self.key(&format!("{}.{}", kind.as_str(), field.as_str()))
    }

    /// The unscoped key for a field
    pub fn generic_key(&self, field: Field) -> String {
        self.key(field.as_str())
    }

    fn key(&self, suffix: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{suffix}"),
            None => suffix.to_string(),
        }
    }

    pub fn extract(&self, bag: &PropertyBag, kind: Kind, field: Field) -> Option<String> {
        non_blank(bag.get(&self.scoped_key(kind, field)))
            .or_else(|| non_blank(bag.get(&self.generic_key(field))))
            .map(str::to_string)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> PropertyBag {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_scoped_key_wins_over_generic() {
        let props = bag(&[("push.username", "A"), ("username", "B")]);
        let extractor = FieldExtractor::new();

        assert_eq!(
            extractor.extract(&props, Kind::Push, Field::Username).as_deref(),
            Some("A")
        );
        assert_eq!(
            extractor.extract(&props, Kind::Pull, Field::Username).as_deref(),
            Some("B")
        );
    }

    #[test]
    fn test_blank_values_are_absent() {
        let props = bag(&[("push.username", "  "), ("username", "B"), ("email", "")]);
        let extractor = FieldExtractor::new();

        assert_eq!(
            extractor.extract(&props, Kind::Push, Field::Username).as_deref(),
            Some("B")
        );
        assert_eq!(extractor.extract(&props, Kind::Push, Field::Email), None);
        assert_eq!(extractor.extract(&props, Kind::Pull, Field::Password), None);
    }

    #[test]
    fn test_prefixed_keys() {
        let props = bag(&[("docker.pull.username", "puller"), ("username", "ignored")]);
        let extractor = FieldExtractor::with_prefix(Some("docker."));

        assert_eq!(extractor.scoped_key(Kind::Pull, Field::Username), "docker.pull.username");
        assert_eq!(extractor.generic_key(Field::Auth), "docker.auth");
        assert_eq!(
            extractor.extract(&props, Kind::Pull, Field::Username).as_deref(),
            Some("puller")
        );
        assert_eq!(extractor.extract(&props, Kind::Push, Field::Username), None);

        assert_eq!(FieldExtractor::with_prefix(Some(" ")), FieldExtractor::new());
        assert_eq!(FieldExtractor::with_prefix(None::<String>), FieldExtractor::new());
    }

    #[test]
    fn test_from_assignments() {
        let props = PropertyBag::from_assignments(["push.username=bot", "password=a=b", "push.username=bot2"])
            .unwrap();
        assert_eq!(props.get("push.username"), Some("bot2"));
        assert_eq!(props.get("password"), Some("a=b"));
        assert_eq!(props.len(), 2);

        let err = PropertyBag::from_assignments(["novalue"]).unwrap_err();
        assert!(err.contains("novalue"));
        assert!(PropertyBag::from_assignments(["=x"]).is_err());
    }

    #[test]
    fn test_debug_hides_values() {
        let props = bag(&[("password", "hunter2")]);
        let debug = format!("{props:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("PUSH".parse::<Kind>().unwrap(), Kind::Push);
        assert_eq!(Kind::Pull.to_string(), "pull");
        assert!("delete".parse::<Kind>().is_err());
    }
}
