//! Identity keys derived from component identifiers.
//!
//! A component can carry up to four kinds of identifier. They are ranked
//! `purl > cpe > swid > coordinates`; [`KeyKind`] derives `Ord` in that
//! order so the lowest value is the most authoritative.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of identifier an [`IdentityKey`] was built from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Purl,
    Cpe,
    Swid,
    Coordinates,
}

impl KeyKind {
    /// All kinds, most authoritative first
    pub const PRIORITY: [Self; 4] = [Self::Purl, Self::Cpe, Self::Swid, Self::Coordinates];
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purl => write!(f, "purl"),
            Self::Cpe => write!(f, "cpe"),
            Self::Swid => write!(f, "swid"),
            Self::Coordinates => write!(f, "coordinates"),
        }
    }
}

/// Name/group/version fallback identity.
///
/// `name` and `group` are stored case-folded so that equality and hashing
/// ignore authoring differences in case; `version` is kept exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinates {
    name: String,
    group: Option<String>,
    version: Option<String>,
}

impl Coordinates {
    pub fn new(name: &str, group: Option<&str>, version: Option<&str>) -> Self {
        Self {
            name: name.to_lowercase(),
            group: group.filter(|g| !g.is_empty()).map(str::to_lowercase),
            version: version.map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(group) = &self.group {
            write!(f, "{group}/")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// A single comparable identity key.
///
/// Equality is exact for purl, cpe and swid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Purl(String),
    Cpe(String),
    Swid {
        tag_id: String,
        version: Option<String>,
    },
    Coordinates(Coordinates),
}

impl IdentityKey {
    pub const fn kind(&self) -> KeyKind {
        match self {
            Self::Purl(_) => KeyKind::Purl,
            Self::Cpe(_) => KeyKind::Cpe,
            Self::Swid { .. } => KeyKind::Swid,
            Self::Coordinates(_) => KeyKind::Coordinates,
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purl(p) => write!(f, "{p}"),
            Self::Cpe(c) => write!(f, "{c}"),
            Self::Swid { tag_id, version } => match version {
                Some(v) => write!(f, "swid:{tag_id}@{v}"),
                None => write!(f, "swid:{tag_id}"),
            },
            Self::Coordinates(c) => write!(f, "{c}"),
        }
    }
}

/// The full set of identity keys of one component, at most one per kind,
/// sorted by [`KeyKind`] priority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentIdentity {
    keys: Vec<IdentityKey>,
}

impl ComponentIdentity {
    /// Build from keys in any order; later duplicates of a kind are ignored.
    pub fn from_keys(keys: impl IntoIterator<Item = IdentityKey>) -> Self {
        let mut collected: Vec<IdentityKey> = Vec::with_capacity(KeyKind::PRIORITY.len());
        for key in keys {
            if !collected.iter().any(|k| k.kind() == key.kind()) {
                collected.push(key);
            }
        }
        collected.sort_by_key(IdentityKey::kind);
        Self { keys: collected }
    }

    /// The most authoritative key, i.e. the component's identity key
    pub fn primary(&self) -> Option<&IdentityKey> {
        self.keys.first()
    }

    pub fn key(&self, kind: KeyKind) -> Option<&IdentityKey> {
        self.keys.iter().find(|k| k.kind() == kind)
    }

    pub fn keys(&self) -> &[IdentityKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Highest-priority identifier kind present on both sides.
    pub fn common_kind(&self, other: &Self) -> Option<KeyKind> {
        KeyKind::PRIORITY
            .into_iter()
            .find(|kind| self.key(*kind).is_some() && other.key(*kind).is_some())
    }

    /// Whether both identities denote the same entity.
    ///
    /// Only the highest-priority kind available on both sides is compared;
    /// without a common kind the components are distinct.
    pub fn same_entity(&self, other: &Self) -> bool {
        self.common_kind(other)
            .is_some_and(|kind| self.key(kind) == other.key(kind))
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary() {
            Some(key) => write!(f, "{key}"),
            None => write!(f, "<unresolvable>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purl(p: &str) -> IdentityKey {
        IdentityKey::Purl(p.to_string())
    }

    fn coords(name: &str, version: &str) -> IdentityKey {
        IdentityKey::Coordinates(Coordinates::new(name, None, Some(version)))
    }

    #[test]
    fn test_keys_sorted_by_priority() {
        let id = ComponentIdentity::from_keys([
            coords("a", "1"),
            IdentityKey::Cpe("cpe:2.3:a:x:a:1".into()),
            purl("pkg:npm/a@1"),
        ]);
        let kinds: Vec<_> = id.keys().iter().map(IdentityKey::kind).collect();
        assert_eq!(kinds, vec![KeyKind::Purl, KeyKind::Cpe, KeyKind::Coordinates]);
        assert_eq!(id.primary(), Some(&purl("pkg:npm/a@1")));
    }

    #[test]
    fn test_highest_common_kind_decides() {
        // Same purl, different coordinates: purl decides.
        let a = ComponentIdentity::from_keys([purl("pkg:npm/a@1"), coords("a", "1")]);
        let b = ComponentIdentity::from_keys([purl("pkg:npm/a@1"), coords("renamed", "1")]);
        assert!(a.same_entity(&b));

        // Different purls, same coordinates: still distinct.
        let c = ComponentIdentity::from_keys([purl("pkg:npm/a@2"), coords("a", "1")]);
        assert!(!a.same_entity(&c));

        // Only coordinates in common.
        let d = ComponentIdentity::from_keys([coords("A", "1")]);
        assert!(a.same_entity(&d));
    }

    #[test]
    fn test_no_common_kind_is_distinct() {
        let a = ComponentIdentity::from_keys([purl("pkg:npm/a@1")]);
        let b = ComponentIdentity::from_keys([IdentityKey::Cpe("cpe:2.3:a:x:a:1".into())]);
        assert_eq!(a.common_kind(&b), None);
        assert!(!a.same_entity(&b));
    }

    #[test]
    fn test_coordinates_fold_case_but_not_version() {
        let a = Coordinates::new("Lodash", Some("Org"), Some("1.0"));
        let b = Coordinates::new("lodash", Some("org"), Some("1.0"));
        let c = Coordinates::new("lodash", Some("org"), Some("1.0-RC"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "org/lodash@1.0");
    }

    #[test]
    fn test_purl_comparison_is_case_sensitive() {
        let a = ComponentIdentity::from_keys([purl("pkg:npm/Foo@1")]);
        let b = ComponentIdentity::from_keys([purl("pkg:npm/foo@1")]);
        assert!(!a.same_entity(&b));
    }
}
