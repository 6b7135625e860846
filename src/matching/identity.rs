//! Identity resolution.
//!
//! Identity keys are produced by a priority-ordered table of extractors, one
//! per identifier kind. The first extractor that succeeds yields the
//! component's identity key; all successful extractors together form its
//! [`ComponentIdentity`], which is what cross-kind comparison needs.

use crate::model::{Component, ComponentIdentity, Coordinates, IdentityKey, KeyKind, Service};

type Extractor = fn(&Component) -> Option<IdentityKey>;

/// Identifier extractors, most authoritative first.
const EXTRACTORS: [(KeyKind, Extractor); 4] = [
    (KeyKind::Purl, purl_key),
    (KeyKind::Cpe, cpe_key),
    (KeyKind::Swid, swid_key),
    (KeyKind::Coordinates, coordinates_key),
];

/// Outcome of resolving a component's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ComponentIdentity),
    /// None of the four identifier forms is present
    Unresolvable,
}

impl Resolution {
    pub fn identity(&self) -> Option<&ComponentIdentity> {
        match self {
            Self::Resolved(identity) => Some(identity),
            Self::Unresolvable => None,
        }
    }

    /// The component's identity key, i.e. its most authoritative key
    pub fn key(&self) -> Option<&IdentityKey> {
        self.identity().and_then(ComponentIdentity::primary)
    }

    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Something that can be matched by identity across documents.
pub trait Identifiable {
    fn resolve_identity(&self) -> Resolution;
}

impl Identifiable for Component {
    fn resolve_identity(&self) -> Resolution {
        identity_of(self)
    }
}

impl Identifiable for Service {
    fn resolve_identity(&self) -> Resolution {
        if self.name.is_empty() {
            return Resolution::Unresolvable;
        }
        Resolution::Resolved(ComponentIdentity::from_keys([IdentityKey::Coordinates(
            Coordinates::new(&self.name, self.group.as_deref(), self.version.as_deref()),
        )]))
    }
}

/// Compute all identity keys of a component.
pub fn identity_of(component: &Component) -> Resolution {
    let keys = EXTRACTORS
        .iter()
        .filter_map(|(_, extract)| extract(component));
    let identity = ComponentIdentity::from_keys(keys);
    if identity.is_empty() {
        Resolution::Unresolvable
    } else {
        Resolution::Resolved(identity)
    }
}

/// Whether two components denote the same entity.
///
/// Unresolvable components are never the same entity as anything.
pub fn same_entity(a: &Component, b: &Component) -> bool {
    match (identity_of(a), identity_of(b)) {
        (Resolution::Resolved(a), Resolution::Resolved(b)) => a.same_entity(&b),
        _ => false,
    }
}

/// Extract a single kind of key from a component
pub fn key_of(component: &Component, kind: KeyKind) -> Option<IdentityKey> {
    EXTRACTORS
        .iter()
        .find(|(k, _)| *k == kind)
        .and_then(|(_, extract)| extract(component))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn purl_key(component: &Component) -> Option<IdentityKey> {
    non_empty(component.purl.as_ref()).map(|p| IdentityKey::Purl(p.to_string()))
}

fn cpe_key(component: &Component) -> Option<IdentityKey> {
    non_empty(component.cpe.as_ref()).map(|c| IdentityKey::Cpe(c.to_string()))
}

fn swid_key(component: &Component) -> Option<IdentityKey> {
    let swid = component.swid.as_ref()?;
    let tag_id = non_empty(Some(&swid.tag_id))?;
    Some(IdentityKey::Swid {
        tag_id: tag_id.to_string(),
        version: swid.version.clone(),
    })
}

fn coordinates_key(component: &Component) -> Option<IdentityKey> {
    let name = non_empty(Some(&component.name))?;
    Some(IdentityKey::Coordinates(Coordinates::new(
        name,
        component.group.as_deref(),
        component.version.as_deref(),
    )))
}
