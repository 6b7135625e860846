//! Vulnerability and VEX records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A CycloneDX vulnerability entry (also used for VEX statements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Aliases of this vulnerability in other databases
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<VulnerabilityReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affects: Vec<Affects>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Vulnerability {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            bom_ref: None,
            id: Some(id.into()),
            references: Vec::new(),
            analysis: None,
            affects: Vec::new(),
            extensions: IndexMap::new(),
        }
    }

    /// `id` plus the ids of all `references`
    pub fn identifiers(&self) -> BTreeSet<&str> {
        self.id
            .iter()
            .map(String::as_str)
            .chain(self.references.iter().map(|r| r.id.as_str()))
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// `analysis.state`, if any
    pub fn state(&self) -> Option<&str> {
        self.analysis.as_ref().and_then(|a| a.state.as_deref())
    }

    /// Affected refs, in document order
    pub fn affected_refs(&self) -> impl Iterator<Item = &str> {
        self.affects.iter().map(|a| a.reference.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReference {
    pub id: String,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// VEX analysis of a vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response: Vec<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// A component (by reference) affected by a vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affects {
    #[serde(rename = "ref")]
    pub reference: String,
    /// Version or range objects, kept verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<Value>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Affects {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            versions: Vec::new(),
            extensions: IndexMap::new(),
        }
    }
}
