//! The top-level CycloneDX document.

use super::{Component, SpecVersion, Vulnerability};
use crate::error::{ParseErrorKind, Result, SbomMergeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected value of `bomFormat`
pub const BOM_FORMAT: &str = "CycloneDX";

/// A CycloneDX BOM in JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bom {
    pub bom_format: String,
    pub spec_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compositions: Vec<Composition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,
    /// Remaining top-level keys (`$schema`, `externalReferences`, `annotations`, ...)
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Bom {
    /// An empty BOM of the given version
    pub fn new(spec_version: SpecVersion) -> Self {
        Self {
            bom_format: BOM_FORMAT.to_string(),
            spec_version: spec_version.to_string(),
            serial_number: None,
            version: Some(1),
            metadata: None,
            components: Vec::new(),
            services: Vec::new(),
            dependencies: Vec::new(),
            compositions: Vec::new(),
            vulnerabilities: Vec::new(),
            extensions: IndexMap::new(),
        }
    }

    /// Parsed `specVersion`
    pub fn parsed_spec_version(&self) -> Result<SpecVersion> {
        self.spec_version.parse().map_err(|_| {
            SbomMergeError::parse(
                "reading specVersion",
                ParseErrorKind::InvalidSpecVersion(self.spec_version.clone()),
            )
        })
    }

    /// Stamp `specVersion`, rewriting `$schema` when the document carries one
    pub fn set_spec_version(&mut self, version: SpecVersion) {
        self.spec_version = version.to_string();
        if let Some(schema) = self.extensions.get_mut("$schema") {
            *schema = Value::String(version.schema_url());
        }
    }

    /// `metadata.component`, the product this BOM describes
    pub fn root_component(&self) -> Option<&Component> {
        self.metadata.as_ref().and_then(|m| m.component.as_ref())
    }

    /// Every component of the document, root first, nested ones included
    pub fn all_components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.root_component()
            .into_iter()
            .flat_map(Component::walk)
            .chain(self.components.iter().flat_map(Component::walk))
    }

    /// Every service of the document, nested ones included
    pub fn all_services(&self) -> impl Iterator<Item = &Service> + '_ {
        self.services.iter().flat_map(Service::walk)
    }

    /// Every `bom-ref` declared by a component or service, in document order
    pub fn declared_refs(&self) -> impl Iterator<Item = &str> + '_ {
        self.all_components()
            .filter_map(|c| c.bom_ref.as_deref())
            .chain(self.all_services().filter_map(|s| s.bom_ref.as_deref()))
    }
}

/// Document metadata; only the root component is typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// A CycloneDX service. Services are carried through the merge unchanged
/// apart from de-duplication and reference registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Service {
    pub fn walk(&self) -> impl Iterator<Item = &Service> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.services.iter().rev());
            Some(next)
        })
    }
}

/// One node of the dependency graph and its outgoing relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Dependency {
    pub fn new(reference: impl Into<String>, depends_on: Vec<String>) -> Self {
        Self {
            reference: reference.into(),
            depends_on,
            provides: Vec::new(),
            extensions: IndexMap::new(),
        }
    }
}

/// A statement about the completeness of part of the BOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default = "unknown_aggregate")]
    pub aggregate: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assemblies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

fn unknown_aggregate() -> String {
    "unknown".to_string()
}

/// Parse a CycloneDX JSON document.
///
/// Rejects documents whose `bomFormat` is not `CycloneDX`.
pub fn parse_bom_str(content: &str) -> Result<Bom> {
    let bom: Bom = serde_json::from_str(content)?;
    if bom.bom_format != BOM_FORMAT {
        return Err(SbomMergeError::parse(
            "checking bomFormat",
            ParseErrorKind::NotCycloneDx(bom.bom_format),
        ));
    }
    Ok(bom)
}
