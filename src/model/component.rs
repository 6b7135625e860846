//! Component records as they appear in CycloneDX JSON.
//!
//! Only the keys the merge logic reasons about are typed; every other key is
//! kept in an ordered `extensions` map so that documents round-trip without
//! losing vendor data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A CycloneDX component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swid: Option<Swid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<Hash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    /// All remaining keys (`description`, `supplier`, `scope`, ...)
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Component {
    /// Create a component with just a type and name
    pub fn new(component_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            bom_ref: None,
            group: None,
            name: name.into(),
            version: None,
            purl: None,
            cpe: None,
            swid: None,
            licenses: Vec::new(),
            hashes: Vec::new(),
            external_references: Vec::new(),
            properties: Vec::new(),
            components: Vec::new(),
            extensions: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_bom_ref(mut self, bom_ref: impl Into<String>) -> Self {
        self.bom_ref = Some(bom_ref.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.purl = Some(purl.into());
        self
    }

    #[must_use]
    pub fn with_cpe(mut self, cpe: impl Into<String>) -> Self {
        self.cpe = Some(cpe.into());
        self
    }

    /// Set an untyped field such as `description`
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Copy of this component without its nested `components`
    pub fn shallow_clone(&self) -> Self {
        Self {
            component_type: self.component_type.clone(),
            bom_ref: self.bom_ref.clone(),
            group: self.group.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            purl: self.purl.clone(),
            cpe: self.cpe.clone(),
            swid: self.swid.clone(),
            licenses: self.licenses.clone(),
            hashes: self.hashes.clone(),
            external_references: self.external_references.clone(),
            properties: self.properties.clone(),
            components: Vec::new(),
            extensions: self.extensions.clone(),
        }
    }

    /// Human-readable label used in logs and warnings
    pub fn display_name(&self) -> String {
        if let Some(purl) = &self.purl {
            return purl.clone();
        }
        let mut label = String::new();
        if let Some(group) = &self.group {
            label.push_str(group);
            label.push('/');
        }
        label.push_str(&self.name);
        if let Some(version) = &self.version {
            label.push('@');
            label.push_str(version);
        }
        label
    }

    /// Depth-first iteration over this component and all nested components
    pub fn walk(&self) -> impl Iterator<Item = &Component> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.components.iter().rev());
            Some(next)
        })
    }
}

/// Software identification tag reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swid {
    pub tag_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// One entry of a `licenses` array: either a license or an SPDX expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl LicenseChoice {
    /// A license referenced by SPDX id
    pub fn spdx(id: impl Into<String>) -> Self {
        Self {
            license: Some(License {
                id: Some(id.into()),
                name: None,
                extensions: IndexMap::new(),
            }),
            expression: None,
            extensions: IndexMap::new(),
        }
    }

    /// An SPDX license expression
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            license: None,
            expression: Some(expression.into()),
            extensions: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hash {
    pub alg: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReference {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub url: String,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Array entries that are de-duplicated by a field-specific key when merged.
pub trait KeyedEntry {
    /// Key under which two entries are considered the same entry
    fn merge_key(&self) -> Option<String>;

    /// Whether a second entry with the same key but different content is a conflict
    fn reports_conflicts() -> bool {
        false
    }
}

impl KeyedEntry for LicenseChoice {
    fn merge_key(&self) -> Option<String> {
        if let Some(license) = &self.license {
            if let Some(id) = &license.id {
                return Some(format!("id:{id}"));
            }
            if let Some(name) = &license.name {
                return Some(format!("name:{name}"));
            }
        }
        self.expression.as_ref().map(|e| format!("expression:{e}"))
    }
}

impl KeyedEntry for ExternalReference {
    fn merge_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.ref_type, self.url))
    }
}

impl KeyedEntry for Property {
    fn merge_key(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn reports_conflicts() -> bool {
        true
    }
}

impl KeyedEntry for Hash {
    fn merge_key(&self) -> Option<String> {
        Some(self.alg.clone())
    }

    fn reports_conflicts() -> bool {
        true
    }
}
