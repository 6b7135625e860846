//! Field-level merging of two records judged to be the same entity.
//!
//! Rules, applied per field with the primary record first:
//!
//! - scalars: present-in-one wins; if both differ the primary value is kept
//!   and a `FieldConflict` is reported
//! - `licenses`, `externalReferences`, `properties`, `hashes`: union keyed
//!   by license id/name, type+url, property name and hash algorithm
//! - objects merge key by key, other arrays union by structural equality
//! - `purl`, `cpe` and `swid` are never overwritten; a missing identifier
//!   is adopted from the secondary record
//!
//! All functions here are pure: inputs are borrowed and never modified.

use super::warning::MergeWarning;
use crate::model::{
    Component, ExternalReference, Hash, KeyedEntry, LicenseChoice, Metadata, Property,
};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Metadata keys that legitimately differ between inputs and are not worth a warning.
pub const SILENT_METADATA_FIELDS: &[&str] = &["timestamp"];

type ArrayStrategy = fn(&mut FieldMerger, &str, &[Value], &[Value]) -> Option<Vec<Value>>;

/// Keyed-union strategies for untyped arrays, e.g. `metadata.properties`.
const KEYED_ARRAYS: [(&str, ArrayStrategy); 4] = [
    ("licenses", keyed_values::<LicenseChoice>),
    ("externalReferences", keyed_values::<ExternalReference>),
    ("properties", keyed_values::<Property>),
    ("hashes", keyed_values::<Hash>),
];

/// Merge two components. The result keeps the primary's `bom-ref`.
pub fn merge_components(
    primary: &Component,
    secondary: &Component,
) -> (Component, Vec<MergeWarning>) {
    let mut merger = FieldMerger::new(primary.display_name());
    let merged = merger.component(primary, secondary);
    (merged, merger.into_warnings())
}

/// Merge two metadata records, including their root components.
pub fn merge_metadata(
    primary: &Metadata,
    secondary: &Metadata,
) -> (Metadata, Vec<MergeWarning>) {
    let mut merger = FieldMerger::new("metadata").silence(SILENT_METADATA_FIELDS);
    let component = match (&primary.component, &secondary.component) {
        (Some(p), Some(s)) => Some(merger.component(p, s)),
        (p, s) => p.clone().or_else(|| s.clone()),
    };
    let extensions = merger.extensions(&primary.extensions, &secondary.extensions);
    (
        Metadata {
            component,
            extensions,
        },
        merger.into_warnings(),
    )
}

/// Merge two arbitrary JSON values using the generic rules.
pub fn merge_values(
    subject: impl Into<String>,
    field: &str,
    primary: &Value,
    secondary: &Value,
) -> (Value, Vec<MergeWarning>) {
    let mut merger = FieldMerger::new(subject);
    let merged = merger.value(field, primary, secondary);
    (merged, merger.into_warnings())
}

/// Union two arrays by structural equality, primary entries first.
pub fn union_values(primary: &[Value], secondary: &[Value]) -> Vec<Value> {
    union_by_eq(primary, secondary)
}

pub(crate) fn union_by_eq<T: Clone + PartialEq>(primary: &[T], secondary: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(primary.len() + secondary.len());
    for item in primary.iter().chain(secondary) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Accumulates warnings while merging the fields of one subject.
#[derive(Debug)]
pub struct FieldMerger {
    subject: String,
    silent: &'static [&'static str],
    warnings: Vec<MergeWarning>,
}

impl FieldMerger {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            silent: &[],
            warnings: Vec::new(),
        }
    }

    /// Top-level keys whose conflicts are resolved without a warning
    #[must_use]
    pub fn silence(mut self, fields: &'static [&'static str]) -> Self {
        self.silent = fields;
        self
    }

    pub fn into_warnings(self) -> Vec<MergeWarning> {
        self.warnings
    }

    fn conflict(&mut self, field: &str, kept: &Value, discarded: &Value) {
        self.warnings.push(MergeWarning::field_conflict(
            self.subject.clone(),
            field,
            &kept.to_string(),
            &discarded.to_string(),
        ));
    }

    fn conflict_str(&mut self, field: &str, kept: &str, discarded: &str) {
        self.conflict(
            field,
            &Value::String(kept.to_string()),
            &Value::String(discarded.to_string()),
        );
    }

    pub fn component(&mut self, primary: &Component, secondary: &Component) -> Component {
        Component {
            component_type: self.required(
                "type",
                &primary.component_type,
                &secondary.component_type,
            ),
            bom_ref: primary.bom_ref.clone().or_else(|| secondary.bom_ref.clone()),
            group: self.optional("group", &primary.group, &secondary.group, true),
            name: self.name(&primary.name, &secondary.name),
            version: self.optional("version", &primary.version, &secondary.version, false),
            purl: self.optional("purl", &primary.purl, &secondary.purl, false),
            cpe: self.optional("cpe", &primary.cpe, &secondary.cpe, false),
            swid: match (&primary.swid, &secondary.swid) {
                (Some(p), Some(s)) => {
                    if p != s {
                        self.conflict("swid", &to_json(p), &to_json(s));
                    }
                    Some(p.clone())
                }
                (p, s) => p.clone().or_else(|| s.clone()),
            },
            licenses: self.keyed("licenses", &primary.licenses, &secondary.licenses),
            hashes: self.keyed("hashes", &primary.hashes, &secondary.hashes),
            external_references: self.keyed(
                "externalReferences",
                &primary.external_references,
                &secondary.external_references,
            ),
            properties: self.keyed("properties", &primary.properties, &secondary.properties),
            components: union_by_eq(&primary.components, &secondary.components),
            extensions: self.extensions(&primary.extensions, &secondary.extensions),
        }
    }

    fn required(&mut self, field: &str, primary: &str, secondary: &str) -> String {
        if primary.is_empty() {
            return secondary.to_string();
        }
        if !secondary.is_empty() && primary != secondary {
            self.conflict_str(field, primary, secondary);
        }
        primary.to_string()
    }

    fn name(&mut self, primary: &str, secondary: &str) -> String {
        if primary.is_empty() {
            return secondary.to_string();
        }
        if !secondary.is_empty() && primary.to_lowercase() != secondary.to_lowercase() {
            self.conflict_str("name", primary, secondary);
        }
        primary.to_string()
    }

    fn optional(
        &mut self,
        field: &str,
        primary: &Option<String>,
        secondary: &Option<String>,
        fold_case: bool,
    ) -> Option<String> {
        match (primary, secondary) {
            (Some(p), Some(s)) => {
                let equal = if fold_case {
                    p.to_lowercase() == s.to_lowercase()
                } else {
                    p == s
                };
                if !equal {
                    self.conflict_str(field, p, s);
                }
                Some(p.clone())
            }
            (p, s) => p.clone().or_else(|| s.clone()),
        }
    }

    /// Keyed union of two typed arrays.
    ///
    /// The result holds at most one entry per key, the first one seen with
    /// primary entries first. Later entries under a taken key are dropped,
    /// with a conflict for kinds that report one when the content differs.
    pub fn keyed<T>(&mut self, field: &str, primary: &[T], secondary: &[T]) -> Vec<T>
    where
        T: KeyedEntry + Clone + PartialEq + Serialize,
    {
        let mut out: Vec<T> = Vec::with_capacity(primary.len() + secondary.len());
        let mut taken: HashMap<String, usize> = HashMap::new();

        for entry in primary.iter().chain(secondary) {
            if out.contains(entry) {
                continue;
            }
            let Some(key) = entry.merge_key() else {
                out.push(entry.clone());
                continue;
            };
            if let Some(&index) = taken.get(&key) {
                if T::reports_conflicts() {
                    let kept = to_json(&out[index]);
                    self.conflict(&format!("{field}[{key}]"), &kept, &to_json(entry));
                }
                continue;
            }
            taken.insert(key, out.len());
            out.push(entry.clone());
        }
        out
    }

    /// Merge two extension maps key by key, using the keyed strategies
    /// where a key names a known collection.
    pub fn extensions(
        &mut self,
        primary: &IndexMap<String, Value>,
        secondary: &IndexMap<String, Value>,
    ) -> IndexMap<String, Value> {
        let mut out = primary.clone();
        for (key, theirs) in secondary {
            let merged = match primary.get(key) {
                None => theirs.clone(),
                Some(ours) if self.silent.contains(&key.as_str()) => ours.clone(),
                Some(ours) => self.field(key, ours, theirs),
            };
            out.insert(key.clone(), merged);
        }
        out
    }

    fn field(&mut self, key: &str, primary: &Value, secondary: &Value) -> Value {
        if let (Value::Array(ours), Value::Array(theirs)) = (primary, secondary) {
            let strategy = KEYED_ARRAYS
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, strategy)| *strategy);
            if let Some(strategy) = strategy {
                if let Some(merged) = strategy(self, key, ours, theirs) {
                    return Value::Array(merged);
                }
            }
        }
        self.value(key, primary, secondary)
    }

    /// Generic structural merge of two JSON values.
    pub fn value(&mut self, path: &str, primary: &Value, secondary: &Value) -> Value {
        match (primary, secondary) {
            (Value::Null, _) => secondary.clone(),
            (_, Value::Null) => primary.clone(),
            (Value::Object(ours), Value::Object(theirs)) => {
                Value::Object(self.object(path, ours, theirs))
            }
            (Value::Array(ours), Value::Array(theirs)) => {
                Value::Array(union_values(ours, theirs))
            }
            _ if primary == secondary => primary.clone(),
            _ => {
                self.conflict(path, primary, secondary);
                primary.clone()
            }
        }
    }

    fn object(
        &mut self,
        path: &str,
        primary: &Map<String, Value>,
        secondary: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut out = primary.clone();
        for (key, theirs) in secondary {
            let merged = match primary.get(key) {
                Some(ours) => self.value(&format!("{path}.{key}"), ours, theirs),
                None => theirs.clone(),
            };
            out.insert(key.clone(), merged);
        }
        out
    }
}

fn keyed_values<T>(
    merger: &mut FieldMerger,
    field: &str,
    primary: &[Value],
    secondary: &[Value],
) -> Option<Vec<Value>>
where
    T: KeyedEntry + Clone + PartialEq + Serialize + DeserializeOwned,
{
    let primary: Vec<T> = from_values(primary)?;
    let secondary: Vec<T> = from_values(secondary)?;
    merger
        .keyed(field, &primary, &secondary)
        .iter()
        .map(|entry| serde_json::to_value(entry).ok())
        .collect()
}

fn from_values<T: DeserializeOwned>(values: &[Value]) -> Option<Vec<T>> {
    values
        .iter()
        .map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
