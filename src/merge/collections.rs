//! Pass-through collections: services, vulnerabilities and compositions.
//!
//! These are not part of the identity graph but still carry references into
//! it. Every reference is remapped through the [`EquivalenceMap`]; refs the
//! map does not know (e.g. BOM-Links) are kept verbatim.

use super::field::{union_by_eq, FieldMerger};
use super::refs::{EquivalenceMap, RefTable};
use super::warning::{MergeWarning, WarningKind};
use crate::matching::Identifiable;
use crate::model::{Affects, Analysis, Bom, Composition, Service, Vulnerability};
use crate::utils::{json_fingerprint, VersionRange};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Unified name of a local reference of `document`, or the reference itself.
pub fn remap_ref(
    document: usize,
    local: &str,
    equivalence: &EquivalenceMap,
    refs: &RefTable,
) -> String {
    equivalence
        .resolve(document, local)
        .map_or_else(|| local.to_string(), |id| refs.name(id).to_string())
}

// ============================================================================
// Services
// ============================================================================

/// Merge the services of all documents and register their references.
///
/// Services are matched by group/name/version (names compared
/// case-insensitively), falling back to `bom-ref` for unnamed services.
/// Nested services are merged recursively into their matched parent.
pub fn merge_services(
    documents: &[Bom],
    refs: &mut RefTable,
    equivalence: &mut EquivalenceMap,
) -> (Vec<Service>, Vec<MergeWarning>) {
    let mut merger = ServiceMerger {
        refs,
        equivalence,
        warnings: Vec::new(),
    };
    let mut services = Vec::new();
    for (document, bom) in documents.iter().enumerate() {
        for service in &bom.services {
            merger.absorb(&mut services, service.clone(), document);
        }
    }
    (services, merger.warnings)
}

struct ServiceMerger<'a> {
    refs: &'a mut RefTable,
    equivalence: &'a mut EquivalenceMap,
    warnings: Vec<MergeWarning>,
}

impl ServiceMerger<'_> {
    fn absorb(&mut self, list: &mut Vec<Service>, mut incoming: Service, document: usize) {
        let nested = std::mem::take(&mut incoming.services);

        let index = match list.iter().position(|s| same_service(s, &incoming)) {
            Some(index) => {
                self.merge_into(&mut list[index], &incoming, document);
                index
            }
            None => {
                if let Some(local) = incoming.bom_ref.clone() {
                    let unified = self.register_new(&local, document);
                    incoming.bom_ref = Some(unified);
                }
                list.push(incoming);
                list.len() - 1
            }
        };

        for child in nested {
            self.absorb(&mut list[index].services, child, document);
        }
    }

    fn merge_into(&mut self, target: &mut Service, incoming: &Service, document: usize) {
        if let Some(local) = incoming.bom_ref.as_deref() {
            match target.bom_ref.as_deref() {
                Some(existing) => {
                    let unified = self.refs.intern(existing);
                    self.equivalence.insert(document, local, unified);
                }
                None => target.bom_ref = Some(self.register_new(local, document)),
            }
        }

        let mut fields = FieldMerger::new(target.name.clone());
        target.extensions = fields.extensions(&target.extensions, &incoming.extensions);
        self.warnings.extend(fields.into_warnings());
        if target.group.is_none() {
            target.group.clone_from(&incoming.group);
        }
        if target.version.is_none() {
            target.version.clone_from(&incoming.version);
        }
        debug!(service = %target.name, input = document, "merged service");
    }

    /// Intern a new service reference; returns the unified name.
    fn register_new(&mut self, local: &str, document: usize) -> String {
        let (unified, renamed) = self.refs.intern_unique(local);
        let name = self.refs.name(unified).to_string();
        if renamed {
            self.warnings.push(MergeWarning::new(
                WarningKind::ReferenceRenamed,
                local,
                format!("input #{document}: service ref already taken; renamed to '{name}'"),
            ));
        }
        self.equivalence.insert(document, local, unified);
        name
    }
}

fn same_service(a: &Service, b: &Service) -> bool {
    match (
        a.resolve_identity().identity().cloned(),
        b.resolve_identity().identity().cloned(),
    ) {
        (Some(x), Some(y)) => x.same_entity(&y),
        _ => a.bom_ref.is_some() && a.bom_ref == b.bom_ref,
    }
}

// ============================================================================
// Vulnerabilities
// ============================================================================

/// Merge the vulnerabilities of all documents, first input authoritative.
pub fn merge_vulnerabilities(
    documents: &[Bom],
    equivalence: &EquivalenceMap,
    refs: &RefTable,
) -> (Vec<Vulnerability>, Vec<MergeWarning>) {
    let mut merger = VulnerabilityMerger::default();
    for (document, bom) in documents.iter().enumerate() {
        for vulnerability in &bom.vulnerabilities {
            let mut remapped = vulnerability.clone();
            for affects in &mut remapped.affects {
                affects.reference = remap_ref(document, &affects.reference, equivalence, refs);
            }
            merger.add(remapped);
        }
    }
    merger.finish()
}

/// Identity of a vulnerability: its ids and aliases, or a content fingerprint.
pub fn vulnerability_keys(vulnerability: &Vulnerability) -> BTreeSet<String> {
    let ids: BTreeSet<String> = vulnerability
        .identifiers()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !ids.is_empty() {
        return ids;
    }
    let value = serde_json::to_value(vulnerability).unwrap_or(Value::Null);
    BTreeSet::from([format!("fingerprint:{:016x}", json_fingerprint(&value))])
}

#[derive(Debug, Default)]
struct VulnerabilityMerger {
    entries: Vec<Vulnerability>,
    keys: Vec<BTreeSet<String>>,
    warnings: Vec<MergeWarning>,
}

impl VulnerabilityMerger {
    fn add(&mut self, mut incoming: Vulnerability) {
        let keys = vulnerability_keys(&incoming);
        let matching: Vec<usize> = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, existing)| !existing.is_disjoint(&keys))
            .map(|(i, _)| i)
            .collect();

        if matching.is_empty() {
            self.entries.push(incoming);
            self.keys.push(keys);
            return;
        }

        let same_state = matching
            .iter()
            .copied()
            .find(|&i| self.entries[i].state() == incoming.state());
        if let Some(i) = same_state {
            let subject = display_keys(&self.keys[i]);
            let mut fields = FieldMerger::new(subject.clone());
            let mut versions = VersionMerge::new(subject, false);
            let merged =
                merge_vulnerability(&mut fields, &mut versions, &self.entries[i], &incoming);
            self.warnings.extend(fields.into_warnings());
            self.warnings.extend(versions.warnings);
            self.entries[i] = merged;
            self.keys[i].extend(keys);
            return;
        }

        // Different analysis state: keep only what the earlier entries do not assert.
        let asserted: Vec<&Affects> = matching
            .iter()
            .flat_map(|&i| self.entries[i].affects.iter())
            .collect();
        let had_affects = !incoming.affects.is_empty();
        let mut versions = VersionMerge::new(display_keys(&keys), true);
        incoming.affects = incoming
            .affects
            .into_iter()
            .filter_map(|affects| new_assertions(affects, &asserted, &mut versions))
            .collect();
        self.warnings.extend(versions.warnings);

        if had_affects && !incoming.affects.is_empty() {
            self.entries.push(incoming);
            self.keys.push(keys);
            return;
        }

        let earlier = matching
            .first()
            .and_then(|&i| self.entries[i].state())
            .unwrap_or("none");
        self.warnings.push(MergeWarning::new(
            WarningKind::InformationLoss,
            display_keys(&keys),
            format!(
                "analysis state '{}' conflicts with earlier state '{earlier}' and adds no \
                 new affected components; entry dropped",
                incoming.state().unwrap_or("none")
            ),
        ));
    }

    fn finish(self) -> (Vec<Vulnerability>, Vec<MergeWarning>) {
        (self.entries, self.warnings)
    }
}

fn display_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// The part of `affects` not already asserted by `asserted`, if any.
fn new_assertions(
    mut affects: Affects,
    asserted: &[&Affects],
    versions: &mut VersionMerge,
) -> Option<Affects> {
    let same_ref: Vec<&&Affects> = asserted
        .iter()
        .filter(|a| a.reference == affects.reference)
        .collect();
    if same_ref.is_empty() {
        return Some(affects);
    }
    if affects.versions.is_empty() {
        return None;
    }
    let earlier: Vec<Value> = same_ref
        .iter()
        .flat_map(|a| a.versions.iter().cloned())
        .collect();
    affects.versions = versions.new_versions(&affects.reference, &earlier, &affects.versions);
    (!affects.versions.is_empty()).then_some(affects)
}

/// How an incoming `affects[].versions` entry relates to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    Distinct,
    Same,
    /// The earlier range contains the incoming version
    Covered,
    /// The incoming range contains the earlier version
    Covers,
    Inconclusive,
}

fn overlap(earlier: &Value, incoming: &Value) -> Overlap {
    let get = |entry: &Value, key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let in_range = |version: &str, range: &str| {
        range
            .parse::<VersionRange>()
            .ok()
            .and_then(|r| r.contains(version))
    };

    match (
        get(earlier, "version"),
        get(earlier, "range"),
        get(incoming, "version"),
        get(incoming, "range"),
    ) {
        (Some(ours), _, Some(theirs), _) if ours == theirs => Overlap::Same,
        (Some(_), _, Some(_), _) => Overlap::Distinct,
        (None, Some(range), Some(version), _) => match in_range(&version, &range) {
            Some(true) => Overlap::Covered,
            Some(false) => Overlap::Distinct,
            None => Overlap::Inconclusive,
        },
        (Some(version), _, None, Some(range)) => match in_range(&version, &range) {
            Some(true) => Overlap::Covers,
            Some(false) => Overlap::Distinct,
            None => Overlap::Inconclusive,
        },
        (None, Some(ours), None, Some(theirs)) => {
            let equivalent = ours == theirs
                || matches!(
                    (ours.parse::<VersionRange>(), theirs.parse::<VersionRange>()),
                    (Ok(a), Ok(b)) if a.equivalent(&b)
                );
            if equivalent {
                Overlap::Same
            } else {
                Overlap::Inconclusive
            }
        }
        _ if earlier == incoming => Overlap::Same,
        _ => Overlap::Distinct,
    }
}

/// Merges the `versions` of affected components of one vulnerability.
///
/// With `narrow` set (the incoming entry has a different analysis state),
/// an incoming range that contains an earlier version is narrowed with
/// `!=<version>` and versions already asserted are dropped with a warning.
#[derive(Debug)]
struct VersionMerge {
    subject: String,
    narrow: bool,
    warnings: Vec<MergeWarning>,
}

impl VersionMerge {
    fn new(subject: String, narrow: bool) -> Self {
        Self {
            subject,
            narrow,
            warnings: Vec::new(),
        }
    }

    /// Incoming versions not already asserted by `earlier`.
    fn new_versions(
        &mut self,
        reference: &str,
        earlier: &[Value],
        incoming: &[Value],
    ) -> Vec<Value> {
        let mut kept: Vec<Value> = Vec::new();
        for entry in incoming {
            let mut candidate = entry.clone();
            let mut asserted = false;
            for existing in earlier.iter().chain(&kept) {
                match overlap(existing, entry) {
                    Overlap::Same | Overlap::Covered => {
                        asserted = true;
                        break;
                    }
                    Overlap::Covers if self.narrow => narrow_range(&mut candidate, existing),
                    Overlap::Inconclusive => self.warnings.push(
                        MergeWarning::new(
                            WarningKind::InconclusiveVersion,
                            self.subject.clone(),
                            format!(
                                "inconclusive version comparison of {entry} with \
                                 {existing}; keeping both"
                            ),
                        )
                        .with_field(format!("affects[{reference}]")),
                    ),
                    Overlap::Covers | Overlap::Distinct => {}
                }
            }

            if !asserted {
                kept.push(candidate);
            } else if self.narrow {
                self.warnings.push(
                    MergeWarning::new(
                        WarningKind::InformationLoss,
                        self.subject.clone(),
                        format!(
                            "version {entry} is already asserted with a different \
                             analysis state; dropped"
                        ),
                    )
                    .with_field(format!("affects[{reference}]")),
                );
            }
        }
        kept
    }
}

/// Exclude the `version` of `earlier` from the `range` of `entry`.
fn narrow_range(entry: &mut Value, earlier: &Value) {
    let Some(version) = earlier.get("version").and_then(Value::as_str) else {
        return;
    };
    let Some(range) = entry
        .get("range")
        .and_then(Value::as_str)
        .and_then(|r| r.parse::<VersionRange>().ok())
    else {
        return;
    };
    if let Some(object) = entry.as_object_mut() {
        object.insert(
            "range".to_string(),
            Value::String(range.excluding(version).to_string()),
        );
    }
}

/// Merge two entries describing the same vulnerability with the same state.
fn merge_vulnerability(
    fields: &mut FieldMerger,
    versions: &mut VersionMerge,
    primary: &Vulnerability,
    secondary: &Vulnerability,
) -> Vulnerability {
    let mut references = primary.references.clone();
    for reference in &secondary.references {
        if !references.iter().any(|r| r.id == reference.id) {
            references.push(reference.clone());
        }
    }

    let mut affects = primary.affects.clone();
    for incoming in &secondary.affects {
        match affects.iter_mut().find(|a| a.reference == incoming.reference) {
            Some(existing) => {
                let added = versions.new_versions(
                    &incoming.reference,
                    &existing.versions,
                    &incoming.versions,
                );
                existing.versions.extend(added);
                existing.extensions = fields.extensions(&existing.extensions, &incoming.extensions);
            }
            None => affects.push(incoming.clone()),
        }
    }

    let analysis = match (&primary.analysis, &secondary.analysis) {
        (Some(p), Some(s)) => Some(Analysis {
            state: p.state.clone(),
            response: union_by_eq(&p.response, &s.response),
            extensions: fields.extensions(&p.extensions, &s.extensions),
        }),
        (p, s) => p.clone().or_else(|| s.clone()),
    };

    Vulnerability {
        bom_ref: primary.bom_ref.clone().or_else(|| secondary.bom_ref.clone()),
        id: primary.id.clone().or_else(|| secondary.id.clone()),
        references,
        analysis,
        affects,
        extensions: fields.extensions(&primary.extensions, &secondary.extensions),
    }
}

// ============================================================================
// Compositions
// ============================================================================

/// Merge compositions of all documents; compositions with the same
/// `aggregate` are combined.
pub fn merge_compositions(
    documents: &[Bom],
    equivalence: &EquivalenceMap,
    refs: &RefTable,
) -> (Vec<Composition>, Vec<MergeWarning>) {
    let mut merged: Vec<Composition> = Vec::new();
    let mut warnings = Vec::new();

    for (document, bom) in documents.iter().enumerate() {
        for composition in &bom.compositions {
            let remap = |list: &[String]| -> Vec<String> {
                let remapped: Vec<String> = list
                    .iter()
                    .map(|r| remap_ref(document, r, equivalence, refs))
                    .collect();
                union_by_eq(&remapped, &[])
            };
            let incoming = Composition {
                aggregate: composition.aggregate.clone(),
                assemblies: remap(&composition.assemblies),
                dependencies: remap(&composition.dependencies),
                extensions: composition.extensions.clone(),
            };

            match merged.iter_mut().find(|c| c.aggregate == incoming.aggregate) {
                Some(existing) => {
                    existing.assemblies = union_by_eq(&existing.assemblies, &incoming.assemblies);
                    existing.dependencies =
                        union_by_eq(&existing.dependencies, &incoming.dependencies);
                    let mut fields =
                        FieldMerger::new(format!("composition '{}'", existing.aggregate));
                    existing.extensions =
                        fields.extensions(&existing.extensions, &incoming.extensions);
                    warnings.extend(fields.into_warnings());
                }
                None => merged.push(incoming),
            }
        }
    }
    (merged, warnings)
}
