//! Merge orchestration.
//!
//! Inputs are processed strictly in order: the first document is
//! authoritative on every conflict, and reordering the inputs changes the
//! result.

use super::collections::{merge_compositions, merge_services, merge_vulnerabilities};
use super::components::{ComponentMergeResult, ComponentSetMerger};
use super::field::{merge_metadata, FieldMerger};
use super::graph::merge_graph;
use super::policy::{ConflictPolicy, NewerEntryWins, OnConflict};
use super::vex::VexMerger;
use super::warning::MergeWarning;
use crate::error::{MergeErrorKind, ParseErrorKind, Result, SbomMergeError};
use crate::model::{Bom, Metadata, SpecVersion, TargetSchemaVersion, BOM_FORMAT};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Top-level keys that are rewritten for the unified document rather than merged.
const SILENT_DOCUMENT_FIELDS: &[&str] = &["$schema"];

/// Options consumed by the merge engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub target_schema_version: TargetSchemaVersion,
    pub on_conflict: OnConflict,
    /// Re-attach new children of merged parents under the merged entry
    pub hierarchical: bool,
    /// Treat references missing from their own document as fatal
    pub strict_references: bool,
}

/// Counters describing one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub documents: usize,
    pub input_components: usize,
    pub unified_components: usize,
    pub merged_components: usize,
    pub unresolvable_components: usize,
    pub edges: usize,
    pub vulnerabilities: usize,
    pub warnings: usize,
}

/// The unified document and everything reported while building it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: Bom,
    pub warnings: Vec<MergeWarning>,
    pub stats: MergeStats,
}

impl MergeOutcome {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Merges CycloneDX documents into one.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: MergeOptions,
}

impl MergeEngine {
    /// Create an engine with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options at once
    #[must_use]
    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the schema version of the unified document
    #[must_use]
    pub fn with_target_schema_version(mut self, target: TargetSchemaVersion) -> Self {
        self.options.target_schema_version = target;
        self
    }

    #[must_use]
    pub fn with_on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.options.on_conflict = on_conflict;
        self
    }

    /// Keep new children of merged parents nested under the merged entry
    #[must_use]
    pub fn hierarchical(mut self, enabled: bool) -> Self {
        self.options.hierarchical = enabled;
        self
    }

    /// Fail instead of warning on references missing from their own document
    #[must_use]
    pub fn strict_references(mut self, enabled: bool) -> Self {
        self.options.strict_references = enabled;
        self
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge `documents` into one unified document.
    ///
    /// Fatal conditions (no inputs, irreconcilable schema versions,
    /// malformed inputs) abort before any output is built.
    pub fn merge(&self, documents: &[Bom]) -> Result<MergeOutcome> {
        if documents.is_empty() {
            return Err(SbomMergeError::merge("merging", MergeErrorKind::NoInputs));
        }
        let target = resolve_target(&self.options.target_schema_version, documents)?;
        for (index, bom) in documents.iter().enumerate() {
            validate_document(index, bom)?;
        }

        let policy = self.options.on_conflict.policy();
        info!(
            "Merging {} documents into CycloneDX {} ({})",
            documents.len(),
            target,
            policy_name(&policy)
        );

        let mut merger = ComponentSetMerger::new().hierarchical(self.options.hierarchical);
        for (index, bom) in documents.iter().enumerate() {
            merger.add_document(index, bom);
        }
        let ComponentMergeResult {
            components,
            mut refs,
            mut equivalence,
            mut warnings,
            stats: component_stats,
        } = merger.finish();

        let (services, service_warnings) = merge_services(documents, &mut refs, &mut equivalence);
        warnings.extend(service_warnings);

        let (graph, graph_warnings) =
            merge_graph(documents, &equivalence, self.options.strict_references)?;
        warnings.extend(graph_warnings);

        let (vulnerabilities, vulnerability_warnings) =
            merge_vulnerabilities(documents, &equivalence, &refs);
        warnings.extend(vulnerability_warnings);

        let (compositions, composition_warnings) =
            merge_compositions(documents, &equivalence, &refs);
        warnings.extend(composition_warnings);

        let mut metadata = fold_metadata(documents, &mut warnings);
        let extensions = fold_extensions(documents, &mut warnings);

        let unified_components = components.len();
        let (root, components) = components.into_tree();
        if root.is_some() {
            metadata.get_or_insert_with(Metadata::default).component = root;
        }

        let first = &documents[0];
        let mut document = Bom {
            bom_format: BOM_FORMAT.to_string(),
            spec_version: target.to_string(),
            serial_number: first.serial_number.clone(),
            version: first.version,
            metadata,
            components,
            services,
            dependencies: graph.to_dependencies(&refs),
            compositions,
            vulnerabilities,
            extensions,
        };
        document.set_spec_version(target);

        let stats = MergeStats {
            documents: documents.len(),
            input_components: component_stats.input_components,
            unified_components,
            merged_components: component_stats.merged_components,
            unresolvable_components: component_stats.unresolvable_components,
            edges: graph.edge_count(),
            vulnerabilities: document.vulnerabilities.len(),
            warnings: warnings.len(),
        };
        info!(
            "Merged {} components into {} ({} edges, {} warnings)",
            stats.input_components, stats.unified_components, stats.edges, stats.warnings
        );

        Ok(MergeOutcome {
            document,
            warnings,
            stats,
        })
    }

    /// Fold VEX documents into the vulnerabilities of `sbom`.
    ///
    /// Later statements supersede earlier ones for the same vulnerability
    /// and affected reference; see [`VexMerger`].
    pub fn merge_vex(&self, sbom: &Bom, vex: &[Bom]) -> Result<MergeOutcome> {
        let inputs: Vec<&Bom> = std::iter::once(sbom).chain(vex).collect();
        let target = resolve_target(&self.options.target_schema_version, inputs.iter().copied())?;
        for (index, bom) in inputs.iter().enumerate() {
            validate_document(index, bom)?;
        }
        info!(
            "Merging {} VEX documents into CycloneDX {} ({})",
            vex.len(),
            target,
            policy_name(&NewerEntryWins)
        );

        let mut merger = VexMerger::new(sbom);
        for (index, document) in vex.iter().enumerate() {
            merger.add_document(index + 1, document);
        }
        let (vulnerabilities, warnings) = merger.finish();

        let mut document = sbom.clone();
        document.vulnerabilities = vulnerabilities;
        document.set_spec_version(target);

        let components = sbom.all_components().count();
        let stats = MergeStats {
            documents: inputs.len(),
            input_components: components,
            unified_components: components,
            vulnerabilities: document.vulnerabilities.len(),
            edges: sbom
                .dependencies
                .iter()
                .map(|d| d.depends_on.len() + d.provides.len())
                .sum(),
            warnings: warnings.len(),
            ..MergeStats::default()
        };
        info!(
            "VEX merge produced {} vulnerabilities ({} warnings)",
            stats.vulnerabilities, stats.warnings
        );

        Ok(MergeOutcome {
            document,
            warnings,
            stats,
        })
    }
}

/// Merge `documents` with the given options.
pub fn merge(documents: &[Bom], options: &MergeOptions) -> Result<MergeOutcome> {
    MergeEngine::new().with_options(*options).merge(documents)
}

fn policy_name<P: ConflictPolicy>(_: &P) -> &'static str {
    P::NAME
}

/// Resolve the output schema version for a set of inputs.
pub fn resolve_target<'a>(
    target: &TargetSchemaVersion,
    documents: impl IntoIterator<Item = &'a Bom>,
) -> Result<SpecVersion> {
    let versions = documents
        .into_iter()
        .map(|bom| bom.spec_version.parse::<SpecVersion>())
        .collect::<Result<Vec<_>>>()?;
    let resolved = target.resolve(&versions)?;
    debug!(inputs = ?versions, target = %resolved, "resolved schema version");
    Ok(resolved)
}

/// Structural checks that make an input unmergeable.
fn validate_document(document: usize, bom: &Bom) -> Result<()> {
    if bom.bom_format != BOM_FORMAT {
        return Err(SbomMergeError::parse(
            format!("input #{document}"),
            ParseErrorKind::NotCycloneDx(bom.bom_format.clone()),
        ));
    }
    let mut seen = HashSet::new();
    for reference in bom.declared_refs() {
        if !seen.insert(reference) {
            return Err(SbomMergeError::malformed_input(
                document,
                format!("bom-ref '{reference}' is declared more than once"),
            ));
        }
    }
    Ok(())
}

/// Merge document metadata, first input primary. Root components are
/// handled by the component fold and are left out here.
fn fold_metadata(documents: &[Bom], warnings: &mut Vec<MergeWarning>) -> Option<Metadata> {
    let mut merged: Option<Metadata> = None;
    for bom in documents {
        let Some(metadata) = &bom.metadata else {
            continue;
        };
        let incoming = Metadata {
            component: None,
            extensions: metadata.extensions.clone(),
        };
        merged = Some(match merged {
            Some(existing) => {
                let (next, found) = merge_metadata(&existing, &incoming);
                warnings.extend(found);
                next
            }
            None => incoming,
        });
    }
    merged
}

fn fold_extensions(
    documents: &[Bom],
    warnings: &mut Vec<MergeWarning>,
) -> indexmap::IndexMap<String, serde_json::Value> {
    let mut fields = FieldMerger::new("document").silence(SILENT_DOCUMENT_FIELDS);
    let mut merged = indexmap::IndexMap::new();
    for bom in documents {
        merged = fields.extensions(&merged, &bom.extensions);
    }
    warnings.extend(fields.into_warnings());
    merged
}
