//! Dependency graph merging.
//!
//! Every input's `dependencies` are remapped through the [`EquivalenceMap`]
//! into edges between interned unified references. The union of all edges
//! is kept, de-duplicated by ordered pair and relation, in first-seen order.

use super::field::FieldMerger;
use super::refs::{EquivalenceMap, RefId, RefTable};
use super::warning::MergeWarning;
use crate::error::{Result, SbomMergeError};
use crate::model::{Bom, Dependency};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Relation carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// `dependsOn`
    DependsOn,
    /// `provides` (CycloneDX 1.6)
    Provides,
}

/// A directed edge between two unified references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: RefId,
    pub to: RefId,
    pub relation: Relation,
}

/// The merged dependency graph.
#[derive(Debug, Clone, Default)]
pub struct UnifiedGraph {
    /// Nodes that have a dependency entry, in first-seen order
    nodes: IndexSet<RefId>,
    edges: IndexSet<Edge>,
    /// Extra keys of dependency entries, merged per node
    extensions: HashMap<RefId, IndexMap<String, Value>>,
}

impl UnifiedGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn contains(&self, from: RefId, to: RefId, relation: Relation) -> bool {
        self.edges.contains(&Edge { from, to, relation })
    }

    /// Render as CycloneDX `dependencies`, one entry per node.
    pub fn to_dependencies(&self, refs: &RefTable) -> Vec<Dependency> {
        let mut outgoing: HashMap<RefId, (Vec<String>, Vec<String>)> = HashMap::new();
        for edge in &self.edges {
            let (depends_on, provides) = outgoing.entry(edge.from).or_default();
            let target = refs.name(edge.to).to_string();
            match edge.relation {
                Relation::DependsOn => depends_on.push(target),
                Relation::Provides => provides.push(target),
            }
        }

        self.nodes
            .iter()
            .map(|node| {
                let (depends_on, provides) = outgoing.remove(node).unwrap_or_default();
                Dependency {
                    reference: refs.name(*node).to_string(),
                    depends_on,
                    provides,
                    extensions: self.extensions.get(node).cloned().unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Merge the dependency graphs of all `documents`.
///
/// A reference that is not declared in its own document is a dangling
/// reference: by default the affected edges are skipped with a warning;
/// with `strict` the merge fails with a malformed-input error.
pub fn merge_graph(
    documents: &[Bom],
    equivalence: &EquivalenceMap,
    strict: bool,
) -> Result<(UnifiedGraph, Vec<MergeWarning>)> {
    let mut graph = UnifiedGraph::default();
    let mut warnings = Vec::new();

    for (document, bom) in documents.iter().enumerate() {
        for entry in &bom.dependencies {
            add_entry(&mut graph, &mut warnings, equivalence, document, entry, strict)?;
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "merged dependency graph"
    );
    Ok((graph, warnings))
}

fn add_entry(
    graph: &mut UnifiedGraph,
    warnings: &mut Vec<MergeWarning>,
    equivalence: &EquivalenceMap,
    document: usize,
    entry: &Dependency,
    strict: bool,
) -> Result<()> {
    let Some(from) = equivalence.resolve(document, &entry.reference) else {
        let skipped = entry.depends_on.len() + entry.provides.len();
        if strict {
            return Err(SbomMergeError::malformed_input(
                document,
                format!("dependency ref '{}' is not declared in the document", entry.reference),
            ));
        }
        warnings.push(MergeWarning::dangling(
            entry.reference.clone(),
            format!(
                "input #{document}: dependency entry for undeclared ref; {skipped} edge(s) skipped"
            ),
        ));
        return Ok(());
    };

    graph.nodes.insert(from);
    if !entry.extensions.is_empty() {
        let merged = match graph.extensions.get(&from) {
            Some(existing) => {
                let mut merger = FieldMerger::new(entry.reference.clone());
                let merged = merger.extensions(existing, &entry.extensions);
                warnings.extend(merger.into_warnings());
                merged
            }
            None => entry.extensions.clone(),
        };
        graph.extensions.insert(from, merged);
    }

    let targets = entry
        .depends_on
        .iter()
        .map(|t| (t, Relation::DependsOn))
        .chain(entry.provides.iter().map(|t| (t, Relation::Provides)));
    for (target, relation) in targets {
        let Some(to) = equivalence.resolve(document, target) else {
            if strict {
                return Err(SbomMergeError::malformed_input(
                    document,
                    format!(
                        "'{}' depends on '{target}', which is not declared in the document",
                        entry.reference
                    ),
                ));
            }
            warnings.push(MergeWarning::dangling(
                target.clone(),
                format!(
                    "input #{document}: edge from '{}' to undeclared ref skipped",
                    entry.reference
                ),
            ));
            continue;
        };
        graph.edges.insert(Edge { from, to, relation });
    }
    Ok(())
}
