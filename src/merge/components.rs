//! Component set merging.
//!
//! Components of all inputs are folded, left to right, into an arena of
//! unified components addressed by [`NodeId`]. Nested components are
//! flattened into the arena with a parent link and rebuilt into a tree when
//! the unified document is assembled.

use super::field;
use super::policy::{ConflictPolicy, FirstInputWins};
use super::refs::{EquivalenceMap, RefId, RefTable};
use super::warning::{MergeWarning, WarningKind};
use crate::matching::{identity_of, IdentityIndex, Resolution};
use crate::model::{Bom, Component, ComponentIdentity, IdentityKey};
use tracing::debug;

/// Index of a unified component in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A component of the unified document.
#[derive(Debug, Clone)]
pub struct UnifiedComponent {
    /// Merged record, without nested components; `bom_ref` is the unified reference
    pub component: Component,
    pub reference: RefId,
    pub parent: Option<NodeId>,
    /// Index of the input the component was first seen in
    pub origin: usize,
    identity: Option<ComponentIdentity>,
}

impl UnifiedComponent {
    pub fn identity(&self) -> Option<&ComponentIdentity> {
        self.identity.as_ref()
    }
}

/// The arena of unified components.
#[derive(Debug, Clone, Default)]
pub struct UnifiedComponents {
    nodes: Vec<UnifiedComponent>,
    root: Option<NodeId>,
}

impl UnifiedComponents {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&UnifiedComponent> {
        self.nodes.get(id.0)
    }

    /// The unified root component (from the first input's metadata)
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &UnifiedComponent)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Rebuild the component tree: the root (with its children) and the
    /// top-level component list, both in arena order.
    pub fn into_tree(self) -> (Option<Component>, Vec<Component>) {
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut top_level = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            match node.parent {
                Some(parent) => children[parent.0].push(i),
                None if self.root != Some(NodeId(i)) => top_level.push(i),
                None => {}
            }
        }

        let mut slots: Vec<Option<Component>> =
            self.nodes.into_iter().map(|n| Some(n.component)).collect();
        let root = self
            .root
            .and_then(|r| build_subtree(r.0, &mut slots, &children));
        let components = top_level
            .into_iter()
            .filter_map(|i| build_subtree(i, &mut slots, &children))
            .collect();
        (root, components)
    }
}

fn build_subtree(
    index: usize,
    slots: &mut [Option<Component>],
    children: &[Vec<usize>],
) -> Option<Component> {
    let mut component = slots.get_mut(index)?.take()?;
    for &child in children.get(index).map(Vec::as_slice).unwrap_or_default() {
        if let Some(built) = build_subtree(child, slots, children) {
            component.components.push(built);
        }
    }
    Some(component)
}

/// Counters collected while folding components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentStats {
    pub input_components: usize,
    pub merged_components: usize,
    pub unresolvable_components: usize,
}

/// Output of the component set merge.
#[derive(Debug, Clone)]
pub struct ComponentMergeResult {
    pub components: UnifiedComponents,
    pub refs: RefTable,
    pub equivalence: EquivalenceMap,
    pub warnings: Vec<MergeWarning>,
    pub stats: ComponentStats,
}

/// Merge the components of `documents`, first input authoritative.
pub fn merge_components(documents: &[Bom], hierarchical: bool) -> ComponentMergeResult {
    let mut merger = ComponentSetMerger::new().hierarchical(hierarchical);
    for (index, bom) in documents.iter().enumerate() {
        merger.add_document(index, bom);
    }
    merger.finish()
}

/// A flattened component with the position of its parent in the same list.
struct FlatEntry {
    component: Component,
    parent: Option<usize>,
    is_root: bool,
}

/// Incremental component fold over an ordered list of documents.
///
/// Documents are expected to be validated already. The merge engine
/// rejects a duplicate `bom-ref` within one document as malformed input
/// before the fold starts.
#[derive(Debug, Default)]
pub struct ComponentSetMerger {
    hierarchical: bool,
    policy: FirstInputWins,
    unified: UnifiedComponents,
    refs: RefTable,
    equivalence: EquivalenceMap,
    index: IdentityIndex<NodeId>,
    warnings: Vec<MergeWarning>,
    stats: ComponentStats,
}

impl ComponentSetMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-attach new children of merged parents under the merged entry
    #[must_use]
    pub fn hierarchical(mut self, enabled: bool) -> Self {
        self.hierarchical = enabled;
        self
    }

    /// Fold all components of one document into the accumulator.
    ///
    /// The first document's root component is processed first and becomes
    /// the unified root; later roots are processed after their document's
    /// components, like any other component.
    pub fn add_document(&mut self, document: usize, bom: &Bom) {
        let flat = flatten(bom, document == 0);
        let mut placed: Vec<(NodeId, bool)> = Vec::with_capacity(flat.len());

        for entry in flat {
            let parent = entry.parent.and_then(|p| placed.get(p).copied());
            let (node, merged) = self.place(document, entry.component, parent);
            if entry.is_root && document == 0 {
                self.unified.root = Some(node);
            }
            placed.push((node, merged));
        }
    }

    pub fn finish(self) -> ComponentMergeResult {
        debug!(
            unified = self.unified.len(),
            identity_keys = self.index.key_count(),
            "component fold finished"
        );
        ComponentMergeResult {
            components: self.unified,
            refs: self.refs,
            equivalence: self.equivalence,
            warnings: self.warnings,
            stats: self.stats,
        }
    }

    /// Place one incoming component; returns its node and whether it was
    /// merged into an existing entry.
    fn place(
        &mut self,
        document: usize,
        component: Component,
        parent: Option<(NodeId, bool)>,
    ) -> (NodeId, bool) {
        self.stats.input_components += 1;

        let Resolution::Resolved(identity) = identity_of(&component) else {
            self.stats.unresolvable_components += 1;
            let subject = component
                .bom_ref
                .clone()
                .unwrap_or_else(|| component.display_name());
            self.warnings.push(MergeWarning::new(
                WarningKind::UnresolvableIdentity,
                subject,
                format!(
                    "input #{document}: no purl, cpe, swid or name; kept as a distinct component"
                ),
            ));
            return (self.push_new(document, component, None, parent), false);
        };

        let nodes = &self.unified.nodes;
        let found = self
            .index
            .find(&identity, |id| nodes.get(id.0).and_then(|n| n.identity.as_ref()));

        match found {
            Some(found) => {
                for rejected in &found.rejected {
                    let detail = format!(
                        "input #{document}: also matches '{}'; merged into '{}' by identifier priority",
                        self.ref_of(*rejected),
                        self.ref_of(found.chosen),
                    );
                    self.warnings.push(MergeWarning::new(
                        WarningKind::AmbiguousMatch,
                        identity.to_string(),
                        detail,
                    ));
                }
                self.merge_into(found.chosen, document, component);
                (found.chosen, true)
            }
            None => (self.push_new(document, component, Some(identity), parent), false),
        }
    }

    fn ref_of(&self, node: NodeId) -> &str {
        self.unified
            .nodes
            .get(node.0)
            .map_or("", |n| self.refs.name(n.reference))
    }

    fn merge_into(&mut self, target: NodeId, document: usize, incoming: Component) {
        let Some(existing) = self.unified.nodes.get(target.0) else {
            return;
        };
        let reference = existing.reference;
        let (primary, secondary) = self.policy.rank(&existing.component, &incoming);
        let (mut merged, warnings) = field::merge_components(primary, secondary);
        merged.bom_ref = Some(self.refs.name(reference).to_string());
        self.warnings.extend(warnings);

        debug!(
            unified = self.refs.name(reference),
            input = document,
            "merged {} into existing component",
            incoming.display_name()
        );

        if let Some(local) = incoming.bom_ref.as_deref() {
            self.equivalence.insert(document, local, reference);
        }
        let identity = identity_of(&merged).identity().cloned();
        if let Some(identity) = &identity {
            self.index.insert(target, identity);
        }
        if let Some(node) = self.unified.nodes.get_mut(target.0) {
            node.component = merged;
            node.identity = identity;
        }
        self.stats.merged_components += 1;
    }

    fn push_new(
        &mut self,
        document: usize,
        mut component: Component,
        identity: Option<ComponentIdentity>,
        parent: Option<(NodeId, bool)>,
    ) -> NodeId {
        let reference = match component.bom_ref.as_deref().filter(|r| !r.is_empty()) {
            Some(local) => {
                let (reference, renamed) = self.refs.intern_unique(local);
                if renamed {
                    self.warnings.push(MergeWarning::new(
                        WarningKind::ReferenceRenamed,
                        local,
                        format!(
                            "input #{document}: '{local}' already names another entity; renamed to '{}'",
                            self.refs.name(reference)
                        ),
                    ));
                }
                self.equivalence.insert(document, local, reference);
                reference
            }
            None => match identity.as_ref().and_then(ComponentIdentity::primary) {
                Some(key) => self.refs.intern_unique(&derived_ref(key)).0,
                None => self.refs.intern_generated("component"),
            },
        };
        component.bom_ref = Some(self.refs.name(reference).to_string());

        // Children of merged parents are only kept nested in hierarchical mode.
        let parent = match parent {
            Some((node, merged)) if !merged || self.hierarchical => Some(node),
            _ => None,
        };

        let id = NodeId(self.unified.nodes.len());
        if let Some(identity) = &identity {
            self.index.insert(id, identity);
        }
        debug!(
            unified = self.refs.name(reference),
            input = document,
            "new component {}",
            component.display_name()
        );
        self.unified.nodes.push(UnifiedComponent {
            component,
            reference,
            parent,
            origin: document,
            identity,
        });
        id
    }
}

/// `bom-ref` for a component that did not declare one
fn derived_ref(key: &IdentityKey) -> String {
    key.to_string()
}

fn flatten(bom: &Bom, root_first: bool) -> Vec<FlatEntry> {
    let mut out = Vec::new();
    let root = bom.root_component();
    if root_first {
        if let Some(root) = root {
            push_subtree(&mut out, root, None, true);
        }
    }
    for component in &bom.components {
        push_subtree(&mut out, component, None, false);
    }
    if !root_first {
        if let Some(root) = root {
            push_subtree(&mut out, root, None, true);
        }
    }
    out
}

fn push_subtree(
    out: &mut Vec<FlatEntry>,
    component: &Component,
    parent: Option<usize>,
    is_root: bool,
) {
    let index = out.len();
    out.push(FlatEntry {
        component: component.shallow_clone(),
        parent,
        is_root,
    });
    for child in &component.components {
        push_subtree(out, child, Some(index), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, SpecVersion};
    use serde_json::json;

    fn bom(components: Vec<Component>) -> Bom {
        let mut bom = Bom::new(SpecVersion::V1_5);
        bom.components = components;
        bom
    }

    fn lib(bom_ref: &str, purl: &str) -> Component {
        Component::new("library", bom_ref)
            .with_bom_ref(bom_ref)
            .with_purl(purl)
    }

    fn names(components: &[Component]) -> Vec<&str> {
        components
            .iter()
            .filter_map(|c| c.bom_ref.as_deref())
            .collect()
    }

    #[test]
    fn test_same_identity_merges_and_maps_both_refs() {
        let a = bom(vec![lib("a-local", "pkg:npm/x@1")]);
        let b = bom(vec![lib("b-local", "pkg:npm/x@1"), lib("y", "pkg:npm/y@1")]);

        let result = merge_components(&[a, b], false);
        assert_eq!(result.components.len(), 2);
        assert_eq!(result.stats.merged_components, 1);

        let x0 = result.equivalence.resolve(0, "a-local");
        let x1 = result.equivalence.resolve(1, "b-local");
        assert!(x0.is_some());
        assert_eq!(x0, x1);
        assert_eq!(x0.map(|r| result.refs.name(r)), Some("a-local"));
    }

    #[test]
    fn test_colliding_ref_is_renamed() {
        let a = bom(vec![lib("lib", "pkg:npm/one@1")]);
        let b = bom(vec![lib("lib", "pkg:npm/two@1")]);

        let result = merge_components(&[a, b], false);
        let (_, components) = result.components.into_tree();
        assert_eq!(names(&components), vec!["lib", "lib-1"]);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::ReferenceRenamed && w.subject == "lib"));
        assert_eq!(
            result.equivalence.resolve(1, "lib").map(|r| result.refs.name(r)),
            Some("lib-1")
        );
    }

    #[test]
    fn test_unresolvable_components_stay_distinct() {
        let mut anonymous = Component::new("file", "");
        anonymous.bom_ref = Some("blob".into());
        let a = bom(vec![anonymous.clone(), Component::new("data", "")]);
        let b = bom(vec![anonymous]);

        let result = merge_components(&[a, b], false);
        assert_eq!(result.components.len(), 3);
        assert_eq!(result.stats.unresolvable_components, 3);
        let (_, components) = result.components.into_tree();
        assert_eq!(names(&components), vec!["blob", "component-1", "blob-1"]);
    }

    #[test]
    fn test_missing_ref_is_derived_from_identity() {
        let a = bom(vec![Component::new("library", "left-pad").with_version("1.3.0")]);
        let result = merge_components(&[a], false);
        let (_, components) = result.components.into_tree();
        assert_eq!(names(&components), vec!["left-pad@1.3.0"]);
    }

    #[test]
    fn test_first_root_is_unified_root_and_later_roots_fold_in() {
        let mut a = bom(vec![lib("dep", "pkg:npm/dep@1")]);
        a.metadata = Some(Metadata {
            component: Some(Component::new("application", "app-a").with_bom_ref("app-a")),
            extensions: Default::default(),
        });
        let mut b = bom(vec![]);
        b.metadata = Some(Metadata {
            component: Some(Component::new("application", "app-b").with_bom_ref("app-b")),
            extensions: Default::default(),
        });

        let result = merge_components(&[a, b], false);
        let (root, components) = result.components.into_tree();
        assert_eq!(root.and_then(|r| r.bom_ref), Some("app-a".to_string()));
        assert_eq!(names(&components), vec!["dep", "app-b"]);
    }

    #[test]
    fn test_nested_children_follow_hierarchical_option() {
        let mut parent_a = lib("parent", "pkg:npm/parent@1");
        parent_a.components.push(lib("child-a", "pkg:npm/child-a@1"));
        let mut parent_b = lib("parent-b", "pkg:npm/parent@1");
        parent_b.components.push(lib("child-b", "pkg:npm/child-b@1"));
        let docs = [bom(vec![parent_a]), bom(vec![parent_b])];

        let flat = merge_components(&docs, false);
        let (_, components) = flat.components.into_tree();
        assert_eq!(names(&components), vec!["parent", "child-b"]);
        assert_eq!(names(&components[0].components), vec!["child-a"]);

        let nested = merge_components(&docs, true);
        let (_, components) = nested.components.into_tree();
        assert_eq!(names(&components), vec!["parent"]);
        assert_eq!(names(&components[0].components), vec!["child-a", "child-b"]);
    }

    #[test]
    fn test_ambiguous_match_picks_priority_and_warns() {
        let by_purl = lib("by-purl", "pkg:npm/x@1");
        let by_name = Component::new("library", "x")
            .with_version("1")
            .with_bom_ref("by-name");
        let incoming = Component::new("library", "x")
            .with_version("1")
            .with_purl("pkg:npm/x@1")
            .with_bom_ref("incoming");
        // by-purl and by-name differ in coordinates, so they stay distinct.
        let a = bom(vec![by_purl, by_name]);
        let b = bom(vec![incoming]);

        let result = merge_components(&[a, b], false);
        assert_eq!(result.components.len(), 2);
        assert_eq!(
            result.equivalence.resolve(1, "incoming").map(|r| result.refs.name(r)),
            Some("by-purl")
        );
        let ambiguous: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::AmbiguousMatch)
            .collect();
        assert_eq!(ambiguous.len(), 1);
        assert!(ambiguous[0].detail.contains("by-name"));
    }

    #[test]
    fn test_merged_record_carries_secondary_fields() {
        let a = bom(vec![lib("x", "pkg:npm/x@1")]);
        let b = bom(vec![
            lib("x2", "pkg:npm/x@1").with_field("description", json!("from b"))
        ]);
        let result = merge_components(&[a, b], false);
        let (_, components) = result.components.into_tree();
        assert_eq!(components[0].extensions["description"], json!("from b"));
        assert_eq!(components[0].bom_ref.as_deref(), Some("x"));
    }
}
