//! SBOM merging.
//!
//! The merge runs in fixed stages over an ordered list of documents:
//!
//! 1. the component fold ([`components`]) resolves identities, merges
//!    fields and builds the [`EquivalenceMap`] of local to unified refs
//! 2. services, vulnerabilities and compositions are carried through with
//!    their references remapped ([`collections`])
//! 3. the dependency graph is rebuilt over unified refs ([`graph`])
//! 4. metadata and remaining top-level keys are merged field by field
//!
//! The first input is authoritative throughout ([`FirstInputWins`]). VEX
//! documents are merged with the opposite policy ([`NewerEntryWins`]), see
//! [`vex`].

pub mod collections;
pub mod components;
mod engine;
pub mod field;
pub mod graph;
mod policy;
mod refs;
pub mod vex;
mod warning;

pub use collections::{merge_compositions, merge_services, merge_vulnerabilities};
pub use components::{
    merge_components, ComponentMergeResult, ComponentSetMerger, NodeId, UnifiedComponent,
    UnifiedComponents,
};
pub use engine::{merge, resolve_target, MergeEngine, MergeOptions, MergeOutcome, MergeStats};
pub use field::{merge_metadata, merge_values, union_values, FieldMerger};
pub use graph::{merge_graph, Edge, Relation, UnifiedGraph};
pub use policy::{ConflictPolicy, FirstInputWins, NewerEntryWins, OnConflict};
pub use refs::{EquivalenceMap, RefId, RefTable};
pub use vex::{merge_vex, VexMerger};
pub use warning::{MergeWarning, WarningKind};
