//! **Identity-aware merging of CycloneDX SBOMs.**
//!
//! `sbom-merge` combines several CycloneDX documents into one. Components that
//! describe the same software are recognised across documents, their bom-refs
//! are rewritten to a single unified reference, and the dependency graphs are
//! folded into one graph over those references. A separate VEX merge folds
//! vulnerability statements from VEX documents into the vulnerabilities of an
//! SBOM.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: serde types for the CycloneDX document. Unknown fields are
//!   kept in per-object extension maps and written back unchanged.
//! - **[`matching`]**: component identity (purl, cpe, swid, coordinates) and
//!   the [`IdentityIndex`](matching::IdentityIndex) used to find an existing
//!   entity for an incoming component.
//! - **[`merge`]**: the [`MergeEngine`], which unifies components, rewrites
//!   references, unions the dependency graph and merges the remaining
//!   collections. Every lossy decision is reported as a [`MergeWarning`].
//! - **[`config`]**: YAML configuration files and CLI layering.
//! - **[`pipeline`]**: file input and output around the engine.
//!
//! ## Merging documents
//!
//! Inputs are ordered: when two inputs disagree on a field, the earlier one
//! wins and a warning records the value that was dropped.
//!
//! ```no_run
//! use sbom_merge::{parse_bom_str, MergeEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = parse_bom_str(&std::fs::read_to_string("app.cdx.json")?)?;
//!     let lib = parse_bom_str(&std::fs::read_to_string("lib.cdx.json")?)?;
//!
//!     let outcome = MergeEngine::new().hierarchical(true).merge(&[app, lib])?;
//!     for warning in &outcome.warnings {
//!         eprintln!("{warning}");
//!     }
//!     println!("{}", serde_json::to_string_pretty(&outcome.document)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Applying VEX statements
//!
//! ```no_run
//! use sbom_merge::{merge_vex, parse_bom_str};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sbom = parse_bom_str(&std::fs::read_to_string("app.cdx.json")?)?;
//!     let vex = parse_bom_str(&std::fs::read_to_string("triage.vex.json")?)?;
//!
//!     let outcome = merge_vex(&sbom, &[vex])?;
//!     println!("{} vulnerabilities", outcome.stats.vulnerabilities);
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod config;
pub mod error;
pub mod matching;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod utils;

// Re-export main types for convenience
pub use config::{AppConfig, AppConfigBuilder, BehaviorConfig, MergeConfig, OutputConfig};
pub use config::{ConfigError, Validatable};
pub use error::{Result, SbomMergeError};
pub use matching::{identity_of, same_entity, IdentityIndex, Resolution};
pub use merge::{
    merge, merge_vex, ConflictPolicy, MergeEngine, MergeOptions, MergeOutcome, MergeStats,
    MergeWarning, OnConflict, WarningKind,
};
pub use model::{
    parse_bom_str, Bom, Component, ComponentIdentity, IdentityKey, SpecVersion,
    TargetSchemaVersion, Vulnerability,
};
