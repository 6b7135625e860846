//! Configuration types for sbom-merge.

use crate::merge::{MergeOptions, OnConflict};
use crate::model::TargetSchemaVersion;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default value of `merge.target_schema_version`
pub const DEFAULT_TARGET_SCHEMA_VERSION: &str = "highest-common";

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
///
/// CLI arguments are layered over file settings with [`AppConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// How documents are merged
    pub merge: MergeConfig,
    /// Where the unified document and the warnings go
    pub output: OutputConfig,
    /// Behavior flags
    pub behavior: BehaviorConfig,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// The engine options described by this configuration.
    ///
    /// Fails when `merge.target_schema_version` is not a valid version.
    pub fn to_merge_options(&self) -> crate::Result<MergeOptions> {
        Ok(MergeOptions {
            target_schema_version: self.merge.target_schema_version.parse()?,
            on_conflict: self.merge.on_conflict,
            hierarchical: self.merge.hierarchical,
            strict_references: self.merge.strict_references,
        })
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the target schema version (`highest-common` or `M.N`).
    pub fn target_schema_version(mut self, version: impl Into<String>) -> Self {
        self.config.merge.target_schema_version = version.into();
        self
    }

    pub const fn hierarchical(mut self, enabled: bool) -> Self {
        self.config.merge.hierarchical = enabled;
        self
    }

    pub const fn strict_references(mut self, enabled: bool) -> Self {
        self.config.merge.strict_references = enabled;
        self
    }

    /// Set the output file.
    pub fn output_file(mut self, file: Option<PathBuf>) -> Self {
        self.config.output.file = file;
        self
    }

    /// Set the warnings report file.
    pub fn warnings_file(mut self, file: Option<PathBuf>) -> Self {
        self.config.output.warnings_file = file;
        self
    }

    pub const fn compact(mut self, compact: bool) -> Self {
        self.config.output.compact = compact;
        self
    }

    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.config.behavior.quiet = quiet;
        self
    }

    pub const fn fail_on_warning(mut self, fail: bool) -> Self {
        self.config.behavior.fail_on_warning = fail;
        self
    }

    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Section types
// ============================================================================

/// Merge engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MergeConfig {
    /// Schema version of the unified document: `highest-common` or an
    /// explicit CycloneDX version such as `1.5`
    pub target_schema_version: String,
    /// Conflict policy for component fields; only `first-input-wins` exists
    pub on_conflict: OnConflict,
    /// Keep new children of merged components nested under the merged entry
    pub hierarchical: bool,
    /// Fail on references that are not declared in their own document
    pub strict_references: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            target_schema_version: DEFAULT_TARGET_SCHEMA_VERSION.to_string(),
            on_conflict: OnConflict::default(),
            hierarchical: false,
            strict_references: false,
        }
    }
}

impl MergeConfig {
    /// Parsed `target_schema_version`
    pub fn target(&self) -> crate::Result<TargetSchemaVersion> {
        self.target_schema_version.parse()
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file path (None for stdout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Write JSON without indentation
    pub compact: bool,
    /// Write merge warnings as a JSON array to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings_file: Option<PathBuf>,
}

/// Behavior flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Suppress non-essential output
    pub quiet: bool,
    /// Exit with code 1 if the merge produced any warning
    pub fail_on_warning: bool,
}
