//! Configuration module for sbom-merge.
//!
//! This module provides:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - YAML config file loading and discovery
//! - CLI argument merging
//!
//! # Configuration File
//!
//! Place a `.sbom-merge.yaml` file in your project root or `~/.config/sbom-merge/`:
//!
//! ```yaml
//! merge:
//!   target_schema_version: "1.6"
//!   strict_references: true
//! behavior:
//!   fail_on_warning: true
//! ```

pub mod file;
mod types;
mod validation;

pub use types::{
    AppConfig, AppConfigBuilder, BehaviorConfig, MergeConfig, OutputConfig,
    DEFAULT_TARGET_SCHEMA_VERSION,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    user_config_dir, ConfigFileError,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// This schema documents all configuration options that can be set in
/// `.sbom-merge.yaml` config files. It can be used by editors for
/// validation and autocompletion.
pub fn generate_json_schema() -> crate::Result<String> {
    let schema = schemars::schema_for!(AppConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
