//! Configuration validation for sbom-merge.

use super::types::{AppConfig, BehaviorConfig, MergeConfig, OutputConfig};
use crate::model::TargetSchemaVersion;

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.merge.validate());
        errors.extend(self.output.validate());
        errors.extend(self.behavior.validate());
        errors
    }
}

impl Validatable for MergeConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        match self.target_schema_version.parse::<TargetSchemaVersion>() {
            Ok(TargetSchemaVersion::Explicit(version)) if !version.is_known() => {
                errors.push(ConfigError {
                    field: "merge.target_schema_version".to_string(),
                    message: format!("Unknown CycloneDX version {version}"),
                });
            }
            Ok(_) => {}
            Err(_) => errors.push(ConfigError {
                field: "merge.target_schema_version".to_string(),
                message: format!(
                    "Invalid version '{}'. Use 'highest-common' or a version such as '1.5'",
                    self.target_schema_version
                ),
            }),
        }
        errors
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let files = [("output.file", &self.file), ("output.warnings_file", &self.warnings_file)];
        for (field, file) in files {
            let Some(parent) = file.as_ref().and_then(|f| f.parent()) else {
                continue;
            };
            if !parent.as_os_str().is_empty() && !parent.exists() {
                errors.push(ConfigError {
                    field: field.to_string(),
                    message: format!("Parent directory does not exist: {}", parent.display()),
                });
            }
        }

        if self.file.is_some() && self.file == self.warnings_file {
            errors.push(ConfigError {
                field: "output.warnings_file".to_string(),
                message: "Warnings file must differ from the output file".to_string(),
            });
        }

        errors
    }
}

impl Validatable for BehaviorConfig {
    fn validate(&self) -> Vec<ConfigError> {
        Vec::new()
    }
}
