//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::types::AppConfig;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".sbom-merge.yaml",
    ".sbom-merge.yml",
    "sbom-merge.yaml",
    "sbom-merge.yml",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/sbom-merge/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Some(path) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_in_dir(&cwd))
    {
        return Some(path);
    }

    if let Some(path) = find_git_root().and_then(|root| find_config_in_dir(&root)) {
        return Some(path);
    }

    if let Some(path) = user_config_dir().and_then(|dir| find_config_in_dir(&dir)) {
        return Some(path);
    }

    dirs::home_dir().and_then(|home| find_config_in_dir(&home))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up the directory tree.
fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Per-user configuration directory (`~/.config/sbom-merge/` on Linux).
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sbom-merge"))
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence.
    ///
    /// Only values that differ from the defaults override; this is how CLI
    /// args are layered over file config.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        if other.merge.target_schema_version != defaults.merge.target_schema_version {
            self.merge
                .target_schema_version
                .clone_from(&other.merge.target_schema_version);
        }
        if other.merge.on_conflict != defaults.merge.on_conflict {
            self.merge.on_conflict = other.merge.on_conflict;
        }
        if other.merge.hierarchical {
            self.merge.hierarchical = true;
        }
        if other.merge.strict_references {
            self.merge.strict_references = true;
        }

        if other.output.file.is_some() {
            self.output.file.clone_from(&other.output.file);
        }
        if other.output.warnings_file.is_some() {
            self.output.warnings_file.clone_from(&other.output.warnings_file);
        }
        if other.output.compact {
            self.output.compact = true;
        }

        if other.behavior.quiet {
            self.behavior.quiet = true;
        }
        if other.behavior.fail_on_warning {
            self.behavior.fail_on_warning = true;
        }
    }

    /// Load from file and merge with CLI overrides.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path);
        config.merge(cli_overrides);
        (config, loaded_from)
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_example_config() -> String {
    r"# sbom-merge configuration
# =========================
#
# Place this file at:
#   - .sbom-merge.yaml in your project root
#   - ~/.config/sbom-merge/sbom-merge.yaml for global config
#
# CLI arguments always override file settings.

merge:
  # Schema version of the merged document: highest-common, or e.g. '1.5'
  target_schema_version: highest-common
  # Conflict policy for component fields (only first-input-wins exists)
  on_conflict: first-input-wins
  # Keep new children of merged components nested under the merged entry
  hierarchical: false
  # Fail instead of warning on references not declared in their own document
  strict_references: false

output:
  # Output file path (omit for stdout)
  # file: merged.cdx.json
  # Write JSON without indentation
  compact: false
  # Write merge warnings as JSON to this file
  # warnings_file: merge-warnings.json

behavior:
  # Suppress non-essential output
  quiet: false
  # Exit with code 1 if the merge produced warnings
  fail_on_warning: false
"
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================
