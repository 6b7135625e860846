//! Merge command handler.
//!
//! Implements the `merge` subcommand for combining several SBOMs.

use super::{check_config, emit};
use crate::config::AppConfig;
use crate::merge::MergeEngine;
use crate::pipeline::{collect_input_paths, parse_all};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Inputs of the `merge` subcommand.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    /// Explicit input files, in priority order
    pub files: Vec<PathBuf>,
    /// Folder whose `*.cdx.json` and `bom.json` files are appended after `files`
    pub from_folder: Option<PathBuf>,
    pub config: AppConfig,
}

/// Run the merge command, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
#[allow(clippy::needless_pass_by_value)]
pub fn run_merge(request: MergeRequest) -> Result<i32> {
    let config = &request.config;
    check_config(config)?;
    let quiet = config.behavior.quiet;

    let paths = collect_input_paths(&request.files, request.from_folder.as_deref())?;
    if paths.len() < 2 {
        anyhow::bail!(
            "At least two input SBOMs are required, got {}",
            paths.len()
        );
    }

    let documents = parse_all(&paths, quiet)?;
    let options = config.to_merge_options()?;
    let outcome = MergeEngine::new()
        .with_options(options)
        .merge(&documents)
        .context("Merge failed")?;

    if !quiet {
        tracing::info!(
            "Merged {} SBOMs: {} components ({} merged), {} dependency edges, {} warnings",
            outcome.stats.documents,
            outcome.stats.unified_components,
            outcome.stats.merged_components,
            outcome.stats.edges,
            outcome.stats.warnings
        );
    }

    emit(&outcome, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = r#"{
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "components": [{"type": "library", "bom-ref": "a", "name": "a", "version": "1"}]
    }"#;

    #[test]
    fn test_requires_two_inputs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("only.json");
        std::fs::write(&path, DOC).unwrap();

        let err = run_merge(MergeRequest {
            files: vec![path],
            ..MergeRequest::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("At least two"));
    }

    #[test]
    fn test_merges_to_file() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        std::fs::write(&a, DOC).unwrap();
        std::fs::write(&b, DOC).unwrap();
        let out = tmp.path().join("merged.json");

        let code = run_merge(MergeRequest {
            files: vec![a, b],
            from_folder: None,
            config: AppConfig::builder()
                .output_file(Some(out.clone()))
                .quiet(true)
                .build(),
        })
        .unwrap();

        assert_eq!(code, 0);
        let merged: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(merged["components"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = run_merge(MergeRequest {
            files: vec![],
            from_folder: None,
            config: AppConfig::builder().target_schema_version("9.x").build(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("merge.target_schema_version"));
    }
}
