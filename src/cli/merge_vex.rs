//! Merge-vex command handler.
//!
//! Implements the `merge-vex` subcommand, which folds VEX documents into the
//! vulnerabilities of one SBOM.

use super::{check_config, emit};
use crate::config::AppConfig;
use crate::merge::MergeEngine;
use crate::pipeline::{parse_all, parse_bom_with_context};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Inputs of the `merge-vex` subcommand.
#[derive(Debug, Clone, Default)]
pub struct MergeVexRequest {
    pub sbom: PathBuf,
    /// VEX documents, oldest first
    pub vex: Vec<PathBuf>,
    pub config: AppConfig,
}

/// Run the merge-vex command, returning the desired exit code.
#[allow(clippy::needless_pass_by_value)]
pub fn run_merge_vex(request: MergeVexRequest) -> Result<i32> {
    let config = &request.config;
    check_config(config)?;
    let quiet = config.behavior.quiet;

    if request.vex.is_empty() {
        anyhow::bail!("At least one VEX document is required");
    }

    let sbom = parse_bom_with_context(&request.sbom, quiet)?;
    let vex = parse_all(&request.vex, quiet)?;
    let options = config.to_merge_options()?;
    let outcome = MergeEngine::new()
        .with_options(options)
        .merge_vex(&sbom, &vex)
        .context("VEX merge failed")?;

    if !quiet {
        tracing::info!(
            "Applied {} VEX documents: {} vulnerabilities, {} warnings",
            request.vex.len(),
            outcome.stats.vulnerabilities,
            outcome.stats.warnings
        );
    }

    emit(&outcome, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_requires_vex_documents() {
        let err = run_merge_vex(MergeVexRequest {
            sbom: PathBuf::from("sbom.json"),
            ..MergeVexRequest::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("VEX"));
    }

    #[test]
    fn test_fail_on_warning_exit_code() {
        let tmp = TempDir::new().unwrap();
        let sbom = tmp.path().join("sbom.json");
        let vex = tmp.path().join("vex.json");
        std::fs::write(
            &sbom,
            r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
                "components": [{"type": "library", "bom-ref": "a", "name": "a"}]}"#,
        )
        .unwrap();
        std::fs::write(
            &vex,
            r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
                "vulnerabilities": [{"id": "CVE-1", "affects": [{"ref": "missing"}]}]}"#,
        )
        .unwrap();

        let code = run_merge_vex(MergeVexRequest {
            sbom,
            vex: vec![vex],
            config: AppConfig::builder()
                .output_file(Some(tmp.path().join("out.json")))
                .warnings_file(Some(tmp.path().join("warnings.json")))
                .fail_on_warning(true)
                .quiet(true)
                .build(),
        })
        .unwrap();

        assert_eq!(code, crate::pipeline::exit_codes::WARNINGS_EMITTED);
        let warnings = std::fs::read_to_string(tmp.path().join("warnings.json")).unwrap();
        assert!(warnings.contains("DanglingReference"));
    }
}
