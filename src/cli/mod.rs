//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler implements the business logic for a specific CLI subcommand
//! and returns the process exit code.

mod merge;
mod merge_vex;

pub use merge::{run_merge, MergeRequest};
pub use merge_vex::{run_merge_vex, MergeVexRequest};

use crate::config::{AppConfig, Validatable};
use crate::merge::MergeOutcome;
use crate::pipeline::{exit_code, report_warnings, write_bom, OutputTarget};
use anyhow::Result;

/// Reject invalid configurations before any file is read.
fn check_config(config: &AppConfig) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = errors.iter().map(ToString::to_string).collect();
    anyhow::bail!("Invalid configuration:\n  {}", listed.join("\n  "))
}

/// Write the unified document and its warnings; returns the exit code.
fn emit(outcome: &MergeOutcome, config: &AppConfig) -> Result<i32> {
    let quiet = config.behavior.quiet;
    report_warnings(
        &outcome.warnings,
        config.output.warnings_file.as_deref(),
        quiet,
    )?;

    let target = OutputTarget::from_option(config.output.file.clone());
    write_bom(&outcome.document, &target, config.output.compact, quiet)?;

    Ok(exit_code(
        outcome.warnings.len(),
        config.behavior.fail_on_warning,
    ))
}
