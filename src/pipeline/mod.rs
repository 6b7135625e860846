//! Pipeline orchestration for merge operations.
//!
//! Shared parse → merge → write logic for the CLI command handlers. The merge
//! engine itself never touches the filesystem; everything file-related lives
//! here.

mod output;
mod parse;

pub use output::{render_bom, write_bom, write_output, write_warnings, OutputTarget};
pub use parse::{collect_input_paths, parse_all, parse_bom_with_context};

use crate::merge::MergeWarning;

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// The merge produced warnings and `--fail-on-warning` was set
    pub const WARNINGS_EMITTED: i32 = 1;
    /// An error occurred
    pub const ERROR: i32 = 2;
}

/// Log every warning and, if requested, write them to a JSON file.
pub fn report_warnings(
    warnings: &[MergeWarning],
    warnings_file: Option<&std::path::Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    for warning in warnings {
        tracing::warn!("{}", warning);
    }
    if let Some(path) = warnings_file {
        write_warnings(warnings, path)?;
        if !quiet {
            tracing::info!("{} warnings written to {:?}", warnings.len(), path);
        }
    }
    Ok(())
}

/// Exit code for a finished merge
#[must_use]
pub fn exit_code(warning_count: usize, fail_on_warning: bool) -> i32 {
    if fail_on_warning && warning_count > 0 {
        exit_codes::WARNINGS_EMITTED
    } else {
        exit_codes::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::WARNINGS_EMITTED, 1);
        assert_eq!(exit_codes::ERROR, 2);
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(0, true), exit_codes::SUCCESS);
        assert_eq!(exit_code(3, false), exit_codes::SUCCESS);
        assert_eq!(exit_code(3, true), exit_codes::WARNINGS_EMITTED);
    }
}
