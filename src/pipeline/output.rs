//! Output handling for merged documents and warning reports.

use crate::merge::MergeWarning;
use crate::model::Bom;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Target for output - either stdout or a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to stdout
    Stdout,
    /// Write to a file
    File(PathBuf),
}

impl OutputTarget {
    /// Create output target from optional path
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Stdout, Self::File)
    }
}

/// Serialize a BOM, pretty-printed unless `compact`
pub fn render_bom(bom: &Bom, compact: bool) -> Result<String> {
    let rendered = if compact {
        serde_json::to_string(bom)
    } else {
        serde_json::to_string_pretty(bom)
    };
    rendered.context("Failed to serialize merged SBOM")
}

/// Write output to the target (stdout or file)
pub fn write_output(content: &str, target: &OutputTarget, quiet: bool) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            println!("{content}");
            Ok(())
        }
        OutputTarget::File(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {path:?}"))?;
            if !quiet {
                tracing::info!("Output written to {:?}", path);
            }
            Ok(())
        }
    }
}

/// Write a BOM to the target
pub fn write_bom(bom: &Bom, target: &OutputTarget, compact: bool, quiet: bool) -> Result<()> {
    write_output(&render_bom(bom, compact)?, target, quiet)
}

/// Write merge warnings as a JSON array
pub fn write_warnings(warnings: &[MergeWarning], path: &std::path::Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(warnings).context("Failed to serialize merge warnings")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write warnings to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::WarningKind;
    use crate::model::SpecVersion;
    use tempfile::TempDir;

    #[test]
    fn test_output_target_from_option() {
        assert_eq!(OutputTarget::from_option(None), OutputTarget::Stdout);
        let path = PathBuf::from("/tmp/merged.json");
        assert_eq!(
            OutputTarget::from_option(Some(path.clone())),
            OutputTarget::File(path)
        );
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let bom = Bom::new(SpecVersion::V1_5);
        let compact = render_bom(&bom, true).unwrap();
        let pretty = render_bom(&bom, false).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        assert!(compact.starts_with(r#"{"bomFormat":"CycloneDX","specVersion":"1.5""#));
    }

    #[test]
    fn test_write_bom_and_warnings_to_files() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("merged.json");
        write_bom(&Bom::new(SpecVersion::V1_6), &OutputTarget::File(out.clone()), false, true)
            .unwrap();
        let written: Bom = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written.spec_version, "1.6");

        let warnings_path = tmp.path().join("warnings.json");
        let warnings = vec![MergeWarning::dangling("ghost", "edge skipped")];
        write_warnings(&warnings, &warnings_path).unwrap();
        let read: Vec<MergeWarning> =
            serde_json::from_str(&std::fs::read_to_string(&warnings_path).unwrap()).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].kind, WarningKind::DanglingReference);
    }
}
