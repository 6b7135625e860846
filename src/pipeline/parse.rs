//! Input collection and parsing.

use crate::error::SbomMergeError;
use crate::model::{parse_bom_str, Bom};
use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;

/// Parse a CycloneDX JSON file with context for error messages
pub fn parse_bom_with_context(path: &Path, quiet: bool) -> Result<Bom> {
    if !quiet {
        tracing::info!("Parsing SBOM: {:?}", path);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|source| SbomMergeError::io(path, source))
        .with_context(|| format!("Failed to read SBOM file: {}", path.display()))?;
    let bom = parse_bom_str(&content)
        .with_context(|| format!("Failed to parse SBOM: {}", path.display()))?;

    tracing::debug!(
        components = bom.all_components().count(),
        spec_version = %bom.spec_version,
        "parsed {}",
        path.display()
    );
    Ok(bom)
}

/// Parse every path in order
pub fn parse_all(paths: &[PathBuf], quiet: bool) -> Result<Vec<Bom>> {
    paths
        .iter()
        .map(|path| parse_bom_with_context(path, quiet))
        .collect()
}

/// Explicit files first, then the SBOMs of `folder` (`*.cdx.json` and
/// `bom.json`) in natural file name order. A folder file that is already
/// listed explicitly is skipped.
pub fn collect_input_paths(files: &[PathBuf], folder: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in files {
        if !paths.contains(file) {
            paths.push(file.clone());
        }
    }

    let Some(folder) = folder else {
        return Ok(paths);
    };

    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read input folder: {}", folder.display()))?;
    let mut found = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list input folder: {}", folder.display()))?
            .path();
        let is_sbom = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_sbom_file_name);
        if path.is_file() && is_sbom && !paths.iter().any(|p| same_file(p, &path)) {
            found.push(path);
        }
    }
    found.sort_by(|a, b| {
        let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());
        let (a, b) = (name(a).unwrap_or_default(), name(b).unwrap_or_default());
        natural_cmp(&a, &b).then_with(|| a.cmp(&b))
    });

    if found.is_empty() {
        tracing::warn!("No additional SBOMs found in folder: {}", folder.display());
    }
    for path in &found {
        tracing::debug!("Found in folder: {}", path.display());
    }
    paths.extend(found);
    Ok(paths)
}

fn is_sbom_file_name(name: &str) -> bool {
    name == "bom.json" || name.ends_with(".cdx.json")
}

/// Natural order: runs of digits compare by value, other characters
/// case-insensitively.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a);
                let right = take_digits(&mut b);
                let (left, right) = (left.trim_start_matches('0'), right.trim_start_matches('0'));
                let ordering = left.len().cmp(&right.len()).then_with(|| left.cmp(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
