//! Unified error types for sbom-merge.
//!
//! Only fatal conditions live here. Recoverable merge findings (field
//! conflicts, dangling references, ...) are reported as
//! [`MergeWarning`](crate::merge::MergeWarning)s alongside a complete result.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sbom-merge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SbomMergeError {
    /// Errors while turning JSON into the document model
    #[error("Failed to parse SBOM: {context}")]
    Parse {
        context: String,
        #[source]
        source: ParseErrorKind,
    },

    /// Fatal merge errors; no partial document is produced
    #[error("Merge failed: {context}")]
    Merge {
        context: String,
        #[source]
        source: MergeErrorKind,
    },

    /// Reading an input file failed
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Specific parse error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("Not a CycloneDX document (bomFormat: {0})")]
    NotCycloneDx(String),

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Invalid specVersion '{0}'")]
    InvalidSpecVersion(String),

    #[error("Invalid version range {0}")]
    InvalidVersionRange(String),
}

/// Specific merge error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MergeErrorKind {
    #[error("Incompatible schema versions: {0}")]
    IncompatibleSchema(String),

    #[error("Malformed input document #{document}: {message}")]
    MalformedInput { document: usize, message: String },

    #[error("No input documents")]
    NoInputs,
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for sbom-merge operations
pub type Result<T> = std::result::Result<T, SbomMergeError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl SbomMergeError {
    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, source: ParseErrorKind) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    /// Create a merge error with context
    pub fn merge(context: impl Into<String>, source: MergeErrorKind) -> Self {
        Self::Merge {
            context: context.into(),
            source,
        }
    }

    /// Create an incompatible schema error
    pub fn incompatible_schema(message: impl Into<String>) -> Self {
        Self::merge(
            "schema version check",
            MergeErrorKind::IncompatibleSchema(message.into()),
        )
    }

    /// Create a malformed input error for the document at `document` (0-based)
    pub fn malformed_input(document: usize, message: impl Into<String>) -> Self {
        Self::merge(
            "input structure",
            MergeErrorKind::MalformedInput {
                document,
                message: message.into(),
            },
        )
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors raised because inputs disagree on schema version
    #[must_use]
    pub const fn is_incompatible_schema(&self) -> bool {
        matches!(
            self,
            Self::Merge {
                source: MergeErrorKind::IncompatibleSchema(_),
                ..
            }
        )
    }

    /// Returns true for errors raised because an input is structurally broken
    #[must_use]
    pub const fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::Merge {
                source: MergeErrorKind::MalformedInput { .. },
                ..
            }
        )
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<serde_json::Error> for SbomMergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(
            "JSON deserialization",
            ParseErrorKind::InvalidJson(err.to_string()),
        )
    }
}
