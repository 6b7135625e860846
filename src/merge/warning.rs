//! Recoverable merge findings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a [`MergeWarning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// Both records set a field to different values; the primary value was kept
    FieldConflict,
    /// A reference could not be resolved; the relation was dropped
    DanglingReference,
    /// A component has no identifier; it was carried through as a distinct entry
    UnresolvableIdentity,
    /// A component matched several unified entries under different identifier kinds
    AmbiguousMatch,
    /// A `bom-ref` was already taken and had to be renamed
    ReferenceRenamed,
    /// A record was dropped because it added nothing that could be kept
    InformationLoss,
    /// Two affected versions could not be compared; both were kept
    InconclusiveVersion,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FieldConflict => "field conflict",
            Self::DanglingReference => "dangling reference",
            Self::UnresolvableIdentity => "unresolvable identity",
            Self::AmbiguousMatch => "ambiguous match",
            Self::ReferenceRenamed => "reference renamed",
            Self::InformationLoss => "information loss",
            Self::InconclusiveVersion => "inconclusive version comparison",
        };
        f.write_str(name)
    }
}

/// A recoverable finding reported alongside a complete merge result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeWarning {
    pub kind: WarningKind,
    /// Identity or reference the warning is about
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub detail: String,
}

impl MergeWarning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            field: None,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// A primary-wins conflict on `field`, naming both values
    pub fn field_conflict(
        subject: impl Into<String>,
        field: impl Into<String>,
        kept: &str,
        discarded: &str,
    ) -> Self {
        Self::new(
            WarningKind::FieldConflict,
            subject,
            format!("kept {kept}, discarded {discarded}"),
        )
        .with_field(field)
    }

    pub fn dangling(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(WarningKind::DanglingReference, subject, detail)
    }
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.subject)?;
        if let Some(field) = &self.field {
            write!(f, " [{field}]")?;
        }
        write!(f, ": {}", self.detail)
    }
}
