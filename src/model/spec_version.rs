//! CycloneDX schema versions and merge target resolution.

use crate::error::{Result, SbomMergeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A CycloneDX `specVersion`, e.g. `1.5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecVersion {
    pub major: u32,
    pub minor: u32,
}

impl SpecVersion {
    pub const V1_0: Self = Self::new(1, 0);
    pub const V1_1: Self = Self::new(1, 1);
    pub const V1_2: Self = Self::new(1, 2);
    pub const V1_3: Self = Self::new(1, 3);
    pub const V1_4: Self = Self::new(1, 4);
    pub const V1_5: Self = Self::new(1, 5);
    pub const V1_6: Self = Self::new(1, 6);

    /// Versions this crate knows how to emit, oldest first
    pub const KNOWN: [Self; 7] = [
        Self::V1_0,
        Self::V1_1,
        Self::V1_2,
        Self::V1_3,
        Self::V1_4,
        Self::V1_5,
        Self::V1_6,
    ];

    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether this version is one of [`SpecVersion::KNOWN`]
    #[must_use]
    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(self)
    }

    /// JSON schema URL published for this version
    #[must_use]
    pub fn schema_url(&self) -> String {
        format!(
            "http://cyclonedx.org/schema/bom-{}.{}.schema.json",
            self.major, self.minor
        )
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SpecVersion {
    type Err = SbomMergeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || SbomMergeError::incompatible_schema(format!("unparseable specVersion '{s}'"));
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

/// Which schema version the unified document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSchemaVersion {
    /// The highest version among the inputs
    #[default]
    HighestCommon,
    /// A caller-chosen version; must not be older than any input
    Explicit(SpecVersion),
}

impl TargetSchemaVersion {
    /// Resolve the target against the versions of the input documents.
    ///
    /// Fails when an input version is unknown, when major versions differ,
    /// or when an explicit target is unknown or older than an input.
    pub fn resolve(&self, inputs: &[SpecVersion]) -> Result<SpecVersion> {
        for version in inputs {
            if !version.is_known() {
                return Err(SbomMergeError::incompatible_schema(format!(
                    "unknown CycloneDX version {version}"
                )));
            }
        }

        let (Some(lowest), Some(highest)) = (inputs.iter().min(), inputs.iter().max()) else {
            return Err(SbomMergeError::incompatible_schema(
                "no input versions to reconcile",
            ));
        };
        if lowest.major != highest.major {
            return Err(SbomMergeError::incompatible_schema(format!(
                "inputs span major versions {lowest} and {highest}"
            )));
        }

        match self {
            Self::HighestCommon => Ok(*highest),
            Self::Explicit(target) => {
                if !target.is_known() {
                    return Err(SbomMergeError::incompatible_schema(format!(
                        "unknown target version {target}"
                    )));
                }
                if target.major != highest.major || target < highest {
                    return Err(SbomMergeError::incompatible_schema(format!(
                        "target version {target} cannot represent input version {highest}"
                    )));
                }
                Ok(*target)
            }
        }
    }
}

impl fmt::Display for TargetSchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighestCommon => f.write_str("highest-common"),
            Self::Explicit(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for TargetSchemaVersion {
    type Err = SbomMergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "highest-common" | "highest_common" | "highest" => Ok(Self::HighestCommon),
            other => other.parse().map(Self::Explicit),
        }
    }
}

impl Serialize for TargetSchemaVersion {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetSchemaVersion {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
