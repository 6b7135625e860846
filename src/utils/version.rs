//! `vers:` version ranges, as used by CycloneDX `affects[].versions[].range`.
//!
//! Only schemes with semantic versioning are evaluated. For every other
//! scheme, and for versions that do not parse, containment is undecided
//! and reported as `None`.

use crate::error::{ParseErrorKind, Result, SbomMergeError};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Schemes whose versions are compared as semantic versions
const SEMVER_SCHEMES: &[&str] = &["semver", "npm", "cargo", "golang", "hex", "pub"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    const fn is_upper_bound(self) -> bool {
        matches!(self, Self::Lt | Self::Le)
    }

    const fn is_lower_bound(self) -> bool {
        matches!(self, Self::Gt | Self::Ge)
    }

    fn admits(self, tested: &Version, bound: &Version) -> bool {
        match self {
            Self::Eq => tested == bound,
            Self::Ne => tested != bound,
            Self::Lt => tested < bound,
            Self::Le => tested <= bound,
            Self::Gt => tested > bound,
            Self::Ge => tested >= bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub comparator: Comparator,
    pub version: String,
}

/// A parsed `vers:<scheme>/<constraint>|<constraint>...` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    scheme: String,
    /// `vers:<scheme>/*`
    any: bool,
    constraints: Vec<Constraint>,
}

impl VersionRange {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    fn is_semver(&self) -> bool {
        SEMVER_SCHEMES.contains(&self.scheme.as_str())
    }

    /// Whether `version` lies in this range, or `None` when that cannot be decided.
    pub fn contains(&self, version: &str) -> Option<bool> {
        if !self.is_semver() {
            return None;
        }
        let tested = parse_version(version)?;
        if self.any {
            return Some(true);
        }

        let mut bounds: Vec<(Comparator, Version)> = Vec::new();
        for constraint in &self.constraints {
            let bound = parse_version(&constraint.version)?;
            match constraint.comparator {
                Comparator::Eq if tested == bound => return Some(true),
                Comparator::Ne if tested == bound => return Some(false),
                Comparator::Eq | Comparator::Ne => {}
                comparator => bounds.push((comparator, bound)),
            }
        }

        if bounds.is_empty() {
            // Only `=` and `!=` constraints, none of which named the version
            return Some(
                self.constraints
                    .iter()
                    .all(|c| c.comparator == Comparator::Ne),
            );
        }
        bounds.sort_by(|a, b| a.1.cmp(&b.1));

        if let [(comparator, bound)] = bounds.as_slice() {
            return Some(comparator.admits(&tested, bound));
        }

        let last = bounds.len() - 2;
        for (i, pair) in bounds.windows(2).enumerate() {
            let (current, next) = (&pair[0], &pair[1]);
            if i == 0 && current.0.is_upper_bound() && current.0.admits(&tested, &current.1) {
                return Some(true);
            }
            if i == last && next.0.is_lower_bound() && next.0.admits(&tested, &next.1) {
                return Some(true);
            }
            if current.0.is_lower_bound()
                && next.0.is_upper_bound()
                && current.0.admits(&tested, &current.1)
                && next.0.admits(&tested, &next.1)
            {
                return Some(true);
            }
        }
        Some(false)
    }

    /// Whether both ranges describe the same set of versions.
    ///
    /// Constraint order is irrelevant; for semantic versions `1.0` and
    /// `1.0.0` are the same bound.
    pub fn equivalent(&self, other: &Self) -> bool {
        if self.scheme != other.scheme || self.any != other.any {
            return false;
        }
        if self.is_semver() {
            if let (Some(ours), Some(theirs)) = (self.normalized(), other.normalized()) {
                return ours == theirs;
            }
        }
        let pairs = |range: &Self| -> Vec<(Comparator, String)> {
            let mut pairs: Vec<_> = range
                .constraints
                .iter()
                .map(|c| (c.comparator, c.version.clone()))
                .collect();
            pairs.sort();
            pairs
        };
        pairs(self) == pairs(other)
    }

    fn normalized(&self) -> Option<Vec<(Comparator, Version)>> {
        let mut out = self
            .constraints
            .iter()
            .map(|c| parse_version(&c.version).map(|v| (c.comparator, v)))
            .collect::<Option<Vec<_>>>()?;
        out.sort();
        out.dedup();
        Some(out)
    }

    /// This range with `version` excluded.
    #[must_use]
    pub fn excluding(mut self, version: impl Into<String>) -> Self {
        self.any = false;
        self.constraints.push(Constraint {
            comparator: Comparator::Ne,
            version: version.into(),
        });
        self
    }
}

impl FromStr for VersionRange {
    type Err = SbomMergeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| {
            SbomMergeError::parse(
                "version range",
                ParseErrorKind::InvalidVersionRange(format!("'{s}': {why}")),
            )
        };
        let body = s
            .trim()
            .strip_prefix("vers:")
            .ok_or_else(|| invalid("missing 'vers:' prefix"))?;
        let (scheme, constraints) = body
            .split_once('/')
            .ok_or_else(|| invalid("missing versioning scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("empty versioning scheme"));
        }
        let scheme = scheme.to_ascii_lowercase();
        let constraints = constraints.trim();
        if constraints == "*" {
            return Ok(Self {
                scheme,
                any: true,
                constraints: Vec::new(),
            });
        }

        let constraints = constraints
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| parse_constraint(c).ok_or_else(|| invalid("empty constraint version")))
            .collect::<Result<Vec<_>>>()?;
        if constraints.is_empty() {
            return Err(invalid("no constraints"));
        }
        Ok(Self {
            scheme,
            any: false,
            constraints,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vers:{}/", self.scheme)?;
        if self.any {
            return f.write_str("*");
        }
        let joined: Vec<String> = self
            .constraints
            .iter()
            .map(|c| format!("{}{}", c.comparator.symbol(), c.version))
            .collect();
        f.write_str(&joined.join("|"))
    }
}

fn parse_constraint(raw: &str) -> Option<Constraint> {
    const PREFIXES: [(&str, Comparator); 6] = [
        (">=", Comparator::Ge),
        ("<=", Comparator::Le),
        ("!=", Comparator::Ne),
        ("<", Comparator::Lt),
        (">", Comparator::Gt),
        ("=", Comparator::Eq),
    ];
    let (comparator, version) = PREFIXES
        .iter()
        .find_map(|(prefix, comparator)| raw.strip_prefix(prefix).map(|rest| (*comparator, rest)))
        .unwrap_or((Comparator::Eq, raw));
    let version = version.trim();
    (!version.is_empty()).then(|| Constraint {
        comparator,
        version: version.to_string(),
    })
}

/// Lenient semantic version: a leading `v` is ignored and missing minor or
/// patch parts count as zero.
fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }
    let padded = match raw.matches('.').count() {
        0 => format!("{raw}.0.0"),
        1 => format!("{raw}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}
