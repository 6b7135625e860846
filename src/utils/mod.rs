//! Shared utilities.

mod hash;
mod version;

pub use hash::{content_hash, json_fingerprint};
pub use version::{Comparator, Constraint, VersionRange};
