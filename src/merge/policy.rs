//! Conflict policies.
//!
//! The component merge and the VEX merge resolve conflicts in opposite
//! directions. Each direction is its own type so the two cannot be swapped
//! by flipping a flag.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Decides which of two records describing the same thing takes precedence.
pub trait ConflictPolicy {
    /// Policy name used in logs
    const NAME: &'static str;

    /// Order an `earlier` and a `later` record as `(winner, loser)`.
    fn rank<'a, T: ?Sized>(&self, earlier: &'a T, later: &'a T) -> (&'a T, &'a T);
}

/// Component merge policy: the record from the earlier input is authoritative.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstInputWins;

impl ConflictPolicy for FirstInputWins {
    const NAME: &'static str = "first-input-wins";

    fn rank<'a, T: ?Sized>(&self, earlier: &'a T, later: &'a T) -> (&'a T, &'a T) {
        (earlier, later)
    }
}

/// VEX merge policy: a later statement supersedes an earlier one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewerEntryWins;

impl ConflictPolicy for NewerEntryWins {
    const NAME: &'static str = "newer-entry-wins";

    fn rank<'a, T: ?Sized>(&self, earlier: &'a T, later: &'a T) -> (&'a T, &'a T) {
        (later, earlier)
    }
}

/// User-selectable conflict behaviour of the component merge.
///
/// Only one value exists today; the option is accepted so configurations
/// stay valid once more policies are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OnConflict {
    #[default]
    FirstInputWins,
}

impl OnConflict {
    /// The policy this option selects
    pub const fn policy(self) -> FirstInputWins {
        match self {
            Self::FirstInputWins => FirstInputWins,
        }
    }
}
