//! Identity index for expected O(1) candidate lookup.
//!
//! Entries are bucketed by each of their identity keys. A lookup gathers the
//! candidates from the buckets of the incoming identity's keys, in priority
//! order, and re-checks each with [`ComponentIdentity::same_entity`]. Stale
//! bucket entries (left behind when a merged record gains keys) are harmless
//! because of that re-check.

use crate::model::{ComponentIdentity, IdentityKey};
use std::collections::HashMap;
use std::hash::Hash;

/// Result of an index lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMatch<Id> {
    /// Entry selected by declared identifier priority
    pub chosen: Id,
    /// Other distinct entries that also matched
    pub rejected: Vec<Id>,
}

/// Index from identity keys to entry ids.
#[derive(Debug, Clone)]
pub struct IdentityIndex<Id> {
    buckets: HashMap<IdentityKey, Vec<Id>>,
}

impl<Id> Default for IdentityIndex<Id> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<Id: Copy + Eq + Hash> IdentityIndex<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every key of `identity` for `id`.
    pub fn insert(&mut self, id: Id, identity: &ComponentIdentity) {
        for key in identity.keys() {
            let bucket = self.buckets.entry(key.clone()).or_default();
            if !bucket.contains(&id) {
                bucket.push(id);
            }
        }
    }

    /// Find entries that are the same entity as `identity`.
    ///
    /// `identity_of` returns the current identity of an indexed entry.
    pub fn find<'a, F>(
        &self,
        identity: &ComponentIdentity,
        identity_of: F,
    ) -> Option<IndexMatch<Id>>
    where
        F: Fn(Id) -> Option<&'a ComponentIdentity>,
    {
        let mut matches: Vec<Id> = Vec::new();
        for key in identity.keys() {
            let Some(bucket) = self.buckets.get(key) else {
                continue;
            };
            for &candidate in bucket {
                if matches.contains(&candidate) {
                    continue;
                }
                if identity_of(candidate).is_some_and(|existing| existing.same_entity(identity)) {
                    matches.push(candidate);
                }
            }
        }

        let mut matches = matches.into_iter();
        let chosen = matches.next()?;
        Some(IndexMatch {
            chosen,
            rejected: matches.collect(),
        })
    }

    /// Number of distinct keys indexed
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }
}
