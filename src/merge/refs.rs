//! Interned unified references and the cross-document equivalence map.

use std::collections::HashMap;
use std::fmt;

/// Handle of an interned unified `bom-ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(usize);

impl RefId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Interner for the `bom-ref` values of the unified document.
#[derive(Debug, Clone, Default)]
pub struct RefTable {
    names: Vec<String>,
    by_name: HashMap<String, RefId>,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<RefId> {
        self.by_name.get(name).copied()
    }

    /// Name of an interned reference.
    ///
    /// Ids are only handed out by this table, so every id indexes a name.
    pub fn name(&self, id: RefId) -> &str {
        self.names.get(id.0).map_or("", String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Return the id for `name`, interning it if new.
    pub fn intern(&mut self, name: &str) -> RefId {
        if let Some(id) = self.get(name) {
            return id;
        }
        self.insert(name.to_string())
    }

    /// Intern a reference that must not alias an existing one.
    ///
    /// Returns the id and whether `wanted` had to be renamed to the first
    /// free `<wanted>-<n>`.
    pub fn intern_unique(&mut self, wanted: &str) -> (RefId, bool) {
        if !self.contains(wanted) {
            return (self.insert(wanted.to_string()), false);
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{wanted}-{n}");
            if !self.contains(&candidate) {
                return (self.insert(candidate), true);
            }
            n += 1;
        }
    }

    /// Intern `component-<n>` for the first free `n`.
    pub fn intern_generated(&mut self, prefix: &str) -> RefId {
        let mut n = 1usize;
        loop {
            let candidate = format!("{prefix}-{n}");
            if !self.contains(&candidate) {
                return self.insert(candidate);
            }
            n += 1;
        }
    }

    fn insert(&mut self, name: String) -> RefId {
        let id = RefId(self.names.len());
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        id
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Maps every `(document index, local bom-ref)` seen in the inputs to the
/// unified reference that survived the merge.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceMap {
    documents: Vec<HashMap<String, RefId>>,
}

impl EquivalenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: usize, local: &str, unified: RefId) {
        if self.documents.len() <= document {
            self.documents.resize_with(document + 1, HashMap::new);
        }
        self.documents[document].insert(local.to_string(), unified);
    }

    /// Unified reference for a local reference of `document`, if declared there
    pub fn resolve(&self, document: usize, local: &str) -> Option<RefId> {
        self.documents.get(document)?.get(local).copied()
    }

    /// Total number of recorded local references
    pub fn len(&self) -> usize {
        self.documents.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_unique_renames_with_first_free_suffix() {
        let mut table = RefTable::new();
        let (a, renamed) = table.intern_unique("lib");
        assert!(!renamed);
        table.intern("lib-1");

        let (b, renamed) = table.intern_unique("lib");
        assert!(renamed);
        assert_ne!(a, b);
        assert_eq!(table.name(b), "lib-2");
        assert_eq!(table.intern("lib"), a);
    }

    #[test]
    fn test_generated_refs() {
        let mut table = RefTable::new();
        table.intern("component-1");
        let id = table.intern_generated("component");
        assert_eq!(table.name(id), "component-2");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_equivalence_map_is_per_document() {
        let mut table = RefTable::new();
        let x = table.intern("x");
        let mut map = EquivalenceMap::new();
        map.insert(2, "local-x", x);

        assert_eq!(map.resolve(2, "local-x"), Some(x));
        assert_eq!(map.resolve(0, "local-x"), None);
        assert_eq!(map.resolve(5, "local-x"), None);
        assert_eq!(map.len(), 1);
    }
}
