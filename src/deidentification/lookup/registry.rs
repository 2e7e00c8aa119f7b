//! Named lookup structures and versioned snapshots
//!
//! A [`LookupRegistry`] is immutable once published through a [`LookupStore`].
//! Updates build a complete new registry and swap it in atomically, so a
//! document that holds a [`LookupSnapshot`] never observes partial state.

use super::{LookupSet, LookupTrie};
use crate::domain::{DeidError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Kind of a lookup structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    /// Single-token [`LookupSet`]
    Set,
    /// Multi-token [`LookupTrie`]
    Trie,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::Set => write!(f, "set"),
            StructureKind::Trie => write!(f, "trie"),
        }
    }
}

/// A lookup structure stored in the registry
#[derive(Debug, Clone)]
pub enum LookupStructure {
    Set(LookupSet),
    Trie(LookupTrie),
}

impl LookupStructure {
    pub fn kind(&self) -> StructureKind {
        match self {
            LookupStructure::Set(_) => StructureKind::Set,
            LookupStructure::Trie(_) => StructureKind::Trie,
        }
    }

    /// Number of items or phrases
    pub fn len(&self) -> usize {
        match self {
            LookupStructure::Set(set) => set.len(),
            LookupStructure::Trie(trie) => trie.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A structure a processor needs in order to run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupRequirement {
    pub name: String,
    pub kind: StructureKind,
}

impl LookupRequirement {
    pub fn set(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StructureKind::Set,
        }
    }

    pub fn trie(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StructureKind::Trie,
        }
    }
}

/// Named collection of lookup sets and tries
#[derive(Debug, Clone, Default)]
pub struct LookupRegistry {
    structures: BTreeMap<String, LookupStructure>,
}

impl LookupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a set
    pub fn insert_set(&mut self, name: impl Into<String>, set: LookupSet) {
        self.structures.insert(name.into(), LookupStructure::Set(set));
    }

    /// Adds or replaces a trie
    pub fn insert_trie(&mut self, name: impl Into<String>, trie: LookupTrie) {
        self.structures
            .insert(name.into(), LookupStructure::Trie(trie));
    }

    pub fn remove(&mut self, name: &str) -> Option<LookupStructure> {
        self.structures.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&LookupStructure> {
        self.structures.get(name)
    }

    pub fn set(&self, name: &str) -> Option<&LookupSet> {
        match self.structures.get(name) {
            Some(LookupStructure::Set(set)) => Some(set),
            _ => None,
        }
    }

    pub fn trie(&self, name: &str) -> Option<&LookupTrie> {
        match self.structures.get(name) {
            Some(LookupStructure::Trie(trie)) => Some(trie),
            _ => None,
        }
    }

    pub fn set_mut(&mut self, name: &str) -> Option<&mut LookupSet> {
        match self.structures.get_mut(name) {
            Some(LookupStructure::Set(set)) => Some(set),
            _ => None,
        }
    }

    pub fn trie_mut(&mut self, name: &str) -> Option<&mut LookupTrie> {
        match self.structures.get_mut(name) {
            Some(LookupStructure::Trie(trie)) => Some(trie),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.structures.contains_key(name)
    }

    /// Structure names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.structures.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LookupStructure)> {
        self.structures.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Checks that every requirement is present with the right kind
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` naming the first missing or
    /// mismatched structure.
    pub fn check(&self, requirements: &[LookupRequirement]) -> Result<()> {
        for requirement in requirements {
            match self.get(&requirement.name) {
                None => {
                    return Err(DeidError::Configuration(format!(
                        "lookup structure '{}' ({}) is not defined",
                        requirement.name, requirement.kind
                    )))
                }
                Some(found) if found.kind() != requirement.kind => {
                    return Err(DeidError::Configuration(format!(
                        "lookup structure '{}' is a {}, expected a {}",
                        requirement.name,
                        found.kind(),
                        requirement.kind
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Immutable view of the registry at one version
#[derive(Debug, Clone)]
pub struct LookupSnapshot {
    version: u64,
    registry: Arc<LookupRegistry>,
}

impl LookupSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn registry(&self) -> &LookupRegistry {
        &self.registry
    }
}

/// Versioned holder of the active lookup registry
///
/// Readers take a cheap [`LookupSnapshot`]; writers publish a fully built
/// replacement. Publishing never mutates a registry that readers can see.
#[derive(Debug)]
pub struct LookupStore {
    current: RwLock<LookupSnapshot>,
    requirements: Vec<LookupRequirement>,
}

impl LookupStore {
    /// Creates a store at version 1
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` if `registry` misses a required
    /// structure.
    pub fn new(registry: LookupRegistry, requirements: Vec<LookupRequirement>) -> Result<Self> {
        registry.check(&requirements)?;
        Ok(Self {
            current: RwLock::new(LookupSnapshot {
                version: 1,
                registry: Arc::new(registry),
            }),
            requirements,
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> LookupSnapshot {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    pub fn requirements(&self) -> &[LookupRequirement] {
        &self.requirements
    }

    /// Publishes a new registry, returning its version
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` when a required structure is missing;
    /// the previous snapshot stays active.
    pub fn publish(&self, registry: LookupRegistry) -> Result<u64> {
        registry.check(&self.requirements)?;

        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let version = current.version + 1;
        *current = LookupSnapshot {
            version,
            registry: Arc::new(registry),
        };

        tracing::info!(version, structures = current.registry.len(), "Lookup snapshot published");
        Ok(version)
    }

    /// Copies the active registry, applies `update` and publishes the result
    ///
    /// Concurrent calls are not serialized against each other; the last
    /// publish wins.
    ///
    /// # Errors
    ///
    /// Propagates errors from `update` and from [`publish`](Self::publish).
    pub fn update<F>(&self, update: F) -> Result<u64>
    where
        F: FnOnce(&mut LookupRegistry) -> Result<()>,
    {
        let mut next = self.snapshot().registry().clone();
        update(&mut next)?;
        self.publish(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LookupRegistry {
        let mut registry = LookupRegistry::new();
        registry.insert_set("prefixes", LookupSet::from_items(["dr"], false));
        let mut trie = LookupTrie::new(true);
        trie.insert(&["Jan"]);
        registry.insert_trie("first_names", trie);
        registry
    }

    #[test]
    fn test_typed_access() {
        let registry = registry();
        assert!(registry.set("prefixes").is_some());
        assert!(registry.trie("prefixes").is_none());
        assert!(registry.trie("first_names").is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["first_names", "prefixes"]);
    }

    #[test]
    fn test_check_reports_missing_and_mismatched() {
        let registry = registry();
        assert!(registry.check(&[LookupRequirement::set("prefixes")]).is_ok());

        let err = registry
            .check(&[LookupRequirement::set("surnames")])
            .unwrap_err();
        assert!(err.to_string().contains("not defined"));

        let err = registry
            .check(&[LookupRequirement::set("first_names")])
            .unwrap_err();
        assert!(err.to_string().contains("expected a set"));
    }

    #[test]
    fn test_publish_swaps_snapshot() {
        let store = LookupStore::new(registry(), vec![LookupRequirement::trie("first_names")]).unwrap();
        let before = store.snapshot();
        assert_eq!(before.version(), 1);

        let version = store
            .update(|registry| {
                if let Some(trie) = registry.trie_mut("first_names") {
                    trie.insert(&["Piet"]);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(version, 2);
        assert_eq!(before.registry().trie("first_names").unwrap().len(), 1);
        assert_eq!(store.snapshot().registry().trie("first_names").unwrap().len(), 2);
    }

    #[test]
    fn test_publish_rejects_incomplete_registry() {
        let store = LookupStore::new(registry(), vec![LookupRequirement::trie("first_names")]).unwrap();

        let result = store.update(|registry| {
            registry.remove("first_names");
            Ok(())
        });

        assert!(matches!(result, Err(DeidError::Configuration(_))));
        assert_eq!(store.version(), 1);
        assert!(store.snapshot().registry().contains("first_names"));
    }
}
