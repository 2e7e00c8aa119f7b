//! Lookup structures for vocabulary matching
//!
//! - [`LookupSet`]: single-token membership with optional fuzzy matching
//! - [`LookupTrie`]: multi-token longest-match phrase lookup
//! - [`LookupRegistry`] / [`LookupStore`]: named structures behind versioned,
//!   immutable snapshots

pub mod distance;
pub mod loader;
pub mod registry;
pub mod set;
pub mod trie;

pub use distance::{edit_budget, edit_distance, within_distance};
pub use loader::{build_registry, read_list};
pub use registry::{
    LookupRegistry, LookupRequirement, LookupSnapshot, LookupStore, LookupStructure,
    StructureKind,
};
pub use set::LookupSet;
pub use trie::{LookupTrie, RecallBoost, TrieMatch};
