//! Builds lookup structures from configuration and list files
//!
//! A list is either a plain text file with one item per line, or a directory
//! laid out as:
//!
//! ```text
//! first_names/
//! ├── items.txt          items of this list
//! ├── exceptions.txt     items removed from the final list (optional)
//! └── lst_nicknames/     nested sub-list, unioned into the parent
//!     └── items.txt
//! ```

use super::{LookupRegistry, LookupSet, LookupTrie, StructureKind};
use crate::config::LookupConfig;
use crate::deidentification::tokenizer::Tokenizer;
use crate::domain::{DeidError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

const ITEMS_FILE: &str = "items.txt";
const EXCEPTIONS_FILE: &str = "exceptions.txt";
const SUBLIST_PREFIX: &str = "lst_";

/// Builds a registry from `[lookups.<name>]` configuration sections
///
/// Relative list paths are resolved against `base_dir` when given. Trie
/// phrases are tokenized with `tokenizer`, so merge terms apply to lookup
/// phrases exactly as they apply to documents.
///
/// # Errors
///
/// Returns `DeidError::Lookup` if a list file or directory cannot be read.
pub fn build_registry(
    lookups: &BTreeMap<String, LookupConfig>,
    base_dir: Option<&Path>,
    tokenizer: &Tokenizer,
) -> Result<LookupRegistry> {
    let mut registry = LookupRegistry::new();

    for (name, config) in lookups {
        let mut items: Vec<String> = config.items.clone();
        if let Some(path) = &config.path {
            let path = resolve(path, base_dir);
            items.extend(read_list(&path)?);
        }

        let exceptions = LookupSet::from_items(&config.exceptions, config.case_sensitive);

        match config.structure {
            StructureKind::Set => {
                let mut set = LookupSet::from_items(&items, config.case_sensitive);
                set.subtract(&exceptions);
                tracing::debug!(lookup = %name, items = set.len(), "Built lookup set");
                registry.insert_set(name.clone(), set);
            }
            StructureKind::Trie => {
                let mut trie = LookupTrie::new(config.case_sensitive);
                for phrase in items.iter().filter(|item| !exceptions.contains(item.trim())) {
                    let words = tokenizer.words(phrase);
                    trie.insert(words.as_slice());
                }
                tracing::debug!(lookup = %name, phrases = trie.len(), "Built lookup trie");
                registry.insert_trie(name.clone(), trie);
            }
        }
    }

    Ok(registry)
}

fn resolve(path: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Reads a list file or list directory into sorted, de-duplicated items
///
/// # Errors
///
/// Returns `DeidError::Lookup` if the path does not exist or cannot be read.
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    if path.is_dir() {
        Ok(read_list_dir(path)?.into_iter().collect())
    } else if path.is_file() {
        let mut items: Vec<String> = read_list_file(path)?;
        items.sort();
        items.dedup();
        Ok(items)
    } else {
        Err(DeidError::Lookup(format!(
            "Lookup list not found: {}",
            path.display()
        )))
    }
}

fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Lookup(format!(
            "Failed to read lookup list {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_list_dir(dir: &Path) -> Result<BTreeSet<String>> {
    let mut items = BTreeSet::new();

    let own_items = dir.join(ITEMS_FILE);
    if own_items.is_file() {
        items.extend(read_list_file(&own_items)?);
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        DeidError::Lookup(format!(
            "Failed to read lookup directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut sublists: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_sublist = path.is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(SUBLIST_PREFIX));
        if is_sublist {
            sublists.push(path);
        }
    }
    sublists.sort();

    for sublist in sublists {
        items.extend(read_list_dir(&sublist)?);
    }

    let exceptions = dir.join(EXCEPTIONS_FILE);
    if exceptions.is_file() {
        for exception in read_list_file(&exceptions)? {
            items.remove(&exception);
        }
    }

    Ok(items)
}
