//! Single-token vocabulary set

use super::distance::{edit_budget, within_distance};
use rustc_hash::FxHashSet;

/// Set of canonical strings with a case-sensitivity mode
///
/// In case-insensitive mode items are stored lowercased and queries are
/// lowercased before lookup.
///
/// # Examples
///
/// ```
/// use deid::deidentification::lookup::LookupSet;
///
/// let prefixes = LookupSet::from_items(["dr", "dhr", "mevr"], false);
/// assert!(prefixes.contains("Dr"));
/// assert!(!prefixes.contains("prof"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LookupSet {
    items: FxHashSet<String>,
    case_sensitive: bool,
}

impl LookupSet {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            items: FxHashSet::default(),
            case_sensitive,
        }
    }

    /// Builds a set from items, skipping blank entries
    pub fn from_items<I, S>(items: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(case_sensitive);
        set.extend(items);
        set
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key(&self, item: &str) -> String {
        if self.case_sensitive {
            item.to_string()
        } else {
            item.to_lowercase()
        }
    }

    /// Adds an item, returning false when it was already present
    pub fn insert(&mut self, item: &str) -> bool {
        let item = item.trim();
        if item.is_empty() {
            return false;
        }
        let key = self.key(item);
        self.items.insert(key)
    }

    pub fn extend<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            self.insert(item.as_ref());
        }
    }

    pub fn remove(&mut self, item: &str) -> bool {
        let key = self.key(item.trim());
        self.items.remove(&key)
    }

    /// Removes every item of `other`
    pub fn subtract(&mut self, other: &LookupSet) {
        for item in &other.items {
            self.remove(item);
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        if self.case_sensitive {
            self.items.contains(item)
        } else {
            self.items.contains(&item.to_lowercase())
        }
    }

    /// Returns true when some item is within `max_edits` of `item`
    pub fn fuzzy_contains(&self, item: &str, max_edits: usize) -> bool {
        if self.contains(item) {
            return true;
        }
        if max_edits == 0 {
            return false;
        }

        let query = self.key(item);
        self.items
            .iter()
            .any(|candidate| within_distance(&query, candidate, max_edits))
    }

    /// Fuzzy membership with the edit budget scaled to the length of `item`
    pub fn fuzzy_contains_scaled(&self, item: &str) -> bool {
        self.fuzzy_contains(item, edit_budget(item.chars().count()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the stored (possibly lowercased) items in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_sensitive_membership() {
        let set = LookupSet::from_items(["Jan", "Piet"], true);
        assert!(set.contains("Jan"));
        assert!(!set.contains("jan"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_case_insensitive_membership() {
        let set = LookupSet::from_items(["Van", "der"], false);
        assert!(set.contains("van"));
        assert!(set.contains("DER"));
    }

    #[test]
    fn test_blank_items_are_skipped() {
        let set = LookupSet::from_items(["", "  ", "a"], true);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_subtract() {
        let mut set = LookupSet::from_items(["Amsterdam", "Hoorn", "Best"], true);
        set.subtract(&LookupSet::from_items(["Best"], true));
        assert!(!set.contains("Best"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_fuzzy_contains() {
        let set = LookupSet::from_items(["Willemijn"], true);
        assert!(set.fuzzy_contains("Wilemijn", 1));
        assert!(!set.fuzzy_contains("Wilemin", 1));
        assert!(set.fuzzy_contains_scaled("Willemijm"));
        assert!(!LookupSet::from_items(["Jan"], true).fuzzy_contains_scaled("Jas"));
    }
}
