//! Patient metadata supplied by the caller
//!
//! A [`Person`] is owned by the caller and only read by the pipeline for the
//! duration of a single call. Every field is optional; an absent field
//! disables the matchers that depend on it.

use serde::{Deserialize, Serialize};

/// Identity of the patient a document is about
///
/// # Defaults
///
/// - `first_names`: empty (no first name or initial-from-name matching)
/// - `initials`: `None` (no initials matching)
/// - `surname`: `None` (no surname matching)
///
/// # Examples
///
/// ```
/// use deid::domain::Person;
///
/// let patient = Person::new()
///     .with_first_names(["Jan", "Willem"])
///     .with_initials("J.W.")
///     .with_surname("Jansen");
///
/// assert_eq!(patient.first_names, vec!["Jan", "Willem"]);
/// assert!(!patient.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// First names, in order
    #[serde(default)]
    pub first_names: Vec<String>,

    /// Initials as written, e.g. `"J.W."`
    #[serde(default)]
    pub initials: Option<String>,

    /// Surname, possibly multi-word (e.g. `"van der Berg"`)
    #[serde(default)]
    pub surname: Option<String>,
}

impl Person {
    /// Creates an empty person
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first names, dropping blank entries
    pub fn with_first_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.first_names = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        self
    }

    /// Sets the initials
    pub fn with_initials(mut self, initials: impl Into<String>) -> Self {
        self.initials = non_blank(initials.into());
        self
    }

    /// Sets the surname
    pub fn with_surname(mut self, surname: impl Into<String>) -> Self {
        self.surname = non_blank(surname.into());
        self
    }

    /// Builds a person from whitespace separated first names plus optional
    /// initials and surname, as they are typically passed on a command line
    pub fn from_keywords(first_names: &str, initials: &str, surname: &str) -> Self {
        Self::new()
            .with_first_names(first_names.split_whitespace())
            .with_initials(initials)
            .with_surname(surname)
    }

    /// Returns true when no field carries any information
    pub fn is_empty(&self) -> bool {
        self.first_names.is_empty() && self.initials.is_none() && self.surname.is_none()
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_person_is_empty() {
        assert!(Person::default().is_empty());
    }

    #[test]
    fn test_from_keywords() {
        let person = Person::from_keywords("Jan  Willem", "", "Jansen");
        assert_eq!(person.first_names, vec!["Jan", "Willem"]);
        assert_eq!(person.initials, None);
        assert_eq!(person.surname.as_deref(), Some("Jansen"));
    }

    #[test]
    fn test_blank_fields_are_dropped() {
        let person = Person::new()
            .with_first_names(["", " "])
            .with_surname("   ");
        assert!(person.is_empty());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let person: Person = serde_json::from_str(r#"{"surname": "Visser"}"#).unwrap();
        assert!(person.first_names.is_empty());
        assert_eq!(person.surname.as_deref(), Some("Visser"));
    }
}
