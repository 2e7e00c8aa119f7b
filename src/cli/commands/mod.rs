//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod batch;
pub mod deidentify;
pub mod init;
pub mod validate;

use crate::domain::Person;

/// Patient metadata flags shared by the processing commands
#[derive(clap::Args, Debug, Default, Clone)]
pub struct PatientArgs {
    /// Patient first names (space-separated)
    #[arg(long, value_name = "NAMES")]
    pub first_names: Option<String>,

    /// Patient initials, e.g. "J.W."
    #[arg(long)]
    pub initials: Option<String>,

    /// Patient surname
    #[arg(long)]
    pub surname: Option<String>,
}

impl PatientArgs {
    /// The patient, or `None` when no flag carries a value
    pub fn person(&self) -> Option<Person> {
        let person = Person::from_keywords(
            self.first_names.as_deref().unwrap_or_default(),
            self.initials.as_deref().unwrap_or_default(),
            self.surname.as_deref().unwrap_or_default(),
        );
        (!person.is_empty()).then_some(person)
    }
}
