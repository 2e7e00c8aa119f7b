//! Processor kinds and their registration table
//!
//! Configuration names a processor by its [`ProcessorKind`]. Each kind maps to
//! exactly one constructor, which deserializes the kind-specific arguments and
//! validates them. Every failure here is a configuration error raised before
//! any document is processed.

use crate::deidentification::annotator::checksum::ChecksumArgs;
use crate::deidentification::annotator::context::ContextArgs;
use crate::deidentification::annotator::lookup::LookupArgs;
use crate::deidentification::annotator::patient::PatientNameArgs;
use crate::deidentification::annotator::phone::PhoneNumberArgs;
use crate::deidentification::annotator::regexp::{RegexpArgs, RegexpPseudoArgs};
use crate::deidentification::annotator::token_pattern::TokenPatternArgs;
use crate::deidentification::annotator::{
    Annotator, ChecksumAnnotator, ContextAnnotator, MultiTokenLookupAnnotator,
    PatientNameAnnotator, PhoneNumberAnnotator, RegexpAnnotator, RegexpPseudoAnnotator,
    TokenPatternAnnotator,
};
use crate::deidentification::lookup::{LookupRegistry, LookupRequirement};
use crate::deidentification::processing::merge::MergeArgs;
use crate::deidentification::processing::overlap::OverlapResolverArgs;
use crate::deidentification::processing::person::PersonConverterArgs;
use crate::deidentification::processing::{
    AnnotationMerger, AnnotationProcessor, OverlapResolver, PersonAnnotationConverter,
};
use crate::deidentification::redactor::{Redactor, RedactorArgs};
use crate::deidentification::tokenizer::Tokenizer;
use crate::domain::{DeidError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shared inputs available to processor constructors
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Lookup structures the processors will read at run time
    pub lookups: &'a LookupRegistry,

    /// Tokenizer used for documents, including merge terms
    pub tokenizer: &'a Tokenizer,

    /// Whether lookup annotators may use their recall boost settings
    pub recall_boost: bool,
}

/// Closed set of processor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    MultiTokenLookup,
    TokenPattern,
    Context,
    Regexp,
    RegexpPseudo,
    Checksum,
    PhoneNumber,
    PatientName,
    PersonConverter,
    OverlapResolver,
    MergeAdjacent,
    Redactor,
}

type Constructor = fn(&toml::Table, &BuildContext<'_>) -> std::result::Result<Processor, String>;

impl ProcessorKind {
    pub const ALL: [ProcessorKind; 12] = [
        ProcessorKind::MultiTokenLookup,
        ProcessorKind::TokenPattern,
        ProcessorKind::Context,
        ProcessorKind::Regexp,
        ProcessorKind::RegexpPseudo,
        ProcessorKind::Checksum,
        ProcessorKind::PhoneNumber,
        ProcessorKind::PatientName,
        ProcessorKind::PersonConverter,
        ProcessorKind::OverlapResolver,
        ProcessorKind::MergeAdjacent,
        ProcessorKind::Redactor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::MultiTokenLookup => "multi_token_lookup",
            ProcessorKind::TokenPattern => "token_pattern",
            ProcessorKind::Context => "context",
            ProcessorKind::Regexp => "regexp",
            ProcessorKind::RegexpPseudo => "regexp_pseudo",
            ProcessorKind::Checksum => "checksum",
            ProcessorKind::PhoneNumber => "phone_number",
            ProcessorKind::PatientName => "patient_name",
            ProcessorKind::PersonConverter => "person_converter",
            ProcessorKind::OverlapResolver => "overlap_resolver",
            ProcessorKind::MergeAdjacent => "merge_adjacent",
            ProcessorKind::Redactor => "redactor",
        }
    }

    /// Registration table: the constructor for this kind
    fn constructor(self) -> Constructor {
        match self {
            ProcessorKind::MultiTokenLookup => |args, ctx| {
                let annotator = MultiTokenLookupAnnotator::from_args(parse_args::<LookupArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::TokenPattern => |args, ctx| {
                let annotator = TokenPatternAnnotator::from_args(parse_args::<TokenPatternArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::Context => |args, ctx| {
                let annotator = ContextAnnotator::from_args(parse_args::<ContextArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::Regexp => |args, ctx| {
                let annotator = RegexpAnnotator::from_args(parse_args::<RegexpArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::RegexpPseudo => |args, ctx| {
                let annotator = RegexpPseudoAnnotator::from_args(parse_args::<RegexpPseudoArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::Checksum => |args, ctx| {
                let annotator = ChecksumAnnotator::from_args(parse_args::<ChecksumArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::PhoneNumber => |args, ctx| {
                let annotator = PhoneNumberAnnotator::from_args(parse_args::<PhoneNumberArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::PatientName => |args, ctx| {
                let annotator = PatientNameAnnotator::from_args(parse_args::<PatientNameArgs>(args)?, ctx)?;
                Ok(Processor::annotator(annotator))
            },
            ProcessorKind::PersonConverter => |args, _ctx| {
                let converter = PersonAnnotationConverter::from_args(parse_args::<PersonConverterArgs>(args)?)?;
                Ok(Processor::processing(converter))
            },
            ProcessorKind::OverlapResolver => |args, _ctx| {
                let resolver = OverlapResolver::from_args(parse_args::<OverlapResolverArgs>(args)?)?;
                Ok(Processor::processing(resolver))
            },
            ProcessorKind::MergeAdjacent => |args, _ctx| {
                let merger = AnnotationMerger::from_args(parse_args::<MergeArgs>(args)?)?;
                Ok(Processor::processing(merger))
            },
            ProcessorKind::Redactor => |args, _ctx| {
                let redactor = Redactor::from_args(parse_args::<RedactorArgs>(args)?);
                Ok(Processor::Redactor(redactor))
            },
        }
    }

    /// Builds a processor of this kind from its arguments
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` naming `name` when the arguments do
    /// not deserialize or fail validation.
    pub fn build(self, name: &str, args: &toml::Table, ctx: &BuildContext<'_>) -> Result<Processor> {
        (self.constructor())(args, ctx).map_err(|msg| {
            DeidError::processor_config(name, format!("{} ({})", msg, self.as_str()))
        })
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_args<T: DeserializeOwned>(args: &toml::Table) -> std::result::Result<T, String> {
    toml::Value::Table(args.clone())
        .try_into()
        .map_err(|e: toml::de::Error| e.message().to_string())
}

/// A built pipeline step
#[derive(Debug)]
pub enum Processor {
    /// Adds candidate annotations
    Annotator(Box<dyn Annotator>),
    /// Replaces the whole annotation set
    Processing(Box<dyn AnnotationProcessor>),
    /// Produces the redacted text
    Redactor(Redactor),
}

impl Processor {
    pub fn annotator(annotator: impl Annotator + 'static) -> Self {
        Processor::Annotator(Box::new(annotator))
    }

    pub fn processing(processor: impl AnnotationProcessor + 'static) -> Self {
        Processor::Processing(Box::new(processor))
    }

    pub fn required_lookups(&self) -> Vec<LookupRequirement> {
        match self {
            Processor::Annotator(annotator) => annotator.required_lookups(),
            Processor::Processing(_) | Processor::Redactor(_) => Vec::new(),
        }
    }

    pub fn is_redactor(&self) -> bool {
        matches!(self, Processor::Redactor(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::lookup::{LookupSet, LookupTrie};
    use test_case::test_case;

    fn registry() -> LookupRegistry {
        let mut registry = LookupRegistry::new();
        let mut trie = LookupTrie::new(true);
        trie.insert(&["Utrecht"]);
        registry.insert_trie("places", trie);
        registry.insert_set("prefixes", LookupSet::from_items(["dr"], false));
        registry
    }

    fn build(kind: ProcessorKind, args: &str) -> Result<Processor> {
        let lookups = registry();
        let tokenizer = Tokenizer::new();
        let ctx = BuildContext {
            lookups: &lookups,
            tokenizer: &tokenizer,
            recall_boost: false,
        };
        let args: toml::Table = toml::from_str(args).unwrap();
        kind.build("test", &args, &ctx)
    }

    #[test]
    fn test_kind_names_round_trip_through_serde() {
        for kind in ProcessorKind::ALL {
            let value = toml::Value::String(kind.as_str().to_string());
            let parsed: ProcessorKind = value.try_into().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test_case(ProcessorKind::MultiTokenLookup, r#"lookup = "places"
tag = "locatie""# ; "lookup")]
    #[test_case(ProcessorKind::Regexp, r#"pattern = "\\d{4}"
tag = "postcode""# ; "regexp")]
    #[test_case(ProcessorKind::Checksum, r#"pattern = "\\d{9}"
tag = "bsn""# ; "checksum")]
    #[test_case(ProcessorKind::PatientName, "" ; "patient name with defaults")]
    #[test_case(ProcessorKind::OverlapResolver, "" ; "overlap resolver with defaults")]
    #[test_case(ProcessorKind::MergeAdjacent, "" ; "merger with defaults")]
    #[test_case(ProcessorKind::Redactor, r#"open = "[""# ; "redactor")]
    fn test_builds_valid_args(kind: ProcessorKind, args: &str) {
        assert!(build(kind, args).is_ok());
    }

    #[test_case(ProcessorKind::MultiTokenLookup, r#"lookup = "missing"
tag = "locatie""# ; "unknown lookup")]
    #[test_case(ProcessorKind::MultiTokenLookup, r#"lookup = "prefixes"
tag = "x""# ; "lookup of wrong kind")]
    #[test_case(ProcessorKind::Regexp, r#"pattern = "("
tag = "x""# ; "invalid regex")]
    #[test_case(ProcessorKind::Regexp, r#"tag = "x""# ; "missing pattern")]
    #[test_case(ProcessorKind::Redactor, r#"colour = "red""# ; "unknown field")]
    #[test_case(ProcessorKind::PersonConverter, "threshold = 1" ; "converter takes no args")]
    fn test_rejects_invalid_args(kind: ProcessorKind, args: &str) {
        let err = build(kind, args).unwrap_err();
        assert!(matches!(err, DeidError::Configuration(_)));
        assert!(err.to_string().contains("processor 'test'"));
    }

    #[test]
    fn test_required_lookups_are_reported() {
        let processor = build(
            ProcessorKind::MultiTokenLookup,
            "lookup = \"places\"\ntag = \"locatie\"",
        )
        .unwrap();
        assert_eq!(processor.required_lookups(), vec![LookupRequirement::trie("places")]);
        assert!(!processor.is_redactor());
    }
}
