//! Dutch phone numbers
//!
//! The pattern must define at least four capture groups:
//! 1. the area prefix including any parentheses, e.g. `(06)`
//! 2. the country or trunk prefix (`0031`, `+31`, `0`)
//! 3. the area code digits
//! 4. the subscriber number
//!
//! The digit count is the area code (with a leading `0`) plus the subscriber
//! number, so `0031 6 ...` and `06 ...` are measured the same way.

use super::Annotator;
use crate::deidentification::models::{Annotation, Document, Tag};
use crate::deidentification::processors::BuildContext;
use fancy_regex::Regex;
use serde::Deserialize;

const PREFIX_GROUP: usize = 1;
const AREA_GROUP: usize = 3;
const NUMBER_GROUP: usize = 4;

/// Service numbers such as `0800` have shorter subscriber numbers
const SHORT_PREFIX_SHIFT: usize = 2;

fn default_min_digits() -> usize {
    9
}

fn default_max_digits() -> usize {
    11
}

fn default_short_prefixes() -> Vec<String> {
    ["0800", "0900", "0906", "0909"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhoneNumberArgs {
    pub pattern: String,
    pub tag: String,
    #[serde(default = "default_min_digits")]
    pub min_digits: usize,
    #[serde(default = "default_max_digits")]
    pub max_digits: usize,
    #[serde(default = "default_short_prefixes")]
    pub short_prefixes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PhoneNumberAnnotator {
    regex: Regex,
    tag: Tag,
    min_digits: usize,
    max_digits: usize,
    short_prefixes: Vec<String>,
}

impl PhoneNumberAnnotator {
    pub fn from_args(
        args: PhoneNumberArgs,
        _ctx: &BuildContext<'_>,
    ) -> std::result::Result<Self, String> {
        let regex = super::compile_pattern(&args.pattern, NUMBER_GROUP)?;
        if args.min_digits > args.max_digits {
            return Err(format!(
                "min_digits ({}) exceeds max_digits ({})",
                args.min_digits, args.max_digits
            ));
        }
        if args.min_digits < SHORT_PREFIX_SHIFT {
            return Err(format!("min_digits must be at least {SHORT_PREFIX_SHIFT}"));
        }

        Ok(Self {
            regex,
            tag: Tag::new(args.tag),
            min_digits: args.min_digits,
            max_digits: args.max_digits,
            short_prefixes: args.short_prefixes,
        })
    }

    /// Checks one match and returns the span to annotate
    fn accept(&self, captures: &fancy_regex::Captures<'_>) -> Option<(usize, usize)> {
        let whole = captures.get(0)?;
        if whole.as_str().matches('-').count() > 1 {
            return None;
        }

        let prefix = captures.get(PREFIX_GROUP).map_or("", |m| m.as_str());
        let area = format!("0{}", digits_of(captures.get(AREA_GROUP).map_or("", |m| m.as_str())));
        let number = digits_of(captures.get(NUMBER_GROUP).map_or("", |m| m.as_str()));

        let (min, max) = if self.short_prefixes.iter().any(|p| *p == area) {
            (
                self.min_digits - SHORT_PREFIX_SHIFT,
                self.max_digits.saturating_sub(SHORT_PREFIX_SHIFT),
            )
        } else {
            (self.min_digits, self.max_digits)
        };

        let count = area.len() + number.len();
        if !(min..=max).contains(&count) {
            return None;
        }

        // An opening parenthesis without its closing one stays outside the span
        let shift = usize::from(prefix.starts_with('(') && !prefix.ends_with(')'));
        Some((whole.start() + shift, whole.end()))
    }
}

fn digits_of(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

impl Annotator for PhoneNumberAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        let text = doc.text();
        let mut annotations = Vec::new();

        for captures in self.regex.captures_iter(text) {
            let captures = match captures {
                Ok(captures) => captures,
                Err(e) => {
                    tracing::warn!(error = %e, "Phone number matching stopped early");
                    break;
                }
            };
            if let Some((start, end)) = self.accept(&captures) {
                if let Some(annotation) = Annotation::from_source(text, start, end, self.tag.clone()) {
                    annotations.push(annotation);
                }
            }
        }

        annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::lookup::LookupRegistry;
    use crate::deidentification::tokenizer::Tokenizer;

    const PATTERN: &str = r"(?<!\d)(\(?(0031|\+31|0)(1[035]|2[0347]|3[03568]|4[03456]|5[0358]|6|7|88|800|91|90[069]|[1-5]\d{2})\)?) ?-? ?((\d{2,4}[ -]?)+\d{2,4})";

    const TEXT: &str = "Telefoonnummers zijn 0314-555555, (088 755 55 55) of (06)55555555, \
                        maar 065555 is te kort en 065555555555 is te lang. \
                        Verwijsnummer is 0800-9003.";

    fn annotate(min_digits: usize, max_digits: usize) -> Vec<(String, usize, usize)> {
        let args = PhoneNumberArgs {
            pattern: PATTERN.to_string(),
            tag: "telefoonnummer".to_string(),
            min_digits,
            max_digits,
            short_prefixes: default_short_prefixes(),
        };
        let lookups = LookupRegistry::new();
        let tokenizer = Tokenizer::new();
        let ctx = BuildContext {
            lookups: &lookups,
            tokenizer: &tokenizer,
            recall_boost: false,
        };
        let annotator = PhoneNumberAnnotator::from_args(args, &ctx).unwrap();

        let doc = Document::new(TEXT, Tokenizer::new().tokenize(TEXT), None, &lookups);
        annotator
            .annotate(&doc)
            .into_iter()
            .map(|a| (a.text, a.start_char, a.end_char))
            .collect()
    }

    #[test]
    fn test_default_digit_range() {
        assert_eq!(
            annotate(9, 11),
            vec![
                ("0314-555555".to_string(), 21, 32),
                ("088 755 55 55".to_string(), 35, 48),
                ("(06)55555555".to_string(), 53, 65),
                ("0800-9003".to_string(), 135, 144),
            ]
        );
    }

    #[test]
    fn test_short_and_long_ranges() {
        assert_eq!(annotate(4, 8), vec![("065555".to_string(), 72, 78)]);
        assert_eq!(annotate(11, 12), vec![("065555555555".to_string(), 93, 105)]);
    }

    #[test]
    fn test_multiple_hyphens_are_rejected() {
        let lookups = LookupRegistry::new();
        let tokenizer = Tokenizer::new();
        let ctx = BuildContext {
            lookups: &lookups,
            tokenizer: &tokenizer,
            recall_boost: false,
        };
        let args: PhoneNumberArgs =
            toml::from_str(&format!("pattern = '{PATTERN}'\ntag = \"telefoonnummer\"")).unwrap();
        let annotator = PhoneNumberAnnotator::from_args(args, &ctx).unwrap();

        let text = "Bel 06-12-345678 of 06-12345678";
        let doc = Document::new(text, Tokenizer::new().tokenize(text), None, &lookups);
        let found: Vec<String> = annotator.annotate(&doc).into_iter().map(|a| a.text).collect();

        assert_eq!(found, vec!["06-12345678"]);
    }

    #[test]
    fn test_pattern_needs_number_group() {
        let lookups = LookupRegistry::new();
        let tokenizer = Tokenizer::new();
        let ctx = BuildContext {
            lookups: &lookups,
            tokenizer: &tokenizer,
            recall_boost: false,
        };
        let args = PhoneNumberArgs {
            pattern: r"(\d+)".to_string(),
            tag: "telefoonnummer".to_string(),
            min_digits: 9,
            max_digits: 11,
            short_prefixes: Vec::new(),
        };
        assert!(PhoneNumberAnnotator::from_args(args, &ctx).is_err());
    }
}
