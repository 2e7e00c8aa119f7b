//! Identifier detection with a weighted checksum (elfproef)

use super::Annotator;
use crate::deidentification::models::{Annotation, Document, Tag};
use crate::deidentification::processors::BuildContext;
use fancy_regex::Regex;
use serde::Deserialize;

fn default_digits() -> usize {
    9
}

fn default_weights() -> Vec<i64> {
    vec![9, 8, 7, 6, 5, 4, 3, 2, -1]
}

fn default_modulus() -> i64 {
    11
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecksumArgs {
    pub pattern: String,
    pub tag: String,
    #[serde(default)]
    pub capture_group: usize,
    #[serde(default = "default_digits")]
    pub digits: usize,
    #[serde(default = "default_weights")]
    pub weights: Vec<i64>,
    #[serde(default = "default_modulus")]
    pub modulus: i64,
}

/// Weighted modulo check over a fixed number of digits
///
/// The default rule is the Dutch BSN elfproef.
///
/// # Examples
///
/// ```
/// use deid::deidentification::annotator::ChecksumRule;
///
/// let rule = ChecksumRule::default();
/// assert!(rule.is_valid("111222333"));
/// assert!(!rule.is_valid("111222334"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRule {
    weights: Vec<i64>,
    modulus: i64,
}

impl Default for ChecksumRule {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            modulus: default_modulus(),
        }
    }
}

impl ChecksumRule {
    pub fn new(digits: usize, weights: Vec<i64>, modulus: i64) -> std::result::Result<Self, String> {
        if weights.len() != digits {
            return Err(format!(
                "checksum needs one weight per digit ({digits} digits, {} weights)",
                weights.len()
            ));
        }
        if modulus <= 0 {
            return Err(format!("checksum modulus must be positive, got {modulus}"));
        }
        Ok(Self { weights, modulus })
    }

    pub fn digits(&self) -> usize {
        self.weights.len()
    }

    /// Returns true when `candidate` has exactly the expected number of ASCII
    /// digits and its weighted sum is divisible by the modulus
    ///
    /// A weighted sum that does not fit in an `i64` never validates.
    pub fn is_valid(&self, candidate: &str) -> bool {
        if candidate.len() != self.digits() || !candidate.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        candidate
            .bytes()
            .zip(&self.weights)
            .try_fold(0i64, |sum, (b, w)| {
                i64::from(b - b'0')
                    .checked_mul(*w)
                    .and_then(|term| sum.checked_add(term))
            })
            .is_some_and(|sum| sum.rem_euclid(self.modulus) == 0)
    }
}

/// Annotates regex candidates that pass a [`ChecksumRule`]
#[derive(Debug, Clone)]
pub struct ChecksumAnnotator {
    regex: Regex,
    tag: Tag,
    capture_group: usize,
    rule: ChecksumRule,
}

impl ChecksumAnnotator {
    pub fn from_args(args: ChecksumArgs, _ctx: &BuildContext<'_>) -> std::result::Result<Self, String> {
        Ok(Self {
            regex: super::compile_pattern(&args.pattern, args.capture_group)?,
            tag: Tag::new(args.tag),
            capture_group: args.capture_group,
            rule: ChecksumRule::new(args.digits, args.weights, args.modulus)?,
        })
    }
}

impl Annotator for ChecksumAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        let text = doc.text();
        super::regex_hits(&self.regex, text, self.capture_group)
            .into_iter()
            .filter(|hit| self.rule.is_valid(&text[hit.start..hit.end]))
            .filter_map(|hit| Annotation::from_source(text, hit.start, hit.end, self.tag.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::lookup::LookupRegistry;
    use crate::deidentification::tokenizer::Tokenizer;
    use test_case::test_case;

    #[test_case("111222333", true ; "valid bsn")]
    #[test_case("111222334", false ; "wrong check digit")]
    #[test_case("123456782", true ; "another valid bsn")]
    #[test_case("11122233", false ; "too short")]
    #[test_case("1112223333", false ; "too long")]
    #[test_case("11122233a", false ; "non digit")]
    fn test_elfproef(candidate: &str, expected: bool) {
        assert_eq!(ChecksumRule::default().is_valid(candidate), expected);
    }

    #[test]
    fn test_rule_validation() {
        assert!(ChecksumRule::new(9, vec![1, 2], 11).is_err());
        assert!(ChecksumRule::new(2, vec![1, 2], 0).is_err());
    }

    #[test]
    fn test_overflowing_weights_do_not_validate() {
        let rule = ChecksumRule::new(2, vec![i64::MAX, i64::MAX], 11).unwrap();
        assert!(!rule.is_valid("99"));
        assert!(!rule.is_valid("11"));

        let rule = ChecksumRule::new(2, vec![i64::MIN, 1], 1).unwrap();
        assert!(!rule.is_valid("90"));
        assert!(rule.is_valid("00"));
    }

    #[test]
    fn test_annotates_only_valid_candidates() {
        let args: ChecksumArgs = toml::from_str(
            r#"
            pattern = '(?<!\d)(\d{9})(?!\d)'
            capture_group = 1
            tag = "bsn"
            "#,
        )
        .unwrap();
        let lookups = LookupRegistry::new();
        let tokenizer = Tokenizer::new();
        let ctx = BuildContext {
            lookups: &lookups,
            tokenizer: &tokenizer,
            recall_boost: false,
        };
        let annotator = ChecksumAnnotator::from_args(args, &ctx).unwrap();

        let text = "BSN 111222333, niet 111222334 of 1112223330.";
        let doc = Document::new(text, Tokenizer::new().tokenize(text), None, &lookups);
        let found = annotator.annotate(&doc);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "111222333");
        assert_eq!(found[0].start_char, 4);
    }
}
