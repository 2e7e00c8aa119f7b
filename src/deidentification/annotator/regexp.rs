//! Regular expressions over the raw text

use super::{Annotator, RegexHit};
use crate::deidentification::models::{Annotation, Document, Tag};
use crate::deidentification::processors::BuildContext;
use fancy_regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

fn default_window() -> usize {
    1
}

fn default_lowercase() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexpArgs {
    pub pattern: String,
    pub tag: String,
    #[serde(default)]
    pub capture_group: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexpPseudoArgs {
    pub pattern: String,
    pub tag: String,
    #[serde(default)]
    pub capture_group: usize,
    #[serde(default)]
    pub pre_pseudo: Vec<String>,
    #[serde(default)]
    pub post_pseudo: Vec<String>,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
}

/// Annotates every non-overlapping match of a pattern
///
/// Patterns are compiled with `fancy_regex`, so lookaround such as
/// `(?<!\d)` is available. When `capture_group` is not 0 only that group
/// becomes the annotation.
#[derive(Debug, Clone)]
pub struct RegexpAnnotator {
    regex: Regex,
    tag: Tag,
    capture_group: usize,
}

impl RegexpAnnotator {
    pub fn new(
        pattern: &str,
        tag: impl Into<Tag>,
        capture_group: usize,
    ) -> std::result::Result<Self, String> {
        Ok(Self {
            regex: super::compile_pattern(pattern, capture_group)?,
            tag: tag.into(),
            capture_group,
        })
    }

    pub fn from_args(args: RegexpArgs, _ctx: &BuildContext<'_>) -> std::result::Result<Self, String> {
        Self::new(&args.pattern, args.tag, args.capture_group)
    }

    fn hits(&self, text: &str) -> Vec<RegexHit> {
        super::regex_hits(&self.regex, text, self.capture_group)
    }
}

impl Annotator for RegexpAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        let text = doc.text();
        self.hits(text)
            .into_iter()
            .filter_map(|hit| Annotation::from_source(text, hit.start, hit.end, self.tag.clone()))
            .collect()
    }
}

/// Regexp annotator that drops matches near known false-positive words
///
/// Up to `window` words before the whole match are compared with
/// `pre_pseudo` and up to `window` words after it with `post_pseudo`. Words
/// are runs of letters; punctuation between the match and a word ends the
/// search in that direction.
#[derive(Debug, Clone)]
pub struct RegexpPseudoAnnotator {
    inner: RegexpAnnotator,
    pre_pseudo: HashSet<String>,
    post_pseudo: HashSet<String>,
    window: usize,
    lowercase: bool,
}

impl RegexpPseudoAnnotator {
    pub fn from_args(
        args: RegexpPseudoArgs,
        _ctx: &BuildContext<'_>,
    ) -> std::result::Result<Self, String> {
        if args.window == 0 {
            return Err("window must be at least 1".to_string());
        }

        let normalize = |words: Vec<String>| -> HashSet<String> {
            words
                .into_iter()
                .map(|w| if args.lowercase { w.to_lowercase() } else { w })
                .collect()
        };

        Ok(Self {
            inner: RegexpAnnotator::new(&args.pattern, args.tag, args.capture_group)?,
            pre_pseudo: normalize(args.pre_pseudo),
            post_pseudo: normalize(args.post_pseudo),
            window: args.window,
            lowercase: args.lowercase,
        })
    }

    fn is_pseudo(&self, set: &HashSet<String>, words: Vec<&str>) -> bool {
        words.into_iter().any(|word| {
            if self.lowercase {
                set.contains(&word.to_lowercase())
            } else {
                set.contains(word)
            }
        })
    }
}

impl Annotator for RegexpPseudoAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        let text = doc.text();
        self.inner
            .hits(text)
            .into_iter()
            .filter(|hit| {
                let before = preceding_words(text, hit.match_start, self.window);
                let after = following_words(text, hit.match_end, self.window);
                !self.is_pseudo(&self.pre_pseudo, before) && !self.is_pseudo(&self.post_pseudo, after)
            })
            .filter_map(|hit| {
                Annotation::from_source(text, hit.start, hit.end, self.inner.tag.clone())
            })
            .collect()
    }
}

/// Up to `window` letter-only words ending before `offset`, nearest first
fn preceding_words(text: &str, offset: usize, window: usize) -> Vec<&str> {
    let mut words = Vec::new();
    let mut end = offset;
    while words.len() < window {
        let before = text[..end].trim_end();
        let start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphabetic())
            .last()
            .map_or(before.len(), |(i, _)| i);
        if start == before.len() {
            break;
        }
        words.push(&before[start..]);
        end = start;
    }
    words
}

/// Up to `window` letter-only words starting after `offset`, nearest first
fn following_words(text: &str, offset: usize, window: usize) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = offset;
    while words.len() < window {
        let rest = &text[start..];
        let trimmed = rest.trim_start();
        let word_start = start + (rest.len() - trimmed.len());
        let len: usize = trimmed
            .chars()
            .take_while(|c| c.is_alphabetic())
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            break;
        }
        words.push(&text[word_start..word_start + len]);
        start = word_start + len;
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::lookup::LookupRegistry;
    use crate::deidentification::tokenizer::Tokenizer;

    fn annotate(annotator: &dyn Annotator, text: &str) -> Vec<String> {
        let lookups = LookupRegistry::new();
        let doc = Document::new(text, Tokenizer::new().tokenize(text), None, &lookups);
        annotator.annotate(&doc).into_iter().map(|a| a.text).collect()
    }

    fn pseudo(toml_args: &str) -> RegexpPseudoAnnotator {
        let lookups = LookupRegistry::new();
        let tokenizer = Tokenizer::new();
        let ctx = BuildContext {
            lookups: &lookups,
            tokenizer: &tokenizer,
            recall_boost: false,
        };
        RegexpPseudoAnnotator::from_args(toml::from_str(toml_args).unwrap(), &ctx).unwrap()
    }

    #[test]
    fn test_capture_group_and_lookaround() {
        let annotator = RegexpAnnotator::new(r"(?<!\d)(\d{4}\s?[A-Z]{2})(?![A-Za-z])", "locatie", 1).unwrap();
        assert_eq!(
            annotate(&annotator, "Woont op 3511 AB, vorige 1234XY."),
            vec!["3511 AB", "1234XY"]
        );
    }

    #[test]
    fn test_invalid_pattern_and_group() {
        assert!(RegexpAnnotator::new("(", "x", 0).is_err());
        assert!(RegexpAnnotator::new(r"\d+", "x", 2).is_err());
    }

    #[test]
    fn test_pseudo_words_suppress_matches() {
        let annotator = pseudo(
            r#"
            pattern = '(\d{1,3})(?:\s|-)?jaar'
            capture_group = 1
            tag = "leeftijd"
            pre_pseudo = ["sinds", "Vanaf"]
            post_pseudo = ["geleden"]
            window = 2
            "#,
        );

        assert_eq!(annotate(&annotator, "Patiente is 45 jaar."), vec!["45"]);
        assert!(annotate(&annotator, "Sinds 10 jaar klachten").is_empty());
        assert!(annotate(&annotator, "vanaf ongeveer 10 jaar").is_empty());
        assert!(annotate(&annotator, "De operatie was 12 jaar geleden").is_empty());
    }

    #[test]
    fn test_window_limits_search() {
        let annotator = pseudo(
            r#"
            pattern = '\d+'
            tag = "leeftijd"
            pre_pseudo = ["sinds"]
            "#,
        );

        assert!(annotate(&annotator, "sinds 10").is_empty());
        assert_eq!(annotate(&annotator, "sinds ruim 10"), vec!["10"]);
    }

    #[test]
    fn test_word_extraction() {
        assert_eq!(preceding_words("sinds ruim 10", 11, 2), vec!["ruim", "sinds"]);
        assert_eq!(preceding_words("(10", 1, 2), Vec::<&str>::new());
        assert_eq!(following_words("10 jaar geleden.", 2, 3), vec!["jaar", "geleden"]);
    }
}
