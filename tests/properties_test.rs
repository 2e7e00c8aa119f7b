//! Property tests for offsets, overlap freedom and redaction
//!
//! Engine properties run over synthetic notes assembled from a vocabulary of
//! clinical words, names, places and identifiers.

use deid::deidentification::annotator::ChecksumRule;
use deid::deidentification::lookup::LookupTrie;
use deid::deidentification::processing::AnnotationMerger;
use deid::deidentification::tokenizer::split;
use deid::deidentification::{
    check_consistency, Annotation, AnnotationSet, DeidEngine, Selection, Tokenizer,
};
use deid::domain::Person;
use proptest::prelude::*;
use std::sync::OnceLock;

static ENGINE: OnceLock<DeidEngine> = OnceLock::new();

fn engine() -> &'static DeidEngine {
    ENGINE.get_or_init(|| DeidEngine::from_default_config().unwrap())
}

const VOCABULARY: &[&str] = &[
    "Jan", "Jansen", "Piet", "de", "Vries", "van", "der", "Heide", "Utrecht", "Den", "Haag",
    "Breda", "12-03-2021", "3 maart 2020", "111222333", "1234567", "06-12345678",
    "info@example.nl", "www.example.nl", "Dr.", "A.B.", "op", "naar", "is", "gezien", "in",
    "Sint", "Jans", "Gasthuis", "45", "jaar", "ziekte", "Parkinson", "Postbus 12345",
    "3511 AB", "Kerkstraat 12", ",", ".", "-", "pijn", "patiënt", "Altrecht", "controle",
];

const SEPARATORS: &[&str] = &[" ", " ", " ", "\n", ", ", "  "];

const MERGE_TAGS: &[&str] = &["locatie", "datum"];

fn note() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (prop::sample::select(VOCABULARY), prop::sample::select(SEPARATORS)),
        0..30,
    )
    .prop_map(|parts| {
        parts
            .into_iter()
            .map(|(word, sep)| format!("{word}{sep}"))
            .collect()
    })
}

fn patient() -> Person {
    Person::new()
        .with_first_names(["Jan"])
        .with_initials("J")
        .with_surname("Jansen")
}

/// Checks that `redacted` is `text` with every annotation replaced by one
/// `<...>` placeholder
fn assert_segments_preserved(
    text: &str,
    annotations: &[Annotation],
    redacted: &str,
) -> Result<(), TestCaseError> {
    let mut source_pos = 0;
    let mut out_pos = 0;

    for annotation in annotations {
        let segment = &text[source_pos..annotation.start_char];
        prop_assert!(
            redacted[out_pos..].starts_with(segment),
            "segment {:?} missing at {} in {:?}",
            segment,
            out_pos,
            redacted
        );
        out_pos += segment.len();

        prop_assert!(redacted[out_pos..].starts_with('<'));
        let close = redacted[out_pos..].find('>');
        prop_assert!(close.is_some(), "unterminated placeholder in {:?}", redacted);
        out_pos += close.unwrap_or_default() + 1;
        source_pos = annotation.end_char;
    }

    prop_assert_eq!(&redacted[out_pos..], &text[source_pos..]);
    Ok(())
}

proptest! {
    #[test]
    fn annotation_text_matches_source(text in note(), with_patient in any::<bool>()) {
        let person = patient();
        let result = engine()
            .deidentify(&text, with_patient.then_some(&person), &Selection::All)
            .unwrap();

        prop_assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
        prop_assert!(check_consistency(&text, &result.annotations).is_empty());
        for annotation in &result.annotations {
            prop_assert_eq!(&text[annotation.start_char..annotation.end_char], annotation.text.as_str());
        }
    }

    #[test]
    fn final_annotations_do_not_overlap(text in note(), with_patient in any::<bool>()) {
        let person = patient();
        let result = engine()
            .deidentify(&text, with_patient.then_some(&person), &Selection::All)
            .unwrap();

        for pair in result.annotations.windows(2) {
            prop_assert!(
                pair[0].end_char <= pair[1].start_char,
                "{:?} overlaps {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn redaction_preserves_unannotated_text(text in note(), with_patient in any::<bool>()) {
        let person = patient();
        let result = engine()
            .deidentify(&text, with_patient.then_some(&person), &Selection::All)
            .unwrap();
        let redacted = result.deidentified_text.unwrap();

        assert_segments_preserved(&text, &result.annotations, &redacted)?;
    }

    #[test]
    fn no_pseudo_tags_in_output(text in note()) {
        let result = engine().deidentify(&text, None, &Selection::All).unwrap();
        prop_assert!(result.annotations.iter().all(|a| !a.tag.is_pseudo()));
    }

    #[test]
    fn merge_is_idempotent(
        text in note(),
        picks in prop::collection::vec(prop::option::of(prop::sample::select(MERGE_TAGS)), 0..60)
    ) {
        let tokens = Tokenizer::new().tokenize(&text);
        let set: AnnotationSet = tokens
            .iter()
            .zip(picks)
            .filter_map(|(token, tag)| {
                tag.map(|tag| Annotation::new(token.text.clone(), token.start_char, token.end_char, tag))
            })
            .collect();

        let merger = AnnotationMerger::default();
        let once = merger.merge(set, &text);
        let twice = merger.merge(once.clone(), &text);
        prop_assert_eq!(&once, &twice);
        prop_assert!(!once.has_overlaps());
    }

    #[test]
    fn tokens_reconstruct_the_text(text in "\\PC{0,80}|[a-z .\n-]{0,80}") {
        let tokenizer = engine().tokenizer();
        let tokens = tokenizer.tokenize(&text);

        let mut pos = 0;
        for (i, token) in tokens.iter().enumerate() {
            prop_assert_eq!(token.index, i);
            prop_assert_eq!(&text[token.start_char..token.end_char], token.text.as_str());
            let gap = &text[pos..token.start_char];
            prop_assert!(gap.chars().all(|c| c.is_whitespace() && c != '\n'));
            pos = token.end_char;
        }
        prop_assert!(text[pos..].chars().all(|c| c.is_whitespace() && c != '\n'));
    }
}

#[test]
fn test_tokenizer_splits_initials_and_punctuation() {
    let words: Vec<String> = split("Dr. A.B. de Visser").map(|t| t.text).collect();
    assert_eq!(words, ["Dr", ".", "A", ".", "B", ".", "de", "Visser"]);
}

#[test]
fn test_tokenizer_merges_interfix_terms() {
    let tokenizer = Tokenizer::with_merge_terms(["van der"]);
    let words = tokenizer.words("Piet van der Heide");
    assert_eq!(words, ["Piet", "van der", "Heide"]);
}

#[test]
fn test_bsn_checksum() {
    let rule = ChecksumRule::default();
    assert!(rule.is_valid("111222333"));
    assert!(!rule.is_valid("111222334"));
    assert!(!rule.is_valid("11122233"));
    assert!(!rule.is_valid("11122233a"));
}

#[test]
fn test_trie_prefers_longest_phrase() {
    let mut trie = LookupTrie::new(false);
    trie.insert(&["sint"]);
    trie.insert(&["sint", "jans", "ziekenhuis"]);

    let tokens = Tokenizer::new().tokenize("Het Sint Jans Ziekenhuis belde");
    let found = trie.longest_match(tokens.as_slice(), 1).unwrap();
    assert_eq!((found.start_index, found.end_index), (1, 4));
    assert_eq!(found.len(), 3);

    let partial = Tokenizer::new().tokenize("Sint Jans huis");
    assert_eq!(trie.longest_match(partial.as_slice(), 0).unwrap().len(), 1);
    assert!(trie.longest_match(partial.as_slice(), 1).is_none());
}

#[test]
fn test_merge_joins_across_space_but_not_newline() {
    let merger = AnnotationMerger::default();

    let text = "Amsterdam Zuid";
    let set: AnnotationSet = vec![
        Annotation::new("Amsterdam", 0, 9, "locatie"),
        Annotation::new("Zuid", 10, 14, "locatie"),
    ]
    .into_iter()
    .collect();
    let merged = merger.merge(set, text).into_vec();
    assert_eq!(merged, vec![Annotation::new("Amsterdam Zuid", 0, 14, "locatie")]);

    let text = "Amsterdam\nZuid";
    let set: AnnotationSet = vec![
        Annotation::new("Amsterdam", 0, 9, "locatie"),
        Annotation::new("Zuid", 10, 14, "locatie"),
    ]
    .into_iter()
    .collect();
    assert_eq!(merger.merge(set, text).len(), 2);
}
