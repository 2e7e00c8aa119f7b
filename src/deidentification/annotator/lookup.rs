//! Multi-token vocabulary matching with a trie

use super::Annotator;
use crate::deidentification::lookup::{LookupRequirement, RecallBoost};
use crate::deidentification::models::{Annotation, Document, Tag};
use crate::deidentification::processors::BuildContext;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupArgs {
    pub lookup: String,
    pub tag: String,
    #[serde(default)]
    pub recall_boost: Option<RecallBoost>,
}

/// Annotates the longest trie phrase starting at each token, left to right
///
/// Matches found by one annotator never overlap: after a match the scan
/// continues after its last token.
#[derive(Debug, Clone)]
pub struct MultiTokenLookupAnnotator {
    lookup: String,
    tag: Tag,
    recall_boost: Option<RecallBoost>,
}

impl MultiTokenLookupAnnotator {
    pub fn new(lookup: impl Into<String>, tag: impl Into<Tag>) -> Self {
        Self {
            lookup: lookup.into(),
            tag: tag.into(),
            recall_boost: None,
        }
    }

    pub fn with_recall_boost(mut self, boost: RecallBoost) -> Self {
        self.recall_boost = Some(boost);
        self
    }

    pub fn from_args(args: LookupArgs, ctx: &BuildContext<'_>) -> std::result::Result<Self, String> {
        if ctx.lookups.trie(&args.lookup).is_none() {
            return Err(format!("lookup '{}' is not a defined trie", args.lookup));
        }

        let mut annotator = Self::new(args.lookup, args.tag);
        // Recall boost only applies when switched on for the whole pipeline
        if ctx.recall_boost {
            annotator.recall_boost = args.recall_boost;
        }
        Ok(annotator)
    }
}

impl Annotator for MultiTokenLookupAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        let Some(trie) = doc.lookups().trie(&self.lookup) else {
            return Vec::new();
        };
        let tokens = doc.tokens().as_slice();

        let mut annotations = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let found = match &self.recall_boost {
                Some(boost) => trie.longest_match_boosted(tokens, i, boost),
                None => trie.longest_match(tokens, i),
            };

            match found {
                Some(m) if !m.is_empty() => {
                    if let Some(annotation) =
                        super::token_span(doc, m.start_index, m.end_index - 1, &self.tag)
                    {
                        annotations.push(annotation);
                    }
                    i = m.end_index;
                }
                _ => i += 1,
            }
        }

        annotations
    }

    fn required_lookups(&self) -> Vec<LookupRequirement> {
        vec![LookupRequirement::trie(self.lookup.clone())]
    }
}
