//! Sequences of token predicates

use super::predicate::{Direction, SequencePattern, TokenPredicate, TokenPredicateSpec};
use super::Annotator;
use crate::deidentification::lookup::LookupRequirement;
use crate::deidentification::models::{Annotation, Document, Tag};
use crate::deidentification::processors::BuildContext;
use serde::Deserialize;
use std::collections::HashSet;

fn default_max_skip() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenPatternArgs {
    pub pattern: Vec<TokenPredicateSpec>,
    pub tag: String,
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default = "default_max_skip")]
    pub max_skip: usize,
}

/// Annotates every token run matching an ordered list of predicates
///
/// The pattern is anchored at each token in turn, so matches may overlap.
/// Up to `max_skip` consecutive separator tokens (for example `.`) may sit
/// between two matched elements and are included in the span.
#[derive(Debug, Clone)]
pub struct TokenPatternAnnotator {
    pattern: SequencePattern,
    tag: Tag,
}

impl TokenPatternAnnotator {
    pub fn new(pattern: SequencePattern, tag: impl Into<Tag>) -> Self {
        Self {
            pattern,
            tag: tag.into(),
        }
    }

    pub fn from_args(
        args: TokenPatternArgs,
        ctx: &BuildContext<'_>,
    ) -> std::result::Result<Self, String> {
        if args.pattern.is_empty() {
            return Err("pattern must contain at least one token predicate".to_string());
        }

        let elements = args
            .pattern
            .iter()
            .map(|spec| TokenPredicate::compile(spec, ctx.lookups))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let pattern = SequencePattern {
            direction: Direction::Right,
            skip: args.skip.into_iter().collect::<HashSet<_>>(),
            max_skip: Some(args.max_skip),
            elements,
        };

        Ok(Self::new(pattern, args.tag))
    }
}

impl Annotator for TokenPatternAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        (0..doc.tokens().len())
            .filter_map(|start| {
                let end = self.pattern.match_at(doc, start)?;
                super::token_span(doc, start, end, &self.tag)
            })
            .collect()
    }

    fn required_lookups(&self) -> Vec<LookupRequirement> {
        let mut requirements = Vec::new();
        self.pattern.collect_requirements(&mut requirements);
        requirements
    }
}
