//! Context-based extension of existing annotations
//!
//! A rule looks at the tokens next to an annotation and, when they match its
//! pattern, proposes a longer annotation with a compound tag such as
//! `voornaam+interfix+achternaam`. Rules are applied repeatedly until none
//! fires. Each successful extension covers at least one more token than the
//! annotation it started from, so the loop ends after at most as many rounds
//! as the document has tokens.

use super::predicate::{string_or_list, Direction, SequencePattern, TokenPredicate, TokenPredicateSpec};
use super::Annotator;
use crate::deidentification::lookup::LookupRequirement;
use crate::deidentification::models::{Annotation, Document};
use crate::deidentification::processors::BuildContext;
use serde::Deserialize;
use std::collections::HashSet;

const TAG_PLACEHOLDER: &str = "{tag}";

fn default_iterative() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextRuleArgs {
    pub name: String,
    /// Sub-tags the annotation must end with (right) or start with (left)
    #[serde(deserialize_with = "string_or_list")]
    pub pre_tag: Vec<String>,
    /// Template of the extended tag; `{tag}` is replaced by the current tag
    pub tag: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub skip: Vec<String>,
    pub pattern: Vec<TokenPredicateSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextArgs {
    pub rules: Vec<ContextRuleArgs>,
    #[serde(default = "default_iterative")]
    pub iterative: bool,
}

/// A named extension rule
#[derive(Debug, Clone)]
pub struct ContextRule {
    pub name: String,
    pre_tag: HashSet<String>,
    tag_template: String,
    pattern: SequencePattern,
}

impl ContextRule {
    pub fn compile(
        args: ContextRuleArgs,
        ctx: &BuildContext<'_>,
    ) -> std::result::Result<Self, String> {
        if args.pattern.is_empty() {
            return Err(format!("context rule '{}' has an empty pattern", args.name));
        }
        if args.pre_tag.is_empty() {
            return Err(format!("context rule '{}' has no pre_tag", args.name));
        }
        if !args.tag.contains(TAG_PLACEHOLDER) {
            return Err(format!(
                "context rule '{}' tag template must contain {TAG_PLACEHOLDER}",
                args.name
            ));
        }

        let elements = args
            .pattern
            .iter()
            .map(|spec| TokenPredicate::compile(spec, ctx.lookups))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("context rule '{}': {e}", args.name))?;

        // Skip tokens between the annotation and the pattern are unbounded;
        // within the pattern every element must be adjacent
        let skip: HashSet<String> = args.skip.into_iter().collect();
        Ok(Self {
            name: args.name,
            pre_tag: args.pre_tag.into_iter().collect(),
            tag_template: args.tag,
            pattern: SequencePattern {
                direction: args.direction,
                skip,
                max_skip: Some(0),
                elements,
            },
        })
    }

    /// Extends `annotation` once, or returns `None` if the rule does not apply
    fn extend(&self, annotation: &Annotation, doc: &Document<'_>) -> Option<Annotation> {
        let anchor = match self.pattern.direction {
            Direction::Right => annotation.tag.parts().next_back(),
            Direction::Left => annotation.tag.parts().next(),
        }?;
        if !self.pre_tag.contains(anchor) {
            return None;
        }

        let tokens = doc.tokens();
        let (first, last) = tokens.span_indices(annotation.start_char, annotation.end_char)?;

        let (start, end) = match self.pattern.direction {
            Direction::Right => {
                let reached = self.pattern.match_after(doc, last)?;
                (annotation.start_char, tokens.get(reached)?.end_char)
            }
            Direction::Left => {
                let reached = self.pattern.match_after(doc, first)?;
                (tokens.get(reached)?.start_char, annotation.end_char)
            }
        };

        if start >= annotation.start_char && end <= annotation.end_char {
            return None;
        }

        let tag = self
            .tag_template
            .replace(TAG_PLACEHOLDER, annotation.tag.as_str());
        Annotation::from_source(doc.text(), start, end, tag)
    }
}

/// Grows existing annotations with ordered context rules
///
/// The annotator returns only the extended annotations; the originals stay
/// in the document and are resolved against them later.
#[derive(Debug, Clone)]
pub struct ContextAnnotator {
    rules: Vec<ContextRule>,
    iterative: bool,
}

impl ContextAnnotator {
    pub fn new(rules: Vec<ContextRule>, iterative: bool) -> Self {
        Self { rules, iterative }
    }

    pub fn from_args(args: ContextArgs, ctx: &BuildContext<'_>) -> std::result::Result<Self, String> {
        if args.rules.is_empty() {
            return Err("at least one context rule is required".to_string());
        }

        let mut names = HashSet::new();
        let mut rules = Vec::with_capacity(args.rules.len());
        for rule in args.rules {
            if !names.insert(rule.name.clone()) {
                return Err(format!("duplicate context rule '{}'", rule.name));
            }
            rules.push(ContextRule::compile(rule, ctx)?);
        }

        Ok(Self::new(rules, args.iterative))
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    /// Applies all rules to one annotation until none of them fires
    fn extend_to_fixed_point(&self, annotation: &Annotation, doc: &Document<'_>) -> Annotation {
        let mut current = annotation.clone();
        loop {
            let mut changed = false;
            for rule in &self.rules {
                if let Some(extended) = rule.extend(&current, doc) {
                    tracing::trace!(
                        rule = %rule.name,
                        start = extended.start_char,
                        end = extended.end_char,
                        "Context rule extended annotation"
                    );
                    current = extended;
                    changed = true;
                }
            }
            if !changed || !self.iterative {
                return current;
            }
        }
    }
}

impl Annotator for ContextAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        doc.annotations()
            .iter()
            .filter_map(|annotation| {
                let extended = self.extend_to_fixed_point(annotation, doc);
                (extended != *annotation).then_some(extended)
            })
            .collect()
    }

    fn required_lookups(&self) -> Vec<LookupRequirement> {
        let mut requirements = Vec::new();
        for rule in &self.rules {
            rule.pattern.collect_requirements(&mut requirements);
        }
        requirements.sort();
        requirements.dedup();
        requirements
    }
}
