//! Ordered, named composition of processors
//!
//! A pipeline is an owned value built once from configuration and then only
//! read. Each call to [`Pipeline::run`] takes a [`Selection`] that decides which
//! processors take part in that call; the pipeline itself is never changed by
//! running it.
//!
//! # Group-then-member selection
//!
//! With [`Selection::Enabled`], a processor that belongs to a group only runs
//! when **both** its group and its own name are enabled. Enabling
//! `"patient_names"` alone does nothing if it sits in the `names` group; enable
//! `["names", "patient_names"]` instead. Processors without a group only need
//! their own name. [`Selection::Disabled`] skips a processor when either its
//! name or its group is listed.

use crate::config::ProcessorSpec;
use crate::deidentification::lookup::LookupRequirement;
use crate::deidentification::models::Document;
use crate::deidentification::processors::{BuildContext, Processor};
use crate::domain::{DeidError, Result};
use std::collections::BTreeSet;

/// Where [`Pipeline::add`] inserts a processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Start,
    End,
    Index(usize),
    Before(String),
    After(String),
}

/// Processors taking part in one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every processor
    #[default]
    All,
    /// Only the listed names and groups, see the module docs
    Enabled(BTreeSet<String>),
    /// Everything except the listed names and groups
    Disabled(BTreeSet<String>),
}

impl Selection {
    pub fn enabled<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Enabled(names.into_iter().map(Into::into).collect())
    }

    pub fn disabled<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Disabled(names.into_iter().map(Into::into).collect())
    }

    fn names(&self) -> Option<&BTreeSet<String>> {
        match self {
            Selection::All => None,
            Selection::Enabled(names) | Selection::Disabled(names) => Some(names),
        }
    }

    fn includes(&self, entry: &PipelineEntry) -> bool {
        match self {
            Selection::All => true,
            Selection::Enabled(names) => {
                let group_enabled = entry.group.as_ref().map_or(true, |g| names.contains(g));
                group_enabled && names.contains(&entry.name)
            }
            Selection::Disabled(names) => {
                let group_disabled = entry.group.as_ref().is_some_and(|g| names.contains(g));
                !group_disabled && !names.contains(&entry.name)
            }
        }
    }
}

/// A named processor and its optional group
#[derive(Debug)]
pub struct PipelineEntry {
    pub name: String,
    pub group: Option<String>,
    pub processor: Processor,
}

#[derive(Debug, Default)]
pub struct Pipeline {
    entries: Vec<PipelineEntry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every configured processor, in order
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` for the first processor that fails
    /// to build, or for a duplicate processor name.
    pub fn from_specs(specs: &[ProcessorSpec], ctx: &BuildContext<'_>) -> Result<Self> {
        let mut pipeline = Self::new();
        for spec in specs {
            let processor = spec.kind.build(&spec.name, &spec.args, ctx)?;
            pipeline.add(&spec.name, spec.group.clone(), processor, Position::End)?;
        }

        tracing::debug!(
            processors = pipeline.len(),
            groups = pipeline.groups().len(),
            "Pipeline built"
        );
        Ok(pipeline)
    }

    /// Inserts a processor
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` if the name is taken, the index is
    /// out of range or the reference processor does not exist.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        group: Option<String>,
        processor: Processor,
        position: Position,
    ) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(DeidError::Configuration(format!(
                "processor '{name}' is already part of the pipeline"
            )));
        }

        let index = match position {
            Position::Start => 0,
            Position::End => self.entries.len(),
            Position::Index(i) if i <= self.entries.len() => i,
            Position::Index(i) => {
                return Err(DeidError::Configuration(format!(
                    "cannot insert '{name}' at index {i}, pipeline has {} processors",
                    self.entries.len()
                )))
            }
            Position::Before(other) => self.position_of(&other)?,
            Position::After(other) => self.position_of(&other)? + 1,
        };

        self.entries.insert(
            index,
            PipelineEntry {
                name,
                group,
                processor,
            },
        );
        Ok(())
    }

    /// Removes the processor with this name, or every processor in this group
    ///
    /// Returns the names of the removed processors, empty when nothing
    /// matched.
    pub fn remove(&mut self, name_or_group: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            let hit = entry.name == name_or_group || entry.group.as_deref() == Some(name_or_group);
            if hit {
                removed.push(entry.name.clone());
            }
            !hit
        });
        removed
    }

    fn position_of(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| DeidError::Configuration(format!("no processor named '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    /// Processor names in pipeline order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Distinct group names in order of first appearance
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for group in self.entries.iter().filter_map(|entry| entry.group.as_deref()) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    /// Lookup structures needed by all processors, sorted and de-duplicated
    pub fn required_lookups(&self) -> Vec<LookupRequirement> {
        let mut requirements: Vec<LookupRequirement> = self
            .entries
            .iter()
            .flat_map(|entry| entry.processor.required_lookups())
            .collect();
        requirements.sort();
        requirements.dedup();
        requirements
    }

    /// Selected names that match neither a processor nor a group
    pub fn unknown_names(&self, selection: &Selection) -> Vec<String> {
        let Some(names) = selection.names() else {
            return Vec::new();
        };
        let groups = self.groups();
        names
            .iter()
            .filter(|name| !self.contains(name) && !groups.contains(&name.as_str()))
            .cloned()
            .collect()
    }

    /// Names of the processors that `selection` lets run, in order
    pub fn selected(&self, selection: &Selection) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| selection.includes(entry))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Whether a run with `selection` produces redacted text
    pub fn redacts(&self, selection: &Selection) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.processor.is_redactor() && selection.includes(entry))
    }

    /// Runs the selected processors over `doc` in pipeline order
    ///
    /// Annotations record the position of their producing processor in the
    /// full pipeline, so resolving ties by annotator order does not depend on
    /// the selection.
    pub fn run(&self, doc: &mut Document<'_>, selection: &Selection) {
        for name in self.unknown_names(selection) {
            tracing::warn!(processor = %name, "Selected name matches no processor or group");
        }

        for (position, entry) in self.entries.iter().enumerate() {
            if !selection.includes(entry) {
                continue;
            }

            match &entry.processor {
                Processor::Annotator(annotator) => {
                    let found = annotator.annotate(doc);
                    tracing::trace!(processor = %entry.name, found = found.len(), "Annotator ran");
                    doc.annotations_mut()
                        .extend(found.into_iter().map(|a| a.with_priority(position)));
                }
                Processor::Processing(processor) => {
                    let before = doc.annotations().len();
                    let annotations = doc.take_annotations();
                    let processed = processor.process(annotations, doc);
                    tracing::trace!(
                        processor = %entry.name,
                        before,
                        after = processed.len(),
                        "Annotation processor ran"
                    );
                    doc.set_annotations(processed);
                }
                Processor::Redactor(redactor) => {
                    let redacted = redactor.redact(doc.text(), doc.annotations());
                    doc.set_redacted(redacted);
                }
            }
        }
    }
}
