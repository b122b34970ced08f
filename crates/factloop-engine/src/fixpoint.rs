//! Fixpoint drivers: replay a file of combined queries once, or saturate
//! every known template until nothing changes.

use crate::classify::{classification_queries, ROOT_INFERENCE};
use crate::compiler::compile_descriptor;
use crate::context::Engine;
use crate::lexer;
use crate::ontology::Ontology;
use crate::report::{Mode, Outcome, RunReport};
use crate::template::CompiledTemplate;
use crate::textual::compile_text;
use factloop_core::{Error, Namespaces, Result, TemplateError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Split a replay file into its combined queries. Lines starting with `#`
/// are comments.
pub fn split_queries(text: &str) -> Vec<String> {
    let cleaned: String = text
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = RE.get_or_init(|| Regex::new(r"(?i)\bCONSTRUCT\b").ok()).as_ref() else {
        return Vec::new();
    };
    let masked = lexer::mask_opaque(&cleaned);
    let starts: Vec<usize> = re.find_iter(&masked).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(cleaned.len());
            cleaned[start..end].trim().to_string()
        })
        .filter(|q| !q.is_empty())
        .collect()
}

/// Compile every query of a replay file; the first error aborts.
pub fn compile_replay(text: &str, namespaces: &Namespaces) -> std::result::Result<Vec<CompiledTemplate>, TemplateError> {
    split_queries(text)
        .iter()
        .enumerate()
        .map(|(i, q)| compile_text(format!("query {}", i + 1), q, namespaces))
        .collect()
}

impl Engine {
    /// Compile then run each query once, in order.
    pub fn replay(&self, text: &str) -> Result<RunReport> {
        let templates = compile_replay(text, self.namespaces())?;
        let mut report = RunReport::new(Mode::Replay);
        info!(queries = templates.len(), "replay started");
        for template in &templates {
            let outcome = self.run_detailed(template)?;
            report.record(&template.name, &outcome);
        }
        report.passes = 1;
        report.finish(Outcome::Success);
        info!("{}", report.summary());
        Ok(report)
    }

    pub fn replay_file(&self, path: &Path) -> Result<RunReport> {
        let text = std::fs::read_to_string(path)?;
        self.replay(&text)
    }

    /// Templates for every registered algorithm the ontology describes.
    pub fn compile_ontology(&self, onto: &Ontology) -> Result<Vec<CompiledTemplate>> {
        let mut templates = Vec::new();
        for iri in onto.algorithms() {
            if !self.registry().contains(&iri) {
                debug!(algorithm = %iri, "described but not registered, skipped");
                continue;
            }
            let descriptor = onto.descriptor(&iri);
            if descriptor.is_abstract() {
                debug!(algorithm = %iri, "no inputs or parameters, skipped");
                continue;
            }
            templates.push(compile_descriptor(&descriptor, onto)?);
        }
        Ok(templates)
    }

    /// Harvest the ontology, compile algorithms and classifications, and run
    /// everything to a fixpoint.
    pub fn saturate(&self) -> Result<RunReport> {
        let onto = Ontology::harvest(self.store(), self.namespaces())?;
        let templates = self.compile_ontology(&onto)?;
        let classifications: Vec<String> = classification_queries(&onto)
            .into_iter()
            .map(|(_, q)| q)
            .collect();
        info!(
            templates = templates.len(),
            classifications = classifications.len(),
            "saturation started"
        );
        self.fixpoint(&templates, &classifications)
    }

    /// Run a caller-supplied template set to a fixpoint.
    pub fn saturate_templates(&self, templates: &[CompiledTemplate]) -> Result<RunReport> {
        self.fixpoint(templates, &[])
    }

    fn fixpoint(&self, templates: &[CompiledTemplate], classifications: &[String]) -> Result<RunReport> {
        let max_passes = self.config().fixpoint.max_passes;
        let mut report = RunReport::new(Mode::Saturate);
        for pass in 1..=max_passes {
            report.passes = pass;
            let mut changed = false;

            if self.config().fixpoint.infer_subclass_types {
                let added = self.construct_count(ROOT_INFERENCE)?;
                report.inferred += added;
                changed |= added > 0;
            }
            for query in classifications {
                let added = self.construct_count(query)?;
                report.inferred += added;
                changed |= added > 0;
            }
            for template in templates {
                let outcome = self.run_detailed(template)?;
                changed |= outcome.changed();
                report.record(&template.name, &outcome);
            }

            debug!(pass, changed, "pass done");
            if !changed {
                report.finish(Outcome::Success);
                info!("{}", report.summary());
                return Ok(report);
            }
        }
        warn!(passes = max_passes, "no fixpoint reached");
        Err(Error::Divergence { passes: max_passes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_keyword_in_iris_and_comments() {
        let text = "# CONSTRUCT in a comment\nCONSTRUCT { ?a <http://x.org/CONSTRUCT> ?out } WHERE { }\n\nconstruct { } WHERE { }";
        let parts = split_queries(text);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("<http://x.org/CONSTRUCT>"));
        assert!(parts[1].starts_with("construct"));
    }

    #[test]
    fn replay_compilation_stops_at_first_error() {
        let text = "CONSTRUCT { ?p <urn:s> ?out } WHERE { ?p a <urn:T> . ?out <urn:A>( \"k=\" ?p ) }\n\
                    CONSTRUCT { ?p <urn:s> ?out } WHERE { ?p a <urn:T> . ?out <urn:A>( \"k=\" ?p }";
        let err = compile_replay(text, &Namespaces::default()).unwrap_err();
        assert!(matches!(err, TemplateError::Unbalanced { open: '(', .. }));
    }
}
