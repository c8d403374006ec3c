//! Human-readable run reports.
//!
//! A report summarises one workflow: final status, every attempt with its
//! plan, validation verdict and scores, plan notes and the decision trace.

use std::fmt;

use cartograph::{quality::QualityReport, workflow::Outcome};

/// Formats an [`Outcome`] as a plain-text report.
pub struct Report<'a> {
    name: &'a str,
    outcome: &'a Outcome,
}

impl<'a> Report<'a> {
    pub fn new(name: &'a str, outcome: &'a Outcome) -> Self {
        Self { name, outcome }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self.outcome;

        writeln!(f, "Cartograph report: {}", self.name)?;
        writeln!(f, "Status: {}", outcome.status())?;
        writeln!(f, "Attempts: {}", outcome.attempts())?;
        if let Some(chosen) = outcome.chosen() {
            writeln!(f, "Chosen attempt: {}", chosen.artifact().attempt_index())?;
        }
        if let Some(failure) = outcome.failure() {
            writeln!(f, "Failure: {failure}")?;
        }

        for record in outcome.history() {
            let artifact = record.artifact();
            writeln!(f)?;
            writeln!(f, "Attempt {}", artifact.attempt_index())?;
            writeln!(f, "  Plan: {}", artifact.plan().summary())?;
            writeln!(f, "  Validation: {}", record.validation())?;
            for diagnostic in record.validation().diagnostics().iter().skip(1) {
                writeln!(f, "    {diagnostic}")?;
            }
            if let Some(quality) = record.quality() {
                write_scores(f, quality)?;
            }
        }

        let suggestions = outcome
            .report()
            .map(QualityReport::suggestions)
            .unwrap_or_default();
        if !suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Suggestions:")?;
            for suggestion in suggestions {
                writeln!(f, "  - {suggestion}")?;
            }
        }

        if !outcome.notes().is_empty() {
            writeln!(f)?;
            writeln!(f, "Model notes:")?;
            for note in outcome.notes() {
                writeln!(f, "  - {note}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Decision trace:")?;
        for decision in outcome.trace() {
            writeln!(f, "  {decision}")?;
        }
        Ok(())
    }
}

fn write_scores(f: &mut fmt::Formatter<'_>, quality: &QualityReport) -> fmt::Result {
    writeln!(f, "  Overall: {:.3}", quality.overall())?;
    for (metric, score) in quality.scores() {
        writeln!(f, "    {:<13} {score:.3}", metric.name())?;
    }
    Ok(())
}
