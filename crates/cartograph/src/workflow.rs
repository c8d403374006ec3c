//! The generation-validation-evaluation loop.
//!
//! [`Controller::run`] drives one model through the pipeline as an explicit
//! state machine:
//!
//! ```text
//!            ┌──────────────────────── Retrying ◄──────────────┐
//!            ▼                                                  │
//!        Planning ─► Generating ─► Validating ─► Evaluating ─► Accepted
//!                                      │             │
//!                                      ├─► Retrying  ├─► Degraded
//!                                      ├─► Degraded  └─► Failed
//!                                      └─► Failed
//! ```
//!
//! Content failures (syntax, render) and quality shortfalls are retried with
//! a [`PriorFailure`] hint while the attempt budget lasts. Infrastructure
//! failures end the run immediately. When the budget runs out the best
//! evaluated attempt is returned as degraded.
//!
//! [`WorkflowState`] is the only mutable record of a run. It is owned by the
//! controller for the duration of [`Controller::run`] and turned into an
//! immutable [`Outcome`] at the end.

use std::{fmt, sync::Arc, time::Duration};

use log::{debug, error, info, warn};

use cartograph_core::{
    artifact::DiagramArtifact,
    model::StructuralModel,
    plan::{FailureCause, PlanNote, PriorFailure},
    quality::QualityReport,
    validation::{FailureClass, ValidationResult},
};

use crate::{
    config::{AppConfig, ConfigError},
    evaluator::Evaluator,
    generator::Generator,
    planner::Planner,
    validator::Validator,
};

/// A state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Planning,
    Generating,
    Validating,
    Evaluating,
    Retrying,
    Accepted,
    Degraded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Accepted | Phase::Degraded | Phase::Failed)
    }

    /// States reachable from this one in a single step.
    pub fn successors(self) -> &'static [Phase] {
        match self {
            Phase::Planning => &[Phase::Generating],
            Phase::Generating => &[Phase::Validating],
            Phase::Validating => &[
                Phase::Evaluating,
                Phase::Retrying,
                Phase::Degraded,
                Phase::Failed,
            ],
            Phase::Evaluating => &[
                Phase::Accepted,
                Phase::Retrying,
                Phase::Degraded,
                Phase::Failed,
            ],
            Phase::Retrying => &[Phase::Planning],
            Phase::Accepted | Phase::Degraded | Phase::Failed => &[],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Planning => "PLANNING",
            Phase::Generating => "GENERATING",
            Phase::Validating => "VALIDATING",
            Phase::Evaluating => "EVALUATING",
            Phase::Retrying => "RETRYING",
            Phase::Accepted => "ACCEPTED",
            Phase::Degraded => "DEGRADED",
            Phase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Accepted,
    Degraded,
    Failed,
}

impl Status {
    /// `true` when the run produced a diagram worth writing.
    pub fn is_success(self) -> bool {
        !matches!(self, Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Accepted => write!(f, "ACCEPTED"),
            Status::Degraded => write!(f, "DEGRADED"),
            Status::Failed => write!(f, "FAILED"),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The renderer could not be run to a verdict.
    Infrastructure(ValidationResult),
    /// Every attempt failed validation; nothing was ever evaluated.
    NoRenderableAttempt,
    /// The best evaluated attempt scored below the degraded floor.
    BelowDegradedFloor { best: f64, floor: f64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Infrastructure(validation) => {
                write!(f, "renderer unavailable: {validation}")
            }
            FailureReason::NoRenderableAttempt => {
                write!(f, "no attempt produced a renderable diagram")
            }
            FailureReason::BelowDegradedFloor { best, floor } => {
                write!(f, "best score {best:.3} is below the degraded floor {floor:.3}")
            }
        }
    }
}

/// One generation cycle.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    artifact: DiagramArtifact,
    validation: ValidationResult,
    quality: Option<QualityReport>,
}

impl AttemptRecord {
    pub fn artifact(&self) -> &DiagramArtifact {
        &self.artifact
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    /// `None` unless the artifact rendered.
    pub fn quality(&self) -> Option<&QualityReport> {
        self.quality.as_ref()
    }
}

/// A recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub attempt: usize,
    pub from: Phase,
    pub to: Phase,
    pub reason: String,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[attempt {}] {} -> {}: {}",
            self.attempt, self.from, self.to, self.reason
        )
    }
}

/// Mutable state of one run.
#[derive(Debug)]
pub struct WorkflowState {
    attempt: usize,
    max_attempts: usize,
    phase: Phase,
    history: Vec<AttemptRecord>,
    trace: Vec<Decision>,
}

impl WorkflowState {
    fn new(max_attempts: usize) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            phase: Phase::Planning,
            history: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Zero-based index of the current generation cycle.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    fn can_retry(&self) -> bool {
        self.attempt + 1 < self.max_attempts
    }

    /// Moves to `to`, recording the decision. Transitions the state machine
    /// does not allow are logged and ignored.
    fn transition(&mut self, to: Phase, reason: impl Into<String>) {
        if !self.phase.successors().contains(&to) {
            error!(from:% = self.phase, to:%; "Ignoring invalid workflow transition");
            return;
        }
        let decision = Decision {
            attempt: self.attempt,
            from: self.phase,
            to,
            reason: reason.into(),
        };
        debug!(decision:%; "Workflow transition");
        self.trace.push(decision);
        self.phase = to;
    }

    fn record(
        &mut self,
        artifact: DiagramArtifact,
        validation: ValidationResult,
        quality: Option<QualityReport>,
    ) {
        self.history.push(AttemptRecord {
            artifact,
            validation,
            quality,
        });
    }

    /// Starts the next cycle from `Retrying`.
    fn next_attempt(&mut self) {
        self.attempt += 1;
        self.transition(Phase::Planning, "revising plan");
    }

    /// Index of the highest scoring evaluated attempt, earliest on ties.
    fn best_attempt(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, record) in self.history.iter().enumerate() {
            let Some(quality) = &record.quality else {
                continue;
            };
            if best.is_none_or(|(_, score)| quality.overall() > score) {
                best = Some((index, quality.overall()));
            }
        }
        best.map(|(index, _)| index)
    }

    fn finish(
        self,
        status: Status,
        chosen: Option<usize>,
        failure: Option<FailureReason>,
        notes: Vec<PlanNote>,
    ) -> Outcome {
        Outcome {
            status,
            chosen,
            failure,
            notes,
            history: self.history,
            trace: self.trace,
        }
    }
}

/// The immutable result of a run.
#[derive(Debug, Clone)]
pub struct Outcome {
    status: Status,
    chosen: Option<usize>,
    failure: Option<FailureReason>,
    notes: Vec<PlanNote>,
    history: Vec<AttemptRecord>,
    trace: Vec<Decision>,
}

impl Outcome {
    pub fn status(&self) -> Status {
        self.status
    }

    /// The accepted or degraded attempt.
    pub fn chosen(&self) -> Option<&AttemptRecord> {
        self.chosen.and_then(|index| self.history.get(index))
    }

    pub fn artifact(&self) -> Option<&DiagramArtifact> {
        self.chosen().map(AttemptRecord::artifact)
    }

    pub fn report(&self) -> Option<&QualityReport> {
        self.chosen().and_then(AttemptRecord::quality)
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    /// Relations the planner dropped from the model.
    pub fn notes(&self) -> &[PlanNote] {
        &self.notes
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn trace(&self) -> &[Decision] {
        &self.trace
    }

    pub fn attempts(&self) -> usize {
        self.history.len()
    }
}

/// Drives models through plan, generate, validate and evaluate.
pub struct Controller {
    planner: Planner,
    generator: Generator,
    validator: Arc<dyn Validator>,
    evaluator: Evaluator,
    max_attempts: usize,
    acceptance_threshold: f64,
    min_degraded_score: f64,
    timeout: Duration,
}

impl Controller {
    /// Builds a controller from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invariant `config` violates.
    pub fn new(config: &AppConfig, validator: Arc<dyn Validator>) -> Result<Self, ConfigError> {
        config.validate()?;
        let workflow = config.workflow();
        Ok(Self {
            planner: Planner::new(config.planner(), config.style().theme()),
            generator: Generator::new().with_background(config.style().background_color()?),
            validator,
            evaluator: Evaluator::new(config.quality()),
            max_attempts: workflow.max_attempts(),
            acceptance_threshold: workflow.acceptance_threshold(),
            min_degraded_score: workflow.min_degraded_score(),
            timeout: config.renderer().timeout(),
        })
    }

    /// Runs the loop for `model` until it reaches a terminal state.
    pub fn run(&self, model: &StructuralModel) -> Outcome {
        info!(components = model.len(), max_attempts = self.max_attempts; "Starting workflow");

        let mut state = WorkflowState::new(self.max_attempts);
        let mut hint: Option<PriorFailure> = None;
        let mut notes = Vec::new();

        loop {
            let plan = Arc::new(self.planner.plan(model, hint.as_ref()));
            if state.attempt == 0 {
                notes = plan.notes().to_vec();
            }
            let summary = plan.summary();
            info!(attempt = state.attempt, plan:% = summary; "Planned diagram");
            state.transition(Phase::Generating, format!("planned {summary}"));

            let artifact = self.generator.generate(Arc::clone(&plan), state.attempt);
            state.transition(
                Phase::Validating,
                format!("generated {} bytes", artifact.source_text().len()),
            );

            let validation = self.validator.validate(&artifact, self.timeout);
            info!(attempt = state.attempt, validation:% = validation; "Validated diagram");

            let cause = match validation.failure_class() {
                Some(FailureClass::Infrastructure) => {
                    let reason = FailureReason::Infrastructure(validation.clone());
                    state.record(artifact, validation, None);
                    state.transition(Phase::Failed, reason.to_string());
                    error!(reason:%; "Workflow failed");
                    return state.finish(Status::Failed, None, Some(reason), notes);
                }
                Some(FailureClass::Content(content)) => {
                    let reason = validation.to_string();
                    state.record(artifact, validation, None);
                    if !state.can_retry() {
                        return self.degrade(state, reason, notes);
                    }
                    state.transition(Phase::Retrying, reason);
                    FailureCause::Content(content)
                }
                None => {
                    state.transition(Phase::Evaluating, "rendered");
                    let report = self.evaluator.evaluate(&artifact, model);
                    let overall = report.overall();
                    let weakest = report.weakest();
                    state.record(artifact, validation, Some(report));

                    if overall >= self.acceptance_threshold {
                        state.transition(
                            Phase::Accepted,
                            format!("score {overall:.3} meets {:.3}", self.acceptance_threshold),
                        );
                        let chosen = state.history.len() - 1;
                        info!(score = overall, attempts = state.history.len(); "Workflow accepted");
                        return state.finish(Status::Accepted, Some(chosen), None, notes);
                    }

                    let reason = format!(
                        "score {overall:.3} below {:.3}, weakest {weakest}",
                        self.acceptance_threshold
                    );
                    if !state.can_retry() {
                        return self.degrade(state, reason, notes);
                    }
                    state.transition(Phase::Retrying, reason);
                    FailureCause::Quality { weakest }
                }
            };

            debug!(cause:% = cause; "Retrying with hint");
            hint = Some(PriorFailure::new(cause, summary));
            state.next_attempt();
        }
    }

    /// Ends an exhausted run with the best evaluated attempt, if good enough.
    fn degrade(&self, mut state: WorkflowState, reason: String, notes: Vec<PlanNote>) -> Outcome {
        let best = state.best_attempt();
        let best_score = best
            .and_then(|index| state.history[index].quality.as_ref())
            .map(QualityReport::overall);

        match (best, best_score) {
            (Some(index), Some(score)) if score >= self.min_degraded_score => {
                state.transition(
                    Phase::Degraded,
                    format!("{reason}; attempts exhausted, keeping attempt {index} ({score:.3})"),
                );
                warn!(score, attempt = index; "Workflow degraded");
                state.finish(Status::Degraded, Some(index), None, notes)
            }
            (_, Some(score)) => {
                let failure = FailureReason::BelowDegradedFloor {
                    best: score,
                    floor: self.min_degraded_score,
                };
                state.transition(Phase::Failed, format!("{reason}; {failure}"));
                error!(reason:% = failure; "Workflow failed");
                state.finish(Status::Failed, None, Some(failure), notes)
            }
            _ => {
                let failure = FailureReason::NoRenderableAttempt;
                state.transition(Phase::Failed, format!("{reason}; {failure}"));
                error!(reason:% = failure; "Workflow failed");
                state.finish(Status::Failed, None, Some(failure), notes)
            }
        }
    }
}


#[cfg(test)]
mod proptest_tests {
    use std::sync::Mutex;

    use proptest::prelude::*;

    use cartograph_core::{
        model::{Component, ComponentKind, RelationKind},
        validation::{Stage, ValidationDiagnostic},
    };

    use super::*;
    use crate::config::WorkflowConfig;

    struct Script(Mutex<Vec<u8>>);

    impl Validator for Script {
        fn validate(&self, _artifact: &DiagramArtifact, _timeout: Duration) -> ValidationResult {
            let next = self.0.lock().map(|mut script| script.pop()).unwrap_or(None);
            let diagnostic = |stage| vec![ValidationDiagnostic::new(stage, "scripted")];
            match next {
                Some(0) => ValidationResult::syntax_error(diagnostic(Stage::Syntax)),
                Some(1) => ValidationResult::render_error(diagnostic(Stage::Render)),
                Some(2) => ValidationResult::infrastructure_error(diagnostic(Stage::Infrastructure)),
                _ => ValidationResult::rendered(),
            }
        }
    }

    fn model() -> StructuralModel {
        StructuralModel::new(vec![
            Component::new("a", ComponentKind::Class, "Account")
                .with_relation("b", RelationKind::Depends),
            Component::new("b", ComponentKind::Class, "Ledger"),
        ])
        .unwrap()
    }

    fn check_outcome(outcome: &Outcome, max_attempts: usize) -> Result<(), TestCaseError> {
        prop_assert!(outcome.attempts() >= 1);
        prop_assert!(outcome.attempts() <= max_attempts);
        for decision in outcome.trace() {
            prop_assert!(decision.from.successors().contains(&decision.to));
            prop_assert!(decision.attempt < max_attempts);
        }
        let last = outcome.trace().last().map(|d| d.to);
        prop_assert!(last.is_some_and(Phase::is_terminal));
        prop_assert_eq!(outcome.status().is_success(), outcome.artifact().is_some());
        Ok(())
    }

    proptest! {
        #[test]
        fn loop_respects_budget(
            script in prop::collection::vec(0u8..4, 0..8),
            max_attempts in 1usize..5,
            threshold in 0.0f64..=1.0,
        ) {
            let config = AppConfig::default()
                .with_workflow(WorkflowConfig::new(max_attempts, threshold, 0.0));
            let validator = Arc::new(Script(Mutex::new(script)));
            let outcome = Controller::new(&config, validator).unwrap().run(&model());
            check_outcome(&outcome, max_attempts)?;
        }
    }
}
