//! Cartograph - D2 diagrams from structural code models.
//!
//! Cartograph turns a structural model of source code (components, members
//! and relations produced by an external extractor) into a D2 diagram that
//! is guaranteed to render and to meet a minimum quality bar.
//!
//! # Pipeline
//!
//! ```text
//! StructuralModel
//!     ↓ plan       (planner)    diagram type, layout, component subset
//! DiagramPlan
//!     ↓ generate   (generator)  D2 text
//! DiagramArtifact
//!     ↓ validate   (validator)  pre-flight read, then the `d2` executable
//! ValidationResult
//!     ↓ evaluate   (evaluator)  five quality metrics
//! QualityReport
//! ```
//!
//! The [`workflow::Controller`] runs these stages in a bounded retry loop and
//! returns an [`workflow::Outcome`]: accepted, degraded to the best attempt,
//! or failed.

pub mod batch;
pub mod config;
pub mod evaluator;
pub mod generator;
pub mod planner;
pub mod validator;
pub mod workflow;

mod error;
mod naming;
mod shapes;

pub use cartograph_core::{artifact, color, model, plan, quality, style, validation};

pub use error::CartographError;

use std::sync::Arc;

use log::{debug, info, trace};

use cartograph_parser::Document;

use batch::{Job, JobResult};
use config::AppConfig;
use model::StructuralModel;
use plan::DiagramPlan;
use planner::Planner;
use validator::{D2Validator, Validator};
use workflow::{Controller, Outcome};

/// Reads a structural model from its JSON form.
///
/// # Errors
///
/// Returns [`CartographError::Model`] for malformed JSON, unknown kinds or
/// duplicate component ids.
pub fn model_from_json(json: &str) -> Result<StructuralModel, CartographError> {
    let model: StructuralModel =
        serde_json::from_str(json).map_err(|err| CartographError::new_model_error(err, json))?;
    debug!(
        components = model.len(),
        relations = model.relation_count();
        "Loaded structural model"
    );
    Ok(model)
}

/// Reads D2 text with the D2 reader.
///
/// # Errors
///
/// Returns [`CartographError::Parse`] with every diagnostic the reader
/// collected.
pub fn read_diagram(source: &str) -> Result<Document, CartographError> {
    let document = cartograph_parser::parse(source)
        .map_err(|err| CartographError::new_parse_error(err, source))?;
    trace!(document:?; "Read diagram");
    Ok(document)
}

/// Builder for running the Cartograph workflow.
///
/// # Examples
///
/// ```rust,no_run
/// use cartograph::{Cartographer, config::AppConfig};
///
/// let json = r#"{"components": [{"id": "a", "kind": "class", "name": "Account"}]}"#;
///
/// let cartographer = Cartographer::new(AppConfig::default());
/// let model = cartograph::model_from_json(json).expect("Failed to load model");
///
/// let outcome = cartographer.run(&model).expect("Invalid configuration");
/// if let Some(artifact) = outcome.artifact() {
///     println!("{}", artifact.source_text());
/// }
/// ```
#[derive(Default)]
pub struct Cartographer {
    config: AppConfig,
    validator: Option<Arc<dyn Validator>>,
}

impl Cartographer {
    /// Create a new builder with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            validator: None,
        }
    }

    /// Replace the `d2`-backed validator.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the loop controller for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] if the configuration is invalid.
    pub fn controller(&self) -> Result<Controller, CartographError> {
        let validator = self
            .validator
            .clone()
            .unwrap_or_else(|| Arc::new(D2Validator::new(self.config.renderer())));
        Ok(Controller::new(&self.config, validator)?)
    }

    /// Run the workflow for one model.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] if the configuration is invalid.
    /// Workflow failures are reported through [`Outcome::status`], not as
    /// errors.
    pub fn run(&self, model: &StructuralModel) -> Result<Outcome, CartographError> {
        let controller = self.controller()?;
        let outcome = controller.run(model);
        info!(
            status:% = outcome.status(),
            attempts = outcome.attempts();
            "Workflow finished"
        );
        Ok(outcome)
    }

    /// Plan the first attempt for `model` without generating or rendering.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] if the configuration is invalid.
    pub fn preview(&self, model: &StructuralModel) -> Result<DiagramPlan, CartographError> {
        self.config.validate()?;
        let planner = Planner::new(self.config.planner(), self.config.style().theme());
        let plan = planner.plan(model, None);
        debug!(plan:% = plan.summary(); "Previewed plan");
        Ok(plan)
    }

    /// Run independent workflows for many models in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] if the configuration is invalid.
    pub fn run_batch(&self, jobs: &[Job]) -> Result<Vec<JobResult>, CartographError> {
        let controller = self.controller()?;
        Ok(batch::run_all(&controller, jobs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_json() {
        let json = r#"{"components": [
            {"id": "a", "kind": "class", "name": "Account",
             "members": [{"name": "open", "kind": "method"}],
             "relations": [{"target_id": "b", "kind": "inherits"}]},
            {"id": "b", "kind": "module", "name": "ledger"}
        ]}"#;
        let model = model_from_json(json).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.relation_count(), 1);
        assert_eq!(model.get("a").unwrap().method_count(), 1);
    }

    #[test]
    fn test_model_errors_keep_source() {
        let json = r#"{"components": [{"id": "a", "kind": "widget", "name": "A"}]}"#;
        match model_from_json(json) {
            Err(CartographError::Model { src, .. }) => assert_eq!(src, json),
            other => panic!("expected model error, got {other:?}"),
        }

        let duplicate = r#"{"components": [
            {"id": "a", "kind": "class", "name": "A"},
            {"id": "a", "kind": "class", "name": "B"}
        ]}"#;
        assert!(matches!(
            model_from_json(duplicate),
            Err(CartographError::Model { .. })
        ));
    }

    #[test]
    fn test_preview_applies_planner_overrides() {
        let json = r#"{"components": [
            {"id": "a", "kind": "class", "name": "Account"},
            {"id": "b", "kind": "class", "name": "Ledger"},
            {"id": "c", "kind": "class", "name": "Audit"},
            {"id": "d", "kind": "class", "name": "Report"}
        ]}"#;
        let model = model_from_json(json).unwrap();
        let config = AppConfig::default()
            .with_planner(config::PlannerConfig::default().with_max_components(3))
            .with_style(config::StyleConfig::default().with_theme(style::Theme::TechOrange));

        let plan = Cartographer::new(config).preview(&model).unwrap();
        assert_eq!(plan.components().len(), 3);
        assert_eq!(plan.theme(), style::Theme::TechOrange);
    }

    #[test]
    fn test_preview_rejects_invalid_config() {
        let config = AppConfig::default().with_planner(config::PlannerConfig::new(2, 3));
        let model = StructuralModel::default();
        assert!(matches!(
            Cartographer::new(config).preview(&model),
            Err(CartographError::Config(_))
        ));
    }

    #[test]
    fn test_read_diagram_reports_errors() {
        assert!(read_diagram("a -> b").is_ok());
        assert!(matches!(
            read_diagram("a: {"),
            Err(CartographError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        use config::WorkflowConfig;

        let config = AppConfig::default().with_workflow(WorkflowConfig::default().with_max_attempts(0));
        let cartographer = Cartographer::new(config);
        assert!(matches!(
            cartographer.run(&StructuralModel::default()),
            Err(CartographError::Config(_))
        ));
    }
}
