//! Integration tests for the Cartographer API
//!
//! These tests drive whole workflows through the public API with a validator
//! that always renders, so they run without the `d2` executable.

use std::{sync::Arc, time::Duration};

use float_cmp::assert_approx_eq;

use cartograph::{
    Cartographer,
    artifact::DiagramArtifact,
    batch::Job,
    config::{AppConfig, RendererConfig, WorkflowConfig},
    model::{Component, ComponentKind, MemberKind, RelationKind, StructuralModel},
    plan::DiagramType,
    quality::Metric,
    validation::{FailureClass, ValidationResult},
    validator::Validator,
    workflow::{FailureReason, Status},
};

/// Accepts every artifact without running a renderer.
struct AlwaysRenders;

impl Validator for AlwaysRenders {
    fn validate(&self, _artifact: &DiagramArtifact, _timeout: Duration) -> ValidationResult {
        ValidationResult::rendered()
    }
}

fn cartographer(config: AppConfig) -> Cartographer {
    Cartographer::new(config).with_validator(Arc::new(AlwaysRenders))
}

fn shapes_model() -> StructuralModel {
    StructuralModel::new(vec![
        Component::new("shape", ComponentKind::Class, "Shape")
            .with_member("area", MemberKind::Method)
            .with_member("name", MemberKind::Field),
        Component::new("circle", ComponentKind::Class, "Circle")
            .with_member("radius", MemberKind::Field)
            .with_relation("shape", RelationKind::Inherits),
        Component::new("logger", ComponentKind::Class, "Logger")
            .with_member("log", MemberKind::Method),
    ])
    .expect("valid model")
}

/// Every component depends on every other one.
fn complete_model(n: usize) -> StructuralModel {
    let components = (0..n)
        .map(|i| {
            (0..n).filter(|&j| j != i).fold(
                Component::new(format!("c{i}"), ComponentKind::Class, format!("Widget{i}")),
                |component, j| component.with_relation(format!("c{j}"), RelationKind::Depends),
            )
        })
        .collect();
    StructuralModel::new(components).expect("valid model")
}

#[test]
fn test_three_classes_become_a_class_diagram() {
    let outcome = cartographer(AppConfig::default())
        .run(&shapes_model())
        .expect("valid configuration");

    assert_eq!(outcome.status(), Status::Accepted);
    assert_eq!(outcome.attempts(), 1);

    let artifact = outcome.artifact().expect("accepted runs keep an artifact");
    assert_eq!(artifact.plan().diagram_type(), DiagramType::Class);
    assert_eq!(artifact.plan().components().len(), 3);

    let document = cartograph::read_diagram(artifact.source_text()).expect("readable output");
    assert_eq!(document.leaf_shapes().count(), 3);
    assert_eq!(document.connections().len(), 1);

    let report = outcome.report().expect("accepted runs keep a report");
    assert_approx_eq!(f64, report.score(Metric::Completeness), 1.0);
}

#[test]
fn test_dense_model_is_capped_and_penalised() {
    let model = complete_model(50);
    let outcome = cartographer(AppConfig::default())
        .run(&model)
        .expect("valid configuration");

    let first = &outcome.history()[0];
    assert_eq!(first.artifact().plan().components().len(), 15);

    let document =
        cartograph::read_diagram(first.artifact().source_text()).expect("readable output");
    assert_eq!(document.leaf_shapes().count(), 15);

    // 210 connections over 15 components.
    let report = first.quality().expect("rendered attempts are evaluated");
    assert_approx_eq!(
        f64,
        report.score(Metric::Readability),
        3.0 / 14.0,
        epsilon = 1e-9
    );
    assert!(
        report
            .suggestions()
            .iter()
            .any(|s| s.starts_with("Reduce complexity"))
    );
}

#[test]
fn test_missing_renderer_fails_after_one_attempt() {
    let config = AppConfig::default()
        .with_renderer(RendererConfig::new("cartograph-no-such-renderer", 5));
    let outcome = Cartographer::new(config)
        .run(&shapes_model())
        .expect("valid configuration");

    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(outcome.attempts(), 1);
    assert!(outcome.artifact().is_none());
    match outcome.failure() {
        Some(FailureReason::Infrastructure(validation)) => {
            assert_eq!(validation.failure_class(), Some(FailureClass::Infrastructure));
            assert!(validation.to_string().contains("not found"));
        }
        other => panic!("expected infrastructure failure, got {other:?}"),
    }
}

#[test]
fn test_reruns_produce_identical_text() {
    let cartographer = cartographer(AppConfig::default());
    let model = shapes_model();

    let first = cartographer.run(&model).expect("valid configuration");
    let second = cartographer.run(&model).expect("valid configuration");

    assert_eq!(
        first.artifact().map(DiagramArtifact::source_text),
        second.artifact().map(DiagramArtifact::source_text)
    );
    assert_eq!(first.trace(), second.trace());
}

#[test]
fn test_empty_model_still_produces_a_diagram() {
    let outcome = cartographer(AppConfig::default())
        .run(&StructuralModel::default())
        .expect("valid configuration");

    assert!(outcome.status().is_success());
    let artifact = outcome.artifact().expect("successful runs keep an artifact");
    assert!(cartograph::read_diagram(artifact.source_text()).is_ok());
}

#[test]
fn test_batch_runs_every_job() {
    let config = AppConfig::default().with_workflow(WorkflowConfig::default().with_max_attempts(2));
    let jobs = vec![
        Job::new("shapes", shapes_model()),
        Job::new("dense", complete_model(20)),
        Job::new("empty", StructuralModel::default()),
    ];

    let results = cartographer(config)
        .run_batch(&jobs)
        .expect("valid configuration");

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["shapes", "dense", "empty"]);
    for result in &results {
        assert!(result.outcome.attempts() <= 2, "{}", result.name);
        assert!(result.outcome.history().len() <= 2, "{}", result.name);
    }
}
