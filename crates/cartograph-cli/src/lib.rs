//! CLI logic for the Cartograph diagram tool.
//!
//! This module contains the core CLI logic: loading configuration and
//! models, running the workflow for a single model or a directory of models,
//! and writing diagrams, rendered SVGs and reports. With `--preview` only the
//! planned design is printed.

pub mod error_adapter;

mod args;
mod config;
mod preview;
mod report;

pub use args::Args;

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{error, info, warn};

use cartograph::{
    CartographError, Cartographer,
    batch::{Job, collect_jobs},
    config::AppConfig,
    workflow::{Outcome, Status},
};

use preview::Preview;
use report::Report;

/// Output file used for a single model when `--output` is absent.
const DEFAULT_OUTPUT: &str = "diagram.d2";

/// Output directory used in directory mode when `--output` is absent.
const DEFAULT_OUTPUT_DIR: &str = "diagrams";

/// Run the Cartograph CLI application
///
/// A file input is one workflow written to `--output`. A directory input runs
/// one workflow per `*.json` file and writes `<name>.d2` files into the output
/// directory.
///
/// Returns the least successful status over all workflows. A `FAILED`
/// workflow is not an error; the caller decides the exit code from the
/// status. A preview runs no workflow and reports `ACCEPTED`.
///
/// # Errors
///
/// Returns `CartographError` for:
/// - File I/O errors
/// - Configuration loading or validation errors
/// - Malformed structural models
pub fn run(args: &Args) -> Result<Status, CartographError> {
    info!(
        input_path = args.input,
        report = args.report,
        svg = args.svg,
        preview = args.preview;
        "Processing model"
    );

    let app_config = apply_overrides(config::load_config(args.config.as_ref())?, args);
    let cartographer = Cartographer::new(app_config);

    let input = Path::new(&args.input);
    if args.preview {
        run_preview(&cartographer, input, args)
    } else if input.is_dir() {
        run_directory(&cartographer, input, args)
    } else {
        run_file(&cartographer, input, args)
    }
}

/// Applies the command-line overrides on top of the loaded configuration.
fn apply_overrides(mut app_config: AppConfig, args: &Args) -> AppConfig {
    if let Some(max_attempts) = args.max_attempts {
        let workflow = app_config.workflow().with_max_attempts(max_attempts);
        app_config = app_config.with_workflow(workflow);
    }
    if let Some(max_components) = args.max_components {
        let planner = app_config.planner().with_max_components(max_components);
        app_config = app_config.with_planner(planner);
    }
    if let Some(theme) = args.theme {
        let style = app_config.style().clone().with_theme(theme);
        app_config = app_config.with_style(style);
    }
    app_config
}

fn run_preview(
    cartographer: &Cartographer,
    input: &Path,
    args: &Args,
) -> Result<Status, CartographError> {
    let jobs = if input.is_dir() {
        collect_jobs(input)?
    } else {
        let source = fs::read_to_string(input)?;
        vec![Job::new(file_name(input, args), cartograph::model_from_json(&source)?)]
    };

    for job in &jobs {
        let plan = cartographer.preview(job.model())?;
        println!("{}", Preview::new(job.name(), &plan, job.model().len()));
    }
    info!(models = jobs.len(); "Preview finished");
    Ok(Status::Accepted)
}

fn file_name(input: &Path, args: &Args) -> String {
    input
        .file_stem()
        .map_or_else(|| args.input.clone(), |stem| stem.to_string_lossy().into_owned())
}

fn run_file(
    cartographer: &Cartographer,
    input: &Path,
    args: &Args,
) -> Result<Status, CartographError> {
    let source = fs::read_to_string(input)?;
    let model = cartograph::model_from_json(&source)?;

    let output = PathBuf::from(args.output.as_deref().unwrap_or(DEFAULT_OUTPUT));
    let name = file_name(input, args);

    let outcome = cartographer.run(&model)?;
    write_outcome(&output, &name, &outcome, args)?;
    Ok(outcome.status())
}

fn run_directory(
    cartographer: &Cartographer,
    input: &Path,
    args: &Args,
) -> Result<Status, CartographError> {
    let jobs = collect_jobs(input)?;
    if jobs.is_empty() {
        warn!(input_path = args.input; "No *.json models found");
    }

    let output_dir = PathBuf::from(args.output.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR));
    fs::create_dir_all(&output_dir)?;

    let results = cartographer.run_batch(&jobs)?;
    let mut status = Status::Accepted;
    for result in &results {
        let output = output_dir.join(format!("{}.d2", result.name));
        write_outcome(&output, &result.name, &result.outcome, args)?;
        status = least_successful(status, result.outcome.status());
    }

    info!(
        models = results.len(),
        failed = results.iter().filter(|r| !r.outcome.status().is_success()).count();
        "Batch finished"
    );
    Ok(status)
}

/// Writes the chosen diagram, if any, and the optional SVG and report next
/// to it.
fn write_outcome(
    output: &Path,
    name: &str,
    outcome: &Outcome,
    args: &Args,
) -> Result<(), CartographError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if let Some(artifact) = outcome.artifact() {
        fs::write(output, artifact.source_text())?;
        info!(
            name = name,
            status:% = outcome.status(),
            score = outcome.report().map_or(0.0, |r| r.overall()),
            attempts = outcome.attempts(),
            output_file = output.display().to_string();
            "Diagram written"
        );
    } else {
        let reason = outcome
            .failure()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        error!(name = name, reason = reason, attempts = outcome.attempts(); "No diagram written");
    }

    let stem = output
        .file_stem()
        .map_or_else(|| name.to_string(), |stem| stem.to_string_lossy().into_owned());

    if args.svg {
        let svg = outcome
            .chosen()
            .and_then(|record| record.validation().svg());
        match svg {
            Some(svg) => {
                let svg_path = output.with_file_name(format!("{stem}.svg"));
                fs::write(&svg_path, svg)?;
                info!(svg_file = svg_path.display().to_string(); "SVG written");
            }
            None => warn!(name = name; "No rendered SVG to write"),
        }
    }

    if args.report {
        let report_path = output.with_file_name(format!("{stem}.report.txt"));
        fs::write(&report_path, Report::new(name, outcome).to_string())?;
        info!(report_file = report_path.display().to_string(); "Report written");
    }
    Ok(())
}

fn least_successful(a: Status, b: Status) -> Status {
    match (a, b) {
        (Status::Failed, _) | (_, Status::Failed) => Status::Failed,
        (Status::Degraded, _) | (_, Status::Degraded) => Status::Degraded,
        _ => Status::Accepted,
    }
}
