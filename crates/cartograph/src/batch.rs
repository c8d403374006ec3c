//! Parallel runs over many models.
//!
//! Every job gets its own workflow state and every renderer invocation its
//! own temporary directory, so jobs share nothing but the read-only
//! [`Controller`]. Results come back in job order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use rayon::prelude::*;

use cartograph_core::model::StructuralModel;

use crate::{
    error::CartographError,
    model_from_json,
    workflow::{Controller, Outcome},
};

/// One model to diagram.
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    model: StructuralModel,
}

impl Job {
    pub fn new(name: impl Into<String>, model: StructuralModel) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &StructuralModel {
        &self.model
    }
}

/// The outcome of one [`Job`].
#[derive(Debug, Clone)]
pub struct JobResult {
    pub name: String,
    pub outcome: Outcome,
}

/// Runs every job in parallel on the global rayon pool.
pub fn run_all(controller: &Controller, jobs: &[Job]) -> Vec<JobResult> {
    info!(jobs = jobs.len(); "Running batch");

    jobs.par_iter()
        .map(|job| {
            debug!(job = job.name(); "Starting job");
            JobResult {
                name: job.name.clone(),
                outcome: controller.run(&job.model),
            }
        })
        .collect()
}

/// Loads every `*.json` file directly inside `dir` as a job named after the
/// file stem, sorted by path.
///
/// # Errors
///
/// Returns the first I/O or model error encountered.
pub fn collect_jobs(dir: &Path) -> Result<Vec<Job>, CartographError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"));
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)?;
            let model = model_from_json(&text)?;
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "diagram".to_string());
            Ok(Job::new(name, model))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::{AppConfig, RendererConfig},
        validator::D2Validator,
    };

    const MODEL: &str = r#"{"components": [
        {"id": "a", "kind": "class", "name": "Account", "relations": [{"target_id": "b", "kind": "depends"}]},
        {"id": "b", "kind": "class", "name": "Ledger"}
    ]}"#;

    #[test]
    fn test_collect_jobs_reads_json_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zeta.json"), MODEL).unwrap();
        fs::write(dir.path().join("alpha.json"), MODEL).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let jobs = collect_jobs(dir.path()).unwrap();
        let names: Vec<&str> = jobs.iter().map(Job::name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(jobs[0].model().len(), 2);
    }

    #[test]
    fn test_collect_jobs_reports_bad_model() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{\"components\": [").unwrap();
        assert!(matches!(
            collect_jobs(dir.path()),
            Err(CartographError::Model { .. })
        ));
    }

    #[test]
    fn test_results_keep_job_order() {
        let config = AppConfig::default()
            .with_renderer(RendererConfig::new("cartograph-no-such-renderer", 1));
        let validator = Arc::new(D2Validator::new(config.renderer()));
        let controller = Controller::new(&config, validator).unwrap();

        let model = model_from_json(MODEL).unwrap();
        let jobs: Vec<Job> = (0..6).map(|i| Job::new(format!("job{i}"), model.clone())).collect();
        let results = run_all(&controller, &jobs);

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["job0", "job1", "job2", "job3", "job4", "job5"]);
        assert!(results.iter().all(|r| r.outcome.attempts() == 1));
    }
}
