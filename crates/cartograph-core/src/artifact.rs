//! Generated diagram text.

use std::sync::Arc;

use crate::plan::DiagramPlan;

/// Immutable D2 text produced from one plan during one attempt.
///
/// The plan is shared behind an [`Arc`] so the artifact, the attempt record
/// and the evaluator can all refer to it without copying.
#[derive(Debug, Clone)]
pub struct DiagramArtifact {
    source_text: String,
    plan: Arc<DiagramPlan>,
    attempt_index: usize,
}

impl DiagramArtifact {
    pub fn new(source_text: String, plan: Arc<DiagramPlan>, attempt_index: usize) -> Self {
        Self {
            source_text,
            plan,
            attempt_index,
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn plan(&self) -> &DiagramPlan {
        &self.plan
    }

    /// Shared handle to the plan, for records that outlive the artifact.
    pub fn plan_handle(&self) -> Arc<DiagramPlan> {
        Arc::clone(&self.plan)
    }

    /// Zero-based index of the attempt that produced this artifact.
    pub fn attempt_index(&self) -> usize {
        self.attempt_index
    }
}
