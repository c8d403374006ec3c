//! Artifact validation against the external D2 renderer.
//!
//! [`Validator`] is the seam between the workflow and the renderer. The
//! production implementation, [`D2Validator`], runs in two stages:
//!
//! 1. **Pre-flight**: the source is read with [`cartograph_parser`]. Text the
//!    reader rejects is a syntax failure and the renderer is never started.
//! 2. **Render**: the source is written to a fresh temporary directory and
//!    `d2 <input> <output>` is run with a deadline. The exit status, stderr
//!    and the produced SVG decide the verdict; a produced SVG is kept on the
//!    result.
//!
//! Renderer failures are classified by an ordered table of stderr patterns
//! into content failures (syntax or render), which the workflow retries, and
//! infrastructure failures, which it does not.

use std::{
    fs,
    io::{self, Read},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    sync::{LazyLock, mpsc},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};
use regex::Regex;

use cartograph_core::{
    artifact::DiagramArtifact,
    validation::{Stage, ValidationDiagnostic, ValidationResult},
};

use crate::config::RendererConfig;

/// How often a running renderer is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long stderr is awaited after a renderer exits at its deadline.
const STDERR_GRACE: Duration = Duration::from_millis(200);

/// Checks whether an artifact renders.
pub trait Validator: Send + Sync {
    /// Validates `artifact`, giving up on the renderer after `timeout`.
    fn validate(&self, artifact: &DiagramArtifact, timeout: Duration) -> ValidationResult;
}

/// Verdict for a failed renderer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Syntax,
    Infrastructure,
    Render,
}

/// Stderr patterns in evaluation order; the first match classifies the run.
const STDERR_PATTERNS: &[(Verdict, &str)] = &[
    (Verdict::Syntax, r"\.d2:\d+:\d+:"),
    (
        Verdict::Syntax,
        r"(?i)syntax error|unexpected (text|token|character|end)|unterminated|failed to parse|invalid (key|value|shape|style|keyword)",
    ),
    (
        Verdict::Infrastructure,
        r"(?i)layout (engine|plugin)|plugin .*not found|executable file not found",
    ),
    (
        Verdict::Infrastructure,
        r"(?i)permission denied|killed|signal: |out of memory|cannot allocate|no space left",
    ),
];

static STDERR_RULES: LazyLock<Vec<(Verdict, Regex)>> = LazyLock::new(|| {
    STDERR_PATTERNS
        .iter()
        .map(|(verdict, pattern)| {
            (
                *verdict,
                Regex::new(pattern).expect("stderr patterns are valid"),
            )
        })
        .collect()
});

fn classify_stderr(stderr: &str) -> Verdict {
    STDERR_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(stderr))
        .map_or(Verdict::Render, |(verdict, _)| *verdict)
}

fn diagnostics(stage: Stage, text: &str) -> Vec<ValidationDiagnostic> {
    let diagnostics: Vec<_> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| ValidationDiagnostic::new(stage, line))
        .collect();
    if diagnostics.is_empty() {
        vec![ValidationDiagnostic::new(stage, "renderer failed without output")]
    } else {
        diagnostics
    }
}

fn infrastructure(message: impl Into<String>) -> ValidationResult {
    ValidationResult::infrastructure_error(vec![ValidationDiagnostic::new(
        Stage::Infrastructure,
        message,
    )])
}

/// Outcome of one bounded renderer run.
enum RunOutcome {
    Exited { status: ExitStatus, stderr: String },
    TimedOut,
}

/// Validates artifacts with the D2 reader and the `d2` executable.
#[derive(Debug, Clone)]
pub struct D2Validator {
    executable: String,
    args: Vec<String>,
}

impl D2Validator {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            executable: config.executable().to_string(),
            args: config.args().to_vec(),
        }
    }

    /// Reads the source with the D2 reader.
    ///
    /// Returns the failing result, or the reader's warnings to carry forward
    /// when the source reads cleanly.
    fn preflight(source: &str) -> Result<Vec<ValidationDiagnostic>, ValidationResult> {
        match cartograph_parser::parse(source) {
            Ok(document) => Ok(document
                .warnings()
                .iter()
                .map(|warning| ValidationDiagnostic::new(Stage::Preflight, warning.to_string()))
                .collect()),
            Err(err) => {
                let diagnostics = err
                    .diagnostics()
                    .iter()
                    .map(|diagnostic| {
                        ValidationDiagnostic::new(Stage::Preflight, diagnostic.to_string())
                    })
                    .collect();
                Err(ValidationResult::syntax_error(diagnostics))
            }
        }
    }

    fn render(&self, source: &str, timeout: Duration) -> ValidationResult {
        // Removed when dropped, on every return path.
        let workdir = match tempfile::Builder::new().prefix("cartograph-").tempdir() {
            Ok(dir) => dir,
            Err(err) => return infrastructure(format!("cannot create temporary directory: {err}")),
        };
        let input = workdir.path().join("diagram.d2");
        let output = workdir.path().join("diagram.svg");
        if let Err(err) = fs::write(&input, source) {
            return infrastructure(format!("cannot write diagram source: {err}"));
        }

        let spawned = Command::new(&self.executable)
            .args(&self.args)
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(executable = self.executable.as_str(); "Renderer not found");
                return infrastructure(format!("renderer `{}` not found", self.executable));
            }
            Err(err) => {
                return infrastructure(format!(
                    "cannot start renderer `{}`: {err}",
                    self.executable
                ));
            }
        };

        let started = Instant::now();
        let outcome = match wait_with_deadline(child, timeout) {
            Ok(outcome) => outcome,
            Err(err) => return infrastructure(format!("lost track of renderer: {err}")),
        };
        debug!(elapsed_ms = started.elapsed().as_millis() as u64; "Renderer finished");

        match outcome {
            RunOutcome::TimedOut => {
                warn!(timeout_secs = timeout.as_secs(); "Renderer timed out");
                infrastructure(format!(
                    "renderer timed out after {:.1}s",
                    timeout.as_secs_f64()
                ))
            }
            RunOutcome::Exited { status, stderr } => {
                trace!(status:% = status, stderr = stderr.as_str(); "Renderer output");
                if status.success() {
                    Self::check_output(&output)
                } else {
                    Self::classify_failure(&stderr)
                }
            }
        }
    }

    /// Accepts a non-empty SVG and keeps it on the result.
    fn check_output(output: &Path) -> ValidationResult {
        match fs::read(output) {
            Ok(bytes) if !bytes.is_empty() => {
                let svg = String::from_utf8_lossy(&bytes).into_owned();
                ValidationResult::rendered().with_svg(svg)
            }
            _ => ValidationResult::render_error(vec![ValidationDiagnostic::new(
                Stage::Render,
                "renderer exited successfully but produced no SVG",
            )]),
        }
    }

    fn classify_failure(stderr: &str) -> ValidationResult {
        let verdict = classify_stderr(stderr);
        debug!(verdict:? = verdict; "Classified renderer failure");
        match verdict {
            Verdict::Syntax => ValidationResult::syntax_error(diagnostics(Stage::Syntax, stderr)),
            Verdict::Infrastructure => {
                ValidationResult::infrastructure_error(diagnostics(Stage::Infrastructure, stderr))
            }
            Verdict::Render => ValidationResult::render_error(diagnostics(Stage::Render, stderr)),
        }
    }
}

impl Validator for D2Validator {
    fn validate(&self, artifact: &DiagramArtifact, timeout: Duration) -> ValidationResult {
        info!(attempt = artifact.attempt_index(); "Validating diagram");

        let warnings = match Self::preflight(artifact.source_text()) {
            Ok(warnings) => warnings,
            Err(result) => {
                debug!(diagnostics = result.diagnostics().len(); "Pre-flight rejected source");
                return result;
            }
        };

        warnings
            .into_iter()
            .fold(self.render(artifact.source_text(), timeout), |result, warning| {
                result.with_diagnostic(warning)
            })
    }
}

/// Waits for `child` until `timeout`, killing and reaping it on expiry.
///
/// Stderr is drained on a separate thread so a chatty renderer cannot block
/// on a full pipe. Processes started by the renderer inherit the pipe and may
/// hold it open after the renderer is gone, so the reader is never joined:
/// its output is awaited only until the deadline and abandoned otherwise.
fn wait_with_deadline(mut child: Child, timeout: Duration) -> io::Result<RunOutcome> {
    let (sender, receiver) = mpsc::channel::<String>();
    match child.stderr.take() {
        Some(mut pipe) => {
            thread::spawn(move || {
                let mut bytes = Vec::new();
                if pipe.read_to_end(&mut bytes).is_ok() {
                    // The receiver is gone once the run was abandoned.
                    let _ = sender.send(String::from_utf8_lossy(&bytes).into_owned());
                }
            });
        }
        None => drop(sender),
    }

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .max(STDERR_GRACE);
            let stderr = match receiver.recv_timeout(wait) {
                Ok(stderr) => stderr,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    debug!("Renderer stderr still held open, continuing without it");
                    String::new()
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => String::new(),
            };
            return Ok(RunOutcome::Exited { status, stderr });
        }
        if Instant::now() >= deadline {
            // Already exited between the poll and the kill is fine.
            if let Err(err) = child.kill() {
                debug!(err:%; "Kill after timeout failed");
            }
            child.wait()?;
            return Ok(RunOutcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cartograph_core::{
        plan::{DiagramPlan, DiagramType, Layout},
        validation::{ContentFailure, FailureClass},
    };

    use super::*;

    fn artifact(source: &str) -> DiagramArtifact {
        let plan = DiagramPlan::new(DiagramType::Class, Layout::Hierarchical);
        DiagramArtifact::new(source.to_string(), Arc::new(plan), 0)
    }

    fn missing_renderer() -> D2Validator {
        D2Validator::new(&RendererConfig::new("cartograph-no-such-renderer", 5))
    }

    #[test]
    fn test_classify_stderr() {
        let cases = [
            (
                "err: failed to compile diagram.d2: diagram.d2:3:7: unexpected text after map key",
                Verdict::Syntax,
            ),
            ("syntax error near `{`", Verdict::Syntax),
            ("err: layout engine \"tala\" not found", Verdict::Infrastructure),
            ("open /tmp/out.svg: permission denied", Verdict::Infrastructure),
            ("signal: killed", Verdict::Infrastructure),
            ("err: failed to render: dagre: cycle detected", Verdict::Render),
            ("", Verdict::Render),
        ];
        for (stderr, expected) in cases {
            assert_eq!(classify_stderr(stderr), expected, "{stderr}");
        }
    }

    #[test]
    fn test_failure_diagnostics_carry_stage() {
        let result = D2Validator::classify_failure("line one\n\n  line two  \n");
        assert_eq!(
            result.failure_class(),
            Some(FailureClass::Content(ContentFailure::Render))
        );
        let messages: Vec<&str> = result.diagnostics().iter().map(|d| d.message()).collect();
        assert_eq!(messages, vec!["line one", "line two"]);
        assert!(result.diagnostics().iter().all(|d| d.stage() == Stage::Render));
    }

    #[test]
    fn test_empty_stderr_still_reports() {
        let result = D2Validator::classify_failure("");
        assert_eq!(result.diagnostics().len(), 1);
    }

    #[test]
    fn test_preflight_rejects_without_renderer() {
        let result = missing_renderer().validate(&artifact("a: {\n  shape: blob\n}"), Duration::from_secs(1));
        assert!(!result.syntax_ok());
        assert_eq!(
            result.failure_class(),
            Some(FailureClass::Content(ContentFailure::Syntax))
        );
        assert!(result.diagnostics().iter().all(|d| d.stage() == Stage::Preflight));
    }

    #[test]
    fn test_missing_renderer_is_infrastructure() {
        let result = missing_renderer().validate(&artifact("a -> b"), Duration::from_secs(1));
        assert!(!result.syntax_ok());
        assert!(!result.render_ok());
        assert_eq!(result.failure_class(), Some(FailureClass::Infrastructure));
        assert_eq!(result.diagnostics()[0].stage(), Stage::Infrastructure);
        assert!(result.diagnostics()[0].message().contains("not found"));
    }

    #[test]
    fn test_missing_svg_is_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = D2Validator::check_output(&dir.path().join("missing.svg"));
        assert_eq!(
            result.failure_class(),
            Some(FailureClass::Content(ContentFailure::Render))
        );

        let empty = dir.path().join("empty.svg");
        fs::write(&empty, "").unwrap();
        assert!(!D2Validator::check_output(&empty).render_ok());

        let svg = dir.path().join("ok.svg");
        fs::write(&svg, "<svg/>").unwrap();
        let result = D2Validator::check_output(&svg);
        assert!(result.render_ok());
        assert_eq!(result.svg(), Some("<svg/>"));
    }
}
