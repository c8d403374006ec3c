//! Renderer verdicts.
//!
//! A [`ValidationResult`] records whether the external renderer accepted the
//! diagram text and, if not, why. Construction goes through the named
//! constructors so `render_ok` can never be set without `syntax_ok`.

use std::fmt;

/// The stage at which a diagnostic was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Local parse of the diagram text before the renderer runs.
    Preflight,
    /// The renderer reported a syntax error.
    Syntax,
    /// The renderer parsed the text but could not render it.
    Render,
    /// The renderer could not be run to completion at all.
    Infrastructure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Preflight => write!(f, "preflight"),
            Stage::Syntax => write!(f, "syntax"),
            Stage::Render => write!(f, "render"),
            Stage::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// One message attached to a validation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    stage: Stage,
    message: String,
}

impl ValidationDiagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// A failure caused by the diagram text itself; retrying with a different
/// plan may fix it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFailure {
    Syntax,
    Render,
}

impl fmt::Display for ContentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentFailure::Syntax => write!(f, "syntax"),
            ContentFailure::Render => write!(f, "render"),
        }
    }
}

/// Classification of a failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Retryable: the text was rejected.
    Content(ContentFailure),
    /// Fatal: the renderer is missing, broken or timed out.
    Infrastructure,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Content(failure) => write!(f, "content ({failure})"),
            FailureClass::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// The outcome of validating one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    syntax_ok: bool,
    render_ok: bool,
    failure: Option<FailureClass>,
    diagnostics: Vec<ValidationDiagnostic>,
    svg: Option<String>,
}

impl ValidationResult {
    /// The renderer accepted and rendered the text.
    pub fn rendered() -> Self {
        Self {
            syntax_ok: true,
            render_ok: true,
            failure: None,
            diagnostics: Vec::new(),
            svg: None,
        }
    }

    /// The text was rejected as syntactically invalid.
    pub fn syntax_error(diagnostics: Vec<ValidationDiagnostic>) -> Self {
        Self {
            syntax_ok: false,
            render_ok: false,
            failure: Some(FailureClass::Content(ContentFailure::Syntax)),
            diagnostics,
            svg: None,
        }
    }

    /// The text parsed but the renderer could not produce output.
    pub fn render_error(diagnostics: Vec<ValidationDiagnostic>) -> Self {
        Self {
            syntax_ok: true,
            render_ok: false,
            failure: Some(FailureClass::Content(ContentFailure::Render)),
            diagnostics,
            svg: None,
        }
    }

    /// The renderer could not be run to a verdict.
    pub fn infrastructure_error(diagnostics: Vec<ValidationDiagnostic>) -> Self {
        Self {
            syntax_ok: false,
            render_ok: false,
            failure: Some(FailureClass::Infrastructure),
            diagnostics,
            svg: None,
        }
    }

    /// Appends a diagnostic, keeping the verdict unchanged.
    pub fn with_diagnostic(mut self, diagnostic: ValidationDiagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// Attaches the SVG the renderer produced.
    pub fn with_svg(mut self, svg: impl Into<String>) -> Self {
        self.svg = Some(svg.into());
        self
    }

    pub fn syntax_ok(&self) -> bool {
        self.syntax_ok
    }

    pub fn render_ok(&self) -> bool {
        self.render_ok
    }

    /// `None` when the artifact rendered.
    pub fn failure_class(&self) -> Option<FailureClass> {
        self.failure
    }

    pub fn diagnostics(&self) -> &[ValidationDiagnostic] {
        &self.diagnostics
    }

    /// The rendered SVG, when the renderer produced one.
    pub fn svg(&self) -> Option<&str> {
        self.svg.as_deref()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure {
            None => write!(f, "rendered")?,
            Some(class) => write!(f, "{class} failure")?,
        }
        if let Some(first) = self.diagnostics.first() {
            write!(f, ": {first}")?;
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ok_implies_syntax_ok() {
        let results = [
            ValidationResult::rendered(),
            ValidationResult::syntax_error(vec![]),
            ValidationResult::render_error(vec![]),
            ValidationResult::infrastructure_error(vec![]),
        ];
        for result in results {
            assert!(!result.render_ok() || result.syntax_ok());
        }
    }

    #[test]
    fn test_failure_classes() {
        assert_eq!(ValidationResult::rendered().failure_class(), None);
        assert_eq!(
            ValidationResult::render_error(vec![]).failure_class(),
            Some(FailureClass::Content(ContentFailure::Render))
        );
        assert_eq!(
            ValidationResult::infrastructure_error(vec![]).failure_class(),
            Some(FailureClass::Infrastructure)
        );
    }

    #[test]
    fn test_display_counts_extra_diagnostics() {
        let result = ValidationResult::syntax_error(vec![
            ValidationDiagnostic::new(Stage::Syntax, "unexpected `}`"),
            ValidationDiagnostic::new(Stage::Syntax, "unclosed map"),
        ]);
        assert_eq!(
            result.to_string(),
            "content (syntax) failure: [syntax] unexpected `}` (+1 more)"
        );
    }
}
