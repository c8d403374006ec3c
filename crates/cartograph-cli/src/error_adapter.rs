//! Error adapter for converting CartographError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a [`cartograph_parser::error::ParseError`] contains multiple
//! diagnostics, each diagnostic is rendered independently. Model errors are
//! rendered with a label on the JSON position serde reported.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use cartograph::CartographError;
use cartograph_parser::error::Diagnostic;

/// Adapter for a single D2 reader diagnostic.
pub struct DiagnosticAdapter<'a> {
    /// The wrapped diagnostic
    diag: &'a Diagnostic,
    /// Source code for displaying snippets
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = SourceSpan::new(label.span().start().into(), label.span().len());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for a structural model that failed to load.
///
/// serde_json reports a line and column; the adapter turns them back into a
/// byte span of the model text.
pub struct ModelAdapter<'a> {
    err: &'a serde_json::Error,
    src: &'a str,
}

impl<'a> ModelAdapter<'a> {
    pub fn new(err: &'a serde_json::Error, src: &'a str) -> Self {
        Self { err, src }
    }

    fn span(&self) -> SourceSpan {
        let offset = json_offset(self.src, self.err.line(), self.err.column());
        let len = usize::from(offset < self.src.len());
        SourceSpan::new(offset.into(), len)
    }
}

impl fmt::Debug for ModelAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("err", &self.err)
            .finish()
    }
}

impl fmt::Display for ModelAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid structural model")
    }
}

impl std::error::Error for ModelAdapter<'_> {}

impl MietteDiagnostic for ModelAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("cartograph::model"))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let message = strip_position(&self.err.to_string());
        Some(Box::new(std::iter::once(
            LabeledSpan::new_primary_with_span(Some(message), self.span()),
        )))
    }
}

/// Drops serde_json's " at line L column C" suffix; the label shows it.
fn strip_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(index) => message[..index].to_string(),
        None => message.to_string(),
    }
}

/// Byte offset of a 1-based line and column, clamped to the text.
fn json_offset(src: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(src.len())
}

/// Adapter for [`CartographError`] variants without source text.
pub struct ErrorAdapter<'a>(pub &'a CartographError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            CartographError::Io(_) => "cartograph::io",
            CartographError::Model { .. } => "cartograph::model",
            CartographError::Config(_) => "cartograph::config",
            CartographError::Parse { .. } => return None,
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            CartographError::Config(_) => Some(Box::new(
                "check the configuration file passed with --config or found in cartograph/config.toml",
            )),
            _ => None,
        }
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A D2 reader diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A model loading error pointing into the JSON text.
    Model(ModelAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl Reportable<'_> {
    fn inner(&self) -> &dyn MietteDiagnostic {
        match self {
            Reportable::Diagnostic(d) => d,
            Reportable::Model(m) => m,
            Reportable::Error(e) => e,
        }
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Error(e) => std::error::Error::source(e),
            _ => None,
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.inner().code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.inner().help()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.inner().source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.inner().labels()
    }
}

/// Convert a [`CartographError`] into a list of reportable errors.
///
/// For [`CartographError::Parse`], this returns one [`Reportable`] for
/// each diagnostic in the error. For other error variants, this returns a
/// single [`Reportable`].
pub fn to_reportables(err: &CartographError) -> Vec<Reportable<'_>> {
    match err {
        CartographError::Parse {
            err: parse_err,
            src,
        } => parse_err
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src)))
            .collect(),
        CartographError::Model { err, src } => vec![Reportable::Model(ModelAdapter::new(err, src))],
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use cartograph_parser::{
        Span,
        error::{ErrorCode, ParseError},
    };

    use super::*;

    #[test]
    fn test_multiple_diagnostics() {
        let diags = vec![
            Diagnostic::error("first error")
                .with_code(ErrorCode::E302)
                .with_label(Span::new(0..5), "first"),
            Diagnostic::error("second error")
                .with_code(ErrorCode::E301)
                .with_label(Span::new(10..15), "second")
                .with_help("help for second"),
        ];
        let err = CartographError::new_parse_error(ParseError::new(diags), "source code here...");

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "first error");
        assert_eq!(reportables[1].to_string(), "second error");
        assert_eq!(reportables[1].help().unwrap().to_string(), "help for second");
    }

    #[test]
    fn test_primary_flag_on_labels() {
        let diag = Diagnostic::error("error with labels")
            .with_label(Span::new(0..5), "primary")
            .with_secondary_label(Span::new(10..15), "secondary");

        let adapter = DiagnosticAdapter::new(&diag, "some source code");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
    }

    #[test]
    fn test_model_error_points_into_json() {
        let src = "{\"components\": [\n  {\"id\": \"a\", \"kind\": \"widget\", \"name\": \"A\"}\n]}";
        let err = cartograph::model_from_json(src).unwrap_err();

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        let Reportable::Model(adapter) = &reportables[0] else {
            panic!("Expected Model");
        };
        assert_eq!(adapter.code().unwrap().to_string(), "cartograph::model");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].offset() > src.find('\n').unwrap());
        assert!(labels[0].offset() <= src.len());
        assert!(labels[0].label().unwrap().contains("widget"));
    }

    #[test]
    fn test_json_offset() {
        let src = "ab\ncde\nf";
        assert_eq!(json_offset(src, 1, 1), 0);
        assert_eq!(json_offset(src, 2, 2), 4);
        assert_eq!(json_offset(src, 3, 1), 7);
        assert_eq!(json_offset(src, 9, 9), src.len());
        assert_eq!(json_offset(src, 0, 0), 0);
    }

    #[test]
    fn test_strip_position() {
        assert_eq!(
            strip_position("expected value at line 1 column 2"),
            "expected value"
        );
        assert_eq!(strip_position("no position"), "no position");
    }

    #[test]
    fn test_non_diagnostic_error() {
        let err = CartographError::Io(std::io::Error::other("disk on fire"));

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "I/O error: disk on fire");
                assert_eq!(e.code().unwrap().to_string(), "cartograph::io");
            }
            other => panic!("Expected Error, got {other:?}"),
        }
    }
}
