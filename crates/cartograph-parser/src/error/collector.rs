use crate::error::{Diagnostic, ParseError};

/// Accumulates diagnostics so a phase can report every problem at once.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.errors.push(diagnostic);
        } else {
            self.warnings.push(diagnostic);
        }
    }

    /// `Err` with all errors if any were emitted, otherwise the warnings.
    pub fn finish(self) -> Result<Vec<Diagnostic>, ParseError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ParseError::new(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_only_succeed() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("first"));
        let warnings = collector.finish().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_errors_fail_without_warnings() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("ignored"));
        collector.emit(Diagnostic::error("first"));
        collector.emit(Diagnostic::error("second"));
        let err = collector.finish().unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
    }
}
