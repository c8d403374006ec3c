use std::fmt;

/// Whether a diagnostic rejects the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The text is not valid D2; reading fails.
    Error,
    /// The text is valid but something in it is likely unintended, such as a
    /// `class` that names no entry of the `classes` map.
    Warning,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}
