//! Labeled source spans attached to diagnostics.

use crate::span::Span;

/// A message pinned to a span of D2 text.
///
/// The primary label marks where a problem is; secondary labels point at
/// related text, such as the block a stray `}` was expected to close.
///
/// ```text
/// error[E101]: unclosed block
///   |
/// 3 | grp_core: {
///   |           - block opened here
/// ...
/// 9 |
///   | ^ input ends before `}`
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    span: Span,
    message: String,
    is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: false,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_kinds() {
        let primary = Label::primary(Span::new(3..7), "here");
        let secondary = Label::secondary(Span::new(0..1), "opened here");

        assert!(primary.is_primary());
        assert!(!secondary.is_primary());
        assert_eq!(primary.span().range(), 3..7);
        assert_eq!(secondary.message(), "opened here");
    }
}
