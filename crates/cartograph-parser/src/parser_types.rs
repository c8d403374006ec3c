//! Syntax tree produced by [`parser`](super::parser).
//!
//! The tree mirrors the text: a statement is a key path or a connection
//! chain, optionally followed by `: value` and/or a `{ ... }` block. Meaning
//! (which keys are attributes, which are shapes) is assigned later by
//! [`elaborate`](super::elaborate).

use std::fmt;

use crate::span::{Span, Spanned};

/// A dotted key path such as `grp_core.user_service.style`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<Spanned<String>>,
}

impl KeyPath {
    pub fn new(segments: Vec<Spanned<String>>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Spanned<String>] {
        &self.segments
    }

    pub fn span(&self) -> Span {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.span().union(last.span()),
            _ => Span::default(),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.inner())?;
        }
        Ok(())
    }
}

/// Connection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeOp {
    /// `->`
    Forward,
    /// `<-`
    Backward,
    /// `<->`
    Both,
    /// `--`
    Undirected,
}

impl EdgeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeOp::Forward => "->",
            EdgeOp::Backward => "<-",
            EdgeOp::Both => "<->",
            EdgeOp::Undirected => "--",
        }
    }
}

/// What a statement talks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Key(KeyPath),
    /// `a -> b <- c` holds three endpoints and two operators.
    Edge {
        endpoints: Vec<KeyPath>,
        operators: Vec<Spanned<EdgeOp>>,
    },
}

/// One statement of a D2 map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: Subject,
    pub value: Option<Spanned<String>>,
    pub block: Option<Block>,
    pub span: Span,
}

/// A `{ ... }` map with the span of its opening brace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub open: Span,
}
