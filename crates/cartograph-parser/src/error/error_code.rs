//! Error codes for D2 reader diagnostics.
//!
//! Codes are grouped by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E3xx` - Elaboration errors

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    E001,

    /// Unexpected character.
    E002,

    /// Invalid escape sequence in a double-quoted string.
    ///
    /// Valid escapes are `\n`, `\t`, `\\` and `\"`.
    E003,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    E100,

    /// Incomplete input, typically a block missing its closing `}`.
    E101,

    // =========================================================================
    // Elaboration Errors (E3xx)
    // =========================================================================
    /// A reserved keyword is used where it has no meaning, such as `shape`
    /// at the top level or as a connection endpoint.
    E300,

    /// Unknown style keyword.
    E301,

    /// Unknown shape.
    E302,

    /// Invalid attribute value.
    E303,

    /// Unknown arrowhead shape.
    E304,

    /// Reference to a class missing from the `classes` map.
    E305,
}

impl ErrorCode {
    /// Short description used as the default label text.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "invalid escape",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E300 => "misplaced keyword",
            ErrorCode::E301 => "unknown style keyword",
            ErrorCode::E302 => "unknown shape",
            ErrorCode::E303 => "invalid value",
            ErrorCode::E304 => "unknown arrowhead",
            ErrorCode::E305 => "undefined class",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
