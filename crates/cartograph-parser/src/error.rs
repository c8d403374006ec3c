//! Error and diagnostic system for the D2 reader.
//!
//! Every phase (lexing, parsing, elaboration) reports problems as
//! [`Diagnostic`]s carrying an [`ErrorCode`], labeled spans and optional help.
//! A failing phase returns them wrapped in a [`ParseError`].
//!
//! # Example
//!
//! ```
//! # use cartograph_parser::error::{Diagnostic, ErrorCode};
//! # use cartograph_parser::Span;
//!
//! let diag = Diagnostic::error("unknown style keyword `colour`")
//!     .with_code(ErrorCode::E301)
//!     .with_label(Span::new(40..46), "not a style keyword")
//!     .with_help("did you mean `font-color`?");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
