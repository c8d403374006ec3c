//! # Cartograph Parser
//!
//! Reader for the subset of D2 that Cartograph generates. It turns diagram
//! text into a [`Document`] of shapes, containers, classes and connections so
//! the text can be checked and measured without the `d2` tool.
//!
//! ## Usage
//!
//! ```
//! # use cartograph_parser::{parse, ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"
//! direction: down
//! user: "User"
//! api: "API" { shape: hexagon }
//! user -> api: "calls"
//! "#;
//!
//!     let document = parse(source)?;
//!     assert_eq!(document.connections().len(), 1);
//!     Ok(())
//! }
//! ```

mod document;
mod elaborate;
pub mod error;
mod lexer;
mod parser;
mod parser_types;
mod span;
mod tokens;

pub use document::{Arrowhead, ClassDef, Connection, Document, ShapeDecl, StyleMap};
pub use error::ParseError;
pub use parser_types::EdgeOp;
pub use span::{Span, Spanned};

use log::{debug, trace};

use elaborate::Builder;

/// Parse D2 source text into a [`Document`].
///
/// The pipeline runs in three phases:
///
/// 1. **Tokenize** - split the text into tokens, reporting every bad character
/// 2. **Parse** - build key, value and block statements
/// 3. **Elaborate** - resolve shapes and attributes, checking keyword values
///
/// # Errors
///
/// Returns a [`ParseError`] holding every error diagnostic of the first
/// failing phase. Warnings of a successful read are available through
/// [`Document::warnings`].
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let tokens = lexer::tokenize(source)?;
    trace!(tokens = tokens.len(); "Tokenized D2 source");

    let statements = parser::build_document(&tokens)?;
    trace!(statements = statements.len(); "Parsed D2 statements");

    let document = Builder::new().build(&statements)?;
    debug!(
        shapes = document.shapes().count(),
        connections = document.connections().len(),
        warnings = document.warnings().len();
        "Read D2 document"
    );
    Ok(document)
}
