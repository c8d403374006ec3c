//! Parser for D2 tokens.
//!
//! Transforms the token stream from the [`lexer`](super::lexer) into the
//! statements of [`parser_types`](super::parser_types). The entry point is
//! [`build_document`].

use winnow::{
    Parser as _,
    combinator::repeat,
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use crate::{
    error::{Diagnostic, ErrorCode},
    parser_types::{Block, EdgeOp, KeyPath, Statement, Subject},
    span::{Span, Spanned},
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what was expected
    Label(&'static str),
    /// A block whose closing brace never arrived, with its opening brace
    Unclosed(Span),
}

type Input<'src> = TokenSlice<'src, PositionedToken<'src>>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// Helper to create a Cut error carrying a label
fn cut_error(label: &'static str) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::Label(label));
    ErrMode::Cut(e)
}

/// Parse one whitespace or comment token
fn trivia<'src>(input: &mut Input<'src>) -> IResult<()> {
    any.verify(|token: &PositionedToken<'_>| token.token.is_trivia())
        .void()
        .parse_next(input)
}

/// Parse zero or more whitespace/comments
fn trivia0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(0.., trivia).parse_next(input)
}

/// Parse a statement separator: newline, `;` or trivia
fn separator<'src>(input: &mut Input<'src>) -> IResult<()> {
    any.verify(|token: &PositionedToken<'_>| {
        token.token.is_trivia() || matches!(token.token, Token::Newline | Token::Semicolon)
    })
    .void()
    .parse_next(input)
}

fn separators0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(0.., separator).parse_next(input)
}

/// Returns `true` when the next token is `}` or the input is exhausted.
fn at_block_end(input: &Input<'_>) -> bool {
    match input.peek_token() {
        None => true,
        Some(token) => matches!(token.token, Token::RightBrace),
    }
}

/// Parse a single key: a bare word or a quoted string
fn key<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::Word(word) => Some(Spanned::new(word.to_string(), token.span)),
        Token::StringLiteral(s) => Some(Spanned::new(s.clone(), token.span)),
        _ => None,
    })
    .context(Context::Label("key"))
    .parse_next(input)
}

/// Parse a dotted key path: `a.b.c`
fn key_path<'src>(input: &mut Input<'src>) -> IResult<KeyPath> {
    let mut segments = vec![key.parse_next(input)?];

    loop {
        let checkpoint = input.checkpoint();
        let dot = any::<_, ErrMode<ContextError<Context>>>
            .verify(|token: &PositionedToken<'_>| matches!(token.token, Token::Dot))
            .parse_next(input);

        match dot {
            Ok(_) => match key.parse_next(input) {
                Ok(segment) => segments.push(segment),
                Err(_) => return Err(cut_error("key after `.`")),
            },
            Err(_) => {
                input.reset(&checkpoint);
                break;
            }
        }
    }

    Ok(KeyPath::new(segments))
}

/// Parse a connection operator
fn edge_op<'src>(input: &mut Input<'src>) -> IResult<Spanned<EdgeOp>> {
    any.verify_map(|token: &PositionedToken<'_>| {
        let op = match token.token {
            Token::Arrow => EdgeOp::Forward,
            Token::LeftArrow => EdgeOp::Backward,
            Token::DoubleArrow => EdgeOp::Both,
            Token::Undirected => EdgeOp::Undirected,
            _ => return None,
        };
        Some(Spanned::new(op, token.span))
    })
    .context(Context::Label("connection operator"))
    .parse_next(input)
}

/// Parse a key path or a connection chain
fn subject<'src>(input: &mut Input<'src>) -> IResult<Subject> {
    let first = key_path.parse_next(input)?;
    let mut endpoints = vec![first];
    let mut operators = Vec::new();

    loop {
        let checkpoint = input.checkpoint();
        trivia0.parse_next(input)?;
        match edge_op.parse_next(input) {
            Ok(op) => {
                operators.push(op);
                trivia0.parse_next(input)?;
                let endpoint = key_path
                    .parse_next(input)
                    .map_err(|_| cut_error("connection target"))?;
                endpoints.push(endpoint);
            }
            Err(ErrMode::Backtrack(_)) => {
                input.reset(&checkpoint);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    if operators.is_empty() {
        let path = endpoints.remove(0);
        Ok(Subject::Key(path))
    } else {
        Ok(Subject::Edge {
            endpoints,
            operators,
        })
    }
}

/// Parse a scalar value: a quoted string or unquoted text up to the end of
/// the statement
fn scalar<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    if let Some(token) = input.peek_token() {
        if let Token::StringLiteral(s) = &token.token {
            let value = Spanned::new(s.clone(), token.span);
            input.next_token();
            return Ok(value);
        }
    }

    let mut text = String::new();
    let mut span: Option<Span> = None;
    loop {
        let Some(token) = input.peek_token() else {
            break;
        };
        let piece = match &token.token {
            Token::Word(word) => *word,
            Token::Whitespace(ws) => *ws,
            Token::Dot => ".",
            _ => break,
        };
        if !matches!(token.token, Token::Whitespace(_)) {
            span = Some(span.map_or(token.span, |s| s.union(token.span)));
        }
        text.push_str(piece);
        input.next_token();
    }

    match span {
        Some(span) => Ok(Spanned::new(text.trim_end().to_string(), span)),
        None => {
            let mut e = ContextError::new();
            e.push(Context::Label("value"));
            Err(ErrMode::Backtrack(e))
        }
    }
}

/// Parse a `{ ... }` block
fn block<'src>(input: &mut Input<'src>) -> IResult<Block> {
    let open = any
        .verify(|token: &PositionedToken<'_>| matches!(token.token, Token::LeftBrace))
        .context(Context::Label("`{`"))
        .parse_next(input)?;
    let open = open.span;

    let statements = statements.parse_next(input)?;

    match input.peek_token() {
        Some(token) if matches!(token.token, Token::RightBrace) => {
            input.next_token();
            Ok(Block { statements, open })
        }
        _ => {
            let mut e = ContextError::new();
            e.push(Context::Unclosed(open));
            Err(ErrMode::Cut(e))
        }
    }
}

/// Parse one statement
fn statement<'src>(input: &mut Input<'src>) -> IResult<Statement> {
    let subject = subject.parse_next(input)?;
    let mut span = match &subject {
        Subject::Key(path) => path.span(),
        Subject::Edge { endpoints, .. } => endpoints
            .iter()
            .map(KeyPath::span)
            .reduce(Span::union)
            .unwrap_or_default(),
    };

    trivia0.parse_next(input)?;

    let mut value = None;
    let mut body = None;
    let is_colon = input
        .peek_token()
        .is_some_and(|token| matches!(token.token, Token::Colon));
    if is_colon {
        input.next_token();
        trivia0.parse_next(input)?;

        match scalar.parse_next(input) {
            Ok(scalar) => {
                span = span.union(scalar.span());
                value = Some(scalar);
                trivia0.parse_next(input)?;
            }
            Err(ErrMode::Backtrack(_)) => {}
            Err(e) => return Err(e),
        }

        let is_block = input
            .peek_token()
            .is_some_and(|token| matches!(token.token, Token::LeftBrace));
        if is_block {
            let parsed = block.parse_next(input)?;
            span = span.union(parsed.open);
            body = Some(parsed);
            trivia0.parse_next(input)?;
        }

        if value.is_none() && body.is_none() {
            return Err(cut_error("value or `{` after `:`"));
        }
    }

    // A statement ends at a newline, `;`, `}` or the end of input
    match input.peek_token() {
        None => {}
        Some(token)
            if matches!(
                token.token,
                Token::Newline | Token::Semicolon | Token::RightBrace
            ) => {}
        Some(_) => return Err(cut_error("newline or `;` after statement")),
    }

    Ok(Statement {
        subject,
        value,
        block: body,
        span,
    })
}

/// Parse statements until `}` or the end of input
fn statements<'src>(input: &mut Input<'src>) -> IResult<Vec<Statement>> {
    let mut parsed = Vec::new();
    loop {
        separators0.parse_next(input)?;
        if at_block_end(input) {
            return Ok(parsed);
        }
        parsed.push(statement.parse_next(input)?);
    }
}

/// Parse a complete document
fn document<'src>(input: &mut Input<'src>) -> IResult<Vec<Statement>> {
    let parsed = statements.parse_next(input)?;
    if !input.is_empty() {
        return Err(cut_error("statement, found unmatched `}`"));
    }
    Ok(parsed)
}

/// Converts a parser error into a diagnostic.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken],
    current_remaining: usize,
) -> Diagnostic {
    let context = match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    let end_of_input = tokens.last().map(|t| t.span.end()).unwrap_or(0);
    let eof_span = Span::new(end_of_input..end_of_input);

    if let Some(open) = context.context().find_map(|ctx| match ctx {
        Context::Unclosed(open) => Some(*open),
        Context::Label(_) => None,
    }) {
        return Diagnostic::error("unclosed block")
            .with_code(ErrorCode::E101)
            .with_label(eof_span, "input ends before `}`")
            .with_secondary_label(open, "block opened here")
            .with_help("add the missing `}`");
    }

    let expected: Vec<&str> = context
        .context()
        .filter_map(|ctx| match ctx {
            Context::Label(label) => Some(*label),
            Context::Unclosed(_) => None,
        })
        .collect();

    // The first meaningful token at or after the failure point
    let position = tokens.len().saturating_sub(current_remaining);
    let found = tokens[position.min(tokens.len())..]
        .iter()
        .find(|t| !t.token.is_trivia() && !matches!(t.token, Token::Newline));

    let message = if expected.is_empty() {
        "unexpected token".to_string()
    } else {
        format!("unexpected token: expected {}", expected.join(" or "))
    };

    match found {
        Some(token) => Diagnostic::error(message)
            .with_code(ErrorCode::E100)
            .with_label(token.span, ErrorCode::E100.description()),
        None => Diagnostic::error(message)
            .with_code(ErrorCode::E101)
            .with_label(eof_span, "unexpected end of input"),
    }
}

/// Build the statement list of a document from tokens
pub fn build_document<'src>(
    tokens: &'src [PositionedToken<'src>],
) -> Result<Vec<Statement>, Diagnostic> {
    let mut token_slice = TokenSlice::new(tokens);

    match document.parse_next(&mut token_slice) {
        Ok(statements) => Ok(statements),
        Err(e) => {
            let current_remaining = token_slice.eof_offset();
            Err(convert_error(e, tokens, current_remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(input: &str) -> Result<Vec<Statement>, Diagnostic> {
        let tokens = tokenize(input).expect("input should tokenize");
        build_document(&tokens)
    }

    fn key_text(statement: &Statement) -> String {
        match &statement.subject {
            Subject::Key(path) => path.to_string(),
            Subject::Edge { .. } => panic!("expected a key statement"),
        }
    }

    #[test]
    fn test_key_with_value() {
        let statements = parse("direction: down").unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(key_text(&statements[0]), "direction");
        assert_eq!(statements[0].value.as_ref().unwrap().inner(), "down");
    }

    #[test]
    fn test_dotted_key_and_quoted_value() {
        let statements = parse(r##"a.style.fill: "#e3f2fd""##).unwrap();
        assert_eq!(key_text(&statements[0]), "a.style.fill");
        assert_eq!(statements[0].value.as_ref().unwrap().inner(), "#e3f2fd");
    }

    #[test]
    fn test_unquoted_value_keeps_inner_spaces() {
        let statements = parse("x: hello big world   \n").unwrap();
        assert_eq!(
            statements[0].value.as_ref().unwrap().inner(),
            "hello big world"
        );
    }

    #[test]
    fn test_nested_blocks() {
        let input = "grp: {\n  a: \"A\" {\n    class: role_service\n  }\n  b\n}\n";
        let statements = parse(input).unwrap();
        assert_eq!(statements.len(), 1);
        let block = statements[0].block.as_ref().unwrap();
        assert_eq!(block.statements.len(), 2);
        let inner = block.statements[0].block.as_ref().unwrap();
        assert_eq!(inner.statements.len(), 1);
        assert_eq!(block.statements[0].value.as_ref().unwrap().inner(), "A");
    }

    #[test]
    fn test_connection_chain() {
        let statements = parse("a -> b.c <- d: uses").unwrap();
        match &statements[0].subject {
            Subject::Edge {
                endpoints,
                operators,
            } => {
                assert_eq!(endpoints.len(), 3);
                assert_eq!(endpoints[1].to_string(), "b.c");
                assert_eq!(*operators[0].inner(), EdgeOp::Forward);
                assert_eq!(*operators[1].inner(), EdgeOp::Backward);
            }
            Subject::Key(_) => panic!("expected a connection"),
        }
        assert_eq!(statements[0].value.as_ref().unwrap().inner(), "uses");
    }

    #[test]
    fn test_semicolons_and_comments_separate() {
        let statements = parse("# header\na; b # trailing\n\nc").unwrap();
        assert_eq!(statements.len(), 3);
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("grp: {\n  a\n").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));
        assert_eq!(err.labels().len(), 2);
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = parse("a\n}\n").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_missing_connection_target() {
        let err = parse("a -> : x").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E100));
        assert!(err.message().contains("connection target"));
    }

    #[test]
    fn test_colon_without_value() {
        let err = parse("a:\nb").unwrap_err();
        assert!(err.message().contains("value"));
    }
}
