//! Lexical analysis of D2 text.
//!
//! [`tokenize`] turns source text into [`PositionedToken`]s, recovering after
//! each bad character so every lexical problem is reported in one pass.

use winnow::{
    Parser as _,
    combinator::{alt, cut_err, peek, preceded, repeat, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, none_of, one_of, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Diagnostic details attached to winnow errors through `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<'a, O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse an escape inside a double-quoted string.
fn string_escape<'a>(input: &mut Input<'a>) -> IResult<'a, char> {
    let escape_start = input.current_token_start();

    preceded(
        '\\',
        cut_err(one_of(['n', 't', '\\', '"']).map(|c| match c {
            'n' => '\n',
            't' => '\t',
            other => other,
        }))
        .context(LexerDiagnostic {
            code: ErrorCode::E003,
            message: "invalid escape sequence",
            help: Some("valid escapes: `\\n`, `\\t`, `\\\\`, `\\\"`"),
            start: escape_start,
        }),
    )
    .parse_next(input)
}

/// Parse a double-quoted string, resolving escapes.
fn double_quoted<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start = input.current_token_start();

    let content = repeat(0.., alt((string_escape, none_of(['"', '\\', '\n', '\r'])))).fold(
        String::new,
        |mut acc, ch| {
            acc.push(ch);
            acc
        },
    );

    preceded(
        '"',
        cut_err(terminated(content, '"')).context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("add closing `\"`"),
            start,
        }),
    )
    .map(Token::StringLiteral)
    .parse_next(input)
}

/// Parse a single-quoted string; its content is taken verbatim.
fn single_quoted<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start = input.current_token_start();

    preceded(
        '\'',
        cut_err(terminated(
            take_while(0.., |c: char| c != '\'' && c != '\n'),
            '\'',
        ))
        .context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("add closing `'`"),
            start,
        }),
    )
    .map(|content: &str| Token::StringLiteral(content.to_string()))
    .parse_next(input)
}

/// Parse a `#` comment up to the end of the line.
fn comment<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    preceded('#', take_while(0.., |c| c != '\n'))
        .map(Token::Comment)
        .parse_next(input)
}

/// Parse connection operators, longest first.
fn operator<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        literal("<->").value(Token::DoubleArrow),
        literal("->").value(Token::Arrow),
        literal("<-").value(Token::LeftArrow),
        literal("--").value(Token::Undirected),
    ))
    .parse_next(input)
}

/// The part of a word after its first character.
///
/// A `-` belongs to the word only when another word character follows, so
/// `stroke-width` is one word while `a--b` and `a->b` are not.
fn word_tail<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    repeat(
        0..,
        alt((
            take_while(1.., is_word_char).void(),
            ('-', peek(one_of(is_word_char))).void(),
        )),
    )
    .parse_next(input)
}

/// Parse a bare word.
fn word<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    (one_of(is_word_char), word_tail)
        .take()
        .map(Token::Word)
        .parse_next(input)
}

fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        '.'.value(Token::Dot),
        ':'.value(Token::Colon),
        ';'.value(Token::Semicolon),
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
    ))
    .parse_next(input)
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt(("\r\n", "\n")).value(Token::Newline).parse_next(input)
}

/// Parse whitespace other than line breaks.
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n' && c != '\r')
        .map(Token::Whitespace)
        .parse_next(input)
}

/// Parse a single token with position tracking.
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<'a, PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        comment,
        double_quoted,
        single_quoted,
        operator, // Must come before words and single chars
        word,
        single_char_token,
        newline, // Must come before whitespace
        whitespace,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(token) => self.tokens.push(token),
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.emit(Self::convert_err_mode(e, error_pos));
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        self.diagnostics.finish().map(|_warnings| self.tokens)
    }

    /// Convert a winnow error into a diagnostic, falling back to E002 when
    /// no [`LexerDiagnostic`] context was attached.
    fn convert_err_mode(
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(Span::new(*start..error_pos), code.description());
            if let Some(help) = help {
                diag = diag.with_help(*help);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Tokenize D2 text, collecting every lexical error.
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let mut lexer = Lexer::new();
    lexer.tokenize(LocatingSlice::new(input));
    lexer.finish()
}
