use crate::span::Span;

/// Lexical tokens of the D2 subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// A bare word: a key, or one piece of an unquoted value.
    Word(&'a str),
    /// A double-quoted string with escapes resolved.
    StringLiteral(String),
    /// `# ...` up to the end of the line.
    Comment(&'a str),
    Whitespace(&'a str),
    Newline,

    /// `->`
    Arrow,
    /// `<-`
    LeftArrow,
    /// `<->`
    DoubleArrow,
    /// `--`
    Undirected,

    Dot,
    Colon,
    Semicolon,
    LeftBrace,
    RightBrace,
}

impl Token<'_> {
    /// Tokens that never carry meaning between statements.
    pub fn is_trivia(&self) -> bool {
        matches!(self, Token::Whitespace(_) | Token::Comment(_))
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken<'a> {
    pub token: Token<'a>,
    pub span: Span,
}

impl<'a> PositionedToken<'a> {
    pub fn new(token: Token<'a>, span: Span) -> Self {
        Self { token, span }
    }
}
