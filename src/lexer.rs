use std::fmt;

use crate::source::{Diagnostic, Position, SourceCursor};
use crate::token::{Keyword, Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A quoted string hit a line break or end of input before its
    /// closing quote.
    UnterminatedString { quote: char },
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString { quote } => {
                write!(f, "unterminated string constant, expected closing {quote}")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", diagnostic.line, diagnostic.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub diagnostic: Diagnostic,
}

/// Tokenize a rule source string into a sequence of tokens.
///
/// # Errors
///
/// Returns `LexError` on an unterminated quoted string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).collect()
}

/// Space separators skipped between tokens. Line breaks are tokens and
/// are not part of this set.
const fn is_horizontal_space(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '\t'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

const fn is_line_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n')
}

const fn ends_word(ch: char) -> bool {
    is_horizontal_space(ch) || is_line_break(ch) || matches!(ch, ';' | '{' | '}')
}

/// Pull-based tokenizer over a [`SourceCursor`].
///
/// Holds no state between tokens other than the cursor position.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    cursor: SourceCursor<'a>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            cursor: SourceCursor::new(input),
        }
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.cursor.position()
    }

    /// Build a diagnostic anchored at `at`.
    #[must_use]
    pub fn fail(&self, message: impl Into<String>, at: Position) -> Diagnostic {
        self.cursor.fail(message, Some(at.line), Some(at.column))
    }

    /// Read the next token, or `None` once the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `LexError` on an unterminated quoted string.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(ch) = self.cursor.peek(0) else {
            return Ok(None);
        };
        let start = self.cursor.position();

        let (kind, value) = match ch {
            '\'' | '"' => (TokenKind::String, self.read_string(ch, start)?),
            '#' => (TokenKind::Comment, self.read_comment()),
            ';' => self.single(TokenKind::ExpressEnd),
            '{' => self.single(TokenKind::BlockStart),
            '}' => self.single(TokenKind::BlockEnd),
            '\r' | '\n' => self.single(TokenKind::LineTerminal),
            '=' if self.cursor.peek(1) == Some('>') => {
                self.cursor.next();
                self.cursor.next();
                (TokenKind::Arrow, "=>".to_string())
            }
            _ => {
                let word = self.read_word();
                let kind = Keyword::from_word(&word).map_or(TokenKind::Word, TokenKind::Keyword);
                (kind, word)
            }
        };

        let token = Token {
            kind,
            value,
            span: Span {
                start,
                end: self.cursor.position(),
            },
        };
        tracing::trace!(kind = %token.kind, value = %token.value, line = start.line, "token");

        Ok(Some(token))
    }

    fn single(&mut self, kind: TokenKind) -> (TokenKind, String) {
        let value = self.cursor.next().map(String::from).unwrap_or_default();
        (kind, value)
    }

    fn skip_whitespace(&mut self) {
        while self.cursor.peek(0).is_some_and(is_horizontal_space) {
            self.cursor.next();
        }
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.cursor.peek(0) {
            if !keep(ch) {
                break;
            }
            out.push(ch);
            self.cursor.next();
        }
        out
    }

    fn read_comment(&mut self) -> String {
        self.read_while(|ch| !is_line_break(ch))
    }

    fn read_word(&mut self) -> String {
        self.read_while(|ch| !ends_word(ch))
    }

    fn read_string(&mut self, quote: char, start: Position) -> Result<String, LexError> {
        self.cursor.next(); // opening quote

        let mut value = String::new();
        loop {
            match self.cursor.next() {
                Some(ch) if ch == quote => return Ok(value),
                Some('\\') => match self.cursor.peek(0) {
                    Some(escaped) if !is_line_break(escaped) => {
                        value.push(escaped);
                        self.cursor.next();
                    }
                    _ => return Err(self.unterminated(quote, start)),
                },
                Some(ch) if !is_line_break(ch) => value.push(ch),
                _ => return Err(self.unterminated(quote, start)),
            }
        }
    }

    fn unterminated(&self, quote: char, start: Position) -> LexError {
        let kind = LexErrorKind::UnterminatedString { quote };
        LexError {
            diagnostic: self.fail(kind.to_string(), start),
            kind,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
