use std::fmt;

use crate::source::Position;

/// Source range covered by a token, start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Reserved words of the rule language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Set,
    Domain,
    Location,
}

impl Keyword {
    /// Look up a word in the keyword table.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "set" => Some(Self::Set),
            "domain" => Some(Self::Domain),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Domain => "domain",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Unquoted word.
    Word,
    /// One of `set`, `domain`, `location`.
    Keyword(Keyword),
    /// Single- or double-quoted string, quotes and escapes removed.
    String,
    /// Comment (`# ...`), up to but excluding the line break.
    Comment,
    /// `;`
    ExpressEnd,
    /// `{`
    BlockStart,
    /// `}`
    BlockEnd,
    /// A single `\r` or `\n`.
    LineTerminal,
    /// `=>`
    Arrow,
}

impl TokenKind {
    /// Kinds that close a statement run.
    #[must_use]
    pub const fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::ExpressEnd | Self::LineTerminal | Self::BlockStart | Self::BlockEnd
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Word => "word",
            Self::Keyword(_) => "keyword",
            Self::String => "string",
            Self::Comment => "comment",
            Self::ExpressEnd => "express_end",
            Self::BlockStart => "block_start",
            Self::BlockEnd => "block_end",
            Self::LineTerminal => "line_terminal",
            Self::Arrow => "arrow",
        };
        f.write_str(name)
    }
}

/// A single token with its kind, literal value, and source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}
