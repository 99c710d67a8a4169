use std::fmt;

use regex::Regex;

use crate::Error;
use crate::ast::{
    BlockKind, CallExpression, DomainBlock, LocationBlock, LocationPattern, SimpleRule, Statement,
    Unit, VariableDeclaration, VariableValue,
};
use crate::lexer::Lexer;
use crate::source::{Diagnostic, Position};
use crate::token::{Keyword, Token, TokenKind};

/// Which family of fatal condition a parse error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed statement or block header.
    Syntax,
    /// A block opened at the wrong scope depth.
    Nesting,
}

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A block header without the name token its kind requires.
    UnexpectedBlock { expected: Option<BlockKind> },
    /// `child` opened directly inside `parent`.
    Nesting { child: BlockKind, parent: BlockKind },
    /// A `=>` statement that is not `left => right`.
    SimpleRule { found: usize },
    /// `location ~ {` without a pattern.
    MissingRegexPattern,
    /// The `~` pattern does not compile.
    InvalidRegex { pattern: String, reason: String },
    /// `set` without both a name and a value.
    IncompleteVariable,
    /// `}` at global scope.
    UnmatchedBlockEnd,
}

impl ParseErrorKind {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnexpectedBlock { .. } | Self::Nesting { .. } => ErrorClass::Nesting,
            Self::SimpleRule { .. }
            | Self::MissingRegexPattern
            | Self::InvalidRegex { .. }
            | Self::IncompleteVariable
            | Self::UnmatchedBlockEnd => ErrorClass::Syntax,
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedBlock {
                expected: Some(kind),
            } => {
                write!(f, "unexpected block declaration, expected {kind}")
            }
            Self::UnexpectedBlock { expected: None } => {
                write!(
                    f,
                    "unexpected block declaration, {} cannot contain blocks",
                    BlockKind::Location
                )
            }
            Self::Nesting { child, parent } => match child.parent() {
                Some(required) => {
                    write!(f, "{child} should be wrapped in {required}, found {parent}")
                }
                None => write!(f, "{child} cannot be nested"),
            },
            Self::SimpleRule { found } => {
                write!(
                    f,
                    "simple rule syntax error, expected `source => target`, \
                     got {found} token(s)"
                )
            }
            Self::MissingRegexPattern => {
                write!(f, "missing regular expression after `~`")
            }
            Self::InvalidRegex { pattern, reason } => {
                write!(f, "invalid regular expression `{pattern}`: {reason}")
            }
            Self::IncompleteVariable => {
                write!(f, "`set` needs a variable name and a value")
            }
            Self::UnmatchedBlockEnd => {
                write!(f, "unexpected '}}' outside of any block")
            }
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", diagnostic.line, diagnostic.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub diagnostic: Diagnostic,
}

/// Parse a rule source string into its global block.
///
/// # Errors
///
/// Returns `Error::Lex` on lexical errors and `Error::Parse` on
/// malformed statements or misplaced blocks.
pub fn parse(input: &str) -> Result<Unit, Error> {
    Parser::new(input).parse_unit()
}

/// Tokens of one statement plus whatever closed it.
struct Run {
    tokens: Vec<Token>,
    terminator: Option<Token>,
}

/// Recursive-descent parser pulling tokens from a [`Lexer`].
///
/// The lexer is the only mutable state; scope depth lives in the
/// recursion.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self::from_lexer(Lexer::new(input))
    }

    #[must_use]
    pub const fn from_lexer(lexer: Lexer<'a>) -> Self {
        Self { lexer }
    }

    /// Parse the whole input as the global block.
    ///
    /// # Errors
    ///
    /// Returns the first lexical, syntax, or nesting error.
    pub fn parse_unit(mut self) -> Result<Unit, Error> {
        let body = self.parse_block_body(BlockKind::Global)?;
        Ok(Unit { body })
    }

    fn parse_block_body(&mut self, parent: BlockKind) -> Result<Vec<Statement>, Error> {
        let mut body = Vec::new();

        loop {
            let Run {
                mut tokens,
                terminator,
            } = self.read_statement_run()?;
            tokens.retain(|t| t.kind != TokenKind::Comment);

            let Some(terminator) = terminator else {
                // end of input closes every open scope
                body.extend(self.parse_call(tokens)?);
                return Ok(body);
            };

            match terminator.kind {
                TokenKind::BlockStart => {
                    body.push(self.parse_block(tokens, &terminator, parent)?);
                }
                TokenKind::BlockEnd => {
                    if parent == BlockKind::Global {
                        return Err(self.error(
                            ParseErrorKind::UnmatchedBlockEnd,
                            terminator.span.start,
                        ));
                    }
                    body.extend(self.parse_call(tokens)?);
                    return Ok(body);
                }
                _ => body.extend(self.parse_call(tokens)?),
            }
        }
    }

    fn read_statement_run(&mut self) -> Result<Run, Error> {
        let mut tokens = Vec::new();

        while let Some(token) = self.lexer.next_token()? {
            if token.kind.is_terminator() {
                return Ok(Run {
                    tokens,
                    terminator: Some(token),
                });
            }
            tokens.push(token);
        }

        Ok(Run {
            tokens,
            terminator: None,
        })
    }

    fn parse_block(
        &mut self,
        header: Vec<Token>,
        brace: &Token,
        parent: BlockKind,
    ) -> Result<Statement, Error> {
        let unexpected = ParseErrorKind::UnexpectedBlock {
            expected: parent.child(),
        };

        let Some(first) = header.first() else {
            return Err(self.error(unexpected, brace.span.start));
        };
        let at = first.span.start;

        if header.len() < 2 {
            return Err(self.error(unexpected, at));
        }

        if first.is_keyword(Keyword::Location) {
            self.check_nesting(BlockKind::Location, parent, at)?;
            let location = self.location_pattern(&header)?;
            tracing::debug!(location = location.as_str(), line = at.line, "location block");

            let body = self.parse_block_body(BlockKind::Location)?;
            return Ok(Statement::Location(LocationBlock { location, body }));
        }

        // `domain a.com {` or `a.com => {`, never both
        let names = match header.iter().position(|t| t.kind == TokenKind::Arrow) {
            Some(arrow) if arrow == header.len() - 1 && !first.is_keyword(Keyword::Domain) => {
                &header[..arrow]
            }
            Some(_) => return Err(self.error(unexpected, at)),
            None => &header[1..],
        };

        self.check_nesting(BlockKind::Domain, parent, at)?;

        let domains = split_domains(names);
        if domains.is_empty() {
            return Err(self.error(unexpected, at));
        }
        tracing::debug!(?domains, line = at.line, "domain block");

        let body = self.parse_block_body(BlockKind::Domain)?;
        Ok(Statement::Domain(DomainBlock { domains, body }))
    }

    fn location_pattern(&self, header: &[Token]) -> Result<LocationPattern, Error> {
        let marker = &header[1];
        if marker.value != "~" {
            return Ok(LocationPattern::Path(marker.value.clone()));
        }

        let Some(pattern) = header.get(2) else {
            return Err(self.error(ParseErrorKind::MissingRegexPattern, marker.span.end));
        };

        Regex::new(&regex_source(&pattern.value))
            .map(LocationPattern::Regex)
            .map_err(|e| {
                self.error(
                    ParseErrorKind::InvalidRegex {
                        pattern: pattern.value.clone(),
                        reason: e.to_string(),
                    },
                    pattern.span.start,
                )
            })
    }

    /// Interpret one statement's tokens.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` for a malformed simple rule or `set`.
    pub fn parse_call(&self, tokens: Vec<Token>) -> Result<Option<Statement>, Error> {
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        let at = first.span.start;

        if tokens.iter().any(|t| t.value == "=>") {
            let found = tokens.len();
            return match <[Token; 3]>::try_from(tokens) {
                Ok([left, arrow, right]) if arrow.value == "=>" => {
                    Ok(Some(Statement::Rule(SimpleRule { left, right })))
                }
                _ => Err(self.error(ParseErrorKind::SimpleRule { found }, at)),
            };
        }

        let mut tokens = tokens.into_iter();
        let Some(head) = tokens.next() else {
            return Ok(None);
        };

        if head.value == Keyword::Set.as_str() {
            let (Some(id), value) = (tokens.next(), tokens.collect::<Vec<_>>()) else {
                return Err(self.error(ParseErrorKind::IncompleteVariable, at));
            };
            let value = match <[Token; 1]>::try_from(value) {
                Ok([single]) => VariableValue::Scalar(single),
                Err(list) if list.is_empty() => {
                    return Err(self.error(ParseErrorKind::IncompleteVariable, at));
                }
                Err(list) => VariableValue::List(list),
            };
            return Ok(Some(Statement::Variable(VariableDeclaration {
                id: id.value,
                value,
            })));
        }

        Ok(Some(Statement::Call(CallExpression {
            directive: head.value,
            arguments: tokens.collect(),
        })))
    }

    /// Require `child` to sit exactly one level below `parent`.
    fn check_nesting(&self, child: BlockKind, parent: BlockKind, at: Position) -> Result<(), Error> {
        if child.depth() == parent.depth() + 1 {
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::Nesting { child, parent }, at))
        }
    }

    fn error(&self, kind: ParseErrorKind, at: Position) -> Error {
        let diagnostic = self.lexer.fail(kind.to_string(), at);
        Error::Parse(ParseError { kind, diagnostic })
    }
}

/// Split header tokens into host names on commas and whitespace.
fn split_domains(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|t| t.value.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn a `~` location token into regex source.
///
/// Bare `/` is a literal path separator and is escaped. A literal of the
/// form `/body/flags` has its delimiters stripped and its flags inlined.
fn regex_source(raw: &str) -> String {
    match split_flagged_literal(raw) {
        Some((body, flags)) => format!("(?{flags}){}", escape_slashes(body)),
        None => escape_slashes(raw),
    }
}

fn split_flagged_literal(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);

    let valid = !body.is_empty()
        && !flags.is_empty()
        && flags.chars().all(|c| matches!(c, 'i' | 'm' | 's' | 'x'));
    valid.then_some((body, flags))
}

fn escape_slashes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;

    for ch in pattern.chars() {
        if ch == '/' && !escaped {
            out.push('\\');
        }
        out.push(ch);
        escaped = ch == '\\' && !escaped;
    }

    out
}
