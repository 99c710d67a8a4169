use std::fmt;

use regex::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::token::Token;

/// The three scope levels, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Global,
    Domain,
    Location,
}

impl BlockKind {
    /// Position in the fixed Global -> Domain -> Location order.
    #[must_use]
    pub const fn depth(self) -> usize {
        match self {
            Self::Global => 0,
            Self::Domain => 1,
            Self::Location => 2,
        }
    }

    /// The kind that may be opened directly inside this one.
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Global => Some(Self::Domain),
            Self::Domain => Some(Self::Location),
            Self::Location => None,
        }
    }

    /// The kind that must directly enclose this one.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Global => None,
            Self::Domain => Some(Self::Global),
            Self::Location => Some(Self::Domain),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Global => "GlobalBlock",
            Self::Domain => "DomainBlock",
            Self::Location => "LocationBlock",
        };
        f.write_str(name)
    }
}

/// A whole compilation unit: the implicit global block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unit {
    pub body: Vec<Statement>,
}

/// One entry of a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Domain(DomainBlock),
    Location(LocationBlock),
    Call(CallExpression),
    Variable(VariableDeclaration),
    Rule(SimpleRule),
}

/// `domain a.com {` or `a.com, b.com => {`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBlock {
    /// One entry per host name in the header.
    pub domains: Vec<String>,
    pub body: Vec<Statement>,
}

/// `location /path {` or `location ~ pattern {`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationBlock {
    pub location: LocationPattern,
    pub body: Vec<Statement>,
}

/// What a location block matches on.
#[derive(Debug)]
pub enum LocationPattern {
    /// Literal path prefix, kept verbatim.
    Path(String),
    /// Compiled `~` pattern.
    Regex(Regex),
}

impl LocationPattern {
    /// The path, or the regex source for `~` locations.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Regex(re) => re.as_str(),
        }
    }

    #[must_use]
    pub const fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }
}

// Copies of a multi-host domain each get a regex compiled from the
// same source.
impl Clone for LocationPattern {
    fn clone(&self) -> Self {
        match self {
            Self::Path(path) => Self::Path(path.clone()),
            Self::Regex(re) => Self::Regex(Regex::new(re.as_str()).unwrap_or_else(|_| re.clone())),
        }
    }
}

impl PartialEq for LocationPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Path(a), Self::Path(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for LocationPattern {}

impl Serialize for LocationPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Path(path) => serializer.serialize_str(path),
            Self::Regex(re) => {
                let mut state = serializer.serialize_struct("Regex", 1)?;
                state.serialize_field("pattern", re.as_str())?;
                state.end()
            }
        }
    }
}

/// A directive invocation: `proxy_pass http://example.com;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpression {
    pub directive: String,
    pub arguments: Vec<Token>,
}

/// `set $name value...;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub id: String,
    pub value: VariableValue,
}

/// Right-hand side of a `set`: one token, or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    Scalar(Token),
    List(Vec<Token>),
}

/// Shorthand `source => target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleRule {
    pub left: Token,
    pub right: Token,
}

impl Statement {
    /// Block kind for block statements, `None` for plain statements.
    #[must_use]
    pub const fn block_kind(&self) -> Option<BlockKind> {
        match self {
            Self::Domain(_) => Some(BlockKind::Domain),
            Self::Location(_) => Some(BlockKind::Location),
            Self::Call(_) | Self::Variable(_) | Self::Rule(_) => None,
        }
    }
}
