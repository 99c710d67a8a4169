//! Compiler for scoped rewrite/proxy rule files.
//!
//! Rule files nest directives and `set` variables in three scopes:
//! the global scope, `domain` blocks, and `location` blocks. This crate
//! scans, parses, and resolves them into one flat entry per host name,
//! with inherited variables and directives merged in and `$name`
//! references substituted.
//!
//! # Quick start
//!
//! ```
//! use rewrite_conf::compile;
//!
//! let input = "set $api http://127.0.0.1:8000\n\
//!              example.com => {\n\
//!                  location /api {\n\
//!                      proxy_pass $api;\n\
//!                  }\n\
//!              }\n";
//! let config = compile(input).unwrap();
//! let location = &config["example.com"].locations[0];
//! assert_eq!(location.directives[0].arguments, ["http://127.0.0.1:8000"]);
//! ```
//!
//! ## Shorthand rules
//!
//! ```
//! use rewrite_conf::{compile, Value};
//!
//! let config = compile("http://api.example.com/ => http://example.com/api/").unwrap();
//! let location = &config["api.example.com"].locations[0];
//! assert!(location.is_base_rule);
//! assert_eq!(
//!     location.variables["proxy_pass"],
//!     Value::Scalar("http://example.com/api/".to_string())
//! );
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod source;
pub mod token;

pub use ast::{
    BlockKind, CallExpression, DomainBlock, LocationBlock, LocationPattern, SimpleRule, Statement,
    Unit, VariableDeclaration, VariableValue,
};
pub use config::CompilerConfig;
pub use lexer::{LexError, LexErrorKind, Lexer, tokenize};
pub use parser::{ErrorClass, ParseError, ParseErrorKind, Parser, parse};
pub use report::{Compiler, Reporter, TracingReporter};
pub use resolver::{
    ResolvedConfig, ResolvedDirective, ResolvedDomain, ResolvedLocation, Resolver, Scope, Value,
    Variables, resolve, substitute, substitute_map, substitute_str,
};
pub use source::{Diagnostic, Position, SourceCursor};
pub use token::{Keyword, Span, Token, TokenKind};

/// Unified error type covering both lexing and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

impl Error {
    /// The located report for this error.
    #[must_use]
    pub const fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Lex(e) => &e.diagnostic,
            Self::Parse(e) => &e.diagnostic,
        }
    }

    /// `None` for lexical errors.
    #[must_use]
    pub const fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Lex(_) => None,
            Self::Parse(e) => Some(e.kind.class()),
        }
    }

    /// Attach a source name to the diagnostic.
    #[must_use]
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        let diagnostic = match &mut self {
            Self::Lex(e) => &mut e.diagnostic,
            Self::Parse(e) => &mut e.diagnostic,
        };
        diagnostic.source_name = Some(name.into());
        self
    }
}

/// Parse and resolve a rule source string with default options.
pub fn compile(input: &str) -> Result<ResolvedConfig, Error> {
    Ok(resolve(&parse(input)?))
}
